use serde::Serialize;
use uuid::Uuid;

use crate::models::metrics::AssignmentMetrics;
use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DispatchEvent {
    OrderCreated {
        order: Order,
    },
    OrderAssigned {
        order: Order,
        partner_id: Uuid,
    },
    OrderStatusChanged {
        order: Order,
        previous: OrderStatus,
    },
    MetricsRefreshed {
        metrics: AssignmentMetrics,
    },
}
