use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::aggregation::refresh_in_tx;
use crate::error::AppError;
use crate::events::DispatchEvent;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;
use crate::store::Transaction;

/// Binds `partner_id` to the pending order `order_id`.
pub async fn assign_partner(
    state: Arc<AppState>,
    order_id: Uuid,
    partner_id: Uuid,
) -> Result<Order, AppError> {
    let tx = state.store.begin().await?;

    match apply_assignment(&state, &tx, order_id, partner_id) {
        Ok(order) => {
            state
                .metrics
                .partner_assignments_total
                .with_label_values(&["assigned"])
                .inc();
            drop(tx);

            info!(
                order_id = %order.id,
                order_number = %order.order_number,
                partner_id = %partner_id,
                "partner assigned to order"
            );

            state.publish(DispatchEvent::OrderAssigned {
                order: order.clone(),
                partner_id,
            });
            Ok(order)
        }
        Err(err) => {
            state
                .metrics
                .partner_assignments_total
                .with_label_values(&["rejected"])
                .inc();
            warn!(order_id = %order_id, partner_id = %partner_id, error = %err, "assignment rejected");
            Err(err)
        }
    }
}

fn apply_assignment(
    state: &AppState,
    tx: &Transaction<'_>,
    order_id: Uuid,
    partner_id: Uuid,
) -> Result<Order, AppError> {
    let store = &state.store;

    let mut order = store
        .order(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let partner = store
        .partner(&partner_id)
        .ok_or_else(|| AppError::NotFound(format!("partner {partner_id} not found")))?;

    if !partner.is_active() {
        return Err(AppError::PartnerUnavailable(partner_id.to_string()));
    }
    if order.assigned_to.is_some() {
        return Err(AppError::AlreadyAssigned(order.order_number.clone()));
    }
    if !order.status.can_transition_to(OrderStatus::Assigned) {
        return Err(AppError::InvalidTransition(format!(
            "order {} is {} and cannot be assigned",
            order.order_number, order.status
        )));
    }
    if !partner.has_capacity(state.max_partner_load) {
        return Err(AppError::PartnerAtCapacity(format!(
            "{partner_id} (load {} of {})",
            partner.current_load, state.max_partner_load
        )));
    }

    let now = Utc::now();
    order.status = OrderStatus::Assigned;
    order.assigned_to = Some(partner_id);
    order.updated_at = now;
    store.orders.insert(order.id, order.clone());

    if let Some(mut partner) = store.partners.get_mut(&partner_id) {
        partner.current_load += 1;
        partner.updated_at = now;
        state
            .metrics
            .record_partner_load(&partner_id.to_string(), partner.current_load);
    }

    refresh_in_tx(state, tx);

    Ok(order)
}
