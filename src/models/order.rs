use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Assigned,
    Picked,
    Delivered,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Assigned,
        OrderStatus::Picked,
        OrderStatus::Delivered,
        OrderStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Picked => "picked",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Failed)
    }

    /// Targets reachable through the status endpoint. `assigned` is only
    /// ever set by binding a partner.
    pub fn is_transition_target(&self) -> bool {
        !matches!(self, OrderStatus::Assigned)
    }

    pub fn requires_partner(&self) -> bool {
        matches!(self, OrderStatus::Picked | OrderStatus::Delivered)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (*self, next),
            (Pending, Assigned)
                | (Assigned, Picked)
                | (Assigned, Delivered)
                | (Assigned, Failed)
                | (Picked, Delivered)
                | (Picked, Failed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| format!("unknown order status '{raw}'"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer: Customer,
    pub area: String,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub scheduled_for: String,
    pub assigned_to: Option<Uuid>,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus;

    #[test]
    fn happy_path_transitions_are_allowed() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Assigned));
        assert!(OrderStatus::Assigned.can_transition_to(OrderStatus::Picked));
        assert!(OrderStatus::Picked.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Assigned.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn failure_is_reachable_only_once_a_partner_is_bound() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Failed));
        assert!(OrderStatus::Assigned.can_transition_to(OrderStatus::Failed));
        assert!(OrderStatus::Picked.can_transition_to(OrderStatus::Failed));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [OrderStatus::Delivered, OrderStatus::Failed] {
            assert!(terminal.is_terminal());
            for next in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn picked_cannot_go_back_to_pending() {
        assert!(!OrderStatus::Picked.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Assigned.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn parses_lowercase_names_only() {
        assert_eq!("picked".parse::<OrderStatus>(), Ok(OrderStatus::Picked));
        assert!("Picked".parse::<OrderStatus>().is_err());
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn assigned_is_not_a_transition_target() {
        assert!(!OrderStatus::Assigned.is_transition_target());
        assert!(OrderStatus::Pending.is_transition_target());
        assert!(OrderStatus::Failed.is_transition_target());
    }
}
