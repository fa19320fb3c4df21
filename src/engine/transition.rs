use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::aggregation::refresh_in_tx;
use crate::error::AppError;
use crate::events::DispatchEvent;
use crate::models::assignment::{Assignment, AssignmentKey, AssignmentOutcome};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;
use crate::store::Transaction;

pub fn parse_target(raw: &str) -> Result<OrderStatus, AppError> {
    raw.trim()
        .parse::<OrderStatus>()
        .ok()
        .filter(OrderStatus::is_transition_target)
        .ok_or_else(|| {
            AppError::InvalidStatus(format!(
                "'{raw}' is not one of pending, picked, delivered, failed"
            ))
        })
}

/// Moves an order to `raw_status` and fans the change out to the bound
/// partner, the assignment record and the metrics snapshot.
pub async fn transition_status(
    state: Arc<AppState>,
    order_id: Uuid,
    raw_status: &str,
    reason: Option<String>,
) -> Result<Order, AppError> {
    let target = parse_target(raw_status)?;
    let reason = reason.filter(|r| !r.trim().is_empty());

    let tx = state.store.begin().await?;
    let (order, previous) = apply_transition(&state, &tx, order_id, target, reason)?;
    drop(tx);

    state
        .metrics
        .status_transitions_total
        .with_label_values(&[target.as_str()])
        .inc();

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        from = %previous,
        to = %target,
        "order status updated"
    );

    state.publish(DispatchEvent::OrderStatusChanged {
        order: order.clone(),
        previous,
    });

    Ok(order)
}

fn apply_transition(
    state: &AppState,
    tx: &Transaction<'_>,
    order_id: Uuid,
    target: OrderStatus,
    reason: Option<String>,
) -> Result<(Order, OrderStatus), AppError> {
    let store = &state.store;

    let mut order = store
        .order(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if target.requires_partner() && order.assigned_to.is_none() {
        return Err(AppError::PartnerRequired(target.to_string()));
    }

    let previous = order.status;
    let resubmission = previous == target;

    if !resubmission && !previous.can_transition_to(target) {
        return Err(AppError::InvalidTransition(format!(
            "order {} cannot move from {previous} to {target}",
            order.order_number
        )));
    }

    let now = Utc::now();
    order.status = target;
    order.updated_at = now;

    if target.is_terminal() {
        let partner_id = order.assigned_to.ok_or_else(|| {
            AppError::Internal(format!(
                "order {} reached {target} without a partner",
                order.order_number
            ))
        })?;

        store.orders.insert(order.id, order.clone());

        if !resubmission {
            release_partner(state, partner_id, target, now);
        }

        let outcome = if target == OrderStatus::Delivered {
            AssignmentOutcome::Success
        } else {
            AssignmentOutcome::Failed
        };
        upsert_assignment(state, order.id, partner_id, outcome, reason, now);

        refresh_in_tx(state, tx);
    } else {
        store.orders.insert(order.id, order.clone());
    }

    Ok((order, previous))
}

fn release_partner(state: &AppState, partner_id: Uuid, target: OrderStatus, now: DateTime<Utc>) {
    let Some(mut partner) = state.store.partners.get_mut(&partner_id) else {
        warn!(partner_id = %partner_id, "assigned partner no longer exists; counters not updated");
        return;
    };

    partner.current_load = partner.current_load.saturating_sub(1);
    match target {
        OrderStatus::Delivered => partner.metrics.completed_orders += 1,
        OrderStatus::Failed => partner.metrics.cancelled_orders += 1,
        _ => {}
    }
    partner.updated_at = now;

    state
        .metrics
        .record_partner_load(&partner_id.to_string(), partner.current_load);
}

/// One record per (order, partner): an existing record is updated in
/// place and keeps its original timestamp.
fn upsert_assignment(
    state: &AppState,
    order_id: Uuid,
    partner_id: Uuid,
    outcome: AssignmentOutcome,
    reason: Option<String>,
    now: DateTime<Utc>,
) {
    let key = AssignmentKey {
        order_id,
        partner_id,
    };

    state
        .store
        .assignments
        .entry(key)
        .and_modify(|existing| {
            if existing.status != outcome {
                existing.timestamp = now;
                existing.reason = None;
            }
            existing.status = outcome;
            if outcome == AssignmentOutcome::Failed && reason.is_some() {
                existing.reason = reason.clone();
            }
        })
        .or_insert_with(|| Assignment {
            id: Uuid::new_v4(),
            order_id,
            partner_id,
            timestamp: now,
            status: outcome,
            reason: match outcome {
                AssignmentOutcome::Failed => reason.clone(),
                AssignmentOutcome::Success => None,
            },
        });
}

#[cfg(test)]
mod tests {
    use super::parse_target;
    use crate::error::AppError;
    use crate::models::order::OrderStatus;

    #[test]
    fn accepts_the_four_transition_targets() {
        assert_eq!(parse_target("pending").unwrap(), OrderStatus::Pending);
        assert_eq!(parse_target("picked").unwrap(), OrderStatus::Picked);
        assert_eq!(parse_target(" delivered ").unwrap(), OrderStatus::Delivered);
        assert_eq!(parse_target("failed").unwrap(), OrderStatus::Failed);
    }

    #[test]
    fn rejects_assigned_and_unknown_targets() {
        assert!(matches!(parse_target("assigned"), Err(AppError::InvalidStatus(_))));
        assert!(matches!(parse_target("lost"), Err(AppError::InvalidStatus(_))));
        assert!(matches!(parse_target(""), Err(AppError::InvalidStatus(_))));
    }
}
