//! In-process document store: one concurrent map per collection plus a
//! write transaction that serializes multi-document mutations.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentKey};
use crate::models::metrics::AssignmentMetrics;
use crate::models::order::Order;
use crate::models::partner::DeliveryPartner;

/// Row key of the singleton metrics document.
pub const METRICS_KEY: &str = "assignment-metrics";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store busy: could not open a transaction within {0:?}")]
    Busy(Duration),
}

/// Held for the duration of a multi-document write.
pub struct Transaction<'a> {
    _guard: MutexGuard<'a, ()>,
}

pub struct Store {
    pub orders: DashMap<Uuid, Order>,
    pub partners: DashMap<Uuid, DeliveryPartner>,
    pub assignments: DashMap<AssignmentKey, Assignment>,
    pub metrics: DashMap<&'static str, AssignmentMetrics>,
    write_lock: Mutex<()>,
    lock_timeout: Duration,
    last_order_millis: AtomicI64,
}

impl Store {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            orders: DashMap::new(),
            partners: DashMap::new(),
            assignments: DashMap::new(),
            metrics: DashMap::new(),
            write_lock: Mutex::new(()),
            lock_timeout,
            last_order_millis: AtomicI64::new(0),
        }
    }

    pub async fn begin(&self) -> Result<Transaction<'_>, StoreError> {
        let guard = tokio::time::timeout(self.lock_timeout, self.write_lock.lock())
            .await
            .map_err(|_| StoreError::Busy(self.lock_timeout))?;

        Ok(Transaction { _guard: guard })
    }

    /// `ORD-<epoch-millis>`, bumped past the last issued value so two
    /// orders created in the same millisecond never share a number.
    pub fn next_order_number(&self, now: DateTime<Utc>) -> String {
        let wanted = now.timestamp_millis();
        let mut last = self.last_order_millis.load(Ordering::Relaxed);

        loop {
            let next = wanted.max(last + 1);
            match self.last_order_millis.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("ORD-{next}"),
                Err(current) => last = current,
            }
        }
    }

    pub fn order(&self, id: &Uuid) -> Option<Order> {
        self.orders.get(id).map(|entry| entry.value().clone())
    }

    pub fn partner(&self, id: &Uuid) -> Option<DeliveryPartner> {
        self.partners.get(id).map(|entry| entry.value().clone())
    }

    pub fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.partners.iter().any(|entry| {
            let partner = entry.value();
            Some(partner.id) != except && partner.email.eq_ignore_ascii_case(email)
        })
    }

    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    pub fn list_partners(&self) -> Vec<DeliveryPartner> {
        let mut partners: Vec<DeliveryPartner> = self
            .partners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        partners.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        partners
    }

    pub fn list_assignments(&self) -> Vec<Assignment> {
        let mut assignments: Vec<Assignment> = self
            .assignments
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        assignments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        assignments
    }

    pub fn current_metrics(&self) -> Option<AssignmentMetrics> {
        self.metrics
            .get(METRICS_KEY)
            .map(|entry| entry.value().clone())
    }

    pub fn replace_metrics(&self, snapshot: AssignmentMetrics) {
        self.metrics.insert(METRICS_KEY, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::Store;

    #[test]
    fn order_numbers_stay_unique_within_one_millisecond() {
        let store = Store::new(Duration::from_millis(50));
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let first = store.next_order_number(now);
        let second = store.next_order_number(now);

        assert_eq!(first, "ORD-1700000000000");
        assert_eq!(second, "ORD-1700000000001");
    }

    #[tokio::test]
    async fn second_transaction_times_out_while_first_is_open() {
        let store = Store::new(Duration::from_millis(20));
        let _tx = store.begin().await.unwrap();

        assert!(store.begin().await.is_err());
    }

    #[tokio::test]
    async fn transaction_is_reusable_after_drop() {
        let store = Store::new(Duration::from_millis(20));
        drop(store.begin().await.unwrap());

        assert!(store.begin().await.is_ok());
    }
}
