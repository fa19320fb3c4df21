use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::order::{Order, OrderStatus};
use crate::models::partner::DeliveryPartner;

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub statuses: Vec<OrderStatus>,
    pub areas: Vec<String>,
    pub date: Option<NaiveDate>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && (self.areas.is_empty() || self.areas.iter().any(|a| a == &order.area))
            && self
                .date
                .is_none_or(|date| order.created_at.date_naive() == date)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub total_orders: u64,
    pub orders_by_status: BTreeMap<OrderStatus, u64>,
    pub orders_by_area: BTreeMap<String, u64>,
    /// Whole minutes from creation to the delivered update.
    pub average_delivery_time: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartnerAvailability {
    pub available: u64,
    pub busy: u64,
    pub offline: u64,
}

pub fn performance<'a>(orders: impl IntoIterator<Item = &'a Order>) -> PerformanceMetrics {
    let mut total_orders = 0;
    let mut orders_by_status = BTreeMap::new();
    let mut orders_by_area = BTreeMap::new();
    let mut delivered = 0i64;
    let mut delivery_millis = 0i64;

    for order in orders {
        total_orders += 1;
        *orders_by_status.entry(order.status).or_insert(0) += 1;
        *orders_by_area.entry(order.area.clone()).or_insert(0) += 1;

        if order.status == OrderStatus::Delivered {
            delivered += 1;
            delivery_millis += (order.updated_at - order.created_at).num_milliseconds().max(0);
        }
    }

    let average_delivery_time = if delivered == 0 {
        0
    } else {
        (delivery_millis as f64 / delivered as f64 / 60_000.0).round() as i64
    };

    PerformanceMetrics {
        total_orders,
        orders_by_status,
        orders_by_area,
        average_delivery_time,
    }
}

pub fn availability<'a>(
    partners: impl IntoIterator<Item = &'a DeliveryPartner>,
    max_load: u32,
) -> PartnerAvailability {
    let mut summary = PartnerAvailability {
        available: 0,
        busy: 0,
        offline: 0,
    };

    for partner in partners {
        if !partner.is_active() {
            summary.offline += 1;
        } else if partner.has_capacity(max_load) {
            summary.available += 1;
        } else {
            summary.busy += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::{OrderFilter, availability, performance};
    use crate::models::order::{Customer, Order, OrderItem, OrderStatus};
    use crate::models::partner::{DeliveryPartner, PartnerMetrics, PartnerStatus, Shift};

    fn order(area: &str, status: OrderStatus, minutes_to_update: i64) -> Order {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-1".to_string(),
            customer: Customer {
                name: "Ada".to_string(),
                phone: "5551234567".to_string(),
                address: "1 Main St".to_string(),
            },
            area: area.to_string(),
            items: vec![OrderItem {
                name: "Bread".to_string(),
                quantity: 1,
                price: 3.5,
            }],
            status,
            scheduled_for: "10:00".to_string(),
            assigned_to: None,
            total_amount: 3.5,
            created_at,
            updated_at: created_at + Duration::minutes(minutes_to_update),
        }
    }

    fn partner(status: PartnerStatus, load: u32) -> DeliveryPartner {
        DeliveryPartner {
            id: Uuid::new_v4(),
            name: "Pat".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            phone: "5550000000".to_string(),
            status,
            current_load: load,
            areas: vec!["north".to_string()],
            shift: Shift {
                start: "08:00".to_string(),
                end: "16:00".to_string(),
            },
            metrics: PartnerMetrics::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn groups_by_status_and_area() {
        let orders = vec![
            order("north", OrderStatus::Pending, 0),
            order("north", OrderStatus::Delivered, 30),
            order("south", OrderStatus::Delivered, 60),
        ];

        let metrics = performance(&orders);
        assert_eq!(metrics.total_orders, 3);
        assert_eq!(metrics.orders_by_status[&OrderStatus::Delivered], 2);
        assert_eq!(metrics.orders_by_status[&OrderStatus::Pending], 1);
        assert_eq!(metrics.orders_by_area["north"], 2);
        assert_eq!(metrics.average_delivery_time, 45);
    }

    #[test]
    fn no_deliveries_means_zero_average() {
        let orders = vec![order("north", OrderStatus::Assigned, 90)];
        assert_eq!(performance(&orders).average_delivery_time, 0);
    }

    #[test]
    fn filter_combines_status_area_and_date() {
        let delivered_north = order("north", OrderStatus::Delivered, 10);
        let pending_south = order("south", OrderStatus::Pending, 0);

        let filter = OrderFilter {
            statuses: vec![OrderStatus::Delivered],
            areas: vec!["north".to_string()],
            date: NaiveDate::from_ymd_opt(2026, 3, 14),
        };
        assert!(filter.matches(&delivered_north));
        assert!(!filter.matches(&pending_south));

        let other_day = OrderFilter {
            date: NaiveDate::from_ymd_opt(2026, 3, 15),
            ..OrderFilter::default()
        };
        assert!(!other_day.matches(&delivered_north));
        assert!(OrderFilter::default().matches(&pending_south));
    }

    #[test]
    fn availability_splits_by_status_and_capacity() {
        let partners = vec![
            partner(PartnerStatus::Active, 0),
            partner(PartnerStatus::Active, 2),
            partner(PartnerStatus::Active, 3),
            partner(PartnerStatus::Inactive, 0),
        ];

        let summary = availability(&partners, 3);
        assert_eq!(summary.available, 2);
        assert_eq!(summary.busy, 1);
        assert_eq!(summary.offline, 1);
    }
}
