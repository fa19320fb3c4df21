use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shift {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartnerMetrics {
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub completed_orders: u32,
    #[serde(default)]
    pub cancelled_orders: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPartner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: PartnerStatus,
    pub current_load: u32,
    pub areas: Vec<String>,
    pub shift: Shift,
    pub metrics: PartnerMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryPartner {
    pub fn is_active(&self) -> bool {
        self.status == PartnerStatus::Active
    }

    pub fn has_capacity(&self, max_load: u32) -> bool {
        self.current_load < max_load
    }

    pub fn is_assignable(&self, max_load: u32) -> bool {
        self.is_active() && self.has_capacity(max_load)
    }
}
