//! Inventory, appointments and the invoice placeholder collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, deserialize_with = "super::decimal")]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub reorder_level: Option<i64>,
}

impl InventoryItem {
    /// At or below the reorder level
    pub fn needs_reorder(&self) -> bool {
        self.reorder_level
            .map(|level| self.quantity <= level)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub client: Option<i64>,
    #[serde(default)]
    pub vehicle: Option<i64>,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Appointment {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for >= now
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub job_card: Option<i64>,
    #[serde(default, deserialize_with = "super::decimal")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}
