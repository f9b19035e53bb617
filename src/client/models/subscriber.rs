//! Subscriber and purchase models used by entitlement checks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kit subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    pub email_address: String,

    /// active, cancelled, bounced, complained or inactive
    #[serde(default = "default_state")]
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_state() -> String {
    "active".to_string()
}

/// Purchase recorded against a subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: u64,

    #[serde(default)]
    pub products: Vec<PurchasedProduct>,
}

/// Line item of a purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasedProduct {
    /// Product ID
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Purchase {
    pub fn includes_product(&self, product_id: u64) -> bool {
        self.products.iter().any(|p| p.id == product_id)
    }
}
