use serde::{Deserialize, Serialize};

/// Subscriber custom field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u64,

    /// Internal field name (e.g. `ck_field_1_last_name`)
    pub name: String,

    /// Key used in subscriber payloads
    pub key: String,

    /// Human readable label
    pub label: String,
}
