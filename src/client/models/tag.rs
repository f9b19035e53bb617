use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscriber tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
