use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Email sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub id: u64,

    pub name: String,

    /// Whether the sequence is paused
    #[serde(default)]
    pub hold: bool,

    /// Whether subscribers may go through the sequence more than once
    #[serde(default)]
    pub repeat: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
