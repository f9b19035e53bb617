//! Broadcast (post) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public broadcast, rendered by sites as a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Broadcast ID
    pub id: u64,

    /// Broadcast subject, used as the post title
    #[serde(rename = "subject")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the broadcast is published to the web
    #[serde(rename = "public", default)]
    pub is_public: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}
