//! Form and landing page models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Embeddable Kit form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    /// Form ID
    pub id: u64,

    /// Form name
    pub name: String,

    /// Display format (inline, modal, slide in, sticky bar)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Script URL used to embed the form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_js: Option<String>,

    /// Hosted URL of the form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,

    #[serde(default)]
    pub archived: bool,

    /// Short public identifier used by the embed script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Kit-hosted landing page (a form with type `hosted`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandingPage {
    /// Landing page ID
    pub id: u64,

    /// Landing page name
    pub name: String,

    /// Public URL of the landing page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,

    #[serde(default)]
    pub archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
