use serde::{Deserialize, Serialize};

/// Commerce product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,

    pub name: String,

    /// Checkout URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub published: bool,
}
