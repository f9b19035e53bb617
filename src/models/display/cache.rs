//! Cached resource set display model

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use crate::output::formatters::{format_datetime, format_relative};
use crate::resource::ResourceType;

/// Summary of one cached resource set
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct CacheEntryDisplay {
    #[tabled(rename = "TYPE")]
    pub resource_type: ResourceType,

    #[tabled(rename = "ITEMS")]
    pub items: usize,

    #[tabled(rename = "LAST QUERIED")]
    #[serde(skip)]
    pub last_queried: String,

    #[tabled(rename = "EXPIRES")]
    #[serde(skip)]
    pub expires: String,

    #[tabled(skip)]
    pub last_queried_at: Option<DateTime<Utc>>,

    #[tabled(skip)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntryDisplay {
    pub fn new(
        resource_type: ResourceType,
        items: usize,
        last_queried_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        let expires = match (last_queried_at, expires_at) {
            (None, _) => "-".to_string(),
            (Some(_), None) => "never".to_string(),
            (Some(_), Some(at)) if at < now => format!("expired {}", format_relative(at, now)),
            (Some(_), Some(at)) => format_relative(at, now),
        };

        Self {
            resource_type,
            items,
            last_queried: format_datetime(last_queried_at),
            expires,
            last_queried_at,
            expires_at,
        }
    }
}
