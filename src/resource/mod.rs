//! Kit resource types and the read-through resource cache
//!
//! Every resource Kit exposes to a site (forms, landing pages, tags,
//! sequences, custom fields, posts and products) is cached as a whole list
//! in the option store and refreshed from the API when it expires.

pub mod cache;
pub mod page;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::client::KitApi;
use crate::client::models::{CustomField, Form, LandingPage, Post, Product, Sequence, Tag};
use crate::error::Result;

pub use cache::{CacheOptions, CachedResourceSet, ResourceCache};
pub use page::PaginatedSubset;

/// Kinds of cached Kit resources
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Forms,
    LandingPages,
    Tags,
    Sequences,
    CustomFields,
    Posts,
    Products,
}

impl ResourceType {
    pub const ALL: [ResourceType; 7] = [
        ResourceType::Forms,
        ResourceType::LandingPages,
        ResourceType::Tags,
        ResourceType::Sequences,
        ResourceType::CustomFields,
        ResourceType::Posts,
        ResourceType::Products,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Forms => "forms",
            ResourceType::LandingPages => "landing_pages",
            ResourceType::Tags => "tags",
            ResourceType::Sequences => "sequences",
            ResourceType::CustomFields => "custom_fields",
            ResourceType::Posts => "posts",
            ResourceType::Products => "products",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for cached resource lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first)
    Desc,
}

/// Behaviour when a cached set has outlived its cache duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Refresh in the caller's path before serving
    #[default]
    Blocking,
    /// Serve the stale set and refresh on a background task
    StaleWhileRevalidate,
}

/// A record type that can be cached.
///
/// `name` is the display name used for default ordering; records whose wire
/// format calls it `title` (posts) map it here.
#[async_trait]
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: ResourceType;

    fn id(&self) -> u64;

    fn name(&self) -> &str;

    /// Fetch the complete list from the API
    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>>;
}

#[async_trait]
impl Resource for Form {
    const TYPE: ResourceType = ResourceType::Forms;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_forms().await
    }
}

#[async_trait]
impl Resource for LandingPage {
    const TYPE: ResourceType = ResourceType::LandingPages;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_landing_pages().await
    }
}

#[async_trait]
impl Resource for Tag {
    const TYPE: ResourceType = ResourceType::Tags;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_tags().await
    }
}

#[async_trait]
impl Resource for Sequence {
    const TYPE: ResourceType = ResourceType::Sequences;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_sequences().await
    }
}

#[async_trait]
impl Resource for CustomField {
    const TYPE: ResourceType = ResourceType::CustomFields;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_custom_fields().await
    }
}

#[async_trait]
impl Resource for Post {
    const TYPE: ResourceType = ResourceType::Posts;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.title
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_posts().await
    }
}

#[async_trait]
impl Resource for Product {
    const TYPE: ResourceType = ResourceType::Products;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(api: &dyn KitApi) -> Result<Vec<Self>> {
        api.list_products().await
    }
}
