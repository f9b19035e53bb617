//! Kit API client

use async_trait::async_trait;

use crate::access::GatedResource;
use crate::error::Result;

pub mod kit;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod pagination;

pub use kit::KitClient;
#[cfg(test)]
pub use mock::MockKitClient;

use models::{CustomField, Form, LandingPage, Post, Product, Sequence, Subscriber, Tag};

/// Kit API surface used by the resource cache and the restrict-content verifier.
///
/// Authentication is the implementation's concern.
#[async_trait]
pub trait KitApi: Send + Sync {
    // ========================================================================
    // Resources
    // ========================================================================

    /// List embeddable forms
    async fn list_forms(&self) -> Result<Vec<Form>>;

    /// List hosted landing pages
    async fn list_landing_pages(&self) -> Result<Vec<LandingPage>>;

    /// List subscriber tags
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// List email sequences
    async fn list_sequences(&self) -> Result<Vec<Sequence>>;

    /// List subscriber custom fields
    async fn list_custom_fields(&self) -> Result<Vec<CustomField>>;

    /// List public broadcasts
    async fn list_posts(&self) -> Result<Vec<Post>>;

    /// List commerce products
    async fn list_products(&self) -> Result<Vec<Product>>;

    // ========================================================================
    // Restrict content
    // ========================================================================

    /// Email a one-time code to a visitor
    async fn send_one_time_code(
        &self,
        email: &str,
        code: &str,
        resource: &GatedResource,
    ) -> Result<()>;

    /// Look up a subscriber by email address
    async fn get_subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    /// Whether a subscriber is tagged with, or has purchased, a resource
    async fn check_entitlement(&self, subscriber_id: u64, resource: &GatedResource)
    -> Result<bool>;
}
