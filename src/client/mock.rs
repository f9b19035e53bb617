//! Mock Kit API client for testing
//!
//! Provides an in-memory implementation of [`KitApi`] for unit testing
//! without making real API calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KitApi;
use super::models::{CustomField, Form, LandingPage, Post, Product, Sequence, Subscriber, Tag};
use crate::access::GatedResource;
use crate::error::{ApiError, Result};

/// Mock API client for testing.
///
/// Configure expected responses via builder methods, then use in tests.
///
/// # Example
/// ```ignore
/// let mock = MockKitClient::new()
///     .with_tags(vec![Tag { id: 1, name: "Members".into(), created_at: None }])
///     .await;
///
/// let tags = mock.list_tags().await?;
/// assert_eq!(tags.len(), 1);
/// ```
pub struct MockKitClient {
    forms: Arc<Mutex<Vec<Form>>>,
    landing_pages: Arc<Mutex<Vec<LandingPage>>>,
    tags: Arc<Mutex<Vec<Tag>>>,
    sequences: Arc<Mutex<Vec<Sequence>>>,
    custom_fields: Arc<Mutex<Vec<CustomField>>>,
    posts: Arc<Mutex<Vec<Post>>>,
    products: Arc<Mutex<Vec<Product>>>,
    /// Subscribers known to get_subscriber_by_email
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    /// (subscriber id, resource) pairs that check_entitlement accepts
    entitlements: Arc<Mutex<Vec<(u64, GatedResource)>>>,
    /// Error to return (if any) - consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Artificial latency applied to every call
    delay: Arc<Mutex<Option<Duration>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
    /// Codes handed to send_one_time_code
    sent_codes: Arc<Mutex<Vec<SentCode>>>,
}

impl Default for MockKitClient {
    fn default() -> Self {
        Self {
            forms: Arc::new(Mutex::new(Vec::new())),
            landing_pages: Arc::new(Mutex::new(Vec::new())),
            tags: Arc::new(Mutex::new(Vec::new())),
            sequences: Arc::new(Mutex::new(Vec::new())),
            custom_fields: Arc::new(Mutex::new(Vec::new())),
            posts: Arc::new(Mutex::new(Vec::new())),
            products: Arc::new(Mutex::new(Vec::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            entitlements: Arc::new(Mutex::new(Vec::new())),
            error: Arc::new(Mutex::new(None)),
            delay: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(CallCounts::default())),
            sent_codes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub list_forms: usize,
    pub list_landing_pages: usize,
    pub list_tags: usize,
    pub list_sequences: usize,
    pub list_custom_fields: usize,
    pub list_posts: usize,
    pub list_products: usize,
    pub send_one_time_code: usize,
    pub get_subscriber_by_email: usize,
    pub check_entitlement: usize,
}

impl CallCounts {
    /// Get total number of API calls made.
    pub fn total(&self) -> usize {
        self.list_forms
            + self.list_landing_pages
            + self.list_tags
            + self.list_sequences
            + self.list_custom_fields
            + self.list_posts
            + self.list_products
            + self.send_one_time_code
            + self.get_subscriber_by_email
            + self.check_entitlement
    }
}

/// A one-time code captured by the mock instead of being emailed.
#[derive(Debug, Clone)]
pub struct SentCode {
    pub email: String,
    pub code: String,
    pub resource: GatedResource,
}

impl MockKitClient {
    /// Create a new mock client with default (empty) responses.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_forms(self, forms: Vec<Form>) -> Self {
        *self.forms.lock().await = forms;
        self
    }

    #[allow(dead_code)]
    pub async fn with_landing_pages(self, pages: Vec<LandingPage>) -> Self {
        *self.landing_pages.lock().await = pages;
        self
    }

    pub async fn with_tags(self, tags: Vec<Tag>) -> Self {
        *self.tags.lock().await = tags;
        self
    }

    #[allow(dead_code)]
    pub async fn with_sequences(self, sequences: Vec<Sequence>) -> Self {
        *self.sequences.lock().await = sequences;
        self
    }

    #[allow(dead_code)]
    pub async fn with_custom_fields(self, fields: Vec<CustomField>) -> Self {
        *self.custom_fields.lock().await = fields;
        self
    }

    #[allow(dead_code)]
    pub async fn with_posts(self, posts: Vec<Post>) -> Self {
        *self.posts.lock().await = posts;
        self
    }

    pub async fn with_products(self, products: Vec<Product>) -> Self {
        *self.products.lock().await = products;
        self
    }

    /// Register a subscriber for get_subscriber_by_email.
    pub async fn with_subscriber(self, subscriber: Subscriber) -> Self {
        self.subscribers.lock().await.push(subscriber);
        self
    }

    /// Grant a subscriber access to a tag or product.
    pub async fn with_entitlement(self, subscriber_id: u64, resource: GatedResource) -> Self {
        self.entitlements
            .lock()
            .await
            .push((subscriber_id, resource));
        self
    }

    /// Configure an error to return on the next API call.
    /// The error is consumed after one use.
    pub async fn with_error(self, error: ApiError) -> Self {
        self.set_error(error).await;
        self
    }

    /// Arm a one-shot error on an already shared client.
    pub async fn set_error(&self, error: ApiError) {
        *self.error.lock().await = Some(error);
    }

    /// Delay every call, for exercising concurrent callers.
    pub async fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().await = Some(delay);
        self
    }

    /// Replace the configured forms on an already shared client.
    pub async fn set_forms(&self, forms: Vec<Form>) {
        *self.forms.lock().await = forms;
    }

    /// Get the call counts for verification in tests.
    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    /// Codes that would have been emailed.
    pub async fn sent_codes(&self) -> Vec<SentCode> {
        self.sent_codes.lock().await.clone()
    }

    /// Count the call, apply latency, then surface any pending error.
    async fn enter(&self, count: impl FnOnce(&mut CallCounts)) -> Result<()> {
        count(&mut *self.call_count.lock().await);

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl KitApi for MockKitClient {
    async fn list_forms(&self) -> Result<Vec<Form>> {
        self.enter(|c| c.list_forms += 1).await?;
        Ok(self.forms.lock().await.clone())
    }

    async fn list_landing_pages(&self) -> Result<Vec<LandingPage>> {
        self.enter(|c| c.list_landing_pages += 1).await?;
        Ok(self.landing_pages.lock().await.clone())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.enter(|c| c.list_tags += 1).await?;
        Ok(self.tags.lock().await.clone())
    }

    async fn list_sequences(&self) -> Result<Vec<Sequence>> {
        self.enter(|c| c.list_sequences += 1).await?;
        Ok(self.sequences.lock().await.clone())
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>> {
        self.enter(|c| c.list_custom_fields += 1).await?;
        Ok(self.custom_fields.lock().await.clone())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.enter(|c| c.list_posts += 1).await?;
        Ok(self.posts.lock().await.clone())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.enter(|c| c.list_products += 1).await?;
        Ok(self.products.lock().await.clone())
    }

    async fn send_one_time_code(
        &self,
        email: &str,
        code: &str,
        resource: &GatedResource,
    ) -> Result<()> {
        self.enter(|c| c.send_one_time_code += 1).await?;
        self.sent_codes.lock().await.push(SentCode {
            email: email.to_string(),
            code: code.to_string(),
            resource: *resource,
        });
        Ok(())
    }

    async fn get_subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        self.enter(|c| c.get_subscriber_by_email += 1).await?;
        Ok(self
            .subscribers
            .lock()
            .await
            .iter()
            .find(|s| s.email_address.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn check_entitlement(
        &self,
        subscriber_id: u64,
        resource: &GatedResource,
    ) -> Result<bool> {
        self.enter(|c| c.check_entitlement += 1).await?;
        Ok(self
            .entitlements
            .lock()
            .await
            .iter()
            .any(|(id, r)| *id == subscriber_id && r == resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn subscriber(id: u64, email: &str) -> Subscriber {
        Subscriber {
            id,
            first_name: None,
            email_address: email.to_string(),
            state: "active".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_mock_client_default_empty() {
        let client = MockKitClient::new();
        assert!(client.list_forms().await.unwrap().is_empty());
        assert!(client.list_products().await.unwrap().is_empty());
        assert!(
            client
                .get_subscriber_by_email("nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_mock_client_with_error_is_one_shot() {
        let client = MockKitClient::new()
            .with_error(ApiError::ServerError("boom".to_string()))
            .await;

        let err = client.list_tags().await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::ServerError(_))));
        assert!(client.list_tags().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_client_call_counts() {
        let client = MockKitClient::new();
        client.list_forms().await.unwrap();
        client.list_forms().await.unwrap();
        client.list_tags().await.unwrap();

        let counts = client.call_counts().await;
        assert_eq!(counts.list_forms, 2);
        assert_eq!(counts.list_tags, 1);
        assert_eq!(counts.total(), 3);
    }

    #[tokio::test]
    async fn test_mock_client_captures_sent_codes() {
        let client = MockKitClient::new();
        client
            .send_one_time_code("a@example.com", "012345", &GatedResource::Tag(9))
            .await
            .unwrap();

        let sent = client.sent_codes().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].code, "012345");
        assert_eq!(sent[0].resource, GatedResource::Tag(9));
    }

    #[tokio::test]
    async fn test_mock_client_entitlements() {
        let client = MockKitClient::new()
            .with_subscriber(subscriber(5, "Member@Example.com"))
            .await
            .with_entitlement(5, GatedResource::Product(123))
            .await;

        let found = client
            .get_subscriber_by_email("member@example.com")
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(5));

        assert!(
            client
                .check_entitlement(5, &GatedResource::Product(123))
                .await
                .unwrap()
        );
        assert!(
            !client
                .check_entitlement(5, &GatedResource::Tag(123))
                .await
                .unwrap()
        );
    }
}
