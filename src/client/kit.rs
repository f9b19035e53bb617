//! Kit v4 API client implementation

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::KitApi;
use super::models::{
    CustomField, Form, LandingPage, Post, Product, Purchase, Sequence, Subscriber, Tag,
};
use super::pagination::{CursorPagination, PaginationParams};
use crate::access::GatedResource;
use crate::error::{ApiError, Result};

/// Kit API host
const API_HOST: &str = "https://api.kit.com";

/// Kit allows 120 requests per rolling minute per API key
const RATE_LIMIT_PER_MINUTE: u32 = 120;

/// Upper bound on pages followed for a single list, guards against cursor loops
const MAX_PAGES: usize = 500;

/// Kit API client
pub struct KitClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    max_pages: usize,
}

impl KitClient {
    /// Create a client against the production API
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_host(api_key, None)
    }

    /// Create a client against a custom host (e.g. a local mock server)
    pub fn with_host(api_key: Option<String>, host: Option<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let host = host.unwrap_or_else(|| API_HOST.to_string());
        let base_url = format!("{}/v4", host.trim_end_matches('/'));

        Ok(Self {
            http,
            base_url,
            api_key,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(
                NonZeroU32::new(RATE_LIMIT_PER_MINUTE).unwrap_or(NonZeroU32::MIN),
            ))),
            max_pages: MAX_PAGES,
        })
    }

    /// Make an authenticated API request and decode the JSON body.
    ///
    /// Empty bodies (202 Accepted, 204 No Content) decode as `null`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let api_key = self.api_key.as_deref().ok_or(ApiError::Unauthorized)?;

        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method, &url)
            .header("X-Kit-Api-Key", api_key)
            .header("Accept", "application/json")
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ApiError::from)?;

        let status = response.status();
        match status {
            status if status.is_success() => {
                let text = response.text().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to read response: {}", e))
                })?;
                let text = if text.trim().is_empty() { "null" } else { &text };
                let data = serde_json::from_str::<T>(text).map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                Ok(data)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden.into()),
            StatusCode::NOT_FOUND => {
                let error_msg = response
                    .text()
                    .await
                    .ok()
                    .and_then(|body| error_message(&body))
                    .unwrap_or_else(|| path.to_string());
                Err(ApiError::NotFound(error_msg).into())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)).into())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let error_msg = response
                    .text()
                    .await
                    .ok()
                    .and_then(|body| error_message(&body))
                    .unwrap_or_else(|| "Bad request".to_string());
                Err(ApiError::BadRequest(error_msg).into())
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg).into())
            }
            _ => {
                let error_msg = format!("Unexpected status code: {}", status);
                Err(ApiError::InvalidResponse(error_msg).into())
            }
        }
    }

    /// Follow cursor pagination and collect every item under `key`.
    ///
    /// A listing that is still paging after `max_pages` is an error, never a
    /// truncated result.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut params = PaginationParams::new();

        for page in 0..self.max_pages {
            let mut query = params.to_query_params();
            query.extend(filters.iter().map(|(k, v)| (*k, v.clone())));

            let mut body: Value = self.request(Method::GET, path, &query, None).await?;

            let page_items = body.get_mut(key).map(Value::take).ok_or_else(|| {
                ApiError::InvalidResponse(format!("Missing '{}' in response from {}", key, path))
            })?;
            let page_items: Vec<T> = serde_json::from_value(page_items).map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to parse {}: {}", key, e))
            })?;
            debug!("{} page {} returned {} {}", path, page, page_items.len(), key);
            items.extend(page_items);

            let pagination: CursorPagination = body
                .get_mut("pagination")
                .map(Value::take)
                .and_then(|p| serde_json::from_value(p).ok())
                .unwrap_or_default();

            match pagination.next_cursor() {
                Some(cursor) if params.after.as_deref() != Some(cursor) => {
                    params = params.after(cursor);
                }
                _ => return Ok(items),
            }
        }

        Err(ApiError::InvalidResponse(format!(
            "{} has more than {} pages",
            path, self.max_pages
        ))
        .into())
    }
}

/// Pull a readable message out of a Kit error body (`{"errors": ["..."]}`)
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let errors = value.get("errors")?.as_array()?;
    let messages: Vec<&str> = errors.iter().filter_map(Value::as_str).collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[async_trait]
impl KitApi for KitClient {
    async fn list_forms(&self) -> Result<Vec<Form>> {
        let filters = [("type", "embed".to_string()), ("status", "active".to_string())];
        self.fetch_all("/forms", "forms", &filters).await
    }

    async fn list_landing_pages(&self) -> Result<Vec<LandingPage>> {
        let filters = [("type", "hosted".to_string()), ("status", "active".to_string())];
        self.fetch_all("/forms", "forms", &filters).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.fetch_all("/tags", "tags", &[]).await
    }

    async fn list_sequences(&self) -> Result<Vec<Sequence>> {
        self.fetch_all("/sequences", "sequences", &[]).await
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>> {
        self.fetch_all("/custom_fields", "custom_fields", &[]).await
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let broadcasts: Vec<Post> = self.fetch_all("/broadcasts", "broadcasts", &[]).await?;
        Ok(broadcasts.into_iter().filter(|b| b.is_public).collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.fetch_all("/products", "products", &[]).await
    }

    async fn send_one_time_code(
        &self,
        email: &str,
        code: &str,
        resource: &GatedResource,
    ) -> Result<()> {
        let body = json!({
            "email_address": email,
            "code": code,
            "resource_type": resource.kind(),
            "resource_id": resource.id(),
        });
        let _: Value = self
            .request(
                Method::POST,
                "/subscribers/one_time_codes",
                &[],
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn get_subscriber_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        let query = [
            ("email_address", email.to_string()),
            ("status", "all".to_string()),
        ];
        let mut body: Value = self
            .request(Method::GET, "/subscribers", &query, None)
            .await?;

        let subscribers: Vec<Subscriber> = body
            .get_mut("subscribers")
            .map(Value::take)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse subscribers: {}", e)))?
            .unwrap_or_default();

        Ok(subscribers
            .into_iter()
            .find(|s| s.email_address.eq_ignore_ascii_case(email)))
    }

    async fn check_entitlement(
        &self,
        subscriber_id: u64,
        resource: &GatedResource,
    ) -> Result<bool> {
        match resource {
            GatedResource::Tag(tag_id) => {
                let path = format!("/subscribers/{}/tags", subscriber_id);
                let tags: Vec<Tag> = self.fetch_all(&path, "tags", &[]).await?;
                Ok(tags.iter().any(|t| t.id == *tag_id))
            }
            GatedResource::Product(product_id) => {
                let path = format!("/subscribers/{}/purchases", subscriber_id);
                let purchases: Vec<Purchase> = self.fetch_all(&path, "purchases", &[]).await?;
                Ok(purchases.iter().any(|p| p.includes_product(*product_id)))
            }
        }
    }
}
