//! Restrict-content verification
//!
//! A visitor proves they may read gated content by entering an emailed
//! one-time code. A correct code for an entitled subscriber yields a signed
//! [`SubscriptionProof`] that the caller keeps as a cookie. Every later
//! request re-checks the proof and re-confirms entitlement with the API.

pub mod challenge;
pub mod ip;
pub mod proof;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::client::KitApi;
use crate::config::RestrictContentSettings;
use crate::error::{AccessError, Result};
use crate::store::key::{CHALLENGE_PREFIX, CODE_REQUESTS_PREFIX, challenge_key, code_requests_key};
use crate::store::{KeyValueStore, get_json, set_json};

pub use challenge::{CodeRequestLog, OneTimeCodeChallenge};
pub use ip::ip_in_range;
pub use proof::SubscriptionProof;

/// Cookie (and URL parameter) carrying the proof
pub const PROOF_COOKIE: &str = "kitgate_proof";

/// Content gated behind a tag or a product purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum GatedResource {
    Tag(u64),
    Product(u64),
}

impl GatedResource {
    /// Parse a resource type name and id, as given by a caller.
    pub fn parse(kind: &str, id: &str) -> std::result::Result<Self, AccessError> {
        let invalid = || AccessError::InvalidResource(format!("{} {}", kind, id));

        let id: u64 = id.trim().parse().map_err(|_| invalid())?;
        if id == 0 {
            return Err(invalid());
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "tag" => Ok(GatedResource::Tag(id)),
            "product" => Ok(GatedResource::Product(id)),
            _ => Err(invalid()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatedResource::Tag(_) => "tag",
            GatedResource::Product(_) => "product",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            GatedResource::Tag(id) | GatedResource::Product(id) => *id,
        }
    }
}

impl std::fmt::Display for GatedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// What the caller knows about the visitor
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    pub proof_param: Option<String>,
    pub proof_cookie: Option<String>,
    pub ip: Option<String>,
}

impl VisitorContext {
    /// The presented proof, URL parameter first
    pub fn proof(&self) -> Option<&str> {
        [&self.proof_param, &self.proof_cookie]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .find(|p| !p.is_empty())
    }
}

/// Why a visitor was let in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessGrant {
    Crawler { ip: String },
    Subscriber { subscriber_id: u64 },
}

/// Returned to the caller after a code was sent
#[derive(Debug, Clone, Serialize)]
pub struct IssuedChallenge {
    pub token: String,
    pub email: String,
    pub resource: GatedResource,
    pub expires_at: DateTime<Utc>,
}

/// Returned after a correct code for an entitled subscriber
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedAccess {
    pub subscriber_id: u64,
    pub resource: GatedResource,
    pub proof: SubscriptionProof,
    pub cookie_value: String,
}

#[derive(Debug, Clone)]
pub struct VerifierOptions {
    pub code_ttl: Duration,
    pub proof_ttl: Duration,
    pub max_code_requests: u32,
    pub code_request_window: Duration,
    pub max_code_attempts: u32,
    pub scope_proofs: bool,
    pub permit_crawlers: bool,
    pub crawler_ip_ranges: Vec<String>,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::from_settings(&RestrictContentSettings::default())
    }
}

impl VerifierOptions {
    pub fn from_settings(settings: &RestrictContentSettings) -> Self {
        Self {
            code_ttl: Duration::from_secs(settings.code_ttl_secs),
            proof_ttl: Duration::from_secs(settings.proof_ttl_secs),
            max_code_requests: settings.max_code_requests,
            code_request_window: Duration::from_secs(settings.code_request_window_secs),
            max_code_attempts: settings.max_code_attempts.max(1),
            scope_proofs: settings.scope_proofs,
            permit_crawlers: settings.permit_crawlers,
            crawler_ip_ranges: settings.crawler_ip_ranges.clone(),
        }
    }
}

/// Email + one-time-code verifier for gated content
pub struct RestrictContentVerifier {
    api: Arc<dyn KitApi>,
    store: Arc<dyn KeyValueStore>,
    secret: Vec<u8>,
    options: VerifierOptions,
}

impl RestrictContentVerifier {
    pub fn new(
        api: Arc<dyn KitApi>,
        store: Arc<dyn KeyValueStore>,
        secret: Vec<u8>,
        options: VerifierOptions,
    ) -> Self {
        Self {
            api,
            store,
            secret,
            options,
        }
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    /// Whether the visitor may see `resource`. Any failure denies access.
    pub async fn is_authorized(&self, visitor: &VisitorContext, resource: &GatedResource) -> bool {
        match self.authorize(visitor, resource).await {
            Ok(grant) => {
                debug!("Granted {} ({:?})", resource, grant);
                true
            }
            Err(e) => {
                debug!("Denied {}: {}", resource, e);
                false
            }
        }
    }

    /// Like [`is_authorized`](Self::is_authorized), with the reason.
    pub async fn authorize(
        &self,
        visitor: &VisitorContext,
        resource: &GatedResource,
    ) -> Result<AccessGrant> {
        if let Some(ip) = visitor.ip.as_deref()
            && self.is_crawler(ip)
        {
            return Ok(AccessGrant::Crawler { ip: ip.to_string() });
        }

        let token = visitor
            .proof()
            .ok_or_else(|| AccessError::InvalidProof("no proof presented".to_string()))?;

        let proof = SubscriptionProof::verify(token, &self.secret, Utc::now())?;
        if !proof.covers(resource) {
            return Err(AccessError::InvalidProof(format!("not valid for {}", resource)).into());
        }

        if !self
            .api
            .check_entitlement(proof.subscriber_id, resource)
            .await?
        {
            return Err(AccessError::NotEntitled.into());
        }

        Ok(AccessGrant::Subscriber {
            subscriber_id: proof.subscriber_id,
        })
    }

    /// Whether `ip` belongs to an allowed crawler
    pub fn is_crawler(&self, ip: &str) -> bool {
        self.options.permit_crawlers && ip::in_any_range(ip, &self.options.crawler_ip_ranges)
    }

    /// Start a challenge: store it and email the code.
    pub async fn request_code(
        &self,
        email: &str,
        resource: &GatedResource,
    ) -> Result<IssuedChallenge> {
        let email = validate_email(email)?;

        if let Err(e) = self.purge_expired_challenges() {
            warn!("Could not purge expired challenges: {}", e);
        }
        if let Err(e) = self.purge_stale_code_requests() {
            warn!("Could not purge code request logs: {}", e);
        }

        let mut requests = self.recent_code_requests(&email)?;

        let (challenge, code) =
            OneTimeCodeChallenge::issue(&email, *resource, self.options.code_ttl, &self.secret);
        let key = challenge_key(&challenge.token);
        set_json(self.store.as_ref(), &key, &challenge)?;

        if let Err(e) = self.api.send_one_time_code(&email, &code, resource).await {
            self.store.delete(&key)?;
            return Err(e);
        }

        requests.record(Utc::now());
        set_json(self.store.as_ref(), &code_requests_key(&email), &requests)?;

        info!("Sent code for {} to {}", resource, email);
        Ok(IssuedChallenge {
            token: challenge.token,
            email,
            resource: *resource,
            expires_at: challenge.expires_at,
        })
    }

    /// Requests from `email` still inside the window. Errors once the
    /// limit is reached. Only sent codes are counted.
    fn recent_code_requests(&self, email: &str) -> Result<CodeRequestLog> {
        let key = code_requests_key(email);
        let now = Utc::now();
        let window = self.options.code_request_window;

        let mut log: CodeRequestLog = match get_json(self.store.as_ref(), &key) {
            Ok(log) => log.unwrap_or_default(),
            Err(e) => {
                warn!("Resetting unreadable request log: {}", e);
                CodeRequestLog::default()
            }
        };
        log.prune(window, now);

        if let Some(retry_after) = log.retry_after(self.options.max_code_requests, window, now) {
            debug!("Code request limit reached for {}", email);
            return Err(AccessError::TooManyRequests(retry_after).into());
        }
        Ok(log)
    }

    /// Check a code against its challenge and mint a proof.
    ///
    /// Expiry is checked before the code. A challenge is consumed by its
    /// first correct code, and dropped after too many wrong ones.
    pub async fn verify_code(&self, code: &str, token: &str) -> Result<VerifiedAccess> {
        let key = challenge_key(token.trim());

        let mut challenge: OneTimeCodeChallenge = match get_json(self.store.as_ref(), &key) {
            Ok(Some(challenge)) => challenge,
            Ok(None) => return Err(AccessError::UnknownToken.into()),
            Err(e) => {
                warn!("Dropping unreadable challenge: {}", e);
                self.store.delete(&key)?;
                return Err(AccessError::UnknownToken.into());
            }
        };

        if challenge.is_expired_at(Utc::now()) {
            self.store.delete(&key)?;
            return Err(AccessError::CodeExpired.into());
        }

        if !challenge.matches(code, &self.secret) {
            challenge.attempts += 1;
            if challenge.attempts >= self.options.max_code_attempts {
                debug!("Too many wrong codes, dropping challenge");
                self.store.delete(&key)?;
            } else {
                set_json(self.store.as_ref(), &key, &challenge)?;
            }
            return Err(AccessError::CodeMismatch.into());
        }

        // Lost a race with another verification of the same token
        if !self.store.delete(&key)? {
            return Err(AccessError::UnknownToken.into());
        }

        let subscriber = self
            .api
            .get_subscriber_by_email(&challenge.email)
            .await?
            .ok_or(AccessError::NotEntitled)?;

        if !self
            .api
            .check_entitlement(subscriber.id, &challenge.resource)
            .await?
        {
            return Err(AccessError::NotEntitled.into());
        }

        let scope = self.options.scope_proofs.then_some(challenge.resource);
        let proof = SubscriptionProof::issue(subscriber.id, scope, self.options.proof_ttl);
        let cookie_value = proof.encode(&self.secret)?;

        info!(
            "Verified subscriber {} for {}",
            subscriber.id, challenge.resource
        );
        Ok(VerifiedAccess {
            subscriber_id: subscriber.id,
            resource: challenge.resource,
            proof,
            cookie_value,
        })
    }

    /// Delete challenges past their expiry. Returns how many were removed.
    pub fn purge_expired_challenges(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        for key in self.store.keys(CHALLENGE_PREFIX)? {
            let expired = match get_json::<OneTimeCodeChallenge>(self.store.as_ref(), &key) {
                Ok(Some(challenge)) => challenge.is_expired_at(now),
                Ok(None) => false,
                Err(_) => true,
            };
            if expired && self.store.delete(&key)? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Purged {} expired challenges", removed);
        }
        Ok(removed)
    }

    /// Delete request logs with nothing left inside the request window.
    /// Returns how many were removed.
    pub fn purge_stale_code_requests(&self) -> Result<usize> {
        let now = Utc::now();
        let window = self.options.code_request_window;
        let mut removed = 0;

        for key in self.store.keys(CODE_REQUESTS_PREFIX)? {
            let stale = match get_json::<CodeRequestLog>(self.store.as_ref(), &key) {
                Ok(Some(mut log)) => {
                    log.prune(window, now);
                    log.requested_at.is_empty()
                }
                Ok(None) => false,
                Err(_) => true,
            };
            if stale && self.store.delete(&key)? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Purged {} code request logs", removed);
        }
        Ok(removed)
    }
}

/// Trim and sanity-check an email address
fn validate_email(email: &str) -> std::result::Result<String, AccessError> {
    let email = email.trim();
    let invalid = || AccessError::InvalidEmail(email.to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockKitClient;
    use crate::client::models::Subscriber;
    use crate::error::{ApiError, Error};
    use crate::store::MemoryStore;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const EMAIL: &str = "reader@example.com";

    fn subscriber(id: u64, email: &str) -> Subscriber {
        Subscriber {
            id,
            first_name: Some("Reader".to_string()),
            email_address: email.to_string(),
            state: "active".to_string(),
            created_at: None,
        }
    }

    async fn product_buyer() -> MockKitClient {
        MockKitClient::new()
            .with_subscriber(subscriber(42, EMAIL))
            .await
            .with_entitlement(42, GatedResource::Product(123))
            .await
    }

    fn verifier_with(
        mock: MockKitClient,
        options: VerifierOptions,
    ) -> (RestrictContentVerifier, Arc<MockKitClient>, Arc<MemoryStore>) {
        let mock = Arc::new(mock);
        let store = Arc::new(MemoryStore::new());
        let verifier =
            RestrictContentVerifier::new(mock.clone(), store.clone(), SECRET.to_vec(), options);
        (verifier, mock, store)
    }

    fn verifier(
        mock: MockKitClient,
    ) -> (RestrictContentVerifier, Arc<MockKitClient>, Arc<MemoryStore>) {
        verifier_with(mock, VerifierOptions::default())
    }

    fn expect_access(err: Error) -> AccessError {
        match err {
            Error::Access(e) => e,
            other => panic!("Expected access error, got {:?}", other),
        }
    }

    #[test]
    fn test_gated_resource_parse() {
        assert_eq!(
            GatedResource::parse("product", "123"),
            Ok(GatedResource::Product(123))
        );
        assert_eq!(GatedResource::parse(" Tag ", " 7 "), Ok(GatedResource::Tag(7)));

        for (kind, id) in [("form", "1"), ("tag", "0"), ("tag", "abc"), ("product", "-4")] {
            assert!(matches!(
                GatedResource::parse(kind, id),
                Err(AccessError::InvalidResource(_))
            ));
        }
    }

    #[test]
    fn test_gated_resource_serde() {
        let json = serde_json::to_string(&GatedResource::Product(123)).unwrap();
        assert_eq!(json, r#"{"type":"product","id":123}"#);
        assert_eq!(GatedResource::Tag(5).to_string(), "tag:5");
    }

    #[test]
    fn test_visitor_prefers_url_parameter() {
        let visitor = VisitorContext {
            proof_param: Some("from-url".to_string()),
            proof_cookie: Some("from-cookie".to_string()),
            ip: None,
        };
        assert_eq!(visitor.proof(), Some("from-url"));

        let visitor = VisitorContext {
            proof_param: Some("  ".to_string()),
            proof_cookie: Some("from-cookie".to_string()),
            ip: None,
        };
        assert_eq!(visitor.proof(), Some("from-cookie"));
        assert_eq!(VisitorContext::default().proof(), None);
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" a@example.com ").unwrap(), "a@example.com");
        for bad in ["", "plain", "@example.com", "a@b", "a@@b.com", "a b@c.com", "a@.com"] {
            assert!(validate_email(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_end_to_end_product_access() {
        let (verifier, mock, _store) = verifier(product_buyer().await);
        let product = GatedResource::Product(123);

        let issued = verifier.request_code(EMAIL, &product).await.unwrap();
        let sent = mock.sent_codes().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, EMAIL);
        assert_eq!(sent[0].resource, product);

        let access = verifier
            .verify_code(&sent[0].code, &issued.token)
            .await
            .unwrap();
        assert_eq!(access.subscriber_id, 42);

        let visitor = VisitorContext {
            proof_cookie: Some(access.cookie_value.clone()),
            ..VisitorContext::default()
        };
        assert!(verifier.is_authorized(&visitor, &product).await);
        assert!(
            !verifier
                .is_authorized(&visitor, &GatedResource::Product(124))
                .await
        );
    }

    #[tokio::test]
    async fn test_expired_challenge_reports_expiry_even_with_right_code() {
        let (verifier, mock, store) = verifier(product_buyer().await);

        let issued = verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap();
        let code = mock.sent_codes().await[0].code.clone();

        let key = challenge_key(&issued.token);
        let mut challenge: OneTimeCodeChallenge =
            get_json(store.as_ref(), &key).unwrap().unwrap();
        challenge.expires_at = Utc::now() - chrono::Duration::minutes(1);
        set_json(store.as_ref(), &key, &challenge).unwrap();

        let err = verifier.verify_code(&code, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::CodeExpired);
        assert!(store.get(&key).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replayed_token_is_unknown() {
        let (verifier, mock, _store) = verifier(product_buyer().await);

        let issued = verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap();
        let code = mock.sent_codes().await[0].code.clone();

        verifier.verify_code(&code, &issued.token).await.unwrap();
        let err = verifier.verify_code(&code, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::UnknownToken);
    }

    #[tokio::test]
    async fn test_wrong_code_then_lockout() {
        let options = VerifierOptions {
            max_code_attempts: 2,
            ..VerifierOptions::default()
        };
        let (verifier, mock, _store) = verifier_with(product_buyer().await, options);

        let issued = verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap();
        let code = mock.sent_codes().await[0].code.clone();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let err = verifier.verify_code(wrong, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::CodeMismatch);
        let err = verifier.verify_code(wrong, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::CodeMismatch);

        // Challenge is gone after the second miss, even with the right code
        let err = verifier.verify_code(&code, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::UnknownToken);
    }

    #[tokio::test]
    async fn test_unentitled_subscriber() {
        let (verifier, mock, _store) = verifier(product_buyer().await);

        let issued = verifier
            .request_code(EMAIL, &GatedResource::Tag(9))
            .await
            .unwrap();
        let code = mock.sent_codes().await[0].code.clone();

        let err = verifier.verify_code(&code, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::NotEntitled);
    }

    #[tokio::test]
    async fn test_unknown_subscriber_not_entitled() {
        let (verifier, mock, _store) = verifier(MockKitClient::new());

        let issued = verifier
            .request_code("stranger@example.com", &GatedResource::Tag(9))
            .await
            .unwrap();
        let code = mock.sent_codes().await[0].code.clone();

        let err = verifier.verify_code(&code, &issued.token).await.unwrap_err();
        assert_eq!(expect_access(err), AccessError::NotEntitled);
    }

    #[tokio::test]
    async fn test_code_request_limit() {
        let (verifier, mock, _store) = verifier(product_buyer().await);
        let product = GatedResource::Product(123);

        for _ in 0..3 {
            verifier.request_code(EMAIL, &product).await.unwrap();
        }
        let err = verifier
            .request_code(&EMAIL.to_uppercase(), &product)
            .await
            .unwrap_err();
        assert!(matches!(
            expect_access(err),
            AccessError::TooManyRequests(_)
        ));
        assert_eq!(mock.sent_codes().await.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_before_sending() {
        let (verifier, mock, _store) = verifier(product_buyer().await);

        let err = verifier
            .request_code("not-an-email", &GatedResource::Tag(1))
            .await
            .unwrap_err();
        assert!(matches!(expect_access(err), AccessError::InvalidEmail(_)));
        assert_eq!(mock.call_counts().await.total(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_discards_challenge() {
        let mock = product_buyer()
            .await
            .with_error(ApiError::ServerError("mail down".to_string()))
            .await;
        let (verifier, _mock, store) = verifier(mock);

        let err = verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::ServerError(_))));
        assert!(store.keys(CHALLENGE_PREFIX).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_does_not_count_toward_limit() {
        let (verifier, mock, _store) = verifier(product_buyer().await);
        let product = GatedResource::Product(123);

        mock.set_error(ApiError::ServerError("mail down".to_string()))
            .await;
        assert!(verifier.request_code(EMAIL, &product).await.is_err());

        for _ in 0..3 {
            verifier.request_code(EMAIL, &product).await.unwrap();
        }
        assert_eq!(mock.sent_codes().await.len(), 3);
    }

    #[tokio::test]
    async fn test_purge_stale_code_requests() {
        let (verifier, _mock, store) = verifier(product_buyer().await);
        let key = code_requests_key(EMAIL);

        let old = CodeRequestLog {
            requested_at: vec![Utc::now() - chrono::Duration::days(2)],
        };
        set_json(store.as_ref(), &key, &old).unwrap();
        store
            .set(&code_requests_key("other@example.com"), "{")
            .unwrap();
        assert_eq!(verifier.purge_stale_code_requests().unwrap(), 2);
        assert!(store.keys(CODE_REQUESTS_PREFIX).unwrap().is_empty());

        verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap();
        assert_eq!(verifier.purge_stale_code_requests().unwrap(), 0);
        assert_eq!(store.keys(CODE_REQUESTS_PREFIX).unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_crawler_ip_is_authorized() {
        let (verifier, mock, _store) = verifier(MockKitClient::new());
        let visitor = VisitorContext {
            ip: Some("66.249.66.1".to_string()),
            ..VisitorContext::default()
        };

        assert!(verifier.is_authorized(&visitor, &GatedResource::Tag(1)).await);
        assert_eq!(mock.call_counts().await.total(), 0);

        let options = VerifierOptions {
            permit_crawlers: false,
            ..VerifierOptions::default()
        };
        let (strict, _mock, _store) = verifier_with(MockKitClient::new(), options);
        assert!(!strict.is_authorized(&visitor, &GatedResource::Tag(1)).await);
    }

    #[tokio::test]
    async fn test_missing_or_forged_proof_denied() {
        let (verifier, _mock, _store) = verifier(product_buyer().await);
        let product = GatedResource::Product(123);

        assert!(
            !verifier
                .is_authorized(&VisitorContext::default(), &product)
                .await
        );

        let forged = SubscriptionProof::issue(42, None, Duration::from_secs(60))
            .encode(b"not-the-real-secret")
            .unwrap();
        let visitor = VisitorContext {
            proof_cookie: Some(forged),
            ..VisitorContext::default()
        };
        assert!(!verifier.is_authorized(&visitor, &product).await);
    }

    #[tokio::test]
    async fn test_entitlement_rechecked_on_every_request() {
        let (verifier, mock, _store) = verifier(product_buyer().await);
        let cookie = SubscriptionProof::issue(42, None, Duration::from_secs(60))
            .encode(SECRET)
            .unwrap();
        let visitor = VisitorContext {
            proof_cookie: Some(cookie),
            ..VisitorContext::default()
        };

        mock.set_error(ApiError::Network("offline".to_string()))
            .await;
        assert!(
            !verifier
                .is_authorized(&visitor, &GatedResource::Product(123))
                .await
        );
        assert!(
            verifier
                .is_authorized(&visitor, &GatedResource::Product(123))
                .await
        );
        assert_eq!(mock.call_counts().await.check_entitlement, 2);
    }

    #[tokio::test]
    async fn test_scoped_proofs() {
        let options = VerifierOptions {
            scope_proofs: true,
            ..VerifierOptions::default()
        };
        let mock = product_buyer()
            .await
            .with_entitlement(42, GatedResource::Tag(9))
            .await;
        let (verifier, mock, _store) = verifier_with(mock, options);

        let issued = verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap();
        let code = mock.sent_codes().await[0].code.clone();
        let access = verifier.verify_code(&code, &issued.token).await.unwrap();
        assert_eq!(access.proof.scope, Some(GatedResource::Product(123)));

        let visitor = VisitorContext {
            proof_param: Some(access.cookie_value),
            ..VisitorContext::default()
        };
        assert!(
            !verifier
                .is_authorized(&visitor, &GatedResource::Tag(9))
                .await
        );
    }

    #[tokio::test]
    async fn test_purge_expired_challenges() {
        let (verifier, _mock, store) = verifier(product_buyer().await);

        let issued = verifier
            .request_code(EMAIL, &GatedResource::Product(123))
            .await
            .unwrap();
        store.set(&challenge_key("garbage"), "{").unwrap();
        assert_eq!(verifier.purge_expired_challenges().unwrap(), 1);

        let key = challenge_key(&issued.token);
        let mut challenge: OneTimeCodeChallenge =
            get_json(store.as_ref(), &key).unwrap().unwrap();
        challenge.expires_at = Utc::now() - chrono::Duration::seconds(1);
        set_json(store.as_ref(), &key, &challenge).unwrap();

        assert_eq!(verifier.purge_expired_challenges().unwrap(), 1);
        assert!(store.keys(CHALLENGE_PREFIX).unwrap().is_empty());
    }
}
