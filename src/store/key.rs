//! Store key generation

use sha2::{Digest, Sha256};

use crate::resource::ResourceType;

/// Prefix for persisted resource sets
pub const RESOURCE_PREFIX: &str = "kitgate_resource_";

/// Prefix for pending one-time-code challenges
pub const CHALLENGE_PREFIX: &str = "kitgate_challenge_";

/// Prefix for per-email code request counters
pub const CODE_REQUESTS_PREFIX: &str = "kitgate_code_requests_";

/// Key holding the cached set for a resource type
pub fn resource_key(resource_type: ResourceType) -> String {
    format!("{}{}", RESOURCE_PREFIX, resource_type.as_str())
}

/// Key holding a pending challenge
pub fn challenge_key(token: &str) -> String {
    format!("{}{}", CHALLENGE_PREFIX, token)
}

/// Key holding the request counter for an email address.
///
/// The address is normalized and hashed so it never appears in the store.
pub fn code_requests_key(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    format!("{}{:x}", CODE_REQUESTS_PREFIX, hasher.finalize())
}
