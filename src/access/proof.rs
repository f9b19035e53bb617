//! Signed subscription proofs
//!
//! A proof is the cookie value handed to a verified visitor:
//! `v1.<base64url(json claims)>.<base64url(hmac-sha256)>`. The MAC covers
//! the version tag and the encoded claims.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::GatedResource;
use crate::error::AccessError;

type HmacSha256 = Hmac<Sha256>;

const VERSION: &str = "v1";

/// Claims carried by a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionProof {
    pub subscriber_id: u64,

    /// Resource the proof is limited to; unscoped proofs cover any resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<GatedResource>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SubscriptionProof {
    /// New proof valid from now for `ttl`, at whole-second precision
    pub fn issue(subscriber_id: u64, scope: Option<GatedResource>, ttl: Duration) -> Self {
        let issued_at = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap_or_default();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            subscriber_id,
            scope,
            issued_at,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the proof may be used for `resource`
    pub fn covers(&self, resource: &GatedResource) -> bool {
        self.scope.is_none_or(|scope| scope == *resource)
    }

    /// Sign and encode as a cookie value
    pub fn encode(&self, secret: &[u8]) -> Result<String, AccessError> {
        let claims =
            serde_json::to_vec(self).map_err(|e| AccessError::InvalidProof(e.to_string()))?;
        let signed = format!("{}.{}", VERSION, URL_SAFE_NO_PAD.encode(claims));

        let mut mac = mac(secret)?;
        mac.update(signed.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signed, tag))
    }

    /// Check the signature and decode the claims. Does not check expiry.
    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, AccessError> {
        let (signed, tag) = split(token)?;

        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| AccessError::InvalidProof("malformed signature".to_string()))?;

        let mut mac = mac(secret)?;
        mac.update(signed.as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| AccessError::InvalidProof("signature mismatch".to_string()))?;

        Self::decode_unverified(token)
    }

    /// Check the signature and expiry
    pub fn verify(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Self, AccessError> {
        let proof = Self::decode(token, secret)?;
        if proof.is_expired_at(now) {
            return Err(AccessError::ProofExpired);
        }
        Ok(proof)
    }

    /// Decode the claims without checking the signature (diagnostics only)
    pub fn decode_unverified(token: &str) -> Result<Self, AccessError> {
        let (signed, _) = split(token)?;
        let claims = signed
            .strip_prefix(VERSION)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| AccessError::InvalidProof("unsupported version".to_string()))?;

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| AccessError::InvalidProof("malformed claims".to_string()))?;

        serde_json::from_slice(&claims).map_err(|e| AccessError::InvalidProof(e.to_string()))
    }
}

/// Split into the signed part and the signature
fn split(token: &str) -> Result<(&str, &str), AccessError> {
    let token = token.trim();
    let (signed, tag) = token
        .rsplit_once('.')
        .ok_or_else(|| AccessError::InvalidProof("malformed proof".to_string()))?;

    if !signed.starts_with(VERSION) || signed.matches('.').count() != 1 {
        return Err(AccessError::InvalidProof("unsupported version".to_string()));
    }
    Ok((signed, tag))
}

fn mac(secret: &[u8]) -> Result<HmacSha256, AccessError> {
    HmacSha256::new_from_slice(secret).map_err(|e| AccessError::InvalidProof(e.to_string()))
}
