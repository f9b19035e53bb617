//! Email one-time-code challenges

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::GatedResource;

type HmacSha256 = Hmac<Sha256>;

/// A pending code challenge as stored between request and verification.
///
/// The code itself is never stored, only a MAC of it bound to the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeCodeChallenge {
    pub email: String,
    pub token: String,
    pub resource: GatedResource,
    pub code_digest: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

impl OneTimeCodeChallenge {
    /// Create a challenge with a fresh code and token.
    ///
    /// Returns the challenge and the plain code to send to the visitor.
    pub fn issue(
        email: &str,
        resource: GatedResource,
        ttl: Duration,
        secret: &[u8],
    ) -> (Self, String) {
        let code = generate_code();
        let token = generate_token();
        let issued_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .unwrap_or(issued_at);

        let challenge = Self {
            email: email.to_string(),
            code_digest: code_digest(secret, &token, &code),
            token,
            resource,
            issued_at,
            expires_at,
            attempts: 0,
        };
        (challenge, code)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Constant-time comparison of `code` against the stored digest
    pub fn matches(&self, code: &str, secret: &[u8]) -> bool {
        let Ok(expected) = URL_SAFE_NO_PAD.decode(&self.code_digest) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
            return false;
        };
        mac.update(self.token.as_bytes());
        mac.update(b":");
        mac.update(code.trim().as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}

/// Six random ASCII digits, zero padded
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// 32 random bytes, base64url
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn code_digest(secret: &[u8], token: &str, code: &str) -> String {
    match HmacSha256::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(token.as_bytes());
            mac.update(b":");
            mac.update(code.as_bytes());
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        }
        // HMAC accepts keys of any length
        Err(_) => String::new(),
    }
}

/// Recent code requests for one email address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeRequestLog {
    #[serde(default)]
    pub requested_at: Vec<DateTime<Utc>>,
}

impl CodeRequestLog {
    /// Forget requests older than `window`
    pub fn prune(&mut self, window: Duration, now: DateTime<Utc>) {
        let Ok(window) = chrono::Duration::from_std(window) else {
            return;
        };
        self.requested_at.retain(|at| *at + window > now);
    }

    /// Time until another request is allowed, if the limit is reached
    pub fn retry_after(&self, max: u32, window: Duration, now: DateTime<Utc>) -> Option<Duration> {
        if (self.requested_at.len() as u64) < u64::from(max) {
            return None;
        }
        let oldest = self.requested_at.iter().min()?;
        let window = chrono::Duration::from_std(window).ok()?;
        let wait = (*oldest + window - now).to_std().unwrap_or(Duration::ZERO);
        Some(wait.max(Duration::from_secs(1)))
    }

    pub fn record(&mut self, now: DateTime<Utc>) {
        self.requested_at.push(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_code_is_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn test_challenge_matches_only_its_code() {
        let (challenge, code) = OneTimeCodeChallenge::issue(
            "a@example.com",
            GatedResource::Tag(1),
            Duration::from_secs(900),
            SECRET,
        );

        assert!(challenge.matches(&code, SECRET));
        assert!(challenge.matches(&format!(" {} ", code), SECRET));
        assert!(!challenge.matches("not-it", SECRET));
        assert!(!challenge.matches(&code, b"some-other-secret"));
        assert!(!challenge.code_digest.contains(&code));
    }

    #[test]
    fn test_challenge_expiry() {
        let (challenge, _) = OneTimeCodeChallenge::issue(
            "a@example.com",
            GatedResource::Tag(1),
            Duration::from_secs(900),
            SECRET,
        );
        assert!(!challenge.is_expired_at(challenge.issued_at));
        assert!(challenge.is_expired_at(challenge.expires_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_request_log_limits() {
        let window = Duration::from_secs(900);
        let now = Utc::now();
        let mut log = CodeRequestLog::default();

        for i in 0..3 {
            assert!(log.retry_after(3, window, now).is_none());
            log.record(now - chrono::Duration::minutes(10 - i));
        }

        let wait = log.retry_after(3, window, now).unwrap();
        assert!(wait <= Duration::from_secs(5 * 60));
        assert!(wait >= Duration::from_secs(4 * 60));
    }

    #[test]
    fn test_request_log_prune() {
        let window = Duration::from_secs(900);
        let now = Utc::now();
        let mut log = CodeRequestLog::default();
        log.record(now - chrono::Duration::minutes(20));
        log.record(now - chrono::Duration::minutes(1));

        log.prune(window, now);
        assert_eq!(log.requested_at.len(), 1);
    }
}
