//! Configuration management for kitgate

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::resource::{RefreshPolicy, ResourceType, SortOrder};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Kit v4 API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom API host (development/testing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    /// Base64 secret used to sign subscription proofs and code digests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_secret: Option<String>,

    /// Surface degraded-path details instead of rendering nothing
    #[serde(default)]
    pub debug: bool,

    /// Resource cache settings
    #[serde(default)]
    pub resources: ResourceSettings,

    /// Restrict content settings
    #[serde(default)]
    pub restrict_content: RestrictContentSettings,
}

/// Resource cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Default cache duration for every resource type
    #[serde(default = "default_cache_duration_secs")]
    pub cache_duration_secs: u64,

    /// Per-type overrides of `cache_duration_secs`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cache_durations: BTreeMap<ResourceType, u64>,

    /// Record field to sort by
    #[serde(default = "default_order_by")]
    pub order_by: String,

    /// Sort direction
    #[serde(default)]
    pub order: SortOrder,

    /// What to do when a cached set has expired
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    /// Interval used by `kitgate resource watch`
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_cache_duration_secs() -> u64 {
    365 * 24 * 60 * 60
}

fn default_order_by() -> String {
    "name".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60 * 60
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            cache_duration_secs: default_cache_duration_secs(),
            cache_durations: BTreeMap::new(),
            order_by: default_order_by(),
            order: SortOrder::default(),
            refresh_policy: RefreshPolicy::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl ResourceSettings {
    /// Cache duration for a resource type, honouring per-type overrides
    pub fn cache_duration(&self, resource_type: ResourceType) -> Duration {
        let secs = self
            .cache_durations
            .get(&resource_type)
            .copied()
            .unwrap_or(self.cache_duration_secs);
        Duration::from_secs(secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Restrict content settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictContentSettings {
    /// How long an emailed code stays valid
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,

    /// How long a subscription proof (cookie) stays valid
    #[serde(default = "default_proof_ttl_secs")]
    pub proof_ttl_secs: u64,

    /// Code requests allowed per email within the request window
    #[serde(default = "default_max_code_requests")]
    pub max_code_requests: u32,

    /// Length of the code request window
    #[serde(default = "default_code_ttl_secs")]
    pub code_request_window_secs: u64,

    /// Wrong codes allowed before a challenge is discarded
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,

    /// Bind proofs to the resource they were issued for
    #[serde(default)]
    pub scope_proofs: bool,

    /// Let search engine crawlers read restricted content
    #[serde(default = "default_permit_crawlers")]
    pub permit_crawlers: bool,

    /// IPv4 CIDR blocks treated as crawlers
    #[serde(default = "default_crawler_ip_ranges")]
    pub crawler_ip_ranges: Vec<String>,
}

fn default_code_ttl_secs() -> u64 {
    15 * 60
}

fn default_proof_ttl_secs() -> u64 {
    30 * 24 * 60 * 60
}

fn default_max_code_requests() -> u32 {
    3
}

fn default_max_code_attempts() -> u32 {
    5
}

fn default_permit_crawlers() -> bool {
    true
}

// Googlebot ranges published by Google
fn default_crawler_ip_ranges() -> Vec<String> {
    [
        "66.249.64.0/19",
        "34.100.182.96/28",
        "34.101.50.144/28",
        "34.118.254.0/28",
        "34.118.66.0/28",
        "34.126.178.96/28",
        "34.146.150.144/28",
        "34.147.110.144/28",
        "34.151.74.144/28",
        "34.152.50.64/28",
        "35.247.243.240/28",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for RestrictContentSettings {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl_secs(),
            proof_ttl_secs: default_proof_ttl_secs(),
            max_code_requests: default_max_code_requests(),
            code_request_window_secs: default_code_ttl_secs(),
            max_code_attempts: default_max_code_attempts(),
            scope_proofs: false,
            permit_crawlers: default_permit_crawlers(),
            crawler_ip_ranges: default_crawler_ip_ranges(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".kitgate").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional override path
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to an optional override path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // The file holds the API key and signing secret
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Validate that the API key is present
    pub fn validate_auth(&self) -> Result<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::MissingApiKey.into()),
        }
    }

    /// Decode the signing secret
    pub fn signing_secret_bytes(&self) -> Result<Vec<u8>> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        let encoded = self
            .signing_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSigningSecret)?;

        let secret = STANDARD.decode(encoded.trim()).map_err(|e| {
            ConfigError::Invalid(format!("signing_secret is not valid base64: {}", e))
        })?;

        if secret.len() < 16 {
            return Err(ConfigError::Invalid(
                "signing_secret must decode to at least 16 bytes".to_string(),
            )
            .into());
        }

        Ok(secret)
    }

    /// Generate a fresh random signing secret (base64)
    pub fn generate_signing_secret() -> String {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_key.is_none());
        assert!(config.signing_secret.is_none());
        assert_eq!(config.resources.order_by, "name");
        assert_eq!(config.resources.order, SortOrder::Asc);
        assert_eq!(config.restrict_content.code_ttl_secs, 900);
        assert!(config.restrict_content.permit_crawlers);
    }

    #[test]
    fn test_cache_duration_override() {
        let mut settings = ResourceSettings::default();
        settings.cache_durations.insert(ResourceType::Posts, 3600);

        assert_eq!(
            settings.cache_duration(ResourceType::Posts),
            Duration::from_secs(3600)
        );
        assert_eq!(
            settings.cache_duration(ResourceType::Forms),
            Duration::from_secs(365 * 24 * 60 * 60)
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "api_key: abc\nresources:\n  order: desc\n  cache_durations:\n    tags: 60\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.resources.order, SortOrder::Desc);
        assert_eq!(config.resources.order_by, "name");
        assert_eq!(
            config.resources.cache_duration(ResourceType::Tags),
            Duration::from_secs(60)
        );
        assert_eq!(config.restrict_content.max_code_attempts, 5);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config {
            api_key: Some("key-123".to_string()),
            signing_secret: Some(Config::generate_signing_secret()),
            ..Config::default()
        };
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("key-123"));
        assert_eq!(loaded.signing_secret, config.signing_secret);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::NotFound)
        ));
    }

    #[test]
    fn test_validate_auth() {
        let mut config = Config::default();
        assert!(config.validate_auth().is_err());

        config.api_key = Some("  ".to_string());
        assert!(config.validate_auth().is_err());

        config.api_key = Some("key".to_string());
        assert!(config.validate_auth().is_ok());
    }

    #[test]
    fn test_signing_secret_bytes() {
        let mut config = Config::default();
        assert!(matches!(
            config.signing_secret_bytes(),
            Err(crate::error::Error::Config(ConfigError::MissingSigningSecret))
        ));

        config.signing_secret = Some("c2hvcnQ=".to_string());
        assert!(config.signing_secret_bytes().is_err());

        config.signing_secret = Some(Config::generate_signing_secret());
        assert_eq!(config.signing_secret_bytes().unwrap().len(), 32);
    }
}
