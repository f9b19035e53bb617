//! Error types for kitgate

use std::time::Duration;
use thiserror::Error;

/// Result type alias for kitgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Kit API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Run `kitgate init` to set up your API key.")]
    Unauthorized,

    #[error("Access denied. Your API key doesn't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `kitgate init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("API key not configured. Run `kitgate init` to set up your API key.")]
    MissingApiKey,

    #[error("Signing secret not configured. Run `kitgate init` to generate one.")]
    MissingSigningSecret,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Store database error: {0}")]
    Database(String),

    #[error("Corrupt store value for {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Restrict-content verification failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("The code has expired. Request a new one.")]
    CodeExpired,

    #[error("The code is incorrect.")]
    CodeMismatch,

    #[error("Unknown or already used verification token.")]
    UnknownToken,

    #[error("This email address does not have access to the requested content.")]
    NotEntitled,

    #[error("Too many code requests. Retry after {0:?}")]
    TooManyRequests(Duration),

    #[error("Invalid subscription proof: {0}")]
    InvalidProof(String),

    #[error("Subscription proof has expired")]
    ProofExpired,
}
