//! Command execution context
//!
//! Provides a unified context for command execution, eliminating boilerplate
//! for config loading, store opening, and client initialization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::access::{RestrictContentVerifier, VerifierOptions};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::{KitApi, KitClient};
use crate::config::Config;
use crate::error::Result;
use crate::resource::{CacheOptions, Resource, ResourceCache};
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};

/// Store location that keeps everything in memory for one invocation
pub const MEMORY_STORE: &str = ":memory:";

/// Context for command execution containing config, client, store and
/// runtime options.
pub struct CommandContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Kit API client (Arc-wrapped so caches and the verifier can share it)
    pub client: Arc<dyn KitApi>,
    /// Persistent option store
    pub store: Arc<dyn KeyValueStore>,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// # Errors
    /// Returns error if config cannot be loaded, the API key is missing, or
    /// the store cannot be opened.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        config.validate_auth()?;

        let api_host = opts
            .api_host
            .clone()
            .or_else(|| config.api_host.clone());
        let client = KitClient::with_host(config.api_key.clone(), api_host)?;

        let store = open_store(opts.store_ref())?;

        Ok(Self {
            config,
            client: Arc::new(client),
            store,
            format: opts.format,
        })
    }

    /// Cache for one resource type using configured options
    pub fn cache<R: Resource>(&self) -> ResourceCache<R> {
        let options = CacheOptions::from_settings(&self.config.resources, R::TYPE);
        self.cache_with(options)
    }

    pub fn cache_with<R: Resource>(&self, options: CacheOptions) -> ResourceCache<R> {
        ResourceCache::new(self.client.clone(), self.store.clone(), options)
    }

    /// Restrict-content verifier; requires a signing secret
    pub fn verifier(&self) -> Result<RestrictContentVerifier> {
        let secret = self.config.signing_secret_bytes()?;
        Ok(RestrictContentVerifier::new(
            self.client.clone(),
            self.store.clone(),
            secret,
            VerifierOptions::from_settings(&self.config.restrict_content),
        ))
    }
}

/// Open the store at `location`, the default directory when `None`
pub fn open_store(location: Option<&str>) -> Result<Arc<dyn KeyValueStore>> {
    match location {
        Some(MEMORY_STORE) => Ok(Arc::new(MemoryStore::new())),
        Some(dir) => Ok(Arc::new(SqliteStore::open_at(Path::new(dir))?)),
        None => Ok(Arc::new(SqliteStore::open()?)),
    }
}

/// Directory the store lives in, `None` for an in-memory store
pub fn store_dir(location: Option<&str>) -> Result<Option<PathBuf>> {
    match location {
        Some(MEMORY_STORE) => Ok(None),
        Some(dir) => Ok(Some(PathBuf::from(dir))),
        None => Ok(Some(SqliteStore::store_dir()?)),
    }
}
