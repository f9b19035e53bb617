//! Read-through resource cache backed by the key-value store
//!
//! Each resource type is cached as one JSON document holding the complete
//! list and the time it was last fetched. Reads are served from an
//! in-memory snapshot; only `load()` and `refresh()` touch the network.

use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::page::{paginate, sort_records};
use super::{PaginatedSubset, RefreshPolicy, Resource, ResourceType, SortOrder};
use crate::client::KitApi;
use crate::config::ResourceSettings;
use crate::error::Result;
use crate::scheduler::{Job, JobScheduler};
use crate::store::key::resource_key;
use crate::store::{KeyValueStore, get_json, set_json};

/// A resource list as persisted in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: serde::de::DeserializeOwned"))]
pub struct CachedResourceSet<R> {
    pub resource_type: ResourceType,
    #[serde(default)]
    pub items: Vec<R>,
    #[serde(default)]
    pub last_queried_at: Option<DateTime<Utc>>,
}

impl<R> CachedResourceSet<R> {
    pub fn empty(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            items: Vec::new(),
            last_queried_at: None,
        }
    }

    /// When the set stops being fresh, if it was ever fetched
    pub fn expires_at(&self, cache_duration: Duration) -> Option<DateTime<Utc>> {
        let last = self.last_queried_at?;
        match chrono::Duration::from_std(cache_duration) {
            Ok(ttl) => last.checked_add_signed(ttl),
            Err(_) => None,
        }
    }

    /// Whether the set needs fetching at `now`.
    ///
    /// Never-fetched sets are always stale. A duration too large to
    /// represent never expires.
    pub fn is_stale_at(&self, cache_duration: Duration, now: DateTime<Utc>) -> bool {
        if self.last_queried_at.is_none() {
            return true;
        }
        match self.expires_at(cache_duration) {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}

/// Per-cache behaviour
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub cache_duration: Duration,
    pub order_by: String,
    pub order: SortOrder,
    pub refresh_policy: RefreshPolicy,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::from_settings(&ResourceSettings::default(), ResourceType::Forms)
    }
}

impl CacheOptions {
    pub fn from_settings(settings: &ResourceSettings, resource_type: ResourceType) -> Self {
        Self {
            cache_duration: settings.cache_duration(resource_type),
            order_by: settings.order_by.clone(),
            order: settings.order,
            refresh_policy: settings.refresh_policy,
        }
    }
}

/// Cache of one Kit resource type.
///
/// Clones share the same snapshot and refresh guard.
pub struct ResourceCache<R> {
    api: Arc<dyn KitApi>,
    store: Arc<dyn KeyValueStore>,
    options: CacheOptions,
    snapshot: Arc<RwLock<CachedResourceSet<R>>>,
    refresh_lock: Arc<Mutex<()>>,
    background: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl<R> Clone for ResourceCache<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            store: self.store.clone(),
            options: self.options.clone(),
            snapshot: self.snapshot.clone(),
            refresh_lock: self.refresh_lock.clone(),
            background: self.background.clone(),
        }
    }
}

impl<R: Resource> ResourceCache<R> {
    /// Open the cache, seeding the snapshot from the store.
    ///
    /// An unreadable stored set is logged and treated as never fetched.
    pub fn new(api: Arc<dyn KitApi>, store: Arc<dyn KeyValueStore>, options: CacheOptions) -> Self {
        let snapshot = read_stored::<R>(store.as_ref())
            .unwrap_or_else(|| CachedResourceSet::empty(R::TYPE));

        Self {
            api,
            store,
            options,
            snapshot: Arc::new(RwLock::new(snapshot)),
            refresh_lock: Arc::new(Mutex::new(())),
            background: Arc::new(StdMutex::new(None)),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        R::TYPE
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Store key of the persisted set
    pub fn store_key(&self) -> String {
        resource_key(R::TYPE)
    }

    /// Name of the periodic refresh job for this resource type
    pub fn event_name(&self) -> String {
        format!("kitgate_refresh_{}", R::TYPE)
    }

    pub fn last_queried_at(&self) -> Option<DateTime<Utc>> {
        self.read_snapshot(|s| s.last_queried_at)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let duration = self.options.cache_duration;
        self.read_snapshot(|s| s.expires_at(duration))
    }

    pub fn is_stale(&self) -> bool {
        let duration = self.options.cache_duration;
        self.read_snapshot(|s| s.is_stale_at(duration, Utc::now()))
    }

    /// Make sure the snapshot is usable, fetching from the API if needed.
    ///
    /// A never-fetched cache always refreshes before returning. An expired
    /// one follows the configured [`RefreshPolicy`]. Concurrent callers
    /// share a single refresh.
    pub async fn load(&self) -> Result<()> {
        if !self.is_stale() {
            debug!("{} cache hit", R::TYPE);
            return Ok(());
        }

        let cold = self.last_queried_at().is_none();
        if !cold && self.options.refresh_policy == RefreshPolicy::StaleWhileRevalidate {
            match self.refresh_lock.clone().try_lock_owned() {
                Ok(guard) => {
                    debug!("{} cache stale, refreshing in background", R::TYPE);
                    let cache = self.clone();
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        if let Err(e) = cache.fetch_and_store().await {
                            warn!("Background refresh of {} failed: {}", R::TYPE, e);
                        }
                    });
                    *self.background.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
                }
                Err(_) => debug!("{} refresh already in flight", R::TYPE),
            }
            return Ok(());
        }

        debug!("{} cache {}", R::TYPE, if cold { "miss" } else { "expired" });
        let _guard = self.refresh_lock.lock().await;

        // Another caller (or process) may have refreshed while we waited
        self.reload_from_store();
        if !self.is_stale() {
            debug!("{} refreshed by a concurrent caller", R::TYPE);
            return Ok(());
        }

        self.fetch_and_store().await.map(|_| ())
    }

    /// Wait for a refresh started by a stale-while-revalidate `load()`.
    ///
    /// Short-lived callers must await this before the runtime shuts down,
    /// or the refresh is aborted and never reaches the store.
    pub async fn finish_background_refresh(&self) {
        let handle = self
            .background
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!("Background refresh of {} did not finish: {}", R::TYPE, e);
        }
    }

    /// Fetch the complete list from the API and persist it.
    ///
    /// On failure the snapshot and the stored set are left untouched.
    pub async fn refresh(&self) -> Result<Vec<R>> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Result<Vec<R>> {
        let items = R::fetch(self.api.as_ref()).await?;

        let set = CachedResourceSet {
            resource_type: R::TYPE,
            items,
            last_queried_at: Some(Utc::now()),
        };
        set_json(self.store.as_ref(), &self.store_key(), &set)?;

        info!("Refreshed {} ({} items)", R::TYPE, set.items.len());
        let items = set.items.clone();
        *self.snapshot.write().unwrap_or_else(|p| p.into_inner()) = set;
        Ok(items)
    }

    fn reload_from_store(&self) {
        if let Some(stored) = read_stored::<R>(self.store.as_ref()) {
            let mut snapshot = self.snapshot.write().unwrap_or_else(|p| p.into_inner());
            if stored.last_queried_at > snapshot.last_queried_at {
                *snapshot = stored;
            }
        }
    }

    fn read_snapshot<T>(&self, f: impl FnOnce(&CachedResourceSet<R>) -> T) -> T {
        let snapshot = self.snapshot.read().unwrap_or_else(|p| p.into_inner());
        f(&snapshot)
    }

    /// Cached items in the configured order. Never calls the API.
    pub fn get(&self) -> Vec<R> {
        let items = self.read_snapshot(|s| s.items.clone());
        sort_records(items, &self.options.order_by, self.options.order)
    }

    pub fn get_by_id(&self, id: u64) -> Option<R> {
        self.read_snapshot(|s| s.items.iter().find(|item| item.id() == id).cloned())
    }

    /// Whether any items are cached
    pub fn exist(&self) -> bool {
        self.read_snapshot(|s| !s.items.is_empty())
    }

    pub fn count(&self) -> usize {
        self.read_snapshot(|s| s.items.len())
    }

    /// One page of the ordered items
    pub fn get_paginated_subset(&self, page: i64, per_page: i64) -> PaginatedSubset<R> {
        paginate(&self.get(), page, per_page)
    }

    /// Remove the persisted set and empty the snapshot
    pub fn delete(&self) -> Result<()> {
        self.store.delete(&self.store_key())?;
        *self.snapshot.write().unwrap_or_else(|p| p.into_inner()) =
            CachedResourceSet::empty(R::TYPE);
        debug!("Deleted cached {}", R::TYPE);
        Ok(())
    }

    /// Register a recurring refresh on `scheduler`.
    ///
    /// Returns false if one is already registered for this resource type.
    pub fn schedule_periodic_refresh(
        &self,
        scheduler: &dyn JobScheduler,
        interval: Duration,
    ) -> bool {
        let cache = self.clone();
        let job: Job = Arc::new(move || {
            let cache = cache.clone();
            Box::pin(async move {
                if let Err(e) = cache.refresh().await {
                    warn!("Scheduled refresh of {} failed: {}", R::TYPE, e);
                }
            })
        });
        scheduler.schedule(&self.event_name(), interval, job)
    }

    pub fn cancel_periodic_refresh(&self, scheduler: &dyn JobScheduler) -> bool {
        scheduler.unschedule(&self.event_name())
    }
}

fn read_stored<R: Resource>(store: &dyn KeyValueStore) -> Option<CachedResourceSet<R>> {
    match get_json::<CachedResourceSet<R>>(store, &resource_key(R::TYPE)) {
        Ok(stored) => stored,
        Err(e) => {
            warn!("Ignoring stored {}: {}", R::TYPE, e);
            None
        }
    }
}
