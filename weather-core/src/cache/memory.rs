use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry, future::Cache};

use crate::error::CacheError;

use super::{KeyValueStore, MAX_ENTRY_TTL};

/// Upper bound on stored entries before least-recently-used eviction.
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, (String, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(String, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(String, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// In-process store, selected with `memory://`.
///
/// Backed by Moka's async cache, which evicts expired entries on its own.
#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, (String, Duration)>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryStore {
    pub const SCHEME: &'static str = "memory://";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Number of live entries, after flushing pending evictions.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|(value, _)| value))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = ttl.min(MAX_ENTRY_TTL);
        self.cache.insert(key.to_owned(), (value.to_owned(), ttl)).await;
        Ok(())
    }
}
