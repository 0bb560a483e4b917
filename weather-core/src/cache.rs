//! Response cache backed by a key-value store with per-key expiry.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::{
    error::CacheError,
    model::{CacheEntry, UnifiedWeatherResponse},
};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Prefix of every weather cache key.
pub const CACHE_KEY_PREFIX: &str = "weather_";

/// Longest expiry a store will honour; larger TTLs are capped to it.
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Cache key for `city`. The city is used verbatim, so keys are case sensitive.
pub fn cache_key(city: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{city}")
}

/// `GET` / `SETEX` style storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Open the store named by `url`: `memory://` or a Redis URL.
pub async fn open_store(
    url: &str,
    secret: Option<&str>,
) -> Result<Arc<dyn KeyValueStore>, CacheError> {
    if url.starts_with(MemoryStore::SCHEME) {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(RedisStore::connect(url, secret).await?))
}

#[derive(Debug, Clone)]
pub struct CacheGateway {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persist `response` under `key`, stamping the write time.
    ///
    /// Whatever `cached_time` the caller passed in is ignored.
    pub async fn put(
        &self,
        key: &str,
        response: &UnifiedWeatherResponse,
    ) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry {
            wind_speed: response.wind_speed,
            temperature_degrees: response.temperature_degrees,
            cached_time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        let blob = serde_json::to_string(&entry)?;
        self.store.set_ex(key, &blob, self.ttl).await?;

        debug!(key, ttl_secs = self.ttl.as_secs(), "cached weather response");
        Ok(entry)
    }

    /// Cached record under `key`. Unreadable blobs count as a miss.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let Some(blob) = self.store.get(key).await? else {
            debug!(key, "cache miss");
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry>(&blob) {
            Ok(entry) => {
                debug!(key, cached_time = %entry.cached_time, "cache hit");
                Ok(Some(entry))
            }
            Err(err) => {
                warn!(key, error = %err, "discarding corrupt cache entry");
                Ok(None)
            }
        }
    }
}
