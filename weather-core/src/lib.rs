//! Core library for the weather proxy.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Provider adapters that normalize each upstream's JSON
//! - The failover orchestrator that walks the provider priority list
//! - The response cache and its key-value stores
//!
//! It is used by `weather-server`, but has no dependency on any HTTP server.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod provider;

pub use cache::{CacheGateway, KeyValueStore, MemoryStore, RedisStore, cache_key, open_store};
pub use config::{Config, ProviderConfig};
pub use error::{CacheError, ConfigError, ProviderError, WeatherError};
pub use model::{CacheEntry, ProviderFailure, ProviderResult, UnifiedWeatherResponse};
pub use orchestrator::{FailoverMode, FailoverOrchestrator};
pub use provider::{ProviderId, ProviderPriority, WeatherProvider, build_providers};
