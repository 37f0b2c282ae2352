//! # Abroadly Cache
//!
//! Redis caching utilities for the Abroadly API.
//!
//! - [`config`]: Cache configuration from environment variables
//! - [`redis`]: JSON get/set/invalidate over a Redis connection manager
//! - [`keys`]: Cache key builders
//! - [`middleware`]: `Cache-Control` response header layers
//!
//! # Example
//!
//! ```ignore
//! use abroadly_cache::{CacheConfig, CacheKeys, RedisCache};
//!
//! let config = CacheConfig::from_env();
//! let cache = RedisCache::new(&config.redis_url, config.default_ttl()).await?;
//! let keys = CacheKeys::new(&config.key_prefix);
//!
//! cache.set(&keys.dashboard_stats(), &stats).await?;
//! let cached: Option<DashboardStats> = cache.get(&keys.dashboard_stats()).await;
//! ```

pub mod config;
pub mod keys;
pub mod middleware;
pub mod redis;

pub use config::CacheConfig;
pub use keys::CacheKeys;
pub use middleware::{cache_control_public, no_store};
pub use redis::{CacheError, RedisCache};
