use std::sync::Arc;

use abroadly_cache::{CacheConfig, CacheKeys, RedisCache};
use abroadly_config::{CorsConfig, EmailConfig, JwtConfig, PaymentConfig, RateLimitConfig};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::middleware::rate_limit::AuthRateLimiter;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub payment_config: PaymentConfig,
    pub auth_limiter: AuthRateLimiter,
    /// `None` when caching is disabled or Redis was unreachable at startup
    pub cache: Option<RedisCache>,
    pub cache_keys: Arc<CacheKeys>,
    pub http: reqwest::Client,
}

impl AppState {
    /// State with default configuration and no cache. Used by tests.
    pub fn new(db: PgPool) -> Self {
        let rate_limit_config = RateLimitConfig::default();
        Self {
            db,
            jwt_config: JwtConfig::default(),
            email_config: EmailConfig::default(),
            cors_config: CorsConfig::default(),
            auth_limiter: AuthRateLimiter::new(&rate_limit_config),
            rate_limit_config,
            payment_config: PaymentConfig::default(),
            cache: None,
            cache_keys: Arc::new(CacheKeys::new(CacheConfig::default().key_prefix)),
            http: reqwest::Client::new(),
        }
    }

    pub async fn from_env(db: PgPool) -> Self {
        let cache_config = CacheConfig::from_env();
        let cache = if cache_config.enabled {
            match RedisCache::new(&cache_config.redis_url, cache_config.default_ttl()).await {
                Ok(cache) => {
                    info!(redis_url = %cache_config.redis_url, "Redis cache connected");
                    Some(cache)
                }
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, continuing without cache");
                    None
                }
            }
        } else {
            None
        };

        Self {
            jwt_config: JwtConfig::from_env(),
            email_config: EmailConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            payment_config: PaymentConfig::from_env(),
            cache,
            cache_keys: Arc::new(CacheKeys::new(cache_config.key_prefix)),
            ..Self::new(db)
        }
        .with_rate_limit(RateLimitConfig::from_env())
    }

    /// Replaces the rate limit configuration and rebuilds the limiter.
    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.auth_limiter = AuthRateLimiter::new(&config);
        self.rate_limit_config = config;
        self
    }
}
