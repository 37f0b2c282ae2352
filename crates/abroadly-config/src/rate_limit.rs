//! Rate limiting configuration for the authentication endpoints.
//!
//! # Configuration
//!
//! - `RATE_LIMIT_ENABLED`: Turn the limiter off entirely (default: true)
//! - `RATE_LIMIT_AUTH_PER_SECOND`: Seconds after which one request is
//!   replenished for a client (default: 10)
//! - `RATE_LIMIT_AUTH_BURST_SIZE`: Requests a client may make back to back
//!   before being throttled (default: 5)
//!
//! # Rate Limiting Strategy
//!
//! The limiter uses the generic cell rate algorithm from `governor`, keyed by
//! client IP:
//!
//! - A client starts with `burst_size` requests available
//! - One request is replenished every `per_second` seconds
//! - Requests are rejected with 429 when nothing is available
//!
//! # Example
//!
//! ```ignore
//! use abroadly_config::RateLimitConfig;
//! use governor::RateLimiter;
//!
//! let config = RateLimitConfig::from_env();
//! let limiter = RateLimiter::keyed(config.auth_quota());
//! ```

use std::num::NonZeroU32;
use std::time::Duration;

use governor::Quota;

/// Rate limit configuration for the auth endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Whether requests are throttled at all.
    pub enabled: bool,

    /// Replenishment interval in seconds.
    pub auth_per_second: u64,

    /// Maximum requests that can accumulate.
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_per_second: 10,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new `RateLimitConfig` from environment variables.
    ///
    /// Falls back to default values if environment variables are not set
    /// or cannot be parsed.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: crate::env_flag("RATE_LIMIT_ENABLED", defaults.enabled),
            auth_per_second: crate::env_or("RATE_LIMIT_AUTH_PER_SECOND", defaults.auth_per_second),
            auth_burst_size: crate::env_or("RATE_LIMIT_AUTH_BURST_SIZE", defaults.auth_burst_size),
        }
    }

    /// Builds the `governor` quota for auth endpoints.
    ///
    /// Zero values are raised to one so the quota is always constructible.
    #[must_use]
    pub fn auth_quota(&self) -> Quota {
        let period = Duration::from_secs(self.auth_per_second.max(1));
        let burst = NonZeroU32::new(self.auth_burst_size).unwrap_or(NonZeroU32::MIN);

        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.auth_per_second, 10);
        assert_eq!(config.auth_burst_size, 5);
    }

    #[test]
    fn test_auth_quota_burst() {
        let quota = RateLimitConfig::default().auth_quota();
        assert_eq!(quota.burst_size().get(), 5);
        assert_eq!(quota.replenish_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = RateLimitConfig {
            enabled: true,
            auth_per_second: 0,
            auth_burst_size: 0,
        };
        let quota = config.auth_quota();
        assert_eq!(quota.burst_size().get(), 1);
        assert_eq!(quota.replenish_interval(), Duration::from_secs(1));
    }
}
