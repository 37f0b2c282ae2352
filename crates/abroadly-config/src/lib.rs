//! # Abroadly Config
//!
//! Configuration types for the Abroadly API, loaded from environment variables:
//!
//! - [`jwt`]: JWT authentication configuration
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`email`]: Email/SMTP configuration
//! - [`rate_limit`]: Auth endpoint rate limiting configuration
//! - [`payments`]: Stripe and Razorpay credentials
//!
//! # Example
//!
//! ```ignore
//! use abroadly_config::{JwtConfig, CorsConfig, EmailConfig, PaymentConfig, RateLimitConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let email_config = EmailConfig::from_env();
//! let rate_limit_config = RateLimitConfig::from_env();
//! let payment_config = PaymentConfig::from_env();
//! ```

pub mod cors;
pub mod email;
pub mod jwt;
pub mod payments;
pub mod rate_limit;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use payments::{PaymentConfig, RazorpayConfig, StripeConfig};
pub use rate_limit::RateLimitConfig;

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Reads a variable, treating empty values as unset.
pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
