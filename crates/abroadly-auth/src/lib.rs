//! # Abroadly Auth
//!
//! Authentication types and JWT utilities for the Abroadly API.
//!
//! - [`claims`]: JWT claim structures for access and refresh tokens
//! - [`jwt`]: Token creation and verification
//!
//! # Example
//!
//! ```ignore
//! use abroadly_auth::{create_access_token, verify_token};
//! use abroadly_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "user@example.com", "student", vec![], &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RefreshTokenClaims};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
