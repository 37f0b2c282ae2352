//! # Abroadly CLI
//!
//! Administrative commands and development data seeding.
//!
//! ```ignore
//! use abroadly_cli::seeder::{seed_all, SeedConfig};
//!
//! seed_all(&pool, SeedConfig::default()).await?;
//! ```

pub mod admin;
pub mod seeder;
