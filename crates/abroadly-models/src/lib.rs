//! # Abroadly Models
//!
//! Domain models and DTOs for the Abroadly API: database entities, request
//! and response DTOs, and validation rules.
//!
//! - [`ids`]: Strongly-typed entity IDs
//! - [`value_types`]: Validated `Email`, `PhoneNumber` and `Slug`
//! - [`users`], [`auth`]: Accounts, roles and authentication DTOs
//! - [`courses`], [`enrollments`]: Catalog and enrollment
//! - [`test_prep`]: Tests, sections, questions, attempts and scores
//! - [`consultants`], [`appointments`]: Consultant profiles, availability, booking
//! - [`payments`]: Payment records and checkout
//! - [`cms`]: Pages, menus and content blocks
//! - [`dashboard`]: Admin and student dashboard shapes

pub mod appointments;
pub mod auth;
pub mod cms;
pub mod consultants;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod ids;
pub mod payments;
pub mod test_prep;
pub mod users;
pub mod value_types;

pub use ids::*;
pub use users::{User, UserRole};
pub use value_types::{Email, PhoneNumber, Slug, ValueTypeError};
