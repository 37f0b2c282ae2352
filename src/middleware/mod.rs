//! Request extractors and middleware.
//!
//! - [`auth`]: `AuthUser` and the permission extractors
//! - [`role`]: role gates applied to whole sub-routers
//! - [`rate_limit`]: per-client limits on the auth endpoints
//!
//! ```ignore
//! use crate::middleware::auth::{AuthUser, RequireCoursesManage};
//!
//! async fn me(auth_user: AuthUser) -> impl IntoResponse { /* any valid token */ }
//!
//! async fn create_course(RequireCoursesManage(auth_user): RequireCoursesManage) {
//!     // only with "courses:manage"
//! }
//! ```

pub mod auth;
pub mod rate_limit;
pub mod role;
