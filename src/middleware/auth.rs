use abroadly_auth::{Claims, verify_token};
use abroadly_core::{AppError, permissions};
use abroadly_models::{UserId, UserRole};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::state::AppState;

/// Extractor that validates the bearer token and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.0.permissions.iter().any(|p| p == permission)
    }

    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    /// Role from the token; `None` if the token names a role we no longer know.
    pub fn role(&self) -> Option<UserRole> {
        match self.0.role.as_str() {
            permissions::ROLE_ADMIN => Some(UserRole::Admin),
            permissions::ROLE_CONSULTANT => Some(UserRole::Consultant),
            permissions::ROLE_STUDENT => Some(UserRole::Student),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    pub fn is_consultant(&self) -> bool {
        self.role() == Some(UserRole::Consultant)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Declares an extractor that authenticates the caller and requires one
/// permission, answering 403 otherwise.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = abroadly_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !auth_user.has_permission($permission) {
                    return Err(abroadly_core::AppError::forbidden(format!(
                        "Access denied. Missing required permission: {}",
                        $permission
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_permission!(RequireUsersManage, permissions::USERS_MANAGE);
require_permission!(RequireCoursesManage, permissions::COURSES_MANAGE);
require_permission!(RequireEnrollmentsReadAll, permissions::ENROLLMENTS_READ_ALL);
require_permission!(RequireTestsManage, permissions::TESTS_MANAGE);
require_permission!(RequireConsultantsManage, permissions::CONSULTANTS_MANAGE);
require_permission!(RequireAppointmentsReadAll, permissions::APPOINTMENTS_READ_ALL);
require_permission!(RequirePaymentsReadAll, permissions::PAYMENTS_READ_ALL);
require_permission!(RequireCmsManage, permissions::CMS_MANAGE);
require_permission!(RequireDashboardView, permissions::DASHBOARD_VIEW);
