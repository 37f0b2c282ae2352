//! Role gates for whole sub-routers.
//!
//! ```rust,ignore
//! Router::new()
//!     .nest("/admin", admin_routes)
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
//! ```

use abroadly_core::AppError;
use abroadly_models::UserRole;
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Authenticates the request and lets it through when the caller's role is
/// one of `allowed_roles`. The verified [`AuthUser`] is stored in the request
/// extensions.
pub async fn require_roles(
    state: &AppState,
    req: Request,
    next: Next,
    allowed_roles: &[UserRole],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let auth_user = AuthUser::from_request_parts(&mut parts, state).await?;

    match auth_user.role() {
        Some(role) if allowed_roles.contains(&role) => {}
        Some(role) => {
            return Err(AppError::forbidden(format!(
                "Access denied. Role '{}' cannot access this resource",
                role
            )));
        }
        None => return Err(AppError::forbidden("Access denied. Unknown role")),
    }

    parts.extensions.insert(auth_user);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &[UserRole::Admin])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}
