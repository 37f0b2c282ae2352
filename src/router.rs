use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::role::require_admin;
use crate::modules::appointments::init_appointments_router;
use crate::modules::auth::init_auth_router;
use crate::modules::cms::{init_admin_cms_router, init_cms_router};
use crate::modules::consultants::{init_admin_consultants_router, init_consultants_router};
use crate::modules::courses::{init_admin_courses_router, init_courses_router};
use crate::modules::dashboard::init_dashboard_router;
use crate::modules::enrollments::init_enrollments_router;
use crate::modules::payments::init_payments_router;
use crate::modules::test_prep::{
    init_admin_tests_router, init_attempts_router, init_tests_router,
};
use crate::modules::users::init_users_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

/// Management endpoints, mounted at `/api/admin`. Every route requires the
/// admin role before the handler's own permission check runs.
fn init_admin_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/courses", init_admin_courses_router())
        .nest("/tests", init_admin_tests_router())
        .nest("/consultants", init_admin_consultants_router())
        .nest("/cms", init_admin_cms_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router(&state))
                .nest("/users", init_users_router(&state))
                .nest("/courses", init_courses_router())
                .nest("/enrollments", init_enrollments_router())
                .nest("/tests", init_tests_router())
                .nest("/attempts", init_attempts_router())
                .nest("/consultants", init_consultants_router())
                .nest("/appointments", init_appointments_router())
                .nest("/payments", init_payments_router())
                .nest("/cms", init_cms_router())
                .nest("/dashboard", init_dashboard_router())
                .nest("/admin", init_admin_router(&state)),
        )
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
