use abroadly_cache::no_store;
use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{get_stats, get_trends, my_dashboard};

/// Mounted at `/api/dashboard`.
pub fn init_dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/trends", get(get_trends))
        .route("/me", get(my_dashboard))
        .layer(no_store())
}
