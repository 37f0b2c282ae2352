use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_consultant, get_availability, get_consultant, get_slots, list_consultants,
    set_availability, update_consultant,
};

/// Mounted at `/api/consultants`.
pub fn init_consultants_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_consultants))
        .route("/{id}", get(get_consultant))
        .route(
            "/{id}/availability",
            get(get_availability).put(set_availability),
        )
        .route("/{id}/slots", get(get_slots))
}

/// Mounted at `/api/admin/consultants`.
pub fn init_admin_consultants_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_consultant))
        .route("/{id}", put(update_consultant))
}
