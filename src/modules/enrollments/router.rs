use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    cancel_enrollment, enroll, list_enrollments, my_enrollments, update_progress,
};

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(enroll).get(list_enrollments))
        .route("/me", get(my_enrollments))
        .route("/{id}/progress", patch(update_progress))
        .route("/{id}/cancel", post(cancel_enrollment))
}
