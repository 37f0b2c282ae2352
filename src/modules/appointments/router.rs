use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

use super::controller::{
    book_appointment, get_appointment, list_appointments, my_appointments, update_status,
};

/// Mounted at `/api/appointments`.
pub fn init_appointments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(book_appointment).get(list_appointments))
        .route("/me", get(my_appointments))
        .route("/{id}", get(get_appointment))
        .route("/{id}/status", patch(update_status))
}
