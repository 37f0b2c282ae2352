use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    admin_get_test, admin_list_tests, create_question, create_section, create_test,
    delete_question, delete_section, delete_test, get_attempt, get_test, list_tests, my_attempts,
    save_answers, start_attempt, submit_attempt, update_question, update_section, update_test,
};

/// Mounted at `/api/tests`.
pub fn init_tests_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tests))
        .route("/{id}", get(get_test))
        .route("/{id}/attempts", post(start_attempt))
}

/// Mounted at `/api/attempts`.
pub fn init_attempts_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(my_attempts))
        .route("/{id}", get(get_attempt))
        .route("/{id}/answers", put(save_answers))
        .route("/{id}/submit", post(submit_attempt))
}

/// Mounted at `/api/admin/tests`.
pub fn init_admin_tests_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_tests).post(create_test))
        .route(
            "/{id}",
            get(admin_get_test).put(update_test).delete(delete_test),
        )
        .route("/{id}/sections", post(create_section))
        .route(
            "/sections/{id}",
            put(update_section).delete(delete_section),
        )
        .route("/sections/{id}/questions", post(create_question))
        .route(
            "/questions/{id}",
            put(update_question).delete(delete_question),
        )
}
