use abroadly_cache::cache_control_public;
use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    admin_get_course, admin_list_courses, create_course, delete_course, get_course, list_courses,
    update_course,
};

/// Public catalog, mounted at `/api/courses`.
pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses))
        .route("/{id_or_slug}", get(get_course))
        .layer(cache_control_public(60))
}

/// Catalog management, mounted at `/api/admin/courses`.
pub fn init_admin_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_courses).post(create_course))
        .route(
            "/{id}",
            get(admin_get_course).put(update_course).delete(delete_course),
        )
}
