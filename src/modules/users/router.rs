use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::middleware::role::require_admin;
use crate::state::AppState;

use super::controller::{
    change_password, create_user, delete_user, get_user, list_users, update_profile, update_user,
};

pub fn init_users_router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let me = Router::new()
        .route("/me", put(update_profile))
        .route("/me/password", post(change_password));

    me.merge(admin)
}
