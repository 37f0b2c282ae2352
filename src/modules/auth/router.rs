use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::rate_limit::auth_rate_limit;
use crate::state::AppState;

use super::controller::{login, me, refresh, register};

pub fn init_auth_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_rate_limit,
        ))
        .route("/me", get(me))
}
