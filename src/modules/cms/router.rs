use abroadly_cache::cache_control_public;
use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{
    create_menu, create_page, delete_block, delete_menu, delete_page, get_block, get_menu,
    get_menu_by_location, get_page, get_page_by_slug, list_blocks, list_menus, list_pages,
    replace_menu_items, update_menu, update_page, upsert_block,
};

/// Public content, mounted at `/api/cms`.
pub fn init_cms_router() -> Router<AppState> {
    Router::new()
        .route("/pages/{slug}", get(get_page_by_slug))
        .route("/menus/{location}", get(get_menu_by_location))
        .route("/blocks/{key}", get(get_block))
        .layer(cache_control_public(60))
}

/// Mounted at `/api/admin/cms`.
pub fn init_admin_cms_router() -> Router<AppState> {
    Router::new()
        .route("/pages", get(list_pages).post(create_page))
        .route(
            "/pages/{id}",
            get(get_page).put(update_page).delete(delete_page),
        )
        .route("/menus", get(list_menus).post(create_menu))
        .route(
            "/menus/{id}",
            get(get_menu).put(update_menu).delete(delete_menu),
        )
        .route("/menus/{id}/items", put(replace_menu_items))
        .route("/blocks", get(list_blocks))
        .route("/blocks/{key}", put(upsert_block).delete(delete_block))
}
