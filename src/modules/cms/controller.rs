use abroadly_core::AppError;
use abroadly_models::{MenuId, PageId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::middleware::auth::RequireCmsManage;
use crate::modules::cms::model::{
    ContentBlock, CreateMenuDto, CreatePageDto, Menu, MenuTree, Page, PageFilterParams,
    PaginatedPagesResponse, ReplaceMenuItemsDto, UpdateMenuDto, UpdatePageDto,
    UpsertContentBlockDto,
};
use crate::modules::cms::service::CmsService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/cms/pages/{slug}",
    params(("slug" = String, Path, description = "Page slug")),
    responses(
        (status = 200, description = "Published page", body = Page),
        (status = 404, description = "Page not found or not published")
    ),
    tag = "CMS"
)]
#[instrument(skip(state))]
pub async fn get_page_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Page>, AppError> {
    let page = CmsService::get_published_page(&state.db, &slug).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/cms/menus/{location}",
    params(("location" = String, Path, description = "Menu location, e.g. header")),
    responses(
        (status = 200, description = "Menu with nested items", body = MenuTree),
        (status = 404, description = "Menu not found")
    ),
    tag = "CMS"
)]
#[instrument(skip(state))]
pub async fn get_menu_by_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<MenuTree>, AppError> {
    let menu = CmsService::get_menu_by_location(&state.db, &location).await?;
    Ok(Json(menu))
}

#[utoipa::path(
    get,
    path = "/api/cms/blocks/{key}",
    params(("key" = String, Path, description = "Content block key")),
    responses(
        (status = 200, description = "Content block", body = ContentBlock),
        (status = 404, description = "Content block not found")
    ),
    tag = "CMS"
)]
#[instrument(skip(state))]
pub async fn get_block(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ContentBlock>, AppError> {
    let block = CmsService::get_block(&state.db, &key).await?;
    Ok(Json(block))
}

// ---------------------------------------------------------------------------
// Admin: pages
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/cms/pages",
    params(PageFilterParams),
    responses(
        (status = 200, description = "All pages", body = PaginatedPagesResponse),
        (status = 403, description = "Forbidden - requires cms:manage permission")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_pages(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Query(filters): Query<PageFilterParams>,
) -> Result<Json<PaginatedPagesResponse>, AppError> {
    let pages = CmsService::list_pages(&state.db, filters).await?;
    Ok(Json(pages))
}

#[utoipa::path(
    post,
    path = "/api/admin/cms/pages",
    request_body = CreatePageDto,
    responses(
        (status = 201, description = "Page created", body = Page),
        (status = 409, description = "Slug already in use")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_page(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    ValidatedJson(dto): ValidatedJson<CreatePageDto>,
) -> Result<(StatusCode, Json<Page>), AppError> {
    let page = CmsService::create_page(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

#[utoipa::path(
    get,
    path = "/api/admin/cms/pages/{id}",
    params(("id" = String, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page, published or not", body = Page),
        (status = 404, description = "Page not found")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_page(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<PageId>,
) -> Result<Json<Page>, AppError> {
    let page = CmsService::get_page(&state.db, id).await?;
    Ok(Json(page))
}

#[utoipa::path(
    put,
    path = "/api/admin/cms/pages/{id}",
    params(("id" = String, Path, description = "Page ID")),
    request_body = UpdatePageDto,
    responses(
        (status = 200, description = "Page updated", body = Page),
        (status = 404, description = "Page not found"),
        (status = 409, description = "Slug already in use")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_page(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<PageId>,
    ValidatedJson(dto): ValidatedJson<UpdatePageDto>,
) -> Result<Json<Page>, AppError> {
    let page = CmsService::update_page(&state.db, id, dto).await?;
    Ok(Json(page))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cms/pages/{id}",
    params(("id" = String, Path, description = "Page ID")),
    responses(
        (status = 204, description = "Page deleted"),
        (status = 404, description = "Page not found")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_page(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<PageId>,
) -> Result<StatusCode, AppError> {
    CmsService::delete_page(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Admin: menus
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/cms/menus",
    responses(
        (status = 200, description = "All menus", body = Vec<Menu>)
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_menus(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
) -> Result<Json<Vec<Menu>>, AppError> {
    let menus = CmsService::list_menus(&state.db).await?;
    Ok(Json(menus))
}

#[utoipa::path(
    post,
    path = "/api/admin/cms/menus",
    request_body = CreateMenuDto,
    responses(
        (status = 201, description = "Menu created", body = Menu),
        (status = 409, description = "Location already taken")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_menu(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    ValidatedJson(dto): ValidatedJson<CreateMenuDto>,
) -> Result<(StatusCode, Json<Menu>), AppError> {
    let menu = CmsService::create_menu(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

#[utoipa::path(
    get,
    path = "/api/admin/cms/menus/{id}",
    params(("id" = String, Path, description = "Menu ID")),
    responses(
        (status = 200, description = "Menu with nested items", body = MenuTree),
        (status = 404, description = "Menu not found")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_menu(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<MenuId>,
) -> Result<Json<MenuTree>, AppError> {
    let menu = CmsService::get_menu(&state.db, id).await?;
    Ok(Json(menu))
}

#[utoipa::path(
    put,
    path = "/api/admin/cms/menus/{id}",
    params(("id" = String, Path, description = "Menu ID")),
    request_body = UpdateMenuDto,
    responses(
        (status = 200, description = "Menu updated", body = Menu),
        (status = 404, description = "Menu not found"),
        (status = 409, description = "Location already taken")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_menu(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<MenuId>,
    ValidatedJson(dto): ValidatedJson<UpdateMenuDto>,
) -> Result<Json<Menu>, AppError> {
    let menu = CmsService::update_menu(&state.db, id, dto).await?;
    Ok(Json(menu))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cms/menus/{id}",
    params(("id" = String, Path, description = "Menu ID")),
    responses(
        (status = 204, description = "Menu and its items deleted"),
        (status = 404, description = "Menu not found")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_menu(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<MenuId>,
) -> Result<StatusCode, AppError> {
    CmsService::delete_menu(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/admin/cms/menus/{id}/items",
    params(("id" = String, Path, description = "Menu ID")),
    request_body = ReplaceMenuItemsDto,
    responses(
        (status = 200, description = "Items replaced", body = MenuTree),
        (status = 400, description = "Unknown parent or cycle"),
        (status = 404, description = "Menu not found")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn replace_menu_items(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(id): Path<MenuId>,
    ValidatedJson(dto): ValidatedJson<ReplaceMenuItemsDto>,
) -> Result<Json<MenuTree>, AppError> {
    let menu = CmsService::replace_items(&state.db, id, dto).await?;
    Ok(Json(menu))
}

// ---------------------------------------------------------------------------
// Admin: content blocks
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/cms/blocks",
    responses(
        (status = 200, description = "All content blocks", body = Vec<ContentBlock>)
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_blocks(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
) -> Result<Json<Vec<ContentBlock>>, AppError> {
    let blocks = CmsService::list_blocks(&state.db).await?;
    Ok(Json(blocks))
}

#[utoipa::path(
    put,
    path = "/api/admin/cms/blocks/{key}",
    params(("key" = String, Path, description = "Content block key")),
    request_body = UpsertContentBlockDto,
    responses(
        (status = 200, description = "Block created or replaced", body = ContentBlock)
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn upsert_block(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(key): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpsertContentBlockDto>,
) -> Result<Json<ContentBlock>, AppError> {
    let block = CmsService::upsert_block(&state.db, &key, dto).await?;
    Ok(Json(block))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cms/blocks/{key}",
    params(("key" = String, Path, description = "Content block key")),
    responses(
        (status = 204, description = "Block deleted"),
        (status = 404, description = "Content block not found")
    ),
    tag = "CMS Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_block(
    State(state): State<AppState>,
    RequireCmsManage(_auth_user): RequireCmsManage,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    CmsService::delete_block(&state.db, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}
