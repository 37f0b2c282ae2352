use abroadly_core::{AppError, permissions};
use abroadly_models::ConsultantId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireConsultantsManage};
use crate::modules::consultants::model::{
    AvailabilityRule, ConsultantFilterParams, ConsultantProfile, CreateConsultantDto,
    PaginatedConsultantsResponse, SetAvailabilityDto, SlotQuery, SlotsResponse,
    UpdateConsultantDto,
};
use crate::modules::consultants::service::ConsultantService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/consultants",
    params(ConsultantFilterParams),
    responses(
        (status = 200, description = "Active consultants", body = PaginatedConsultantsResponse)
    ),
    tag = "Consultants"
)]
#[instrument(skip(state))]
pub async fn list_consultants(
    State(state): State<AppState>,
    Query(filters): Query<ConsultantFilterParams>,
) -> Result<Json<PaginatedConsultantsResponse>, AppError> {
    let consultants = ConsultantService::list_active(&state.db, filters).await?;
    Ok(Json(consultants))
}

#[utoipa::path(
    get,
    path = "/api/consultants/{id}",
    params(("id" = String, Path, description = "Consultant ID")),
    responses(
        (status = 200, description = "Consultant profile", body = ConsultantProfile),
        (status = 404, description = "Consultant not found")
    ),
    tag = "Consultants"
)]
#[instrument(skip(state))]
pub async fn get_consultant(
    State(state): State<AppState>,
    Path(id): Path<ConsultantId>,
) -> Result<Json<ConsultantProfile>, AppError> {
    let consultant = ConsultantService::get_profile(&state.db, id).await?;
    Ok(Json(consultant))
}

#[utoipa::path(
    get,
    path = "/api/consultants/{id}/availability",
    params(("id" = String, Path, description = "Consultant ID")),
    responses(
        (status = 200, description = "Weekly availability rules (UTC)", body = Vec<AvailabilityRule>),
        (status = 404, description = "Consultant not found")
    ),
    tag = "Consultants"
)]
#[instrument(skip(state))]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<ConsultantId>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    let rules = ConsultantService::get_availability(&state.db, id).await?;
    Ok(Json(rules))
}

#[utoipa::path(
    put,
    path = "/api/consultants/{id}/availability",
    params(("id" = String, Path, description = "Consultant ID")),
    request_body = SetAvailabilityDto,
    responses(
        (status = 200, description = "Availability replaced", body = Vec<AvailabilityRule>),
        (status = 400, description = "Invalid or overlapping rules"),
        (status = 403, description = "Not this consultant"),
        (status = 404, description = "Consultant not found")
    ),
    tag = "Consultants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn set_availability(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ConsultantId>,
    ValidatedJson(dto): ValidatedJson<SetAvailabilityDto>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    let can_manage_any = auth_user.has_permission(permissions::CONSULTANTS_MANAGE);
    if !can_manage_any && !auth_user.has_permission(permissions::AVAILABILITY_MANAGE) {
        return Err(AppError::forbidden(format!(
            "Access denied. Missing required permission: {}",
            permissions::AVAILABILITY_MANAGE
        )));
    }

    let rules = ConsultantService::set_availability(
        &state.db,
        auth_user.user_id()?,
        can_manage_any,
        id,
        dto,
    )
    .await?;
    Ok(Json(rules))
}

#[utoipa::path(
    get,
    path = "/api/consultants/{id}/slots",
    params(
        ("id" = String, Path, description = "Consultant ID"),
        SlotQuery
    ),
    responses(
        (status = 200, description = "Open slots in the date range (UTC)", body = SlotsResponse),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Consultant not found")
    ),
    tag = "Consultants"
)]
#[instrument(skip(state))]
pub async fn get_slots(
    State(state): State<AppState>,
    Path(id): Path<ConsultantId>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let slots = ConsultantService::available_slots(&state.db, id, query).await?;
    Ok(Json(slots))
}

#[utoipa::path(
    post,
    path = "/api/admin/consultants",
    request_body = CreateConsultantDto,
    responses(
        (status = 201, description = "Consultant profile created", body = ConsultantProfile),
        (status = 404, description = "User not found"),
        (status = 409, description = "Profile already exists"),
        (status = 403, description = "Forbidden - requires consultants:manage permission")
    ),
    tag = "Consultants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_consultant(
    State(state): State<AppState>,
    RequireConsultantsManage(_auth_user): RequireConsultantsManage,
    ValidatedJson(dto): ValidatedJson<CreateConsultantDto>,
) -> Result<(StatusCode, Json<ConsultantProfile>), AppError> {
    let consultant = ConsultantService::create_consultant(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(consultant)))
}

#[utoipa::path(
    put,
    path = "/api/admin/consultants/{id}",
    params(("id" = String, Path, description = "Consultant ID")),
    request_body = UpdateConsultantDto,
    responses(
        (status = 200, description = "Consultant profile updated", body = ConsultantProfile),
        (status = 404, description = "Consultant not found")
    ),
    tag = "Consultants",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_consultant(
    State(state): State<AppState>,
    RequireConsultantsManage(_auth_user): RequireConsultantsManage,
    Path(id): Path<ConsultantId>,
    ValidatedJson(dto): ValidatedJson<UpdateConsultantDto>,
) -> Result<Json<ConsultantProfile>, AppError> {
    let consultant = ConsultantService::update_consultant(&state.db, id, dto).await?;
    Ok(Json(consultant))
}
