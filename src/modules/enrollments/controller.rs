use abroadly_core::AppError;
use abroadly_models::EnrollmentId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::metrics;
use crate::middleware::auth::{AuthUser, RequireEnrollmentsReadAll};
use crate::modules::dashboard::service::DashboardService;
use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentFilterParams, EnrollmentWithCourse,
    PaginatedEnrollmentsResponse, UpdateProgressDto,
};
use crate::modules::enrollments::service::EnrollmentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Enrolled; status is active for free courses, pending_payment otherwise", body = Enrollment),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found or not published"),
        (status = 409, description = "Already enrolled")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn enroll(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment =
        EnrollmentService::enroll(&state.db, auth_user.user_id()?, dto.course_id).await?;

    metrics::track_enrollment_created(enrollment.status.as_str());
    DashboardService::invalidate_cache(&state).await;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/me",
    responses(
        (status = 200, description = "Own enrollments", body = Vec<EnrollmentWithCourse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn my_enrollments(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<EnrollmentWithCourse>>, AppError> {
    let enrollments = EnrollmentService::list_for_user(&state.db, auth_user.user_id()?).await?;
    Ok(Json(enrollments))
}

#[utoipa::path(
    patch,
    path = "/api/enrollments/{id}/progress",
    params(("id" = String, Path, description = "Enrollment ID")),
    request_body = UpdateProgressDto,
    responses(
        (status = 200, description = "Progress updated", body = Enrollment),
        (status = 400, description = "Enrollment not active or progress decreased"),
        (status = 403, description = "Not your enrollment"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_progress(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<EnrollmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateProgressDto>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment =
        EnrollmentService::update_progress(&state.db, auth_user.user_id()?, id, dto.progress)
            .await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(enrollment))
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/cancel",
    params(("id" = String, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment cancelled", body = Enrollment),
        (status = 400, description = "Enrollment completed or already cancelled"),
        (status = 403, description = "Not your enrollment"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<EnrollmentId>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment = EnrollmentService::cancel(&state.db, auth_user.user_id()?, id).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(enrollment))
}

#[utoipa::path(
    get,
    path = "/api/enrollments",
    params(EnrollmentFilterParams),
    responses(
        (status = 200, description = "All enrollments", body = PaginatedEnrollmentsResponse),
        (status = 403, description = "Forbidden - requires enrollments:read_all permission")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_enrollments(
    State(state): State<AppState>,
    RequireEnrollmentsReadAll(_auth_user): RequireEnrollmentsReadAll,
    Query(filters): Query<EnrollmentFilterParams>,
) -> Result<Json<PaginatedEnrollmentsResponse>, AppError> {
    let enrollments = EnrollmentService::list_enrollments(&state.db, filters).await?;
    Ok(Json(enrollments))
}
