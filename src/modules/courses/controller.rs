use abroadly_core::AppError;
use abroadly_models::CourseId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::middleware::auth::RequireCoursesManage;
use crate::modules::dashboard::service::DashboardService;
use crate::modules::courses::model::{
    Course, CourseFilterParams, CourseWithStats, CreateCourseDto, PaginatedCoursesResponse,
    PaginatedCoursesWithStatsResponse, UpdateCourseDto,
};
use crate::modules::courses::service::CourseService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseFilterParams),
    responses(
        (status = 200, description = "Published courses", body = PaginatedCoursesResponse)
    ),
    tag = "Courses"
)]
#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(filters): Query<CourseFilterParams>,
) -> Result<Json<PaginatedCoursesResponse>, AppError> {
    let courses = CourseService::list_published(&state.db, filters).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id_or_slug}",
    params(("id_or_slug" = String, Path, description = "Course ID or slug")),
    responses(
        (status = 200, description = "Course details", body = Course),
        (status = 404, description = "Course not found or not published")
    ),
    tag = "Courses"
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::get_published(&state.db, &id_or_slug).await?;
    Ok(Json(course))
}

#[utoipa::path(
    get,
    path = "/api/admin/courses",
    params(CourseFilterParams),
    responses(
        (status = 200, description = "All courses with enrollment counts", body = PaginatedCoursesWithStatsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires courses:manage permission")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn admin_list_courses(
    State(state): State<AppState>,
    RequireCoursesManage(_auth_user): RequireCoursesManage,
    Query(filters): Query<CourseFilterParams>,
) -> Result<Json<PaginatedCoursesWithStatsResponse>, AppError> {
    let courses = CourseService::list_with_stats(&state.db, filters).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    post,
    path = "/api/admin/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 409, description = "Slug already in use"),
        (status = 422, description = "Validation error")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_course(
    State(state): State<AppState>,
    RequireCoursesManage(_auth_user): RequireCoursesManage,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = CourseService::create_course(&state.db, dto).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/admin/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course with enrollment counts", body = CourseWithStats),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn admin_get_course(
    State(state): State<AppState>,
    RequireCoursesManage(_auth_user): RequireCoursesManage,
    Path(id): Path<CourseId>,
) -> Result<Json<CourseWithStats>, AppError> {
    let course = CourseService::get_with_stats(&state.db, id).await?;
    Ok(Json(course))
}

#[utoipa::path(
    put,
    path = "/api/admin/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Slug already in use")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_course(
    State(state): State<AppState>,
    RequireCoursesManage(_auth_user): RequireCoursesManage,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::update_course(&state.db, id, dto).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/api/admin/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course has enrollments")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    RequireCoursesManage(_auth_user): RequireCoursesManage,
    Path(id): Path<CourseId>,
) -> Result<StatusCode, AppError> {
    CourseService::delete_course(&state.db, id).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(StatusCode::NO_CONTENT)
}
