use abroadly_core::AppError;
use axum::{Json, extract::State};
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireDashboardView};
use crate::modules::dashboard::model::{
    DashboardStats, StudentDashboard, TrendQuery, TrendsResponse,
};
use crate::modules::dashboard::service::DashboardService;
use crate::state::AppState;
use crate::validator::ValidatedQuery;

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Totals, month-over-month growth and activity feeds", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires dashboard:view permission")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    RequireDashboardView(_auth_user): RequireDashboardView,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = DashboardService::get_stats(&state).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/trends",
    params(TrendQuery),
    responses(
        (status = 200, description = "Monthly enrollments and revenue", body = TrendsResponse),
        (status = 422, description = "months must be between 1 and 24")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_trends(
    State(state): State<AppState>,
    RequireDashboardView(_auth_user): RequireDashboardView,
    ValidatedQuery(query): ValidatedQuery<TrendQuery>,
) -> Result<Json<TrendsResponse>, AppError> {
    let trends = DashboardService::get_trends(&state, query.months).await?;
    Ok(Json(trends))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/me",
    responses(
        (status = 200, description = "The caller's own progress summary", body = StudentDashboard)
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn my_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<StudentDashboard>, AppError> {
    let dashboard = DashboardService::student_dashboard(&state.db, auth_user.user_id()?).await?;
    Ok(Json(dashboard))
}
