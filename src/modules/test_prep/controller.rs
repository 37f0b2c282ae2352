use abroadly_core::{AppError, permissions};
use abroadly_models::{AttemptId, QuestionId, SectionId, TestId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireTestsManage};
use crate::modules::dashboard::service::DashboardService;
use crate::modules::test_prep::attempts::AttemptService;
use crate::modules::test_prep::model::{
    Attempt, AttemptDetail, AttemptWithTest, CreateQuestionDto, CreateSectionDto, CreateTestDto,
    PaginatedTestsResponse, PublicTest, Question, SaveAnswersDto, Section, SubmitAttemptDto, Test,
    TestDetail, TestFilterParams, UpdateQuestionDto, UpdateSectionDto, UpdateTestDto,
};
use crate::modules::test_prep::service::TestService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

// ---------------------------------------------------------------------------
// Catalog and attempts
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/tests",
    params(TestFilterParams),
    responses(
        (status = 200, description = "Published tests with section and question counts", body = PaginatedTestsResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_tests(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<TestFilterParams>,
) -> Result<Json<PaginatedTestsResponse>, AppError> {
    let tests = TestService::list_published(&state.db, filters).await?;
    Ok(Json(tests))
}

#[utoipa::path(
    get,
    path = "/api/tests/{id}",
    params(("id" = String, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Test without answers", body = PublicTest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Test not found or not published")
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_test(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<TestId>,
) -> Result<Json<PublicTest>, AppError> {
    let test = TestService::get_public_test(&state.db, id).await?;
    Ok(Json(test))
}

#[utoipa::path(
    post,
    path = "/api/tests/{id}/attempts",
    params(("id" = String, Path, description = "Test ID")),
    responses(
        (status = 201, description = "Attempt started", body = Attempt),
        (status = 200, description = "Open attempt resumed", body = Attempt),
        (status = 404, description = "Test not found or not published")
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn start_attempt(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<TestId>,
) -> Result<(StatusCode, Json<Attempt>), AppError> {
    let (attempt, created) = AttemptService::start(&state.db, auth_user.user_id()?, id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    DashboardService::invalidate_cache(&state).await;
    Ok((status, Json(attempt)))
}

#[utoipa::path(
    get,
    path = "/api/attempts/me",
    responses(
        (status = 200, description = "Own attempts", body = Vec<AttemptWithTest>)
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn my_attempts(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<AttemptWithTest>>, AppError> {
    let attempts = AttemptService::list_for_user(&state.db, auth_user.user_id()?).await?;
    Ok(Json(attempts))
}

#[utoipa::path(
    get,
    path = "/api/attempts/{id}",
    params(("id" = String, Path, description = "Attempt ID")),
    responses(
        (status = 200, description = "Attempt, with a per-question review once closed", body = AttemptDetail),
        (status = 404, description = "Attempt not found")
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_attempt(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AttemptId>,
) -> Result<Json<AttemptDetail>, AppError> {
    let can_read_all = auth_user.has_permission(permissions::ATTEMPTS_READ_ALL);
    let detail =
        AttemptService::get_attempt(&state.db, auth_user.user_id()?, can_read_all, id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/attempts/{id}/answers",
    params(("id" = String, Path, description = "Attempt ID")),
    request_body = SaveAnswersDto,
    responses(
        (status = 200, description = "Answers saved", body = AttemptDetail),
        (status = 400, description = "Time is up or unknown question"),
        (status = 409, description = "Attempt already submitted")
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn save_answers(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AttemptId>,
    ValidatedJson(dto): ValidatedJson<SaveAnswersDto>,
) -> Result<Json<AttemptDetail>, AppError> {
    let detail =
        AttemptService::save_answers(&state.db, auth_user.user_id()?, id, dto.answers).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    post,
    path = "/api/attempts/{id}/submit",
    params(("id" = String, Path, description = "Attempt ID")),
    request_body = SubmitAttemptDto,
    responses(
        (status = 200, description = "Attempt scored", body = AttemptDetail),
        (status = 409, description = "Attempt already submitted")
    ),
    tag = "Test Prep",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn submit_attempt(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AttemptId>,
    ValidatedJson(dto): ValidatedJson<SubmitAttemptDto>,
) -> Result<Json<AttemptDetail>, AppError> {
    let detail =
        AttemptService::submit(&state.db, auth_user.user_id()?, id, dto.answers).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/tests",
    params(TestFilterParams),
    responses(
        (status = 200, description = "All tests including drafts", body = PaginatedTestsResponse),
        (status = 403, description = "Forbidden - requires tests:manage permission")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn admin_list_tests(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Query(filters): Query<TestFilterParams>,
) -> Result<Json<PaginatedTestsResponse>, AppError> {
    let tests = TestService::list_all(&state.db, filters).await?;
    Ok(Json(tests))
}

#[utoipa::path(
    post,
    path = "/api/admin/tests",
    request_body = CreateTestDto,
    responses(
        (status = 201, description = "Test created", body = Test),
        (status = 422, description = "Validation error")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_test(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    ValidatedJson(dto): ValidatedJson<CreateTestDto>,
) -> Result<(StatusCode, Json<Test>), AppError> {
    let test = TestService::create_test(&state.db, dto).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok((StatusCode::CREATED, Json(test)))
}

#[utoipa::path(
    get,
    path = "/api/admin/tests/{id}",
    params(("id" = String, Path, description = "Test ID")),
    responses(
        (status = 200, description = "Full test structure including answers", body = TestDetail),
        (status = 404, description = "Test not found")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn admin_get_test(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<TestId>,
) -> Result<Json<TestDetail>, AppError> {
    let detail = TestService::get_test_detail(&state.db, id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/admin/tests/{id}",
    params(("id" = String, Path, description = "Test ID")),
    request_body = UpdateTestDto,
    responses(
        (status = 200, description = "Test updated", body = Test),
        (status = 404, description = "Test not found")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_test(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<TestId>,
    ValidatedJson(dto): ValidatedJson<UpdateTestDto>,
) -> Result<Json<Test>, AppError> {
    let test = TestService::update_test(&state.db, id, dto).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(test))
}

#[utoipa::path(
    delete,
    path = "/api/admin/tests/{id}",
    params(("id" = String, Path, description = "Test ID")),
    responses(
        (status = 204, description = "Test deleted"),
        (status = 404, description = "Test not found"),
        (status = 409, description = "Test has submitted attempts")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_test(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<TestId>,
) -> Result<StatusCode, AppError> {
    TestService::delete_test(&state.db, id).await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/tests/{id}/sections",
    params(("id" = String, Path, description = "Test ID")),
    request_body = CreateSectionDto,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 404, description = "Test not found")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_section(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(test_id): Path<TestId>,
    ValidatedJson(dto): ValidatedJson<CreateSectionDto>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    let section = TestService::create_section(&state.db, test_id, dto).await?;
    Ok((StatusCode::CREATED, Json(section)))
}

#[utoipa::path(
    put,
    path = "/api/admin/tests/sections/{id}",
    params(("id" = String, Path, description = "Section ID")),
    request_body = UpdateSectionDto,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 404, description = "Section not found")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_section(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<UpdateSectionDto>,
) -> Result<Json<Section>, AppError> {
    let section = TestService::update_section(&state.db, id, dto).await?;
    Ok(Json(section))
}

#[utoipa::path(
    delete,
    path = "/api/admin/tests/sections/{id}",
    params(("id" = String, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section and its questions deleted"),
        (status = 404, description = "Section not found")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_section(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<SectionId>,
) -> Result<StatusCode, AppError> {
    TestService::delete_section(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/tests/sections/{id}/questions",
    params(("id" = String, Path, description = "Section ID")),
    request_body = CreateQuestionDto,
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 404, description = "Section not found"),
        (status = 422, description = "Options or answers do not fit the question type")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_question(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(section_id): Path<SectionId>,
    ValidatedJson(dto): ValidatedJson<CreateQuestionDto>,
) -> Result<(StatusCode, Json<Question>), AppError> {
    let question = TestService::create_question(&state.db, section_id, dto).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    put,
    path = "/api/admin/tests/questions/{id}",
    params(("id" = String, Path, description = "Question ID")),
    request_body = UpdateQuestionDto,
    responses(
        (status = 200, description = "Question updated", body = Question),
        (status = 404, description = "Question not found"),
        (status = 422, description = "Options or answers do not fit the question type")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_question(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<QuestionId>,
    ValidatedJson(dto): ValidatedJson<UpdateQuestionDto>,
) -> Result<Json<Question>, AppError> {
    let question = TestService::update_question(&state.db, id, dto).await?;
    Ok(Json(question))
}

#[utoipa::path(
    delete,
    path = "/api/admin/tests/questions/{id}",
    params(("id" = String, Path, description = "Question ID")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found")
    ),
    tag = "Test Prep Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_question(
    State(state): State<AppState>,
    RequireTestsManage(_auth_user): RequireTestsManage,
    Path(id): Path<QuestionId>,
) -> Result<StatusCode, AppError> {
    TestService::delete_question(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
