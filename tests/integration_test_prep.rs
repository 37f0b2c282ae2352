mod common;

use abroadly::abroadly_models::UserRole;
use axum::Router;
use axum::http::{Method, StatusCode};
use common::{TestUser, create_test_user, send, test_app};
use serde_json::{Value, json};
use sqlx::PgPool;

struct SeededTest {
    test_id: String,
    choice_id: String,
    blank_id: String,
    essay_id: String,
}

/// Published TOEFL test with one section: a 2 point multiple choice, a 1
/// point fill-in-the-blank and an essay.
async fn seed_test(app: &Router, admin: &TestUser) -> SeededTest {
    let token = admin.token();

    let (status, test) = send(
        app,
        Method::POST,
        "/api/admin/tests",
        Some(&token),
        Some(json!({
            "title": "TOEFL Reading Practice",
            "test_type": "toefl",
            "duration_minutes": 30,
            "pass_percentage": 60.0,
            "is_published": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let test_id = test["id"].as_str().unwrap().to_string();

    let (status, section) = send(
        app,
        Method::POST,
        &format!("/api/admin/tests/{}/sections", test_id),
        Some(&token),
        Some(json!({ "title": "Reading" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let questions_uri = format!(
        "/api/admin/tests/sections/{}/questions",
        section["id"].as_str().unwrap()
    );

    let mut ids = Vec::new();
    for (position, question) in [
        json!({
            "question_type": "multiple_choice",
            "prompt": "What is the capital of France?",
            "options": ["Paris", "London", "Rome"],
            "correct_answers": ["Paris"],
            "points": 2
        }),
        json!({
            "question_type": "fill_blank",
            "prompt": "Plants make food through ____.",
            "correct_answers": ["photosynthesis"]
        }),
        json!({
            "question_type": "essay",
            "prompt": "Describe your ideal university."
        }),
    ]
    .into_iter()
    .enumerate()
    {
        let mut question = question;
        question["position"] = json!(position);
        let (status, created) = send(app, Method::POST, &questions_uri, Some(&token), Some(question)).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    SeededTest {
        test_id,
        choice_id: ids[0].clone(),
        blank_id: ids[1].clone(),
        essay_id: ids[2].clone(),
    }
}

async fn start(app: &Router, student: &TestUser, test_id: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/api/tests/{}/attempts", test_id),
        Some(&student.token()),
        None,
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_view_hides_answers(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;
    let uri = format!("/api/tests/{}", seeded.test_id);

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, &uri, Some(&student.token()), None).await;

    assert_eq!(status, StatusCode::OK);
    let question = &body["sections"][0]["questions"][0];
    assert_eq!(question["prompt"], "What is the capital of France?");
    assert!(question.get("correct_answers").is_none());
    assert!(question.get("explanation").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_multiple_choice_answer_must_be_an_option(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    let (_, detail) = send(
        &app,
        Method::GET,
        &format!("/api/admin/tests/{}", seeded.test_id),
        Some(&admin.token()),
        None,
    )
    .await;
    let section_id = detail["sections"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/admin/tests/sections/{}/questions", section_id),
        Some(&admin.token()),
        Some(json!({
            "question_type": "multiple_choice",
            "prompt": "Pick one",
            "options": ["A", "B"],
            "correct_answers": ["C"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_start_resumes_open_attempt(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    let (status, first) = start(&app, &student, &seeded.test_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "in_progress");

    let (status, second) = start(&app, &student, &seeded.test_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_start_replaces_attempt_whose_time_ran_out(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool.clone());
    let seeded = seed_test(&app, &admin).await;

    let (_, first) = start(&app, &student, &seeded.test_id).await;
    let first_id = first["id"].as_str().unwrap().to_string();

    // Past expires_at but still inside the grace period.
    sqlx::query(
        "UPDATE test_attempts SET expires_at = NOW() - INTERVAL '30 seconds' WHERE id = $1::uuid",
    )
    .bind(&first_id)
    .execute(&pool)
    .await
    .unwrap();

    let (status, second) = start(&app, &student, &seeded.test_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(second["id"], first["id"]);

    let (_, closed) = send(
        &app,
        Method::GET,
        &format!("/api/attempts/{}", first_id),
        Some(&student.token()),
        None,
    )
    .await;
    assert_eq!(closed["status"], "expired");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_full_attempt_is_scored(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;
    let token = student.token();

    let (_, attempt) = start(&app, &student, &seeded.test_id).await;
    let attempt_id = attempt["id"].as_str().unwrap().to_string();

    let (status, saved) = send(
        &app,
        Method::PUT,
        &format!("/api/attempts/{}/answers", attempt_id),
        Some(&token),
        Some(json!({ "answers": { seeded.choice_id.clone(): "Paris" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(saved["remaining_seconds"].as_i64().unwrap() > 0);

    let (status, result) = send(
        &app,
        Method::POST,
        &format!("/api/attempts/{}/submit", attempt_id),
        Some(&token),
        Some(json!({ "answers": {
            seeded.blank_id.clone(): "  Photosynthesis ",
            seeded.essay_id.clone(): "Somewhere with a good library."
        } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "submitted");
    assert_eq!(result["score"], 3);
    assert_eq!(result["max_score"], 3);
    assert_eq!(result["percentage"], 100.0);
    assert_eq!(result["passed"], true);
    assert!(result["band_score"].is_null());
    assert_eq!(result["section_results"][0]["pending_review"], 1);

    let review = result["review"].as_array().unwrap();
    assert_eq!(review.len(), 3);
    assert!(review[2]["is_correct"].is_null());

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/attempts/{}/submit", attempt_id),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_wrong_answers_fail(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    let (_, attempt) = start(&app, &student, &seeded.test_id).await;

    let (status, result) = send(
        &app,
        Method::POST,
        &format!("/api/attempts/{}/submit", attempt["id"].as_str().unwrap()),
        Some(&student.token()),
        Some(json!({ "answers": { seeded.choice_id.clone(): "London" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["score"], 0);
    assert_eq!(result["passed"], false);
    assert_eq!(result["section_results"][0]["incorrect"], 1);
    assert_eq!(result["section_results"][0]["unanswered"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unknown_question_is_rejected(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    let (_, attempt) = start(&app, &student, &seeded.test_id).await;
    let unknown = uuid::Uuid::new_v4().to_string();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/attempts/{}/answers", attempt["id"].as_str().unwrap()),
        Some(&student.token()),
        Some(json!({ "answers": { unknown: "Paris" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attempts_are_private(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let owner = create_test_user(&pool, UserRole::Student).await;
    let other = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    let (_, attempt) = start(&app, &owner, &seeded.test_id).await;
    let uri = format!("/api/attempts/{}", attempt["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &uri, Some(&other.token()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &uri, Some(&owner.token()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &uri, Some(&admin.token()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_other_students_cannot_answer_or_submit(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let owner = create_test_user(&pool, UserRole::Student).await;
    let other = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    let (_, attempt) = start(&app, &owner, &seeded.test_id).await;
    let id = attempt["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/attempts/{}/answers", id),
        Some(&other.token()),
        Some(json!({ "answers": { seeded.choice_id.clone(): "Paris" } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/attempts/{}/submit", id),
        Some(&other.token()),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, still_open) = send(
        &app,
        Method::GET,
        &format!("/api/attempts/{}", id),
        Some(&owner.token()),
        None,
    )
    .await;
    assert_eq!(still_open["status"], "in_progress");
    assert_eq!(still_open["answers"], json!({}));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_late_submission_is_scored_as_expired(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool.clone());
    let seeded = seed_test(&app, &admin).await;
    let token = student.token();

    let (_, attempt) = start(&app, &student, &seeded.test_id).await;
    let id = attempt["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/attempts/{}/answers", id),
        Some(&token),
        Some(json!({ "answers": { seeded.choice_id.clone(): "Paris" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    sqlx::query(
        "UPDATE test_attempts SET expires_at = NOW() - INTERVAL '5 minutes' WHERE id = $1::uuid",
    )
    .bind(&id)
    .execute(&pool)
    .await
    .unwrap();

    let (status, result) = send(
        &app,
        Method::POST,
        &format!("/api/attempts/{}/submit", id),
        Some(&token),
        Some(json!({ "answers": { seeded.blank_id.clone(): "photosynthesis" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["status"], "expired");
    // Saved answer counts; the late one is dropped.
    assert_eq!(result["score"], 2);
    assert!(result["answers"].get(&seeded.blank_id).is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/attempts/{}/submit", id),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_expired_attempt_is_closed_on_read(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool.clone());
    let seeded = seed_test(&app, &admin).await;

    let (_, attempt) = start(&app, &student, &seeded.test_id).await;
    let id = attempt["id"].as_str().unwrap().to_string();

    sqlx::query(
        "UPDATE test_attempts SET expires_at = NOW() - INTERVAL '10 minutes' WHERE id = $1::uuid",
    )
    .bind(&id)
    .execute(&pool)
    .await
    .unwrap();

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/attempts/{}", id),
        Some(&student.token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "expired");
    assert_eq!(body["remaining_seconds"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_test_with_attempts_cannot_be_deleted(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let seeded = seed_test(&app, &admin).await;

    start(&app, &student, &seeded.test_id).await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/tests/{}", seeded.test_id),
        Some(&admin.token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unpublished_test_cannot_be_started(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);

    let (_, test) = send(
        &app,
        Method::POST,
        "/api/admin/tests",
        Some(&admin.token()),
        Some(json!({ "title": "Draft GRE", "test_type": "gre", "duration_minutes": 60 })),
    )
    .await;

    let (status, _) = start(&app, &student, test["id"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
