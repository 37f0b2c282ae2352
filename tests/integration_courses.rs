mod common;

use abroadly::abroadly_models::UserRole;
use axum::http::{Method, StatusCode};
use common::{create_test_course, create_test_user, send, test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_creates_course_with_derived_slug(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);
    let course = json!({
        "title": "MSc Computer Science",
        "country": "Germany",
        "level": "postgraduate",
        "fee_cents": 150000,
        "currency": "EUR",
        "is_published": true
    });

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/courses",
        Some(&admin.token()),
        Some(course.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "msc-computer-science");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/courses",
        Some(&admin.token()),
        Some(course),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "msc-computer-science-2");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_explicit_duplicate_slug_conflicts(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);
    let course = json!({
        "title": "BA Economics",
        "slug": "ba-economics",
        "country": "Canada",
        "level": "undergraduate"
    });

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/courses",
        Some(&admin.token()),
        Some(course.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/courses",
        Some(&admin.token()),
        Some(course),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_public_catalog_hides_unpublished(pool: PgPool) {
    let published = create_test_course(&pool, 0, true).await;
    let draft = create_test_course(&pool, 0, false).await;
    let app = test_app(pool);

    let (status, body) = send(&app, Method::GET, "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["id"], published.to_string());

    let (status, _) = send(&app, Method::GET, &format!("/api/courses/{}", draft), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_lookup_by_slug(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);

    send(
        &app,
        Method::POST,
        "/api/admin/courses",
        Some(&admin.token()),
        Some(json!({
            "title": "IELTS Foundation",
            "country": "Australia",
            "level": "language",
            "is_published": true
        })),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/api/courses/ielts-foundation", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "IELTS Foundation");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_free_course_enrollment_is_active(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let app = test_app(pool);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "active");
    assert_eq!(body["progress"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_paid_course_enrollment_awaits_payment(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 49900, true).await;
    let app = test_app(pool);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending_payment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_enrollment_conflicts(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let app = test_app(pool);
    let token = student.token();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&token),
        Some(json!({ "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&token),
        Some(json!({ "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelled_enrollment_can_be_reactivated(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let app = test_app(pool);
    let token = student.token();

    let (_, enrollment) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&token),
        Some(json!({ "course_id": course })),
    )
    .await;
    let id = enrollment["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/enrollments/{}/cancel", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&token),
        Some(json!({ "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], id);
    assert_eq!(body["status"], "active");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrolling_in_unpublished_course(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, false).await;
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_progress_completes_enrollment(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let app = test_app(pool);
    let token = student.token();

    let (_, enrollment) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&token),
        Some(json!({ "course_id": course })),
    )
    .await;
    let uri = format!("/api/enrollments/{}/progress", enrollment["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "progress": 60 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "progress": 40 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "progress": 100 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert!(body["completed_at"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_touch_someone_elses_enrollment(pool: PgPool) {
    let owner = create_test_user(&pool, UserRole::Student).await;
    let other = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let app = test_app(pool);

    let (_, enrollment) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&owner.token()),
        Some(json!({ "course_id": course })),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/enrollments/{}/cancel", enrollment["id"].as_str().unwrap()),
        Some(&other.token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_with_enrollments_cannot_be_deleted(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let app = test_app(pool);

    send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/courses/{}", course),
        Some(&admin.token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/admin/courses/{}", course),
        Some(&admin.token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enrollment_count"], 1);
}
