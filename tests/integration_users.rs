mod common;

use abroadly::abroadly_models::UserRole;
use axum::http::{Method, StatusCode};
use common::{TEST_PASSWORD, create_test_user, generate_unique_email, send, test_app};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_creates_consultant_user(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);
    let email = generate_unique_email();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        Some(&admin.token()),
        Some(json!({
            "first_name": "Ravi",
            "last_name": "Menon",
            "email": email,
            "password": "password123",
            "role": "consultant"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "consultant");
    assert_eq!(body["email"], email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_users_filters_by_role(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    create_test_user(&pool, UserRole::Student).await;
    create_test_user(&pool, UserRole::Student).await;
    create_test_user(&pool, UserRole::Consultant).await;
    let app = test_app(pool);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/users?role=student",
        Some(&admin.token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|u| u["role"] == "student")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_cannot_deactivate_self(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/users/{}", admin.id),
        Some(&admin.token()),
        Some(json!({ "is_active": false })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_cannot_delete_self(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", admin.id),
        Some(&admin.token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_deletes_user(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);
    let uri = format!("/api/users/{}", student.id);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin.token()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &uri, Some(&admin.token()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_own_profile(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users/me",
        Some(&student.token()),
        Some(json!({ "first_name": "Meera" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Meera");
    assert_eq!(body["last_name"], "User");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_password_requires_current(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/me/password",
        Some(&student.token()),
        Some(json!({ "current_password": "not-my-password", "new_password": "newpassword123" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_password_then_login(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = test_app(pool);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users/me/password",
        Some(&student.token()),
        Some(json!({ "current_password": TEST_PASSWORD, "new_password": "newpassword123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": student.email, "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": student.email, "password": "newpassword123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
