mod common;

use abroadly::abroadly_cache::{CacheKeys, RedisCache};
use abroadly::abroadly_models::UserRole;
use abroadly::router::init_router;
use axum::Router;
use axum::http::{Method, StatusCode};
use common::{create_test_course, create_test_user, send, test_app, test_state};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// App backed by the Redis at `REDIS_URL`, with a key prefix of its own.
/// `None` when no Redis is configured for the test run.
async fn cached_app(pool: PgPool) -> Option<Router> {
    let url = std::env::var("REDIS_URL").ok()?;
    let cache = RedisCache::new(&url, Duration::from_secs(300)).await.ok()?;

    let mut state = test_state(pool);
    state.cache = Some(cache);
    state.cache_keys = Arc::new(CacheKeys::new(format!("abroadly-test-{}", Uuid::new_v4())));
    Some(init_router(state))
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_stats_count_platform_totals(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    create_test_user(&pool, UserRole::Student).await;
    create_test_user(&pool, UserRole::Consultant).await;
    let course = create_test_course(&pool, 0, true).await;
    create_test_course(&pool, 0, false).await;
    let app = test_app(pool);

    send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;

    let (status, stats) = send(&app, Method::GET, "/api/dashboard/stats", Some(&admin.token()), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totals"]["students"], 2);
    assert_eq!(stats["totals"]["consultants"], 1);
    assert_eq!(stats["totals"]["courses"], 2);
    assert_eq!(stats["totals"]["published_courses"], 1);
    assert_eq!(stats["totals"]["active_enrollments"], 1);
    assert_eq!(stats["totals"]["revenue_cents"], 0);
    assert_eq!(stats["growth"]["new_students"]["current"], 2);
    assert_eq!(stats["recent_enrollments"][0]["course_title"], "MSc Data Science");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_trends_cover_requested_months(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let app = test_app(pool);

    let (status, trends) = send(
        &app,
        Method::GET,
        "/api/dashboard/trends?months=3",
        Some(&admin.token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends["months"], 3);
    assert_eq!(trends["points"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_dashboard(pool: PgPool) {
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
    send(
        &app,
        Method::PATCH,
        &format!("/api/enrollments/{}/progress", enrollment["id"].as_str().unwrap()),
        Some(&token),
        Some(json!({ "progress": 50 })),
    )
    .await;

    let (status, me) = send(&app, Method::GET, "/api/dashboard/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["enrollments_total"], 1);
    assert_eq!(me["enrollments_active"], 1);
    assert_eq!(me["average_progress"], 50.0);
    assert!(me["best_percentage"].is_null());
    assert!(me["next_appointment"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cached_stats_follow_writes(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let course = create_test_course(&pool, 0, true).await;
    let Some(app) = cached_app(pool).await else {
        return;
    };
    let admin_token = admin.token();

    let (_, enrollment) = send(
        &app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;
    let (_, before) = send(&app, Method::GET, "/api/dashboard/stats", Some(&admin_token), None).await;
    assert_eq!(before["totals"]["students"], 1);
    assert_eq!(before["totals"]["active_enrollments"], 1);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Ada",
            "last_name": "Okafor",
            "email": common::generate_unique_email(),
            "password": "password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/enrollments/{}/cancel", enrollment["id"].as_str().unwrap()),
        Some(&student.token()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = send(&app, Method::GET, "/api/dashboard/stats", Some(&admin_token), None).await;
    assert_eq!(after["totals"]["students"], 2);
    assert_eq!(after["totals"]["active_enrollments"], 0);
}
