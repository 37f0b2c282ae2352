#![allow(dead_code)]

use abroadly::abroadly_auth::create_access_token;
use abroadly::abroadly_config::{JwtConfig, RateLimitConfig};
use abroadly::abroadly_core::hash_password;
use abroadly::abroadly_models::UserRole;
use abroadly::router::init_router;
use abroadly::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "password123";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl TestUser {
    pub fn token(&self) -> String {
        create_access_token(
            self.id,
            &self.email,
            self.role.as_str(),
            self.role.permissions(),
            &JwtConfig::default(),
        )
        .unwrap()
    }
}

/// State with default config and the auth limiter switched off.
pub fn test_state(pool: PgPool) -> AppState {
    AppState::new(pool).with_rate_limit(RateLimitConfig {
        enabled: false,
        ..RateLimitConfig::default()
    })
}

pub fn test_app(pool: PgPool) -> Router {
    init_router(test_state(pool))
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub async fn create_test_user(pool: &PgPool, role: UserRole) -> TestUser {
    let email = generate_unique_email();
    let hashed = hash_password(TEST_PASSWORD).unwrap();

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (first_name, last_name, email, password_hash, role)
         VALUES ('Test', 'User', $1, $2, $3)
         RETURNING id",
    )
    .bind(&email)
    .bind(&hashed)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();

    TestUser { id, email, role }
}

pub async fn create_test_course(pool: &PgPool, fee_cents: i64, is_published: bool) -> Uuid {
    let slug = format!("course-{}", Uuid::new_v4());
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO courses (title, slug, country, level, fee_cents, is_published)
         VALUES ('MSc Data Science', $1, 'United Kingdom', 'postgraduate', $2, $3)
         RETURNING id",
    )
    .bind(&slug)
    .bind(fee_cents)
    .bind(is_published)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Consultant profile with 30 minute slots, available every day 00:00-23:30 UTC.
pub async fn create_test_consultant(pool: &PgPool, fee_cents: i64) -> (TestUser, Uuid) {
    let user = create_test_user(pool, UserRole::Consultant).await;
    let consultant_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO consultants (user_id, headline, countries, fee_cents, slot_minutes)
         VALUES ($1, 'UK admissions specialist', ARRAY['United Kingdom'], $2, 30)
         RETURNING id",
    )
    .bind(user.id)
    .bind(fee_cents)
    .fetch_one(pool)
    .await
    .unwrap();

    for weekday in 0..7i16 {
        sqlx::query(
            "INSERT INTO availability_rules (consultant_id, weekday, start_time, end_time)
             VALUES ($1, $2, '00:00', '23:30')",
        )
        .bind(consultant_id)
        .bind(weekday)
        .execute(pool)
        .await
        .unwrap();
    }

    (user, consultant_id)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
