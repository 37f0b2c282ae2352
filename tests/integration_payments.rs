mod common;

use abroadly::abroadly_config::{PaymentConfig, RazorpayConfig, StripeConfig};
use abroadly::abroadly_models::UserRole;
use abroadly::router::init_router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use common::{TestUser, create_test_course, create_test_user, send, test_state};
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

const KEY_SECRET: &str = "rzp_test_secret";
const WEBHOOK_SECRET: &str = "rzp_webhook_secret";
const STRIPE_WEBHOOK_SECRET: &str = "whsec_test";
/// Nothing listens here, so provider calls fail to connect.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn payments_app(pool: PgPool, api_base: &str) -> Router {
    let mut state = test_state(pool);
    state.payment_config = PaymentConfig {
        stripe: Some(StripeConfig {
            secret_key: "sk_test".to_string(),
            webhook_secret: Some(STRIPE_WEBHOOK_SECRET.to_string()),
            api_base: api_base.to_string(),
        }),
        razorpay: Some(RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: KEY_SECRET.to_string(),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            api_base: api_base.to_string(),
        }),
        ..PaymentConfig::default()
    };
    init_router(state)
}

fn razorpay_app(pool: PgPool) -> Router {
    payments_app(pool, UNREACHABLE)
}

/// Serves canned Stripe and Razorpay order responses on a local port.
async fn provider_stub() -> String {
    let stub = Router::new()
        .route(
            "/v1/payment_intents",
            post(|| async {
                Json(json!({ "id": "pi_test_123", "client_secret": "pi_test_123_secret_abc" }))
            }),
        )
        .route(
            "/v1/orders",
            post(|| async { Json(json!({ "id": "order_stub_1", "status": "created" })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });
    format!("http://{addr}")
}

fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Paid enrollment awaiting payment plus a Razorpay payment row for it.
async fn pending_enrollment(app: &Router, pool: &PgPool, student: &TestUser, order_id: &str) -> String {
    let course = create_test_course(pool, 49900, true).await;
    let (status, enrollment) = send(
        app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let enrollment_id = enrollment["id"].as_str().unwrap().to_string();

    sqlx::query(
        "INSERT INTO payments
             (user_id, purpose, reference_id, provider, amount_cents, currency, provider_order_id)
         VALUES ($1, 'course_enrollment', $2::uuid, 'razorpay', 49900, 'USD', $3)",
    )
    .bind(student.id)
    .bind(&enrollment_id)
    .bind(order_id)
    .execute(pool)
    .await
    .unwrap();

    enrollment_id
}

async fn enrollment_status(app: &Router, student: &TestUser) -> Value {
    let (_, mine) = send(app, Method::GET, "/api/enrollments/me", Some(&student.token()), None).await;
    mine[0]["status"].clone()
}

/// Paid enrollment awaiting payment, created through the API.
async fn enroll_in_paid_course(app: &Router, pool: &PgPool, student: &TestUser) -> String {
    let course = create_test_course(pool, 49900, true).await;
    let (status, enrollment) = send(
        app,
        Method::POST,
        "/api/enrollments",
        Some(&student.token()),
        Some(json!({ "course_id": course })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    enrollment["id"].as_str().unwrap().to_string()
}

async fn checkout(
    app: &Router,
    student: &TestUser,
    enrollment_id: &str,
    provider: &str,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/payments/checkout",
        Some(&student.token()),
        Some(json!({
            "purpose": "course_enrollment",
            "reference_id": enrollment_id,
            "provider": provider
        })),
    )
    .await
}

fn stripe_signature(body: &str, timestamp: i64) -> String {
    let signed = format!("{timestamp}.{body}");
    format!("t={timestamp},v1={}", sign(STRIPE_WEBHOOK_SECRET, signed.as_bytes()))
}

async fn stripe_webhook(app: &Router, body: &Value, signature: Option<&str>) -> StatusCode {
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/payments/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        request = request.header("stripe-signature", signature);
    }
    let request = request.body(Body::from(body.to_string())).unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

async fn razorpay_webhook(app: &Router, body: &Value, signature: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/webhooks/razorpay")
        .header("content-type", "application/json")
        .header("x-razorpay-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_verified_payment_activates_enrollment(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = razorpay_app(pool.clone());
    pending_enrollment(&app, &pool, &student, "order_abc").await;

    let (status, payment) = send(
        &app,
        Method::POST,
        "/api/payments/razorpay/verify",
        Some(&student.token()),
        Some(json!({
            "razorpay_order_id": "order_abc",
            "razorpay_payment_id": "pay_123",
            "razorpay_signature": sign(KEY_SECRET, b"order_abc|pay_123")
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "succeeded");
    assert_eq!(payment["provider_payment_id"], "pay_123");
    assert_eq!(enrollment_status(&app, &student).await, "active");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bad_signature_is_rejected(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = razorpay_app(pool.clone());
    pending_enrollment(&app, &pool, &student, "order_def").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/payments/razorpay/verify",
        Some(&student.token()),
        Some(json!({
            "razorpay_order_id": "order_def",
            "razorpay_payment_id": "pay_456",
            "razorpay_signature": sign("wrong-secret", b"order_def|pay_456")
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(enrollment_status(&app, &student).await, "pending_payment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_captured_webhook_is_idempotent(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = razorpay_app(pool.clone());
    pending_enrollment(&app, &pool, &student, "order_ghi").await;

    let event = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_789", "order_id": "order_ghi" } } }
    });
    let signature = sign(WEBHOOK_SECRET, event.to_string().as_bytes());

    assert_eq!(razorpay_webhook(&app, &event, &signature).await, StatusCode::OK);
    assert_eq!(razorpay_webhook(&app, &event, &signature).await, StatusCode::OK);
    assert_eq!(enrollment_status(&app, &student).await, "active");

    let (_, payments) = send(&app, Method::GET, "/api/payments/me", Some(&student.token()), None).await;
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["status"], "succeeded");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failed_webhook_records_reason(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = razorpay_app(pool.clone());
    pending_enrollment(&app, &pool, &student, "order_jkl").await;

    let event = json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": {
            "id": "pay_000",
            "order_id": "order_jkl",
            "error_description": "Card declined"
        } } }
    });
    let signature = sign(WEBHOOK_SECRET, event.to_string().as_bytes());
    assert_eq!(razorpay_webhook(&app, &event, &signature).await, StatusCode::OK);

    let (_, payments) = send(&app, Method::GET, "/api/payments/me", Some(&student.token()), None).await;
    assert_eq!(payments[0]["status"], "failed");
    assert_eq!(payments[0]["failure_reason"], "Card declined");
    assert_eq!(enrollment_status(&app, &student).await, "pending_payment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unsigned_webhook_is_rejected(pool: PgPool) {
    let app = razorpay_app(pool);
    let event = json!({ "event": "payment.captured", "payload": {} });

    let status = razorpay_webhook(&app, &event, &sign("not-the-secret", event.to_string().as_bytes())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_webhook_for_unknown_order_is_acknowledged(pool: PgPool) {
    let app = razorpay_app(pool);
    let order_id = format!("order_{}", Uuid::new_v4().simple());
    let event = json!({
        "event": "order.paid",
        "payload": { "order": { "entity": { "id": order_id } } }
    });

    let status = razorpay_webhook(&app, &event, &sign(WEBHOOK_SECRET, event.to_string().as_bytes())).await;

    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_lists_all_payments(pool: PgPool) {
    let admin = create_test_user(&pool, UserRole::Admin).await;
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = razorpay_app(pool.clone());
    pending_enrollment(&app, &pool, &student, "order_mno").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/payments?provider=razorpay",
        Some(&admin.token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["amount_cents"], 49900);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stripe_checkout_stores_provider_order(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = payments_app(pool.clone(), &provider_stub().await);
    let enrollment_id = enroll_in_paid_course(&app, &pool, &student).await;

    let (status, order) = checkout(&app, &student, &enrollment_id, "stripe").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["provider_order_id"], "pi_test_123");
    assert_eq!(order["client_secret"], "pi_test_123_secret_abc");
    assert_eq!(order["amount_cents"], 49900);
    assert!(order["key_id"].is_null());

    let (_, payments) = send(&app, Method::GET, "/api/payments/me", Some(&student.token()), None).await;
    assert_eq!(payments[0]["status"], "created");
    assert_eq!(payments[0]["provider_order_id"], "pi_test_123");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_razorpay_checkout_returns_key_id(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = payments_app(pool.clone(), &provider_stub().await);
    let enrollment_id = enroll_in_paid_course(&app, &pool, &student).await;

    let (status, order) = checkout(&app, &student, &enrollment_id, "razorpay").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["provider_order_id"], "order_stub_1");
    assert_eq!(order["key_id"], "rzp_test_key");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unreachable_provider_marks_payment_failed(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = razorpay_app(pool.clone());
    let enrollment_id = enroll_in_paid_course(&app, &pool, &student).await;

    let (status, _) = checkout(&app, &student, &enrollment_id, "stripe").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, payments) = send(&app, Method::GET, "/api/payments/me", Some(&student.token()), None).await;
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert_eq!(payments[0]["status"], "failed");
    assert!(payments[0]["failure_reason"].is_string());
    assert!(payments[0]["provider_order_id"].is_null());
    assert_eq!(enrollment_status(&app, &student).await, "pending_payment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stripe_succeeded_webhook_activates_enrollment(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = payments_app(pool.clone(), &provider_stub().await);
    let enrollment_id = enroll_in_paid_course(&app, &pool, &student).await;
    let (status, _) = checkout(&app, &student, &enrollment_id, "stripe").await;
    assert_eq!(status, StatusCode::CREATED);

    let event = json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_test_123", "latest_charge": "ch_test_1" } }
    });
    let signature = stripe_signature(&event.to_string(), chrono::Utc::now().timestamp());

    assert_eq!(stripe_webhook(&app, &event, Some(&signature)).await, StatusCode::OK);
    assert_eq!(enrollment_status(&app, &student).await, "active");

    let (_, payments) = send(&app, Method::GET, "/api/payments/me", Some(&student.token()), None).await;
    assert_eq!(payments[0]["status"], "succeeded");
    assert_eq!(payments[0]["provider_payment_id"], "ch_test_1");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stripe_failed_webhook_records_reason(pool: PgPool) {
    let student = create_test_user(&pool, UserRole::Student).await;
    let app = payments_app(pool.clone(), &provider_stub().await);
    let enrollment_id = enroll_in_paid_course(&app, &pool, &student).await;
    checkout(&app, &student, &enrollment_id, "stripe").await;

    let event = json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": {
            "id": "pi_test_123",
            "last_payment_error": { "message": "Your card has insufficient funds." }
        } }
    });
    let signature = stripe_signature(&event.to_string(), chrono::Utc::now().timestamp());

    assert_eq!(stripe_webhook(&app, &event, Some(&signature)).await, StatusCode::OK);

    let (_, payments) = send(&app, Method::GET, "/api/payments/me", Some(&student.token()), None).await;
    assert_eq!(payments[0]["status"], "failed");
    assert_eq!(payments[0]["failure_reason"], "Your card has insufficient funds.");
    assert_eq!(enrollment_status(&app, &student).await, "pending_payment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stripe_webhook_signature_is_checked(pool: PgPool) {
    let app = razorpay_app(pool);
    let event = json!({
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_unknown" } }
    });
    let now = chrono::Utc::now().timestamp();

    assert_eq!(stripe_webhook(&app, &event, None).await, StatusCode::BAD_REQUEST);

    let stale = stripe_signature(&event.to_string(), now - 3600);
    assert_eq!(stripe_webhook(&app, &event, Some(&stale)).await, StatusCode::BAD_REQUEST);

    let overflowing = "t=-9223372036854775808,v1=00";
    assert_eq!(stripe_webhook(&app, &event, Some(overflowing)).await, StatusCode::BAD_REQUEST);

    let fresh = stripe_signature(&event.to_string(), now);
    assert_eq!(stripe_webhook(&app, &event, Some(&fresh)).await, StatusCode::OK);
}
