use abroadly_core::AppError;
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequirePaymentsReadAll};
use crate::modules::dashboard::service::DashboardService;
use crate::modules::payments::model::{
    CheckoutRequest, CheckoutResponse, PaginatedPaymentsResponse, Payment, PaymentFilterParams,
    RazorpayVerifyRequest, WebhookAck,
};
use crate::modules::payments::service::PaymentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[utoipa::path(
    post,
    path = "/api/payments/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Provider order created", body = CheckoutResponse),
        (status = 400, description = "Nothing to pay"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Enrollment or appointment not found"),
        (status = 502, description = "Provider request failed"),
        (status = 503, description = "Provider not configured")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, req))]
pub async fn checkout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let response = PaymentService::checkout(
        &state.db,
        &state.http,
        &state.payment_config,
        auth_user.user_id()?,
        req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/payments/razorpay/verify",
    request_body = RazorpayVerifyRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = Payment),
        (status = 400, description = "Invalid payment signature"),
        (status = 404, description = "Payment not found")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, req))]
pub async fn verify_razorpay(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<RazorpayVerifyRequest>,
) -> Result<Json<Payment>, AppError> {
    let payment = PaymentService::verify_razorpay(
        &state.db,
        &state.payment_config,
        auth_user.user_id()?,
        req,
    )
    .await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhooks/stripe",
    request_body(content = String, description = "Raw Stripe event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Bad signature or payload")
    ),
    tag = "Payments"
)]
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    PaymentService::handle_stripe_webhook(
        &state.db,
        &state.payment_config,
        header_str(&headers, "stripe-signature"),
        &body,
    )
    .await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(WebhookAck { received: true }))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhooks/razorpay",
    request_body(content = String, description = "Raw Razorpay event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Bad signature or payload")
    ),
    tag = "Payments"
)]
#[instrument(skip_all)]
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    PaymentService::handle_razorpay_webhook(
        &state.db,
        &state.payment_config,
        header_str(&headers, "x-razorpay-signature"),
        &body,
    )
    .await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(WebhookAck { received: true }))
}

#[utoipa::path(
    get,
    path = "/api/payments/me",
    responses(
        (status = 200, description = "Own payments", body = Vec<Payment>)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn my_payments(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = PaymentService::list_for_user(&state.db, auth_user.user_id()?).await?;
    Ok(Json(payments))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    params(PaymentFilterParams),
    responses(
        (status = 200, description = "All payments", body = PaginatedPaymentsResponse),
        (status = 403, description = "Forbidden - requires payments:read_all permission")
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
    RequirePaymentsReadAll(_auth_user): RequirePaymentsReadAll,
    Query(filters): Query<PaymentFilterParams>,
) -> Result<Json<PaginatedPaymentsResponse>, AppError> {
    let payments = PaymentService::list_payments(&state.db, filters).await?;
    Ok(Json(payments))
}
