use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    checkout, list_payments, my_payments, razorpay_webhook, stripe_webhook, verify_razorpay,
};

/// Mounted at `/api/payments`. Webhook routes authenticate by signature.
pub fn init_payments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_payments))
        .route("/me", get(my_payments))
        .route("/checkout", post(checkout))
        .route("/razorpay/verify", post(verify_razorpay))
        .route("/webhooks/stripe", post(stripe_webhook))
        .route("/webhooks/razorpay", post(razorpay_webhook))
}
