//! Outbound provider calls and inbound webhook event shapes.

use abroadly_config::payments::{RazorpayConfig, StripeConfig};
use abroadly_core::AppError;
use std::time::Instant;

use abroadly_models::PaymentId;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::metrics;

/// Order created at the provider for one payment row.
#[derive(Debug, Clone)]
pub struct ProviderOrder {
    pub order_id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrderResponse {
    id: String,
}

fn provider_error(provider: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::new(
        StatusCode::BAD_GATEWAY,
        anyhow::anyhow!("{provider} request failed: {detail}"),
    )
}

/// Sends a provider request and decodes a successful JSON body.
async fn send_json<T: for<'de> Deserialize<'de>>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let started = Instant::now();
    let result = match request.send().await {
        Ok(response) => read_json(provider, response).await,
        Err(e) => Err(provider_error(provider, e)),
    };
    metrics::track_provider_request(provider, started.elapsed(), result.is_ok());
    result
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(provider, status = %status, body = %body, "Payment provider rejected request");
        return Err(provider_error(provider, status));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| provider_error(provider, e))
}

/// Creates a Stripe PaymentIntent. Amounts are in the currency's minor unit.
#[instrument(skip(http, config))]
pub async fn create_stripe_intent(
    http: &reqwest::Client,
    config: &StripeConfig,
    payment_id: PaymentId,
    amount_cents: i64,
    currency: &str,
) -> Result<ProviderOrder, AppError> {
    let params = [
        ("amount", amount_cents.to_string()),
        ("currency", currency.to_lowercase()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
        ("metadata[payment_id]", payment_id.to_string()),
    ];

    let request = http
        .post(format!("{}/v1/payment_intents", config.api_base))
        .bearer_auth(&config.secret_key)
        .header("Idempotency-Key", payment_id.to_string())
        .form(&params);

    let intent: StripeIntentResponse = send_json("Stripe", request).await?;
    Ok(ProviderOrder {
        order_id: intent.id,
        client_secret: intent.client_secret,
    })
}

/// Creates a Razorpay order; the payment ID travels as the receipt.
#[instrument(skip(http, config))]
pub async fn create_razorpay_order(
    http: &reqwest::Client,
    config: &RazorpayConfig,
    payment_id: PaymentId,
    amount_cents: i64,
    currency: &str,
) -> Result<ProviderOrder, AppError> {
    let request = http
        .post(format!("{}/v1/orders", config.api_base))
        .basic_auth(&config.key_id, Some(&config.key_secret))
        .json(&json!({
            "amount": amount_cents,
            "currency": currency.to_uppercase(),
            "receipt": payment_id.to_string(),
            "notes": { "payment_id": payment_id.to_string() },
        }));

    let order: RazorpayOrderResponse = send_json("Razorpay", request).await?;
    Ok(ProviderOrder {
        order_id: order.id,
        client_secret: None,
    })
}

/// What a webhook delivery means for our payment rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Succeeded {
        order_id: String,
        provider_payment_id: Option<String>,
    },
    Failed {
        order_id: String,
        reason: String,
    },
    /// Event type we do not act on
    Ignored,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: StripeObject,
}

#[derive(Debug, Deserialize)]
pub struct StripeObject {
    pub id: String,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub last_payment_error: Option<StripeError>,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(default)]
    pub message: Option<String>,
}

impl StripeEvent {
    pub fn outcome(self) -> WebhookOutcome {
        let object = self.data.object;
        match self.kind.as_str() {
            "payment_intent.succeeded" => WebhookOutcome::Succeeded {
                order_id: object.id,
                provider_payment_id: object.latest_charge,
            },
            "payment_intent.payment_failed" => WebhookOutcome::Failed {
                order_id: object.id,
                reason: object
                    .last_payment_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Payment failed".to_string()),
            },
            _ => WebhookOutcome::Ignored,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RazorpayEvent {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct RazorpayPayload {
    pub payment: Option<Entity<RazorpayPayment>>,
    pub order: Option<Entity<RazorpayOrder>>,
}

#[derive(Debug, Deserialize)]
pub struct Entity<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
}

impl RazorpayEvent {
    pub fn outcome(self) -> WebhookOutcome {
        let payment = self.payload.payment.map(|p| p.entity);
        let order_id = self
            .payload
            .order
            .map(|o| o.entity.id)
            .or_else(|| payment.as_ref().and_then(|p| p.order_id.clone()));

        let Some(order_id) = order_id else {
            return WebhookOutcome::Ignored;
        };

        match self.event.as_str() {
            "payment.captured" | "order.paid" => WebhookOutcome::Succeeded {
                order_id,
                provider_payment_id: payment.map(|p| p.id),
            },
            "payment.failed" => WebhookOutcome::Failed {
                order_id,
                reason: payment
                    .and_then(|p| p.error_description)
                    .unwrap_or_else(|| "Payment failed".to_string()),
            },
            _ => WebhookOutcome::Ignored,
        }
    }
}
