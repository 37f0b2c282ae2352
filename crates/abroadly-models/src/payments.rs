//! Payment records and checkout DTOs.

use abroadly_core::serde::deserialize_optional_uuid;
use abroadly_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{PaymentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "payment_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    CourseEnrollment,
    Appointment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "payment_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Razorpay,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Razorpay => "razorpay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Succeeded,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub purpose: PaymentPurpose,
    /// Enrollment ID or appointment ID, depending on `purpose`
    pub reference_id: Uuid,
    pub provider: PaymentProvider,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider_order_id: Option<String>,
    pub provider_payment_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PAYMENT_COLUMNS: &str = "id, user_id, purpose, reference_id, provider, amount_cents, \
     currency, status, provider_order_id, provider_payment_id, failure_reason, created_at, \
     updated_at";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub purpose: PaymentPurpose,
    pub reference_id: Uuid,
    pub provider: PaymentProvider,
}

/// What the client needs to open the provider's payment sheet.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub payment_id: PaymentId,
    pub provider: PaymentProvider,
    /// Stripe PaymentIntent ID or Razorpay order ID
    pub provider_order_id: String,
    /// Stripe only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Razorpay only: public key for the checkout widget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RazorpayVerifyRequest {
    #[validate(length(min = 1))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1))]
    pub razorpay_signature: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct PaymentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub user_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub provider: Option<PaymentProvider>,
    pub purpose: Option<PaymentPurpose>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedPaymentsResponse {
    pub data: Vec<Payment>,
    pub meta: PaginationMeta,
}
