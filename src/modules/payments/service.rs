use abroadly_config::PaymentConfig;
use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{PaymentId, UserId};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::metrics;
use crate::modules::payments::gateway::{
    self, ProviderOrder, RazorpayEvent, StripeEvent, WebhookOutcome,
};
use crate::modules::payments::model::{
    CheckoutRequest, CheckoutResponse, PAYMENT_COLUMNS, PaginatedPaymentsResponse, Payment,
    PaymentFilterParams, PaymentProvider, PaymentPurpose, PaymentStatus, RazorpayVerifyRequest,
};
use crate::modules::payments::signature;

/// Amount owed for a checkout, always read from our own records.
#[derive(Debug, sqlx::FromRow)]
struct Payable {
    owner_id: UserId,
    is_pending: bool,
    amount_cents: i64,
    currency: String,
}

fn not_configured(provider: PaymentProvider) -> AppError {
    AppError::service_unavailable(format!(
        "Payment provider '{}' is not configured",
        provider.as_str()
    ))
}

pub struct PaymentService;

impl PaymentService {
    async fn payable(
        db: &PgPool,
        purpose: PaymentPurpose,
        reference_id: Uuid,
    ) -> Result<Payable, AppError> {
        let (query, missing) = match purpose {
            PaymentPurpose::CourseEnrollment => (
                "SELECT e.user_id AS owner_id,
                        e.status = 'pending_payment' AS is_pending,
                        c.fee_cents AS amount_cents, c.currency
                 FROM enrollments e
                 JOIN courses c ON c.id = e.course_id
                 WHERE e.id = $1",
                "Enrollment not found",
            ),
            PaymentPurpose::Appointment => (
                "SELECT student_id AS owner_id,
                        status = 'pending' AS is_pending,
                        fee_cents AS amount_cents, currency
                 FROM appointments
                 WHERE id = $1",
                "Appointment not found",
            ),
        };

        sqlx::query_as::<_, Payable>(query)
            .bind(reference_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!(missing)))
    }

    /// Opens a provider order for a pending enrollment or appointment owned
    /// by `user_id`.
    #[instrument(
        skip(db, http, config, req),
        fields(purpose = ?req.purpose, provider = req.provider.as_str())
    )]
    pub async fn checkout(
        db: &PgPool,
        http: &reqwest::Client,
        config: &PaymentConfig,
        user_id: UserId,
        req: CheckoutRequest,
    ) -> Result<CheckoutResponse, AppError> {
        match req.provider {
            PaymentProvider::Stripe if config.stripe.is_none() => {
                return Err(not_configured(req.provider));
            }
            PaymentProvider::Razorpay if config.razorpay.is_none() => {
                return Err(not_configured(req.provider));
            }
            _ => {}
        }

        let payable = Self::payable(db, req.purpose, req.reference_id).await?;
        if payable.owner_id != user_id {
            return Err(AppError::forbidden("You can only pay for your own bookings"));
        }
        if !payable.is_pending || payable.amount_cents <= 0 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Nothing to pay for this item"
            )));
        }

        let payment_id = sqlx::query_scalar::<_, PaymentId>(
            r#"
            INSERT INTO payments (user_id, purpose, reference_id, provider, amount_cents, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(req.purpose)
        .bind(req.reference_id)
        .bind(req.provider)
        .bind(payable.amount_cents)
        .bind(&payable.currency)
        .fetch_one(db)
        .await?;

        let order = match (req.provider, &config.stripe, &config.razorpay) {
            (PaymentProvider::Stripe, Some(stripe), _) => {
                gateway::create_stripe_intent(
                    http,
                    stripe,
                    payment_id,
                    payable.amount_cents,
                    &payable.currency,
                )
                .await
            }
            (PaymentProvider::Razorpay, _, Some(razorpay)) => {
                gateway::create_razorpay_order(
                    http,
                    razorpay,
                    payment_id,
                    payable.amount_cents,
                    &payable.currency,
                )
                .await
            }
            _ => Err(not_configured(req.provider)),
        };

        let ProviderOrder {
            order_id,
            client_secret,
        } = match order {
            Ok(order) => order,
            Err(e) => {
                Self::record_failure(db, payment_id, &e.error.to_string()).await?;
                return Err(e);
            }
        };

        sqlx::query("UPDATE payments SET provider_order_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(payment_id)
            .bind(&order_id)
            .execute(db)
            .await?;

        metrics::track_payment(req.provider.as_str(), "created");
        info!(payment_id = %payment_id, order_id = %order_id, "Checkout opened");

        Ok(CheckoutResponse {
            payment_id,
            provider: req.provider,
            provider_order_id: order_id,
            client_secret,
            key_id: config
                .razorpay
                .as_ref()
                .filter(|_| req.provider == PaymentProvider::Razorpay)
                .map(|r| r.key_id.clone()),
            amount_cents: payable.amount_cents,
            currency: payable.currency,
        })
    }

    async fn find_by_order(
        db: &PgPool,
        provider: PaymentProvider,
        order_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider = $1 AND provider_order_id = $2"
        ))
        .bind(provider)
        .bind(order_id)
        .fetch_optional(db)
        .await?;

        Ok(payment)
    }

    /// Marks a payment succeeded and unlocks what it paid for. Returns the
    /// payment and whether this call did the work; repeated deliveries are
    /// no-ops.
    #[instrument(skip(db))]
    pub async fn fulfil(
        db: &PgPool,
        payment_id: PaymentId,
        provider_payment_id: Option<&str>,
    ) -> Result<(Payment, bool), AppError> {
        let mut tx = db.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Payment not found")))?;

        if matches!(payment.status, PaymentStatus::Succeeded | PaymentStatus::Refunded) {
            tx.rollback().await?;
            return Ok((payment, false));
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments
             SET status = 'succeeded',
                 provider_payment_id = COALESCE($2, provider_payment_id),
                 failure_reason = NULL,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(payment_id)
        .bind(provider_payment_id)
        .fetch_one(&mut *tx)
        .await?;

        let unlock = match payment.purpose {
            PaymentPurpose::CourseEnrollment => {
                "UPDATE enrollments SET status = 'active', updated_at = NOW()
                 WHERE id = $1 AND status = 'pending_payment'"
            }
            PaymentPurpose::Appointment => {
                "UPDATE appointments SET status = 'confirmed', updated_at = NOW()
                 WHERE id = $1 AND status = 'pending'"
            }
        };
        let unlocked = sqlx::query(unlock)
            .bind(payment.reference_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        metrics::track_payment(payment.provider.as_str(), "succeeded");
        info!(
            payment_id = %payment.id,
            reference_id = %payment.reference_id,
            unlocked,
            "Payment fulfilled"
        );
        Ok((payment, true))
    }

    async fn record_failure(
        db: &PgPool,
        payment_id: PaymentId,
        reason: &str,
    ) -> Result<(), AppError> {
        let updated = sqlx::query_scalar::<_, PaymentProvider>(
            "UPDATE payments
             SET status = 'failed', failure_reason = $2, updated_at = NOW()
             WHERE id = $1 AND status = 'created'
             RETURNING provider",
        )
        .bind(payment_id)
        .bind(reason)
        .fetch_optional(db)
        .await?;

        if let Some(provider) = updated {
            metrics::track_payment(provider.as_str(), "failed");
            warn!(payment_id = %payment_id, reason, "Payment failed");
        }
        Ok(())
    }

    async fn apply_outcome(
        db: &PgPool,
        provider: PaymentProvider,
        outcome: WebhookOutcome,
    ) -> Result<(), AppError> {
        let (order_id, result) = match outcome {
            WebhookOutcome::Ignored => return Ok(()),
            WebhookOutcome::Succeeded {
                order_id,
                provider_payment_id,
            } => (order_id, Ok(provider_payment_id)),
            WebhookOutcome::Failed { order_id, reason } => (order_id, Err(reason)),
        };

        let Some(payment) = Self::find_by_order(db, provider, &order_id).await? else {
            warn!(provider = provider.as_str(), order_id = %order_id, "Webhook for unknown order");
            return Ok(());
        };

        match result {
            Ok(provider_payment_id) => {
                Self::fulfil(db, payment.id, provider_payment_id.as_deref()).await?;
            }
            Err(reason) => Self::record_failure(db, payment.id, &reason).await?,
        }
        Ok(())
    }

    /// Client-side Razorpay confirmation.
    #[instrument(skip(db, config, req), fields(order_id = %req.razorpay_order_id))]
    pub async fn verify_razorpay(
        db: &PgPool,
        config: &PaymentConfig,
        user_id: UserId,
        req: RazorpayVerifyRequest,
    ) -> Result<Payment, AppError> {
        let razorpay = config
            .razorpay
            .as_ref()
            .ok_or_else(|| not_configured(PaymentProvider::Razorpay))?;

        signature::verify_razorpay_payment(
            &razorpay.key_secret,
            &req.razorpay_order_id,
            &req.razorpay_payment_id,
            &req.razorpay_signature,
        )
        .map_err(|_| AppError::bad_request(anyhow::anyhow!("Invalid payment signature")))?;

        let payment = Self::find_by_order(db, PaymentProvider::Razorpay, &req.razorpay_order_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Payment not found")))?;

        let (payment, _) = Self::fulfil(db, payment.id, Some(&req.razorpay_payment_id)).await?;
        Ok(payment)
    }

    #[instrument(skip_all)]
    pub async fn handle_stripe_webhook(
        db: &PgPool,
        config: &PaymentConfig,
        signature_header: Option<&str>,
        body: &[u8],
    ) -> Result<(), AppError> {
        let secret = config
            .stripe
            .as_ref()
            .and_then(|s| s.webhook_secret.as_deref())
            .ok_or_else(|| not_configured(PaymentProvider::Stripe))?;
        let header = signature_header.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!("Missing Stripe-Signature header"))
        })?;

        signature::verify_stripe(
            header,
            body,
            secret,
            config.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )
        .map_err(|e| AppError::bad_request(anyhow::anyhow!(e.message())))?;

        let event: StripeEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid event payload: {e}")))?;
        info!(event = %event.kind, "Stripe webhook received");

        Self::apply_outcome(db, PaymentProvider::Stripe, event.outcome()).await
    }

    #[instrument(skip_all)]
    pub async fn handle_razorpay_webhook(
        db: &PgPool,
        config: &PaymentConfig,
        signature_header: Option<&str>,
        body: &[u8],
    ) -> Result<(), AppError> {
        let secret = config
            .razorpay
            .as_ref()
            .and_then(|r| r.webhook_secret.as_deref())
            .ok_or_else(|| not_configured(PaymentProvider::Razorpay))?;
        let header = signature_header.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!("Missing X-Razorpay-Signature header"))
        })?;

        signature::verify_razorpay_webhook(secret, body, header)
            .map_err(|e| AppError::bad_request(anyhow::anyhow!(e.message())))?;

        let event: RazorpayEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid event payload: {e}")))?;
        info!(event = %event.event, "Razorpay webhook received");

        Self::apply_outcome(db, PaymentProvider::Razorpay, event.outcome()).await
    }

    #[instrument(skip(db))]
    pub async fn list_for_user(db: &PgPool, user_id: UserId) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(payments)
    }

    #[instrument(skip(db))]
    pub async fn list_payments(
        db: &PgPool,
        filters: PaymentFilterParams,
    ) -> Result<PaginatedPaymentsResponse, AppError> {
        let where_clause = r#"
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::payment_status IS NULL OR status = $2)
              AND ($3::payment_provider IS NULL OR provider = $3)
              AND ($4::payment_purpose IS NULL OR purpose = $4)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM payments {where_clause}"
        ))
        .bind(filters.user_id)
        .bind(filters.status)
        .bind(filters.provider)
        .bind(filters.purpose)
        .fetch_one(db)
        .await?;

        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments {where_clause}
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(filters.user_id)
        .bind(filters.status)
        .bind(filters.provider)
        .bind(filters.purpose)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedPaymentsResponse {
            data: payments,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }
}
