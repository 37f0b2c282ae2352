//! Payment provider credentials.
//!
//! A provider is considered configured only when its secret key is present.
//! Webhook secrets are optional; without one the matching webhook endpoint
//! rejects every delivery.

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub stripe: Option<StripeConfig>,
    pub razorpay: Option<RazorpayConfig>,
    /// Maximum age in seconds of a signed Stripe webhook timestamp.
    pub webhook_tolerance_secs: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe: None,
            razorpay: None,
            webhook_tolerance_secs: 300,
        }
    }
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        let stripe = crate::env_opt("STRIPE_SECRET_KEY").map(|secret_key| StripeConfig {
            secret_key,
            webhook_secret: crate::env_opt("STRIPE_WEBHOOK_SECRET"),
            api_base: crate::env_opt("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".to_string()),
        });

        let razorpay = match (
            crate::env_opt("RAZORPAY_KEY_ID"),
            crate::env_opt("RAZORPAY_KEY_SECRET"),
        ) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayConfig {
                key_id,
                key_secret,
                webhook_secret: crate::env_opt("RAZORPAY_WEBHOOK_SECRET"),
                api_base: crate::env_opt("RAZORPAY_API_BASE")
                    .unwrap_or_else(|| "https://api.razorpay.com".to_string()),
            }),
            _ => None,
        };

        Self {
            stripe,
            razorpay,
            webhook_tolerance_secs: crate::env_or("PAYMENT_WEBHOOK_TOLERANCE_SECS", 300),
        }
    }
}
