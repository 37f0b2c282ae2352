//! Provider signature checks.
//!
//! Comparisons go through [`Mac::verify_slice`], which is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// Header missing parts or not hex
    Malformed,
    /// Timestamp outside the tolerance window
    Expired,
    Mismatch,
}

impl SignatureError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Malformed => "Malformed signature",
            Self::Expired => "Signature timestamp outside tolerance",
            Self::Mismatch => "Invalid signature",
        }
    }
}

fn mac(secret: &str) -> Result<HmacSha256, SignatureError> {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)
}

fn verify_parts(secret: &str, parts: &[&[u8]], signature_hex: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::Malformed)?;
    let mut mac = mac(secret)?;
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Checkout callback: `hex(HMAC(key_secret, "{order_id}|{payment_id}"))`.
pub fn verify_razorpay_payment(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    verify_parts(
        key_secret,
        &[order_id.as_bytes(), b"|", payment_id.as_bytes()],
        signature,
    )
}

/// `X-Razorpay-Signature`: `hex(HMAC(webhook_secret, body))`.
pub fn verify_razorpay_webhook(
    webhook_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), SignatureError> {
    verify_parts(webhook_secret, &[body], signature)
}

/// `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`, signed over
/// `"{t}.{body}"`. Any matching `v1` entry is accepted.
pub fn verify_stripe(
    header: &str,
    body: &[u8],
    webhook_secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for item in header.split(',') {
        match item.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now_unix.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let prefix = format!("{timestamp}.");
    let matched = signatures
        .iter()
        .any(|sig| verify_parts(webhook_secret, &[prefix.as_bytes(), body], sig).is_ok());

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
