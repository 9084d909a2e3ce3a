//! # Callback Signature Verification
//!
//! After the hosted page completes, RazorPay redirects the customer to
//! the callback URL with these query parameters:
//!
//! ```text
//! razorpay_payment_id=pay_...
//! razorpay_payment_link_id=plink_...
//! razorpay_payment_link_reference_id=...
//! razorpay_payment_link_status=paid
//! razorpay_signature=<hex hmac-sha256>
//! ```
//!
//! The signature is HMAC-SHA256, keyed with the API key secret, over
//! `link_id|reference_id|status|payment_id`.

use checkout_core::{PaymentError, PaymentResult, ProcessorResponse};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Link status reported for a completed payment
pub const PAYMENT_LINK_PAID: &str = "paid";

pub const PAYMENT_ID_PARAM: &str = "razorpay_payment_id";
pub const PAYMENT_LINK_ID_PARAM: &str = "razorpay_payment_link_id";
pub const PAYMENT_LINK_REFERENCE_ID_PARAM: &str = "razorpay_payment_link_reference_id";
pub const PAYMENT_LINK_STATUS_PARAM: &str = "razorpay_payment_link_status";
pub const SIGNATURE_PARAM: &str = "razorpay_signature";

type HmacSha256 = Hmac<Sha256>;

/// Signed fields of a payment link callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkCallback {
    pub payment_id: String,
    pub payment_link_id: String,
    pub payment_link_reference_id: String,
    pub payment_link_status: String,
    pub signature: String,
}

impl PaymentLinkCallback {
    /// Extract the callback fields. A missing reference id is treated as
    /// empty, which is what RazorPay signs when the link has none.
    pub fn from_params(params: &ProcessorResponse) -> PaymentResult<Self> {
        let required = |key: &str| {
            params
                .get(key)
                .cloned()
                .ok_or_else(|| PaymentError::GatewayError(format!("Callback is missing {}", key)))
        };

        Ok(Self {
            payment_id: required(PAYMENT_ID_PARAM)?,
            payment_link_id: required(PAYMENT_LINK_ID_PARAM)?,
            payment_link_reference_id: params
                .get(PAYMENT_LINK_REFERENCE_ID_PARAM)
                .cloned()
                .unwrap_or_default(),
            payment_link_status: required(PAYMENT_LINK_STATUS_PARAM)?,
            signature: required(SIGNATURE_PARAM)?,
        })
    }

    /// The string RazorPay signs
    pub fn signed_message(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.payment_link_id,
            self.payment_link_reference_id,
            self.payment_link_status,
            self.payment_id
        )
    }

    pub fn is_paid(&self) -> bool {
        self.payment_link_status == PAYMENT_LINK_PAID
    }

    /// Check the signature, then the status. Either failing is a hard
    /// payment failure.
    pub fn verify(&self, key_secret: &str) -> PaymentResult<()> {
        let expected = compute_signature(key_secret, &self.signed_message())?;
        if !constant_time_compare(&expected, &self.signature) {
            return Err(PaymentError::SignatureVerificationFailed(format!(
                "Signature mismatch for payment {}",
                self.payment_id
            )));
        }

        if !self.is_paid() {
            return Err(PaymentError::PaymentNotCompleted {
                status: self.payment_link_status.clone(),
            });
        }

        Ok(())
    }
}

/// Lowercase hex HMAC-SHA256 of `message` keyed with `secret`
pub fn compute_signature(secret: &str, message: &str) -> PaymentResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
