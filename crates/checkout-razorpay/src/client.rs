//! # RazorPay REST Client
//!
//! Thin client over the RazorPay v1 API: payment links, payments and
//! refunds. Requests authenticate with HTTP basic auth using the key id
//! and key secret.
//!
//! Every call returns the parsed body alongside the raw JSON so the
//! payload can be written to the processor response ledger unchanged.

use crate::config::RazorPayConfig;
use checkout_core::{PaymentError, PaymentResult};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, instrument};

const PROVIDER: &str = "razorpay";

/// Parsed response together with the raw payload
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub body: T,
    pub raw: serde_json::Value,
}

pub struct RazorPayClient {
    config: RazorPayConfig,
    http: Client,
}

impl RazorPayClient {
    pub fn new(config: RazorPayConfig) -> PaymentResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &RazorPayConfig {
        &self.config
    }

    /// Join path segments onto the API base URL. Segments are percent
    /// encoded, so an id can never change the endpoint being called.
    fn url(&self, segments: &[&str]) -> PaymentResult<Url> {
        let mut url = Url::parse(&self.config.api_base_url).map_err(|e| {
            PaymentError::Configuration(format!(
                "Invalid RazorPay API URL {}: {}",
                self.config.api_base_url, e
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PaymentError::Configuration(format!(
                    "RazorPay API URL {} cannot take a path",
                    self.config.api_base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.config.key_id, Some(&self.config.key_secret))
    }

    /// Create a hosted payment link
    #[instrument(skip(self, request), fields(amount = request.amount, currency = %request.currency))]
    pub async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> PaymentResult<ApiResponse<PaymentLink>> {
        let builder = self.authed(self.http.post(self.url(&["v1", "payment_links"])?).json(request));
        self.send(builder).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_payment_link(
        &self,
        payment_link_id: &str,
    ) -> PaymentResult<ApiResponse<PaymentLink>> {
        validate_id(payment_link_id)?;
        let url = self.url(&["v1", "payment_links", payment_link_id])?;
        let builder = self.authed(self.http.get(url));
        self.send(builder).await
    }

    #[instrument(skip(self))]
    pub async fn fetch_payment(&self, payment_id: &str) -> PaymentResult<ApiResponse<Payment>> {
        validate_id(payment_id)?;
        let url = self.url(&["v1", "payments", payment_id])?;
        let builder = self.authed(self.http.get(url));
        self.send(builder).await
    }

    /// Refund a captured payment (fully or partially)
    #[instrument(skip(self, request), fields(amount = request.amount))]
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        request: &RefundRequest,
    ) -> PaymentResult<ApiResponse<Refund>> {
        validate_id(payment_id)?;
        let url = self.url(&["v1", "payments", payment_id, "refund"])?;
        let builder = self.authed(self.http.post(url).json(request));
        self.send(builder).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> PaymentResult<ApiResponse<T>> {
        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("RazorPay API error: status={}, body={}", status, body);
            return Err(api_error(status, &body, retry_after));
        }

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse RazorPay response: {}", e))
        })?;
        let parsed: T = serde_json::from_value(raw.clone()).map_err(|e| {
            PaymentError::Serialization(format!("Unexpected RazorPay response shape: {}", e))
        })?;

        debug!("RazorPay API call succeeded: status={}", status);

        Ok(ApiResponse { body: parsed, raw })
    }
}

/// RazorPay ids look like `pay_29QQoUBi66xm2f`
fn validate_id(id: &str) -> PaymentResult<()> {
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PaymentError::InvalidRequest(format!(
            "Invalid RazorPay id: {}",
            id
        )));
    }
    Ok(())
}

fn api_error(status: StatusCode, body: &str, retry_after: Option<u64>) -> PaymentError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return PaymentError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after_secs: retry_after.unwrap_or(1),
        };
    }

    match serde_json::from_str::<RazorPayErrorResponse>(body) {
        Ok(envelope) => PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("{}: {}", envelope.error.code, envelope.error.description),
        },
        Err(_) => PaymentError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

// =============================================================================
// RazorPay API Types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentLinkRequest {
    /// Amount in the smallest currency unit
    pub amount: i64,
    pub currency: String,
    pub accept_partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_by: Option<i64>,
    pub callback_url: String,
    pub callback_method: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub short_url: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub amount_paid: Option<i64>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub expire_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    /// created, authorized, captured, refunded or failed
    pub status: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub captured: bool,
    #[serde(default)]
    pub amount_refunded: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Payment {
    pub fn is_captured(&self) -> bool {
        self.captured || self.status == "captured"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub amount: i64,
    /// "normal" or "optimum"
    pub speed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub notes: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    /// pending, processed or failed
    pub status: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub speed_processed: Option<String>,
}

impl Refund {
    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

#[derive(Debug, Deserialize)]
struct RazorPayErrorResponse {
    error: RazorPayError,
}

#[derive(Debug, Deserialize)]
struct RazorPayError {
    code: String,
    description: String,
    #[serde(default)]
    #[allow(dead_code)]
    reason: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    field: Option<String>,
}
