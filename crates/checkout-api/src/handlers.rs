//! # Request Handlers
//!
//! Axum request handlers for the checkout API, the RazorPay redirect and
//! callback endpoints, and the storefront landing pages.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Json,
};
use checkout_core::{
    Basket, BasketLine, Currency, Money, Order, PaymentError, PaymentProcessor,
    TransactionParameters,
};
use checkout_razorpay::signature::{PAYMENT_ID_PARAM, PAYMENT_LINK_ID_PARAM, PAYMENT_LINK_STATUS_PARAM};
use checkout_razorpay::Payment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

use crate::checkout::RefundOutcome;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBasketRequest {
    /// ISO 4217 code, defaults to INR
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub lines: Vec<BasketLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct BasketLineRequest {
    pub product_id: String,
    pub title: String,
    /// Decimal unit price, tax included (e.g. 499.00)
    pub unit_price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundOrderRequest {
    /// Decimal amount; the remaining balance when omitted
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "razorpay-checkout",
        "version": env!("CARGO_PKG_VERSION"),
        "processor": state.razorpay.name(),
        "test_mode": state.razorpay.config().is_test_mode(),
    }))
}

/// Create a priced basket
#[instrument(skip(state, request), fields(lines = request.lines.len()))]
pub async fn create_basket(
    State(state): State<AppState>,
    Json(request): Json<CreateBasketRequest>,
) -> Result<(StatusCode, Json<Basket>), ApiError> {
    let currency: Currency = match request.currency.as_deref() {
        Some(code) => code.parse().map_err(payment_error_to_response)?,
        None => Currency::default(),
    };

    let lines = request
        .lines
        .into_iter()
        .map(|line| {
            let unit_price = Money::try_new(line.unit_price, currency)?;
            Ok(BasketLine::new(line.product_id, line.title, unit_price, line.quantity))
        })
        .collect::<Result<Vec<_>, PaymentError>>()
        .map_err(payment_error_to_response)?;

    let basket = state
        .checkout
        .create_basket(currency, request.owner, lines)
        .await
        .map_err(payment_error_to_response)?;

    Ok((StatusCode::CREATED, Json(basket)))
}

pub async fn get_basket(
    State(state): State<AppState>,
    Path(basket_id): Path<u64>,
) -> Result<Json<Basket>, ApiError> {
    let basket = state
        .checkout
        .basket(basket_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(basket))
}

/// Start checkout: freeze the basket and create the hosted payment page
#[instrument(skip(state))]
pub async fn begin_checkout(
    State(state): State<AppState>,
    Path(basket_id): Path<u64>,
) -> Result<Json<TransactionParameters>, ApiError> {
    let params = state
        .checkout
        .begin_checkout(basket_id)
        .await
        .map_err(|e| {
            error!("Failed to create RazorPay transaction for basket [{}]: {}", basket_id, e);
            payment_error_to_response(e)
        })?;

    Ok(Json(params))
}

/// Forward the customer to the hosted payment page (GET and POST)
#[instrument(skip(state, params))]
pub async fn razorpay_redirect(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    let Some(redirect_url) = params.get("redirect_url") else {
        warn!("RazorPay redirect requested without redirect_url");
        return Redirect::to(&state.razorpay.error_url());
    };

    let basket_id = params.get("ecommerce_basket_id").map(String::as_str);
    match state.razorpay.hosted_page_redirect(redirect_url, basket_id) {
        Ok(target) => Redirect::to(&target),
        Err(e) => {
            warn!("Refusing RazorPay redirect: {}", e);
            Redirect::to(&state.razorpay.error_url())
        }
    }
}

/// Customer returning from the hosted payment page
#[instrument(skip(state, params))]
pub async fn razorpay_callback(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    let payment_id = params.get(PAYMENT_ID_PARAM).map(String::as_str);
    let status = params.get(PAYMENT_LINK_STATUS_PARAM).map(String::as_str);
    info!(
        "Payment [{}] is [{}]",
        payment_id.unwrap_or("unknown"),
        status.unwrap_or("unknown")
    );

    let Some(payment_link_id) = params.get(PAYMENT_LINK_ID_PARAM) else {
        warn!("RazorPay callback without {}", PAYMENT_LINK_ID_PARAM);
        return Redirect::to(&state.razorpay.error_url());
    };

    let outcome = state.checkout.execute_callback(payment_link_id, &params).await;
    Redirect::to(outcome.redirect_url())
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .orders
        .get(&order_number)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(order))
}

/// Refund an order through RazorPay
#[instrument(skip(state, request))]
pub async fn refund_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Json(request): Json<RefundOrderRequest>,
) -> Result<Json<RefundOutcome>, ApiError> {
    let amount = match request.amount {
        Some(amount) => {
            let order = state
                .orders
                .get(&order_number)
                .await
                .map_err(payment_error_to_response)?;
            Some(Money::try_new(amount, order.total.currency).map_err(payment_error_to_response)?)
        }
        None => None,
    };

    let outcome = state
        .checkout
        .refund(&order_number, amount)
        .await
        .map_err(|e| {
            error!("Refund for order [{}] failed: {}", order_number, e);
            payment_error_to_response(e)
        })?;

    info!(
        "Refund [{}] issued for order [{}]",
        outcome.refund_id, outcome.order_number
    );
    Ok(Json(outcome))
}

/// Payment details as RazorPay reports them
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .razorpay
        .fetch_payment_details(&payment_id)
        .await
        .map_err(payment_error_to_response)?;
    Ok(Json(payment))
}

/// Receipt page
pub async fn receipt_page(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let order_number = params
        .get("order_number")
        .map(|s| s.as_str())
        .unwrap_or("unknown");
    Html(format!(r#"
<!DOCTYPE html>
<html>
<head><title>Order Receipt</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <div style="font-size: 60px;">✅</div>
        <h1>Thank you for your order!</h1>
        <p>Order: <code>{}</code></p>
        <p style="color: #666;">A receipt has been sent to your email.</p>
    </div>
</body>
</html>
"#, html_escape(order_number)))
}

/// Payment error page
pub async fn error_page() -> impl IntoResponse {
    Html(r#"
<!DOCTYPE html>
<html>
<head><title>Payment Failed</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <div style="font-size: 60px;">⚠️</div>
        <h1>Payment Failed</h1>
        <p style="color: #666;">Your payment could not be processed. No order was placed.</p>
    </div>
</body>
</html>
"#)
}

/// Checkout cancel page
pub async fn cancel_page() -> impl IntoResponse {
    Html(r#"
<!DOCTYPE html>
<html>
<head><title>Checkout Cancelled</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);">
    <div style="background: white; padding: 60px; border-radius: 16px; text-align: center;">
        <div style="font-size: 60px;">❌</div>
        <h1>Checkout Cancelled</h1>
        <p style="color: #666;">No charges were made.</p>
    </div>
</body>
</html>
"#)
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
