//! # Routes
//!
//! Axum router configuration for the checkout service.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use checkout_core::PaymentProcessor;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - API:
///   - POST /api/v1/baskets - Create a basket
///   - GET  /api/v1/baskets/{basket_id} - Get a basket
///   - POST /api/v1/baskets/{basket_id}/checkout - Create the RazorPay payment page
///   - GET  /api/v1/orders/{order_number} - Get an order
///   - POST /api/v1/orders/{order_number}/refund - Refund an order
///   - GET  /api/v1/payments/{payment_id} - RazorPay payment details
///
/// - Processor handlers:
///   - GET/POST /payment/razorpay/handlers/redirect/ - Forward to the hosted page
///   - GET      /payment/razorpay/handlers/callback/ - Customer return from RazorPay
///
/// - Static pages:
///   - GET /checkout/receipt/ - Receipt page
///   - GET /checkout/error/ - Payment error page
///   - GET /checkout/cancel-checkout/ - Cancel page
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let checkout_routes = Router::new()
        .route("/receipt/", get(handlers::receipt_page))
        .route("/error/", get(handlers::error_page))
        .route("/cancel-checkout/", get(handlers::cancel_page));

    let api_routes = Router::new()
        .route("/baskets", post(handlers::create_basket))
        .route("/baskets/{basket_id}", get(handlers::get_basket))
        .route("/baskets/{basket_id}/checkout", post(handlers::begin_checkout))
        .route("/orders/{order_number}", get(handlers::get_order))
        .route("/orders/{order_number}/refund", post(handlers::refund_order))
        .route("/payments/{payment_id}", get(handlers::get_payment));

    let redirect_path = state.razorpay.redirect_path();
    let callback_path = state.razorpay.callback_path();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .route(
            &redirect_path,
            get(handlers::razorpay_redirect).post(handlers::razorpay_redirect),
        )
        .route(&callback_path, get(handlers::razorpay_callback))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
