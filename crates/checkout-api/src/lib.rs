//! # checkout-api
//!
//! HTTP layer for razorpay-checkout-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - `CheckoutService`, which turns RazorPay callbacks into orders
//! - Redirect and callback handlers for the hosted payment page
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/baskets` | Create basket |
//! | POST | `/api/v1/baskets/{id}/checkout` | Create payment link |
//! | GET, POST | `/payment/razorpay/handlers/redirect/` | Forward to RazorPay |
//! | GET | `/payment/razorpay/handlers/callback/` | RazorPay callback |
//! | POST | `/api/v1/orders/{number}/refund` | Refund order |

pub mod checkout;
pub mod handlers;
pub mod routes;
pub mod state;

pub use checkout::{CallbackOutcome, CheckoutService, RefundOutcome};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
