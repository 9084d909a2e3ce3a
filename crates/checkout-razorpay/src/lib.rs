//! # checkout-razorpay
//!
//! RazorPay payment processor for razorpay-checkout-rs.
//!
//! Customers pay on a RazorPay hosted page created through the Payment
//! Links API. RazorPay then redirects them back with a signed callback,
//! which is verified before the order is placed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use checkout_razorpay::RazorPay;
//! use checkout_core::{InMemoryProcessorResponseStore, PaymentProcessor, Site};
//!
//! let site = Site::new("edx", "edX", "https://shop.example.com");
//! let responses = Arc::new(InMemoryProcessorResponseStore::new());
//! let razorpay = RazorPay::from_env(site, responses)?;
//!
//! // Create the hosted page
//! let params = razorpay.get_transaction_parameters(&basket).await?;
//! // Redirect the customer to params.payment_page_url
//!
//! // Later, in the callback handler:
//! let handled = razorpay.handle_processor_response(&query_params, &basket).await?;
//! ```

pub mod client;
pub mod config;
pub mod processor;
pub mod signature;

// Re-exports
pub use client::{ApiResponse, Payment, PaymentLink, RazorPayClient, Refund};
pub use config::RazorPayConfig;
pub use processor::RazorPay;
pub use signature::{compute_signature, PaymentLinkCallback};
