//! # checkout-core
//!
//! Core types and traits for the razorpay-checkout payment service.
//!
//! This crate provides:
//! - `PaymentProcessor` trait for implementing payment gateways
//! - `Basket` and `BasketStore` for the checkout flow
//! - `ProcessorResponseStore`, the ledger of gateway payloads
//! - `OrderPipeline`, the order placement collaborator
//! - `Site` and `SiteRegistry` for storefront URLs
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use checkout_core::{Basket, BasketLine, Currency, Money, PaymentProcessor};
//!
//! let mut basket = Basket::new(1, "edx", "EDX", Currency::INR);
//! basket.add_line(BasketLine::new("course", "Course", Money::new(499.0, Currency::INR), 1))?;
//! basket.freeze()?;
//!
//! // Send the customer to the hosted payment page
//! let params = processor.get_transaction_parameters(&basket).await?;
//! // redirect to params.payment_page_url
//! ```

pub mod basket;
pub mod error;
pub mod ledger;
pub mod money;
pub mod order;
pub mod processor;
pub mod site;

// Re-exports for convenience
pub use basket::{order_number_for, Basket, BasketLine, BasketStatus, BasketStore, InMemoryBasketStore};
pub use error::{PaymentError, PaymentResult};
pub use ledger::{InMemoryProcessorResponseStore, ProcessorResponseEntry, ProcessorResponseStore};
pub use money::{Currency, Money};
pub use order::{InMemoryOrderPipeline, Order, OrderPipeline, OrderStatus, PaymentSource};
pub use processor::{
    BoxedPaymentProcessor, HandledProcessorResponse, PaymentProcessor, ProcessorResponse,
    ProcessorSelector, TransactionParameters,
};
pub use site::{Site, SiteRegistry};
