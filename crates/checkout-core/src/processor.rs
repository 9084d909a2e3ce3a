//! # Payment Processor Trait
//!
//! The seam between the checkout flow and a payment gateway.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PaymentProcessor (trait)                    │
//! │  ├── get_transaction_parameters()   create hosted page      │
//! │  ├── handle_processor_response()    verify the callback     │
//! │  └── issue_credit()                 refund                  │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │   RazorPay    │
//!                    └───────────────┘
//! ```

use crate::basket::Basket;
use crate::error::PaymentResult;
use crate::money::{Currency, Money};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Raw callback parameters as delivered by the gateway
pub type ProcessorResponse = HashMap<String, String>;

/// What the storefront needs to send the customer to the hosted page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionParameters {
    /// Gateway transaction id recorded for this basket
    pub transaction_id: String,

    /// URL the customer's browser should be sent to
    pub payment_page_url: String,
}

/// A verified, successful payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandledProcessorResponse {
    pub transaction_id: String,
    pub total: Money,
    pub currency: Currency,
    /// Label shown in place of a card number
    pub card_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
}

/// Contract every payment gateway integration fulfils.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Short machine name (used in URLs and ledger entries)
    fn name(&self) -> &'static str;

    /// Human readable name
    fn title(&self) -> &'static str;

    /// Create a hosted-payment transaction for the basket.
    async fn get_transaction_parameters(
        &self,
        basket: &Basket,
    ) -> PaymentResult<TransactionParameters>;

    /// Verify the gateway callback for the basket.
    ///
    /// Returns a payment-failure error (see
    /// [`PaymentError::is_payment_failure`](crate::PaymentError::is_payment_failure))
    /// when the payment did not go through.
    async fn handle_processor_response(
        &self,
        response: &ProcessorResponse,
        basket: &Basket,
    ) -> PaymentResult<HandledProcessorResponse>;

    /// Refund `amount` of the payment identified by `reference_number`.
    /// Returns the gateway's refund id.
    async fn issue_credit(
        &self,
        order_number: &str,
        basket: &Basket,
        reference_number: &str,
        amount: Money,
    ) -> PaymentResult<String>;

    /// Page shown when a payment fails
    fn error_url(&self) -> String;

    /// Page shown when the customer abandons checkout
    fn cancel_url(&self) -> String;

    fn callback_path(&self) -> String {
        format!("/payment/{}/handlers/callback/", self.name())
    }

    fn redirect_path(&self) -> String {
        format!("/payment/{}/handlers/redirect/", self.name())
    }
}

/// Type alias for a boxed payment processor (dynamic dispatch)
pub type BoxedPaymentProcessor = Arc<dyn PaymentProcessor>;

/// Registry of configured processors
#[derive(Clone)]
pub struct ProcessorSelector {
    processors: HashMap<String, BoxedPaymentProcessor>,
    default_processor: String,
}

impl ProcessorSelector {
    pub fn new(default_processor: impl Into<String>) -> Self {
        Self {
            processors: HashMap::new(),
            default_processor: default_processor.into(),
        }
    }

    pub fn register(&mut self, processor: BoxedPaymentProcessor) {
        let name = processor.name().to_string();
        self.processors.insert(name, processor);
    }

    /// Register with builder pattern
    pub fn with_processor(mut self, processor: BoxedPaymentProcessor) -> Self {
        self.register(processor);
        self
    }

    pub fn default_processor(&self) -> Option<&BoxedPaymentProcessor> {
        self.processors.get(&self.default_processor)
    }

    pub fn get(&self, name: &str) -> Option<&BoxedPaymentProcessor> {
        self.processors.get(name)
    }

    /// Get processor or fall back to default
    pub fn get_or_default(&self, name: Option<&str>) -> Option<&BoxedPaymentProcessor> {
        match name {
            Some(n) => self.get(n).or_else(|| self.default_processor()),
            None => self.default_processor(),
        }
    }

    pub fn providers(&self) -> Vec<&str> {
        self.processors.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_processor(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }
}
