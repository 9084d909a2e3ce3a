//! # Payment Error Types
//!
//! Typed error handling for the checkout engine.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Zero, negative or otherwise unusable amount
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Currency not supported
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// The gateway reported (or implied) a failed payment
    #[error("Gateway error: {0}")]
    GatewayError(String),

    /// Callback signature did not match the expected digest
    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// Callback arrived with a status other than paid
    #[error("Payment not completed: status={status}")]
    PaymentNotCompleted { status: String },

    /// Basket does not exist
    #[error("Basket not found: {basket_id}")]
    BasketNotFound { basket_id: u64 },

    /// No recorded transaction matches the id
    #[error("Transaction not found: {transaction_id}")]
    TransactionNotFound { transaction_id: String },

    /// More than one recorded transaction matches the id
    #[error("Duplicate transaction {transaction_id}: {count} matching records")]
    DuplicateTransaction { transaction_id: String, count: usize },

    /// Order does not exist
    #[error("Order not found: {order_number}")]
    OrderNotFound { order_number: String },

    /// An order with this number was already placed
    #[error("Order already placed: {order_number}")]
    OrderAlreadyPlaced { order_number: String },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::RateLimited { .. }
                | PaymentError::ProviderError { .. }
        )
    }

    /// Hard payment failures: the customer is sent to the error page
    /// and no order is placed.
    pub fn is_payment_failure(&self) -> bool {
        matches!(
            self,
            PaymentError::GatewayError(_)
                | PaymentError::SignatureVerificationFailed(_)
                | PaymentError::PaymentNotCompleted { .. }
        )
    }

    /// Lookup failures while resolving a callback back to its basket
    pub fn is_recoverable_lookup(&self) -> bool {
        matches!(
            self,
            PaymentError::TransactionNotFound { .. }
                | PaymentError::DuplicateTransaction { .. }
                | PaymentError::BasketNotFound { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::UnsupportedCurrency { .. } => 400,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::RateLimited { .. } => 429,
            PaymentError::GatewayError(_) => 402,
            PaymentError::SignatureVerificationFailed(_) => 401,
            PaymentError::PaymentNotCompleted { .. } => 402,
            PaymentError::BasketNotFound { .. } => 404,
            PaymentError::TransactionNotFound { .. } => 404,
            PaymentError::DuplicateTransaction { .. } => 409,
            PaymentError::OrderNotFound { .. } => 404,
            PaymentError::OrderAlreadyPlaced { .. } => 409,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
