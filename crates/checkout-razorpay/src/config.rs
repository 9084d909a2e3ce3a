//! # RazorPay Configuration
//!
//! Configuration management for the RazorPay integration.
//! All secrets are loaded from environment variables.

use checkout_core::PaymentError;
use std::env;

const DEFAULT_API_BASE_URL: &str = "https://api.razorpay.com";

/// Shortest expiry RazorPay accepts for a payment link
pub const MIN_PAYMENT_LINK_EXPIRY_MINUTES: i64 = 15;

/// RazorPay API configuration
#[derive(Debug, Clone)]
pub struct RazorPayConfig {
    /// API key id (rzp_test_... or rzp_live_...)
    pub key_id: String,

    /// API key secret. Also the HMAC key for callback signatures.
    pub key_secret: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// Storefront path shown when the customer abandons checkout
    pub cancel_checkout_path: String,

    /// Storefront path shown when a payment fails
    pub error_path: String,

    /// Payment link lifetime; `None` leaves RazorPay's default
    pub payment_link_expiry_minutes: Option<i64>,

    /// Hosts the redirect handler may send customers to
    pub payment_page_hosts: Vec<String>,

    /// HTTP timeout for API calls
    pub timeout_secs: u64,
}

impl RazorPayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `RAZORPAY_KEY_ID`
    /// - `RAZORPAY_KEY_SECRET`
    ///
    /// Optional: `RAZORPAY_API_BASE_URL`, `RAZORPAY_CANCEL_CHECKOUT_PATH`,
    /// `RAZORPAY_ERROR_PATH`, `RAZORPAY_PAYMENT_LINK_EXPIRY_MINUTES`.
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let key_id = env::var("RAZORPAY_KEY_ID")
            .map_err(|_| PaymentError::Configuration("RAZORPAY_KEY_ID not set".to_string()))?;

        let key_secret = env::var("RAZORPAY_KEY_SECRET").map_err(|_| {
            PaymentError::Configuration("RAZORPAY_KEY_SECRET not set".to_string())
        })?;

        if !key_id.starts_with("rzp_test_") && !key_id.starts_with("rzp_live_") {
            return Err(PaymentError::Configuration(
                "RAZORPAY_KEY_ID must start with rzp_test_ or rzp_live_".to_string(),
            ));
        }

        if key_secret.is_empty() {
            return Err(PaymentError::Configuration(
                "RAZORPAY_KEY_SECRET must not be empty".to_string(),
            ));
        }

        let payment_link_expiry_minutes = match env::var("RAZORPAY_PAYMENT_LINK_EXPIRY_MINUTES") {
            Ok(raw) => {
                let minutes: i64 = raw.parse().map_err(|_| {
                    PaymentError::Configuration(format!(
                        "RAZORPAY_PAYMENT_LINK_EXPIRY_MINUTES is not a number: {}",
                        raw
                    ))
                })?;
                if minutes < MIN_PAYMENT_LINK_EXPIRY_MINUTES {
                    return Err(PaymentError::Configuration(format!(
                        "RAZORPAY_PAYMENT_LINK_EXPIRY_MINUTES must be at least {}",
                        MIN_PAYMENT_LINK_EXPIRY_MINUTES
                    )));
                }
                Some(minutes)
            }
            Err(_) => None,
        };

        let mut config = Self::new(key_id, key_secret);
        if let Ok(url) = env::var("RAZORPAY_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(path) = env::var("RAZORPAY_CANCEL_CHECKOUT_PATH") {
            config.cancel_checkout_path = path;
        }
        if let Ok(path) = env::var("RAZORPAY_ERROR_PATH") {
            config.error_path = path;
        }
        config.payment_link_expiry_minutes = payment_link_expiry_minutes;

        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            cancel_checkout_path: "/checkout/cancel-checkout/".to_string(),
            error_path: "/checkout/error/".to_string(),
            payment_link_expiry_minutes: None,
            payment_page_hosts: vec!["rzp.io".to_string(), "razorpay.com".to_string()],
            timeout_secs: 30,
        }
    }

    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    pub fn is_live_mode(&self) -> bool {
        self.key_id.starts_with("rzp_live_")
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set payment link expiry
    pub fn with_payment_link_expiry(mut self, minutes: i64) -> Self {
        self.payment_link_expiry_minutes = Some(minutes.max(MIN_PAYMENT_LINK_EXPIRY_MINUTES));
        self
    }

    /// True when `host` is one of the hosted payment page domains or a
    /// subdomain of one
    pub fn is_payment_page_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.payment_page_hosts
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{}", allowed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_key_modes() {
        let config = RazorPayConfig::new("rzp_test_abc123", "secret");
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());

        let config = RazorPayConfig::new("rzp_live_abc123", "secret");
        assert!(!config.is_test_mode());
        assert!(config.is_live_mode());
    }

    #[test]
    fn test_defaults() {
        let config = RazorPayConfig::new("rzp_test_abc123", "secret");
        assert_eq!(config.api_base_url, "https://api.razorpay.com");
        assert_eq!(config.error_path, "/checkout/error/");
        assert_eq!(config.cancel_checkout_path, "/checkout/cancel-checkout/");
        assert!(config.payment_link_expiry_minutes.is_none());
    }

    #[test]
    fn test_expiry_is_clamped() {
        let config = RazorPayConfig::new("rzp_test_abc123", "secret").with_payment_link_expiry(5);
        assert_eq!(config.payment_link_expiry_minutes, Some(15));
    }

    #[test]
    fn test_payment_page_hosts() {
        let config = RazorPayConfig::new("rzp_test_abc123", "secret");
        assert!(config.is_payment_page_host("rzp.io"));
        assert!(config.is_payment_page_host("pages.razorpay.com"));
        assert!(config.is_payment_page_host("RZP.IO"));
        assert!(!config.is_payment_page_host("evil-rzp.io"));
        assert!(!config.is_payment_page_host("attacker.example"));
    }

    #[test]
    fn test_from_env_missing_key() {
        env::remove_var("RAZORPAY_KEY_ID");

        let result = RazorPayConfig::from_env();
        assert!(result.is_err());
    }
}
