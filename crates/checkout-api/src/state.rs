//! # Application State
//!
//! Shared state for the Axum application: the RazorPay processor, the
//! checkout service and the stores behind it.

use crate::checkout::CheckoutService;
use checkout_core::{
    BasketStore, BoxedPaymentProcessor, InMemoryBasketStore, InMemoryOrderPipeline,
    InMemoryProcessorResponseStore, OrderPipeline, ProcessorResponseStore, Site, SiteRegistry,
};
use checkout_razorpay::{RazorPay, RazorPayConfig};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public storefront URL, used when no sites file is found
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Order number prefix for the fallback site
    pub order_prefix: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            order_prefix: std::env::var("ORDER_NUMBER_PREFIX").unwrap_or_else(|_| "EDX".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Site used when `config/sites.toml` is absent
    pub fn fallback_site(&self) -> Site {
        Site::new("default", "Storefront", &self.base_url).with_order_prefix(&self.order_prefix)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub razorpay: Arc<RazorPay>,
    pub checkout: Arc<CheckoutService>,
    pub baskets: Arc<dyn BasketStore>,
    pub responses: Arc<dyn ProcessorResponseStore>,
    pub orders: Arc<dyn OrderPipeline>,
}

impl AppState {
    /// Build state from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let registry = load_site_registry()?;
        let site = registry
            .default_site()
            .cloned()
            .unwrap_or_else(|| config.fallback_site());

        let razorpay_config = RazorPayConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize RazorPay: {}", e))?;

        Self::build(config, site, razorpay_config)
    }

    /// Build state with in-memory stores
    pub fn build(
        config: AppConfig,
        site: Site,
        razorpay_config: RazorPayConfig,
    ) -> anyhow::Result<Self> {
        let baskets: Arc<dyn BasketStore> = Arc::new(InMemoryBasketStore::new());
        let responses: Arc<dyn ProcessorResponseStore> =
            Arc::new(InMemoryProcessorResponseStore::new());
        let orders: Arc<dyn OrderPipeline> = Arc::new(InMemoryOrderPipeline::new());

        let razorpay = Arc::new(
            RazorPay::new(razorpay_config, site.clone(), responses.clone())
                .map_err(|e| anyhow::anyhow!("Failed to initialize RazorPay: {}", e))?,
        );
        let processor: BoxedPaymentProcessor = razorpay.clone();

        let checkout = Arc::new(CheckoutService::new(
            processor,
            site,
            baskets.clone(),
            responses.clone(),
            orders.clone(),
        ));

        Ok(Self {
            config,
            razorpay,
            checkout,
            baskets,
            responses,
            orders,
        })
    }
}

/// Load site registry from config file
fn load_site_registry() -> anyhow::Result<SiteRegistry> {
    let config_paths = [
        "config/sites.toml",
        "../config/sites.toml",
        "../../config/sites.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let registry = SiteRegistry::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} sites from {}", registry.len(), path);
            return Ok(registry);
        }
    }

    tracing::warn!("No sites file found, using BASE_URL for the storefront");
    Ok(SiteRegistry::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::PaymentProcessor;

    fn config() -> AppConfig {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
            order_prefix: "TST".to_string(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..config()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_fallback_site() {
        let site = config().fallback_site();
        assert_eq!(site.base_url, "http://localhost:3000");
        assert_eq!(site.order_prefix, "TST");
    }

    #[test]
    fn test_build_state() {
        let state = AppState::build(
            config(),
            config().fallback_site(),
            RazorPayConfig::new("rzp_test_key", "secret"),
        )
        .unwrap();

        assert_eq!(state.checkout.processor().name(), "razorpay");
        assert_eq!(
            state.checkout.processor().error_url(),
            "http://localhost:3000/checkout/error/"
        );
    }
}
