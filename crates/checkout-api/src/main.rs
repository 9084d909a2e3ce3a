//! # razorpay-checkout
//!
//! Checkout service taking payments through RazorPay hosted pages.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export RAZORPAY_KEY_ID=rzp_test_...
//! export RAZORPAY_KEY_SECRET=...
//! export BASE_URL=https://shop.example.com
//!
//! # Run the server
//! razorpay-checkout
//! ```

use checkout_api::{routes, state::AppState};
use checkout_core::PaymentProcessor;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!(
        "Site: {} ({})",
        state.checkout.site().name,
        state.checkout.site().base_url
    );
    info!(
        "Processor: {} ({} mode)",
        state.razorpay.title(),
        if state.razorpay.config().is_live_mode() { "live" } else { "test" }
    );

    let callback_url = state.razorpay.callback_url();
    let app = routes::create_router(state);

    info!("Checkout service starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Basket: POST http://{}/api/v1/baskets", addr);
        info!("Callback: {}", callback_url);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  RazorPay Checkout RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Hosted payment pages
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
