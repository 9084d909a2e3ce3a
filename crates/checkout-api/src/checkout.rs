//! # Checkout Service
//!
//! Orchestrates the payment flow around a `PaymentProcessor`: starting
//! checkout for a basket, executing the gateway callback into an order,
//! and refunding placed orders.

use checkout_core::{
    Basket, BasketLine, BasketStore, BoxedPaymentProcessor, Currency, Money, OrderPipeline,
    OrderStatus, PaymentError, PaymentResult, ProcessorResponse, ProcessorResponseStore, Site,
    TransactionParameters,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Where the customer is sent after a callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Order placed, show the receipt
    OrderPlaced(String),
    /// The gateway callback did not prove a payment
    PaymentFailed(String),
    /// The callback did not resolve to exactly one basket
    LookupFailed(String),
    /// Payment verified but the order could not be (re)placed
    OrderFailed(String),
}

impl CallbackOutcome {
    pub fn redirect_url(&self) -> &str {
        match self {
            CallbackOutcome::OrderPlaced(url)
            | CallbackOutcome::PaymentFailed(url)
            | CallbackOutcome::LookupFailed(url)
            | CallbackOutcome::OrderFailed(url) => url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub refund_id: String,
    pub order_number: String,
    pub amount: Money,
    /// All refunds on the order, this one included
    pub amount_refunded: Money,
    pub order_status: OrderStatus,
}

pub struct CheckoutService {
    processor: BoxedPaymentProcessor,
    site: Site,
    baskets: Arc<dyn BasketStore>,
    responses: Arc<dyn ProcessorResponseStore>,
    orders: Arc<dyn OrderPipeline>,
    /// Serialises refunds so two requests cannot both pass the balance check
    refunds: Mutex<()>,
}

impl CheckoutService {
    pub fn new(
        processor: BoxedPaymentProcessor,
        site: Site,
        baskets: Arc<dyn BasketStore>,
        responses: Arc<dyn ProcessorResponseStore>,
        orders: Arc<dyn OrderPipeline>,
    ) -> Self {
        Self {
            processor,
            site,
            baskets,
            responses,
            orders,
            refunds: Mutex::new(()),
        }
    }

    pub fn processor(&self) -> &BoxedPaymentProcessor {
        &self.processor
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Create a priced basket on this site
    pub async fn create_basket(
        &self,
        currency: Currency,
        owner: Option<String>,
        lines: Vec<BasketLine>,
    ) -> PaymentResult<Basket> {
        if lines.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Basket must have at least one line".to_string(),
            ));
        }

        let id = self.baskets.next_id().await;
        let mut basket = Basket::new(id, &self.site.id, &self.site.order_prefix, currency);
        basket.owner = owner;
        for line in lines {
            if line.quantity == 0 {
                return Err(PaymentError::InvalidRequest(format!(
                    "Quantity for {} must be positive",
                    line.product_id
                )));
            }
            if !line.unit_price.is_positive() {
                return Err(PaymentError::InvalidAmount {
                    message: format!(
                        "Unit price for {} must be positive, got {}",
                        line.product_id,
                        line.unit_price.display()
                    ),
                });
            }
            basket.add_line(line)?;
        }

        self.baskets.save(&basket).await?;
        info!(
            "Created basket [{}] with {} items, total={}",
            basket.id,
            basket.item_count(),
            basket.total_incl_tax()?.display()
        );
        Ok(basket)
    }

    pub async fn basket(&self, basket_id: u64) -> PaymentResult<Basket> {
        self.baskets.get(basket_id).await
    }

    /// Freeze the basket and create the hosted payment transaction
    #[instrument(skip(self))]
    pub async fn begin_checkout(&self, basket_id: u64) -> PaymentResult<TransactionParameters> {
        let mut basket = self.baskets.get(basket_id).await?;
        basket.freeze()?;
        self.baskets.save(&basket).await?;

        self.processor.get_transaction_parameters(&basket).await
    }

    async fn basket_for_transaction(&self, transaction_id: &str) -> Option<Basket> {
        let lookup = self
            .responses
            .basket_for_transaction(self.processor.name(), transaction_id)
            .await;

        let basket_id = match lookup {
            Ok(id) => id,
            Err(PaymentError::DuplicateTransaction { count, .. }) => {
                warn!(
                    "Duplicate payment ID [{}] received from {} ({} records).",
                    transaction_id,
                    self.processor.title(),
                    count
                );
                return None;
            }
            Err(e) => {
                error!(
                    "Unexpected error during basket retrieval while executing {} payment: {}",
                    self.processor.title(),
                    e
                );
                return None;
            }
        };

        match self.baskets.get(basket_id).await {
            Ok(basket) => Some(basket),
            Err(e) => {
                error!(
                    "Transaction [{}] points at basket [{}], which could not be loaded: {}",
                    transaction_id, basket_id, e
                );
                None
            }
        }
    }

    /// Handle a customer returning from the hosted payment page.
    ///
    /// `transaction_id` is the id recorded when the transaction was
    /// created. Never fails: every error path ends in a redirect.
    #[instrument(skip(self, response))]
    pub async fn execute_callback(
        &self,
        transaction_id: &str,
        response: &ProcessorResponse,
    ) -> CallbackOutcome {
        let error_url = self.processor.error_url();

        let Some(mut basket) = self.basket_for_transaction(transaction_id).await else {
            return CallbackOutcome::LookupFailed(error_url);
        };

        let receipt_url = self.site.receipt_page_url(&basket.order_number, true);

        let handled = match self
            .processor
            .handle_processor_response(response, &basket)
            .await
        {
            Ok(handled) => handled,
            Err(e) if e.is_payment_failure() => {
                return CallbackOutcome::PaymentFailed(error_url);
            }
            Err(e) => {
                error!(
                    "Attempts to handle payment for basket [{}] failed: {}",
                    basket.id, e
                );
                return CallbackOutcome::OrderFailed(receipt_url);
            }
        };

        let order = match self
            .orders
            .create_order(&basket, self.processor.name(), &handled)
            .await
        {
            Ok(order) => order,
            Err(e @ PaymentError::OrderAlreadyPlaced { .. }) => {
                warn!("Callback replayed for basket [{}]: {}", basket.id, e);
                return CallbackOutcome::OrderFailed(receipt_url);
            }
            Err(e) => {
                error!(
                    "Order creation failed for basket [{}] after payment [{}]: {}",
                    basket.id, handled.transaction_id, e
                );
                return CallbackOutcome::OrderFailed(receipt_url);
            }
        };

        basket.submit();
        if let Err(e) = self.baskets.save(&basket).await {
            error!("Failed to mark basket [{}] submitted: {}", basket.id, e);
        }

        if let Err(e) = self.orders.handle_post_order(&order).await {
            error!(
                "Post-order processing failed for order [{}] from basket [{}]: {}",
                order.number, basket.id, e
            );
        }

        CallbackOutcome::OrderPlaced(receipt_url)
    }

    /// Refund an order. Without an `amount` the remaining balance is
    /// refunded.
    #[instrument(skip(self))]
    pub async fn refund(
        &self,
        order_number: &str,
        amount: Option<Money>,
    ) -> PaymentResult<RefundOutcome> {
        let _guard = self.refunds.lock().await;

        let order = self.orders.get(order_number).await?;
        if order.status == OrderStatus::Refunded {
            return Err(PaymentError::InvalidRequest(format!(
                "Order {} has already been refunded",
                order_number
            )));
        }

        let source = order.source_for(self.processor.name()).ok_or_else(|| {
            PaymentError::InvalidRequest(format!(
                "Order {} was not paid with {}",
                order_number,
                self.processor.title()
            ))
        })?;

        let remaining = order.refundable_amount()?;
        let amount = amount.unwrap_or(remaining);
        if amount.currency != remaining.currency {
            return Err(PaymentError::InvalidRequest(format!(
                "Refund currency {} does not match order currency {}",
                amount.currency, remaining.currency
            )));
        }
        if amount.amount > remaining.amount {
            return Err(PaymentError::InvalidAmount {
                message: format!(
                    "Refund of {} exceeds the {} left on order {}",
                    amount.display(),
                    remaining.display(),
                    order.number
                ),
            });
        }

        let basket = self.baskets.get(order.basket_id).await?;
        let refund_id = self
            .processor
            .issue_credit(&order.number, &basket, &source.reference, amount)
            .await?;

        let updated = self.orders.record_refund(&order.number, amount).await?;

        Ok(RefundOutcome {
            refund_id,
            order_number: updated.number,
            amount,
            amount_refunded: updated.amount_refunded,
            order_status: updated.status,
        })
    }
}
