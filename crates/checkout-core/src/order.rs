//! # Order Placement
//!
//! The order pipeline is provided by the commerce platform. The trait
//! here is the part of it the payment flow calls into.

use crate::basket::{Basket, BasketLine};
use crate::error::{PaymentError, PaymentResult};
use crate::money::Money;
use crate::processor::HandledProcessorResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

/// How an order was paid for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSource {
    pub processor_name: String,

    /// Gateway payment id
    pub reference: String,

    pub amount_debited: Money,

    /// Display label (e.g. "RazorPay")
    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Complete,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub number: String,
    pub basket_id: u64,
    pub site_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub lines: Vec<BasketLine>,
    pub total: Money,
    /// Sum of all refunds issued so far
    pub amount_refunded: Money,
    pub status: OrderStatus,
    pub sources: Vec<PaymentSource>,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// The payment source recorded for a processor
    pub fn source_for(&self, processor_name: &str) -> Option<&PaymentSource> {
        self.sources
            .iter()
            .find(|s| s.processor_name == processor_name)
    }

    /// Amount still available for refund
    pub fn refundable_amount(&self) -> PaymentResult<Money> {
        self.total.checked_sub(self.amount_refunded)
    }
}

#[async_trait]
pub trait OrderPipeline: Send + Sync {
    /// Place an order for a paid basket
    async fn create_order(
        &self,
        basket: &Basket,
        processor_name: &str,
        payment: &HandledProcessorResponse,
    ) -> PaymentResult<Order>;

    /// Post-placement work (fulfilment, notifications)
    async fn handle_post_order(&self, order: &Order) -> PaymentResult<()>;

    async fn get(&self, order_number: &str) -> PaymentResult<Order>;

    /// Add an issued refund to the order. The order becomes `Refunded`
    /// once refunds cover its total.
    async fn record_refund(&self, order_number: &str, amount: Money) -> PaymentResult<Order>;
}

#[derive(Debug, Default)]
pub struct InMemoryOrderPipeline {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderPipeline for InMemoryOrderPipeline {
    async fn create_order(
        &self,
        basket: &Basket,
        processor_name: &str,
        payment: &HandledProcessorResponse,
    ) -> PaymentResult<Order> {
        if basket.is_empty() {
            return Err(PaymentError::InvalidRequest(format!(
                "Basket {} has no lines",
                basket.id
            )));
        }

        let total = basket.total_incl_tax()?;
        let mut orders = self.orders.write().await;
        if orders.contains_key(&basket.order_number) {
            return Err(PaymentError::OrderAlreadyPlaced {
                order_number: basket.order_number.clone(),
            });
        }

        let order = Order {
            number: basket.order_number.clone(),
            basket_id: basket.id,
            site_id: basket.site_id.clone(),
            owner: basket.owner.clone(),
            lines: basket.lines.clone(),
            total,
            amount_refunded: Money::zero(total.currency),
            status: OrderStatus::Open,
            sources: vec![PaymentSource {
                processor_name: processor_name.to_string(),
                reference: payment.transaction_id.clone(),
                amount_debited: payment.total,
                label: payment.card_number.clone(),
                card_type: payment.card_type.clone(),
            }],
            placed_at: Utc::now(),
        };
        orders.insert(order.number.clone(), order.clone());

        info!("Placed order [{}] for basket [{}]", order.number, basket.id);
        Ok(order)
    }

    async fn handle_post_order(&self, order: &Order) -> PaymentResult<()> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.number)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_number: order.number.clone(),
            })?;
        stored.status = OrderStatus::Complete;
        info!("Fulfilled order [{}]", order.number);
        Ok(())
    }

    async fn get(&self, order_number: &str) -> PaymentResult<Order> {
        self.orders
            .read()
            .await
            .get(order_number)
            .cloned()
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_number: order_number.to_string(),
            })
    }

    async fn record_refund(&self, order_number: &str, amount: Money) -> PaymentResult<Order> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(order_number)
            .ok_or_else(|| PaymentError::OrderNotFound {
                order_number: order_number.to_string(),
            })?;

        // The refund has already gone through at the gateway, so it is
        // recorded even when it takes the order past its total
        stored.amount_refunded = stored.amount_refunded.checked_add(amount)?;
        if stored.amount_refunded.amount >= stored.total.amount {
            stored.status = OrderStatus::Refunded;
        }
        info!(
            "Recorded refund of {} on order [{}], {} refunded in total",
            amount.display(),
            order_number,
            stored.amount_refunded.display()
        );
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn paid_basket() -> (Basket, HandledProcessorResponse) {
        let mut basket = Basket::new(3, "edx", "EDX", Currency::INR);
        basket
            .add_line(BasketLine::new(
                "course",
                "Course",
                Money::new(999.0, Currency::INR),
                1,
            ))
            .unwrap();
        let handled = HandledProcessorResponse {
            transaction_id: "pay_abc".to_string(),
            total: basket.total_incl_tax().unwrap(),
            currency: Currency::INR,
            card_number: "RazorPay".to_string(),
            card_type: None,
        };
        (basket, handled)
    }

    #[tokio::test]
    async fn test_create_order_records_source() {
        let pipeline = InMemoryOrderPipeline::new();
        let (basket, handled) = paid_basket();

        let order = pipeline
            .create_order(&basket, "razorpay", &handled)
            .await
            .unwrap();

        assert_eq!(order.number, "EDX-100003");
        assert_eq!(order.status, OrderStatus::Open);
        let source = order.source_for("razorpay").unwrap();
        assert_eq!(source.reference, "pay_abc");
        assert_eq!(source.amount_debited.amount, 99_900);
    }

    #[tokio::test]
    async fn test_order_is_placed_once() {
        let pipeline = InMemoryOrderPipeline::new();
        let (basket, handled) = paid_basket();

        pipeline
            .create_order(&basket, "razorpay", &handled)
            .await
            .unwrap();
        let err = pipeline
            .create_order(&basket, "razorpay", &handled)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::OrderAlreadyPlaced { .. }));
        assert_eq!(pipeline.len().await, 1);
    }

    #[tokio::test]
    async fn test_post_order_and_refund_status() {
        let pipeline = InMemoryOrderPipeline::new();
        let (basket, handled) = paid_basket();
        let order = pipeline
            .create_order(&basket, "razorpay", &handled)
            .await
            .unwrap();

        pipeline.handle_post_order(&order).await.unwrap();
        assert_eq!(
            pipeline.get(&order.number).await.unwrap().status,
            OrderStatus::Complete
        );

        let partial = pipeline
            .record_refund(&order.number, Money::new(400.0, Currency::INR))
            .await
            .unwrap();
        assert_eq!(partial.status, OrderStatus::Complete);
        assert_eq!(partial.amount_refunded.amount, 40_000);
        assert_eq!(partial.refundable_amount().unwrap().amount, 59_900);

        let refunded = pipeline
            .record_refund(&order.number, Money::new(599.0, Currency::INR))
            .await
            .unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(refunded.refundable_amount().unwrap().amount, 0);

        assert!(matches!(
            pipeline.get("EDX-999").await,
            Err(PaymentError::OrderNotFound { .. })
        ));
    }
}
