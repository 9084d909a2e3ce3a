//! # Basket Types
//!
//! Basket and basket storage for the checkout flow. Pricing rules and
//! offers are applied upstream; a basket here is already priced.

use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Offset added to the basket id when deriving order numbers
const ORDER_NUMBER_OFFSET: u64 = 100_000;

/// A priced line in a basket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketLine {
    pub product_id: String,

    /// Product title (denormalized for display)
    pub title: String,

    pub unit_price: Money,

    pub quantity: u32,
}

impl BasketLine {
    pub fn new(
        product_id: impl Into<String>,
        title: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            title: title.into(),
            unit_price,
            quantity,
        }
    }

    /// Calculate the total price for this line
    pub fn total(&self) -> PaymentResult<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Lifecycle of a basket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasketStatus {
    /// Still editable
    Open,
    /// Checkout started, contents locked
    Frozen,
    /// An order was placed from this basket
    Submitted,
}

impl Default for BasketStatus {
    fn default() -> Self {
        BasketStatus::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basket {
    pub id: u64,

    /// Order number the basket will be placed under
    pub order_number: String,

    /// Owning user, if authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    pub site_id: String,

    pub currency: Currency,

    #[serde(default)]
    pub lines: Vec<BasketLine>,

    #[serde(default)]
    pub status: BasketStatus,

    pub created_at: DateTime<Utc>,
}

impl Basket {
    pub fn new(
        id: u64,
        site_id: impl Into<String>,
        order_prefix: &str,
        currency: Currency,
    ) -> Self {
        Self {
            id,
            order_number: order_number_for(order_prefix, id),
            owner: None,
            site_id: site_id.into(),
            currency,
            lines: Vec::new(),
            status: BasketStatus::Open,
            created_at: Utc::now(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Add a line; the line currency must match the basket currency and
    /// the basket total must stay representable
    pub fn add_line(&mut self, line: BasketLine) -> PaymentResult<()> {
        if line.unit_price.currency != self.currency {
            return Err(PaymentError::InvalidRequest(format!(
                "Line currency {} does not match basket currency {}",
                line.unit_price.currency, self.currency
            )));
        }
        if self.status != BasketStatus::Open {
            return Err(PaymentError::InvalidRequest(format!(
                "Basket {} is not open",
                self.id
            )));
        }
        self.total_incl_tax()?.checked_add(line.total()?)?;
        self.lines.push(line);
        Ok(())
    }

    /// Basket total, tax included
    pub fn total_incl_tax(&self) -> PaymentResult<Money> {
        self.lines
            .iter()
            .try_fold(Money::zero(self.currency), |total, line| {
                total.checked_add(line.total()?)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Lock the basket for checkout. Freezing twice is allowed so a
    /// customer can restart payment.
    pub fn freeze(&mut self) -> PaymentResult<()> {
        if self.status == BasketStatus::Submitted {
            return Err(PaymentError::InvalidRequest(format!(
                "Basket {} has already been submitted",
                self.id
            )));
        }
        self.status = BasketStatus::Frozen;
        Ok(())
    }

    pub fn submit(&mut self) {
        self.status = BasketStatus::Submitted;
    }
}

/// Derive an order number such as `EDX-100042`
pub fn order_number_for(prefix: &str, basket_id: u64) -> String {
    format!("{}-{}", prefix, ORDER_NUMBER_OFFSET + basket_id)
}

/// Storage for baskets
#[async_trait]
pub trait BasketStore: Send + Sync {
    /// Allocate the next basket id
    async fn next_id(&self) -> u64;

    /// Insert or replace a basket
    async fn save(&self, basket: &Basket) -> PaymentResult<()>;

    /// Fetch a basket by id
    async fn get(&self, basket_id: u64) -> PaymentResult<Basket>;
}

#[derive(Debug)]
pub struct InMemoryBasketStore {
    baskets: RwLock<HashMap<u64, Basket>>,
    next_id: AtomicU64,
}

impl InMemoryBasketStore {
    pub fn new() -> Self {
        Self {
            baskets: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryBasketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasketStore for InMemoryBasketStore {
    async fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn save(&self, basket: &Basket) -> PaymentResult<()> {
        self.baskets.write().await.insert(basket.id, basket.clone());
        Ok(())
    }

    async fn get(&self, basket_id: u64) -> PaymentResult<Basket> {
        self.baskets
            .read()
            .await
            .get(&basket_id)
            .cloned()
            .ok_or(PaymentError::BasketNotFound { basket_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_basket() -> Basket {
        let mut basket = Basket::new(7, "edx", "EDX", Currency::INR);
        basket
            .add_line(BasketLine::new(
                "course-v1:edX+DemoX",
                "Demo Course",
                Money::new(499.0, Currency::INR),
                2,
            ))
            .unwrap();
        basket
            .add_line(BasketLine::new(
                "cert-verified",
                "Verified Certificate",
                Money::new(1500.5, Currency::INR),
                1,
            ))
            .unwrap();
        basket
    }

    #[test]
    fn test_order_number() {
        assert_eq!(order_number_for("EDX", 1), "EDX-100001");
        assert_eq!(course_basket().order_number, "EDX-100007");
    }

    #[test]
    fn test_basket_total() {
        let basket = course_basket();
        assert_eq!(basket.total_incl_tax().unwrap().amount, 249_850);
        assert_eq!(basket.item_count(), 3);
    }

    #[test]
    fn test_overflowing_lines_are_rejected() {
        let mut basket = Basket::new(1, "edx", "EDX", Currency::INR);
        let huge = Money::from_minor(i64::MAX / 2, Currency::INR);

        let err = basket
            .add_line(BasketLine::new("p", "P", huge, 4))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));

        basket.add_line(BasketLine::new("a", "A", huge, 1)).unwrap();
        basket.add_line(BasketLine::new("b", "B", huge, 1)).unwrap();
        let err = basket
            .add_line(BasketLine::new("c", "C", huge, 1))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
        assert_eq!(basket.lines.len(), 2);
    }

    #[test]
    fn test_deserialized_overflow_is_an_error() {
        let mut basket = Basket::new(1, "edx", "EDX", Currency::INR);
        basket.lines.push(BasketLine::new(
            "p",
            "P",
            Money::from_minor(i64::MAX, Currency::INR),
            2,
        ));
        assert!(matches!(
            basket.total_incl_tax(),
            Err(PaymentError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_line_currency_must_match() {
        let mut basket = Basket::new(1, "edx", "EDX", Currency::INR);
        let err = basket
            .add_line(BasketLine::new("p", "P", Money::new(1.0, Currency::USD), 1))
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidRequest(_)));
    }

    #[test]
    fn test_freeze_lifecycle() {
        let mut basket = course_basket();
        basket.freeze().unwrap();
        assert_eq!(basket.status, BasketStatus::Frozen);
        basket.freeze().unwrap();

        basket.submit();
        assert!(basket.freeze().is_err());
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryBasketStore::new();
        let id = store.next_id().await;
        assert_eq!(id, 1);
        assert_eq!(store.next_id().await, 2);

        let basket = Basket::new(id, "edx", "EDX", Currency::INR);
        store.save(&basket).await.unwrap();

        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.order_number, "EDX-100001");

        assert!(matches!(
            store.get(99).await,
            Err(PaymentError::BasketNotFound { basket_id: 99 })
        ));
    }
}
