//! # Money Types
//!
//! Currency and amount types. Amounts are held in the smallest currency
//! unit (paise for INR, cents for USD), which is what the gateway expects.

use crate::error::{PaymentError, PaymentResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
    SGD,
    AED,
    JPY,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::SGD => "SGD",
            Currency::AED => "AED",
            Currency::JPY => "JPY",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert a decimal amount to the smallest currency unit, rejecting
    /// amounts that are not finite or do not fit in an `i64`
    pub fn try_to_smallest_unit(&self, amount: f64) -> PaymentResult<i64> {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        let scaled = (amount * multiplier).round();
        // i64::MAX as f64 rounds up to 2^63, which is itself out of range
        if !scaled.is_finite() || scaled >= i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(PaymentError::InvalidAmount {
                message: format!("{} {} is out of range", amount, self.as_str()),
            });
        }
        Ok(scaled as i64)
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::SGD => "S$",
            Currency::AED => "AED ",
            Currency::JPY => "¥",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::INR
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "SGD" => Ok(Currency::SGD),
            "AED" => Ok(Currency::AED),
            "JPY" => Ok(Currency::JPY),
            _ => Err(PaymentError::UnsupportedCurrency {
                currency: s.to_string(),
            }),
        }
    }
}

/// Amount in the smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    /// Create from a decimal amount (e.g. `499.00` rupees). Out of range
    /// amounts saturate; use [`Money::try_new`] for caller-supplied input.
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create from a decimal amount supplied by a caller
    pub fn try_new(amount: f64, currency: Currency) -> PaymentResult<Self> {
        Ok(Self {
            amount: currency.try_to_smallest_unit(amount)?,
            currency,
        })
    }

    /// Create from minor units (e.g. `49900` paise)
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Sum of two amounts in the same currency
    pub fn checked_add(&self, other: Money) -> PaymentResult<Money> {
        self.check_currency(other)?;
        self.amount
            .checked_add(other.amount)
            .map(|amount| Money::from_minor(amount, self.currency))
            .ok_or_else(|| PaymentError::InvalidAmount {
                message: format!("{} + {} overflows", self.amount, other.amount),
            })
    }

    /// Difference of two amounts in the same currency
    pub fn checked_sub(&self, other: Money) -> PaymentResult<Money> {
        self.check_currency(other)?;
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Money::from_minor(amount, self.currency))
            .ok_or_else(|| PaymentError::InvalidAmount {
                message: format!("{} - {} overflows", self.amount, other.amount),
            })
    }

    /// Amount multiplied by a quantity
    pub fn checked_mul(&self, quantity: u32) -> PaymentResult<Money> {
        self.amount
            .checked_mul(i64::from(quantity))
            .map(|amount| Money::from_minor(amount, self.currency))
            .ok_or_else(|| PaymentError::InvalidAmount {
                message: format!("{} x {} overflows", self.amount, quantity),
            })
    }

    fn check_currency(&self, other: Money) -> PaymentResult<()> {
        if self.currency != other.currency {
            return Err(PaymentError::InvalidRequest(format!(
                "Currency mismatch: {} and {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }

    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    /// Format for display (e.g. "₹499.00")
    pub fn display(&self) -> String {
        if self.currency.decimal_places() == 0 {
            format!("{}{}", self.currency.symbol(), self.amount)
        } else {
            format!("{}{:.2}", self.currency.symbol(), self.as_decimal())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let inr = Currency::INR;
        assert_eq!(inr.to_smallest_unit(499.99), 49999);
        assert_eq!(inr.from_smallest_unit(49999), 499.99);

        let jpy = Currency::JPY;
        assert_eq!(jpy.to_smallest_unit(1000.0), 1000);
    }

    #[test]
    fn test_out_of_range_amounts_are_rejected() {
        assert!(Money::try_new(499.0, Currency::INR).is_ok());
        assert!(matches!(
            Money::try_new(1e17, Currency::INR),
            Err(PaymentError::InvalidAmount { .. })
        ));
        assert!(Money::try_new(f64::NAN, Currency::INR).is_err());
        assert!(Money::try_new(f64::INFINITY, Currency::USD).is_err());
        assert!(Money::try_new(f64::NEG_INFINITY, Currency::USD).is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_minor(49_900, Currency::INR);
        assert_eq!(price.checked_mul(3).unwrap().amount, 149_700);
        assert_eq!(
            price.checked_add(Money::from_minor(100, Currency::INR)).unwrap().amount,
            50_000
        );
        assert_eq!(
            price.checked_sub(Money::from_minor(900, Currency::INR)).unwrap().amount,
            49_000
        );

        let huge = Money::from_minor(i64::MAX / 2, Currency::INR);
        assert!(matches!(huge.checked_mul(4), Err(PaymentError::InvalidAmount { .. })));
        assert!(huge.checked_add(huge).is_ok());
        assert!(huge.checked_add(huge).unwrap().checked_add(huge).is_err());
        assert!(matches!(
            price.checked_add(Money::from_minor(1, Currency::USD)),
            Err(PaymentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::INR);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(PaymentError::UnsupportedCurrency { .. })
        ));
    }

    #[test]
    fn test_currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::INR).unwrap();
        assert_eq!(json, "\"INR\"");
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(499.0, Currency::INR).display(), "₹499.00");
        assert_eq!(Money::from_minor(1999, Currency::USD).display(), "$19.99");
        assert_eq!(Money::from_minor(500, Currency::JPY).display(), "¥500");
    }
}
