/// SALES
///
/// Completed transactions referencing a product, the sponsoring member and
/// the stockist who fulfilled the order. Amounts are held in integer minor
/// units so commission legs never carry floating-point drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use thiserror::Error;

use crate::member::BusinessId;

/// Minor units per whole currency unit
pub const MINOR_UNITS_PER_MAJOR: u128 = 100;

/// Currency amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(minor: u128) -> Self {
        Amount(minor)
    }

    /// Whole currency units, saturating at `u128::MAX` minor units
    pub const fn from_major(major: u128) -> Self {
        Amount(major.saturating_mul(MINOR_UNITS_PER_MAJOR))
    }

    pub const fn minor(&self) -> u128 {
        self.0
    }

    /// Whole units, truncating the fractional part
    pub const fn major(&self) -> u128 {
        self.0 / MINOR_UNITS_PER_MAJOR
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(self, factor: u128) -> Option<Amount> {
        self.0.checked_mul(factor).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / MINOR_UNITS_PER_MAJOR,
            self.0 % MINOR_UNITS_PER_MAJOR
        )
    }
}

impl std::str::FromStr for Amount {
    type Err = SaleError;

    /// Parse whole units with up to two decimals, e.g. `100000` or `2500.50`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SaleError::InvalidAmount(s.to_string());
        let trimmed = s.trim().replace(',', "");
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed.as_str(), ""),
        };
        if whole.is_empty()
            || fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let major: u128 = whole.parse().map_err(|_| invalid())?;
        let minor: u128 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u128>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };
        major
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

fn default_quantity() -> u32 {
    1
}

/// A completed sale line (ordered item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    /// Sale identifier
    pub id: u64,
    /// Product name or SKU
    #[serde(default)]
    pub product: String,
    /// Member credited as sponsor of the sale (generation 1)
    #[serde(default)]
    pub sponsor: Option<BusinessId>,
    /// Stockist who fulfilled the order
    #[serde(default)]
    pub stockist: Option<BusinessId>,
    /// Price per unit
    pub unit_price: Amount,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub sold_at: Option<DateTime<Utc>>,
}

impl OrderedItem {
    pub fn new(id: u64, product: impl Into<String>, unit_price: Amount) -> Self {
        OrderedItem {
            id,
            product: product.into(),
            sponsor: None,
            stockist: None,
            unit_price,
            quantity: 1,
            sold_at: None,
        }
    }

    pub fn with_sponsor(mut self, sponsor: BusinessId) -> Self {
        self.sponsor = Some(sponsor);
        self
    }

    pub fn with_stockist(mut self, stockist: BusinessId) -> Self {
        self.stockist = Some(stockist);
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn validate(&self) -> Result<(), SaleError> {
        if self.quantity == 0 {
            return Err(SaleError::ZeroQuantity(self.id));
        }
        self.price().map(|_| ())
    }

    /// Commission base: unit price times quantity
    pub fn price(&self) -> Result<Amount, SaleError> {
        self.unit_price
            .checked_mul(self.quantity as u128)
            .ok_or(SaleError::PriceOverflow(self.id))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SaleError {
    #[error("Sale {0} has zero quantity")]
    ZeroQuantity(u64),
    #[error("Sale {0} price overflows")]
    PriceOverflow(u64),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_major(100_000).to_string(), "100000.00");
        assert_eq!(Amount::from_minor(12_345).to_string(), "123.45");
        assert_eq!(Amount::from_minor(7).to_string(), "0.07");
    }

    #[test]
    fn test_amount_parse() {
        assert_eq!("100000".parse::<Amount>().unwrap(), Amount::from_major(100_000));
        assert_eq!("2,500.5".parse::<Amount>().unwrap(), Amount::from_minor(250_050));
        assert_eq!("0.07".parse::<Amount>().unwrap(), Amount::from_minor(7));
        assert!("1.234".parse::<Amount>().is_err());
        assert!("-5".parse::<Amount>().is_err());
        assert!(".5".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
    }

    #[test]
    fn test_amount_sum() {
        let total: Amount = [Amount::from_major(1), Amount::from_minor(50)].iter().sum();
        assert_eq!(total, Amount::from_minor(150));
    }

    #[test]
    fn test_sale_price_uses_quantity() {
        let sale = OrderedItem::new(1, "heifer", Amount::from_major(2_500)).with_quantity(4);
        assert_eq!(sale.price().unwrap(), Amount::from_major(10_000));
        assert!(sale.validate().is_ok());
    }

    #[test]
    fn test_sale_rejects_zero_quantity() {
        let sale = OrderedItem::new(9, "feed", Amount::from_major(10)).with_quantity(0);
        assert_eq!(sale.validate(), Err(SaleError::ZeroQuantity(9)));
    }

    #[test]
    fn test_sale_price_overflow() {
        let sale = OrderedItem::new(3, "bull", Amount::from_minor(u128::MAX)).with_quantity(2);
        assert_eq!(sale.price(), Err(SaleError::PriceOverflow(3)));
    }

    #[test]
    fn test_sale_deserializes_default_quantity() {
        let json = r#"{"id": 5, "unit_price": 1000, "sponsor": "DIP0002"}"#;
        let sale: OrderedItem = serde_json::from_str(json).unwrap();
        assert_eq!(sale.quantity, 1);
        assert_eq!(sale.unit_price, Amount::from_minor(1000));
        assert!(sale.stockist.is_none());
    }
}
