//! Money types with precise decimal arithmetic
//!
//! Monetary values are represented with rust_decimal so that balances never
//! accumulate floating-point drift. Every amount carries its currency, and
//! cross-currency arithmetic is rejected rather than silently coerced.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
///
/// The set covers the currencies the agency actually transacts in:
/// BRL for domestic operations plus the destinations billed in foreign
/// currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    BRL,
    USD,
    EUR,
    GBP,
    ARS,
    CLP,
    MXN,
    JPY,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::CLP | Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BRL => "BRL",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::ARS => "ARS",
            Currency::CLP => "CLP",
            Currency::MXN => "MXN",
            Currency::JPY => "JPY",
        }
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BRL => "R$",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::ARS => "AR$",
            Currency::CLP => "CL$",
            Currency::MXN => "MX$",
            Currency::JPY => "¥",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BRL" => Ok(Currency::BRL),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "ARS" => Ok(Currency::ARS),
            "CLP" => Ok(Currency::CLP),
            "MXN" => Ok(Currency::MXN),
            "JPY" => Ok(Currency::JPY),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount {0} is not representable in minor units of {1}")]
    SubUnitPrecision(String, String),
}

/// A monetary amount with associated currency
///
/// Amounts are stored with 4 decimal places internally so that conversion
/// intermediates survive; persisted values are rounded to the currency's
/// standard precision at the storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates Money from an integer amount in minor units (e.g., centavos)
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        let divisor = Decimal::new(10_i64.pow(currency.decimal_places()), 0);
        Self::new(Decimal::new(minor_units, 0) / divisor, currency)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Checked addition that returns an error on currency mismatch
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Splits the amount into n parts that sum exactly to the original
    ///
    /// Division happens in minor units; the remainder is distributed one
    /// minor unit at a time over the earliest parts, so the parts always
    /// reassemble to the original amount with no rounding residue. Amounts
    /// with precision below the currency's minor unit cannot reassemble
    /// exactly and are rejected.
    pub fn allocate(&self, n: u32) -> Result<Vec<Money>, MoneyError> {
        if n == 0 {
            return Err(MoneyError::InvalidAmount(
                "cannot allocate to zero parts".to_string(),
            ));
        }

        let dp = self.currency.decimal_places();
        let scaled = self.amount * Decimal::new(10_i64.pow(dp), 0);
        if !scaled.fract().is_zero() {
            return Err(MoneyError::SubUnitPrecision(
                self.amount.to_string(),
                self.currency.to_string(),
            ));
        }
        let total_minor = scaled.normalize().mantissa();

        let base = total_minor / n as i128;
        let remainder = (total_minor % n as i128) as u32;

        let mut parts = Vec::with_capacity(n as usize);
        for i in 0..n {
            let minor = if i < remainder { base + 1 } else { base };
            parts.push(Money::from_minor(minor as i64, self.currency));
        }

        Ok(parts)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places() as usize;
        write!(f, "{} {:.dp$}", self.currency.symbol(), self.amount, dp = dp)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.checked_add(&other)
            .expect("Currency mismatch in Money::add")
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.checked_sub(&other)
            .expect("Currency mismatch in Money::sub")
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(1250.75), Currency::BRL);
        assert_eq!(m.amount(), dec!(1250.75));
        assert_eq!(m.currency(), Currency::BRL);
    }

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(125075, Currency::BRL);
        assert_eq!(m.amount(), dec!(1250.75));

        let zero_dp = Money::from_minor(5000, Currency::JPY);
        assert_eq!(zero_dp.amount(), dec!(5000));
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(1000.00), Currency::BRL);
        let b = Money::new(dec!(400.00), Currency::BRL);

        assert_eq!((a + b).amount(), dec!(1400.00));
        assert_eq!((a - b).amount(), dec!(600.00));
    }

    #[test]
    fn test_currency_mismatch() {
        let brl = Money::new(dec!(100.00), Currency::BRL);
        let usd = Money::new(dec!(100.00), Currency::USD);

        let result = brl.checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("brl".parse::<Currency>().unwrap(), Currency::BRL);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert!(matches!(
            "XXX".parse::<Currency>(),
            Err(MoneyError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn test_allocation_distributes_remainder_first() {
        let m = Money::new(dec!(100.00), Currency::BRL);
        let parts = m.allocate(3).unwrap();

        assert_eq!(parts[0].amount(), dec!(33.34));
        assert_eq!(parts[1].amount(), dec!(33.33));
        assert_eq!(parts[2].amount(), dec!(33.33));
    }

    #[test]
    fn test_allocation_zero_parts_rejected() {
        let m = Money::new(dec!(100.00), Currency::BRL);
        assert!(m.allocate(0).is_err());
    }

    #[test]
    fn test_allocation_rejects_sub_minor_precision() {
        // 100.005 BRL cannot reassemble exactly from centavos
        let m = Money::new(dec!(100.005), Currency::BRL);
        assert!(matches!(
            m.allocate(2),
            Err(MoneyError::SubUnitPrecision(_, _))
        ));

        // Zero-decimal currencies split on whole units
        let yen = Money::new(dec!(100.5), Currency::JPY);
        assert!(matches!(
            yen.allocate(2),
            Err(MoneyError::SubUnitPrecision(_, _))
        ));
        let yen = Money::new(dec!(101), Currency::JPY);
        let parts = yen.allocate(2).unwrap();
        assert_eq!(parts[0].amount(), dec!(51));
        assert_eq!(parts[1].amount(), dec!(50));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn allocation_sum_equals_original(
            amount in 1i64..1_000_000_000i64,
            parts in 1u32..60u32
        ) {
            let money = Money::from_minor(amount, Currency::BRL);
            let allocations = money.allocate(parts).unwrap();

            let total: Decimal = allocations.iter().map(|m| m.amount()).sum();
            prop_assert_eq!(total, money.amount());
        }

        #[test]
        fn addition_is_commutative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a, Currency::BRL);
            let mb = Money::from_minor(b, Currency::BRL);

            prop_assert_eq!(ma + mb, mb + ma);
        }
    }
}
