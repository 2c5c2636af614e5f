use crate::error::TaxError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places in the currency's minor unit.
pub const CURRENCY_SCALE: u32 = 2;

/// Rounds a raw amount to the currency minor unit, half away from zero.
///
/// For amounts up to [`Income::MAX`] the result carries exactly
/// [`CURRENCY_SCALE`] decimal places, so `100` and `100.000` both render as
/// `100.00`. Near `Decimal::MAX` there is no room for the extra digits and the
/// scale stays lower.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// A non-negative income amount, at most [`Income::MAX`].
///
/// Out-of-range values are rejected with [`TaxError::ValidationError`] rather
/// than clamped, so a calculator never sees them.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Income(Decimal);

impl Income {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest accepted income. Keeps every computed tax representable with
    /// two decimal places.
    pub const MAX: Decimal = dec!(1_000_000_000_000_000);

    pub fn new(value: Decimal) -> Result<Self, TaxError> {
        if value < Decimal::ZERO {
            Err(TaxError::ValidationError(format!(
                "Income must not be negative, got {}",
                value
            )))
        } else if value > Self::MAX {
            Err(TaxError::ValidationError(format!(
                "Income must not exceed {}, got {}",
                Self::MAX,
                value
            )))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Income {
    type Error = TaxError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Income> for Decimal {
    fn from(income: Income) -> Self {
        income.0
    }
}

impl fmt::Display for Income {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A computed tax amount, rounded to the currency minor unit and never negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Tax(Decimal);

impl Tax {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Rounds `value` once and wraps it.
    ///
    /// Callers never pass a negative amount for a valid income, so one is an
    /// [`TaxError::InternalError`].
    pub fn new(value: Decimal) -> Result<Self, TaxError> {
        let rounded = round_currency(value);
        if rounded < Decimal::ZERO {
            Err(TaxError::InternalError(
                format!("computed a negative tax: {}", rounded).into(),
            ))
        } else {
            Ok(Self(rounded))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Tax {
    type Error = TaxError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Tax> for Decimal {
    fn from(tax: Tax) -> Self {
        tax.0
    }
}

impl fmt::Display for Tax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
