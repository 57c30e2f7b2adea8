//! Non-negative monetary amounts

use crate::{ModelError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Number of minor units in one major unit.
const CENTS_PER_UNIT: u64 = 100;

/// A non-negative price held as integer minor units (cents).
///
/// On the wire a price is a plain JSON number such as `10` or `19.99`,
/// which is what the remote endpoint and the catalog speak. Internally it is
/// exact, so totals never drift the way float sums do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    /// A zero price
    pub const ZERO: Price = Price(0);

    /// Create a price from minor units
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create a price from whole units
    pub fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(CENTS_PER_UNIT))
    }

    /// Parse a decimal amount, rounding to the nearest cent.
    ///
    /// Negative, NaN and infinite amounts are rejected.
    pub fn from_decimal(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ModelError::InvalidPrice(format!("{} is not finite", value)));
        }
        if value < 0.0 {
            return Err(ModelError::InvalidPrice(format!("{} is negative", value)));
        }

        let cents = (value * CENTS_PER_UNIT as f64).round();
        if cents > u64::MAX as f64 {
            return Err(ModelError::InvalidPrice(format!("{} is out of range", value)));
        }
        Ok(Self(cents as u64))
    }

    /// Get the amount in minor units
    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Get the amount as a decimal number
    pub fn as_decimal(&self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }

    /// Price of `quantity` units at this price
    pub fn times(self, quantity: u32) -> Price {
        Price(self.0.saturating_mul(quantity as u64))
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!(
            "{}.{:02}",
            self.0 / CENTS_PER_UNIT,
            self.0 % CENTS_PER_UNIT
        ))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0 % CENTS_PER_UNIT == 0 {
            serializer.serialize_u64(self.0 / CENTS_PER_UNIT)
        } else {
            serializer.serialize_f64(self.as_decimal())
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Price::from_decimal(value).map_err(serde::de::Error::custom)
    }
}
