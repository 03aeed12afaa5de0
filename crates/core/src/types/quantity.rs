//! Validated cart quantity.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input is zero or negative.
    #[error("quantity must be greater than zero (got {0})")]
    NotPositive(Decimal),
    /// The input is NaN or infinite.
    #[error("quantity must be a finite number")]
    NotFinite,
    /// The input could not be parsed as a number.
    #[error("quantity is not a number: {0:?}")]
    NotNumeric(String),
}

/// A strictly positive quantity of a product.
///
/// Fresh produce is sold by weight, so quantities are decimals rather than
/// integers. A `Quantity` can never be zero or negative; "set to zero" is
/// expressed as removing the line instead.
///
/// ## Examples
///
/// ```
/// use harvest_core::Quantity;
///
/// assert!("1.5".parse::<Quantity>().is_ok());
/// assert!("0".parse::<Quantity>().is_err());
/// assert!("-2".parse::<Quantity>().is_err());
/// assert!("two".parse::<Quantity>().is_err());
/// assert!(Quantity::try_from(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Validate a decimal quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] if `value <= 0`.
    pub fn new(value: Decimal) -> Result<Self, QuantityError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(QuantityError::NotPositive(value))
        }
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Sum of two quantities. Always positive.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = QuantityError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(Decimal::from(value))
    }
}

impl TryFrom<f64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(QuantityError::NotFinite);
        }
        let decimal = Decimal::try_from(value).map_err(|_| QuantityError::NotFinite)?;
        Self::new(decimal)
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| QuantityError::NotNumeric(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<&str> for Quantity {
    type Error = QuantityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// Persisted lines are re-validated on load so a corrupted slot can never
// yield a zero or negative quantity.
impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}
