//! Payment amounts in euro cents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Smallest accepted amount (one cent).
pub const MIN_AMOUNT: i64 = 1;

/// Largest accepted amount.
pub const MAX_AMOUNT: i64 = 999_999;

/// An amount in cents, given either as a number or as numeric text.
///
/// Text is coerced in exactly one place, [`Amount::cents`]; everything that
/// puts an amount on the wire goes through it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// A whole number of cents.
    Integer(i64),
    /// Numeric text such as `"1254"`; surrounding whitespace is ignored.
    Numeric(String),
}

impl Amount {
    /// The amount in cents, checked against `1..=999999`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Amount`] for text that is not a plain
    /// decimal integer (fractions and exponents such as `"1e3"` included)
    /// and for values outside the accepted range.
    pub fn cents(&self) -> Result<i64, ValidationError> {
        let cents = match self {
            Self::Integer(cents) => *cents,
            Self::Numeric(text) => text.trim().parse::<i64>().map_err(|_| ValidationError::Amount)?,
        };
        if (MIN_AMOUNT..=MAX_AMOUNT).contains(&cents) {
            Ok(cents)
        } else {
            Err(ValidationError::Amount)
        }
    }
}

impl From<i64> for Amount {
    fn from(cents: i64) -> Self {
        Self::Integer(cents)
    }
}

impl From<i32> for Amount {
    fn from(cents: i32) -> Self {
        Self::Integer(i64::from(cents))
    }
}

impl From<u32> for Amount {
    fn from(cents: u32) -> Self {
        Self::Integer(i64::from(cents))
    }
}

impl From<&str> for Amount {
    fn from(text: &str) -> Self {
        Self::Numeric(text.to_owned())
    }
}

impl From<String> for Amount {
    fn from(text: String) -> Self {
        Self::Numeric(text)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(cents) => write!(f, "{cents}"),
            Self::Numeric(text) => f.write_str(text),
        }
    }
}
