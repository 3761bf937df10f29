use crate::error::ProtocolError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strictly positive monetary amount.
///
/// Messages carry amounts as decimal strings; `Amount` is what a principal
/// gets after validating one. Parsing keeps the original scale, so
/// `"0.0010"` round-trips as `"0.0010"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ProtocolError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ProtocolError::Validation(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Parses a decimal string. Floats in exponent form are not accepted.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value = Decimal::from_str(raw.trim()).map_err(|_| {
            ProtocolError::Validation(format!("Amount '{}' is not a decimal number", raw))
        })?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ProtocolError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
