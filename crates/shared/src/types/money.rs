//! Currency codes and minor-unit amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` in the domain and integer minor units
//! (two decimal places) at rest and when comparing gateway-reported values.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places kept in minor units.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Money conversion errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Amount does not fit in the minor-unit representation.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),

    /// Unknown currency code.
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
}

/// ISO 4217 currency codes settled through the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Nigerian Naira
    #[default]
    Ngn,
    /// US Dollar
    Usd,
    /// Ghanaian Cedi
    Ghs,
    /// Kenyan Shilling
    Kes,
    /// South African Rand
    Zar,
}

impl Currency {
    /// Returns the ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ngn => "NGN",
            Self::Usd => "USD",
            Self::Ghs => "GHS",
            Self::Kes => "KES",
            Self::Zar => "ZAR",
        }
    }
}

/// Converts a major-unit amount to integer minor units.
///
/// Rounds half away from zero to two decimal places first, so `5000`,
/// `5000.0` and `5000.004` all map to `500000`.
///
/// # Errors
///
/// Returns `MoneyError::OutOfRange` if the result does not fit in `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    amount
        .round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or(MoneyError::OutOfRange(amount))
}

/// Converts integer minor units back to a major-unit amount.
#[must_use]
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

/// Returns true if `amount` has no digits below the minor unit.
///
/// `10.50` and `10.5000` qualify; `0.004` does not.
#[must_use]
pub fn is_whole_minor_units(amount: Decimal) -> bool {
    amount.normalize().scale() <= MINOR_UNIT_SCALE
}

/// Compares two amounts at minor-unit precision.
///
/// Out-of-range amounts never match.
#[must_use]
pub fn amounts_match(a: Decimal, b: Decimal) -> bool {
    match (to_minor_units(a), to_minor_units(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NGN" => Ok(Self::Ngn),
            "USD" => Ok(Self::Usd),
            "GHS" => Ok(Self::Ghs),
            "KES" => Ok(Self::Kes),
            "ZAR" => Ok(Self::Zar),
            _ => Err(MoneyError::UnknownCurrency(s.to_string())),
        }
    }
}
