//! Payment references.
//!
//! Every pending sale or ledger transaction carries a globally unique
//! reference of the form `{PREFIX}-{id}-{unixMillis}`. The reference is the
//! idempotency key shared with the payment gateway: it comes back on every
//! callback and webhook, and is the only thing used to find the target.
//!
//! The id segment is the entity UUID in its 32-character simple form, so no
//! segment ever contains the `-` separator.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while parsing a reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The reference does not have the `{PREFIX}-{id}-{unixMillis}` shape.
    #[error("Malformed reference: {0}")]
    Malformed(String),

    /// The prefix is not one we issue.
    #[error("Unknown reference prefix in {0}")]
    UnknownPrefix(String),
}

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// E-commerce order.
    Order,
    /// Point-of-sale transaction.
    Pos,
    /// Wallet funding credit.
    WalletFunding,
    /// Wallet withdrawal debit.
    Withdrawal,
}

impl ReferenceKind {
    /// Returns the reference prefix.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Order => "ORD",
            Self::Pos => "POS",
            Self::WalletFunding => "WAL",
            Self::Withdrawal => "WDR",
        }
    }

    /// Looks up a kind by prefix.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "ORD" => Some(Self::Order),
            "POS" => Some(Self::Pos),
            "WAL" => Some(Self::WalletFunding),
            "WDR" => Some(Self::Withdrawal),
            _ => None,
        }
    }

    /// Returns true for references settled against the wallet ledger.
    #[must_use]
    pub const fn is_ledger(self) -> bool {
        matches!(self, Self::WalletFunding | Self::Withdrawal)
    }
}

/// A parsed payment reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentReference {
    /// Target kind.
    pub kind: ReferenceKind,
    /// Target entity id.
    pub id: Uuid,
    /// Issue time in unix milliseconds.
    pub issued_at_ms: i64,
}

impl PaymentReference {
    /// Issues a new reference stamped with the current time.
    #[must_use]
    pub fn issue(kind: ReferenceKind, id: Uuid) -> Self {
        Self::with_timestamp(kind, id, Utc::now().timestamp_millis())
    }

    /// Builds a reference with an explicit timestamp.
    #[must_use]
    pub const fn with_timestamp(kind: ReferenceKind, id: Uuid, issued_at_ms: i64) -> Self {
        Self {
            kind,
            id,
            issued_at_ms,
        }
    }

    /// Parses `{PREFIX}-{id}-{unixMillis}`.
    ///
    /// No store lookup is performed; a reference that fails here is dropped.
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let malformed = || ReferenceError::Malformed(raw.to_string());

        let mut parts = raw.trim().split('-');
        let (Some(prefix), Some(id), Some(millis), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let kind = ReferenceKind::from_prefix(prefix)
            .ok_or_else(|| ReferenceError::UnknownPrefix(raw.to_string()))?;

        if id.len() != 32 {
            return Err(malformed());
        }
        let id = Uuid::try_parse(id).map_err(|_| malformed())?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let issued_at_ms = millis.parse::<i64>().map_err(|_| malformed())?;

        Ok(Self {
            kind,
            id,
            issued_at_ms,
        })
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.kind.prefix(),
            self.id.simple(),
            self.issued_at_ms
        )
    }
}

impl FromStr for PaymentReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
