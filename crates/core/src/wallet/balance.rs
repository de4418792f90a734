//! Balance algebra.
//!
//! Every wallet mutation is expressed as a `BalanceDelta` so the same rules
//! drive the in-memory model and the SQL updates in the repository layer.
//!
//! | event                     | available | ledger |
//! |---------------------------|-----------|--------|
//! | hold (withdrawal placed)  | -amount   | 0      |
//! | release hold              | +amount   | 0      |
//! | credit successful         | +amount   | +amount|
//! | credit failed             | 0         | 0      |
//! | debit successful          | 0         | -amount|
//! | debit failed (refund)     | +amount   | 0      |
//! | credit reversed           | -amount   | -amount|
//! | debit reversed            | +amount   | +amount|

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{SettlementOutcome, TransactionType};

/// Signed change to both wallet balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// Change to the available balance.
    pub available: Decimal,
    /// Change to the ledger balance.
    pub ledger: Decimal,
}

impl BalanceDelta {
    /// No change.
    pub const ZERO: Self = Self {
        available: Decimal::ZERO,
        ledger: Decimal::ZERO,
    };

    /// Delta for settling a pending transaction.
    #[must_use]
    pub fn settlement(kind: TransactionType, outcome: SettlementOutcome, amount: Decimal) -> Self {
        match (kind, outcome) {
            (TransactionType::Credit, SettlementOutcome::Successful) => Self {
                available: amount,
                ledger: amount,
            },
            (TransactionType::Credit, SettlementOutcome::Failed) => Self::ZERO,
            (TransactionType::Debit, SettlementOutcome::Successful) => Self {
                available: Decimal::ZERO,
                ledger: -amount,
            },
            (TransactionType::Debit, SettlementOutcome::Failed) => Self::hold_release(amount),
        }
    }

    /// Delta for reversing a successful transaction.
    #[must_use]
    pub fn reversal(kind: TransactionType, amount: Decimal) -> Self {
        match kind {
            TransactionType::Credit => Self {
                available: -amount,
                ledger: -amount,
            },
            TransactionType::Debit => Self {
                available: amount,
                ledger: amount,
            },
        }
    }

    /// Delta for placing a withdrawal hold.
    #[must_use]
    pub fn hold(amount: Decimal) -> Self {
        Self {
            available: -amount,
            ledger: Decimal::ZERO,
        }
    }

    /// Delta for releasing a withdrawal hold.
    #[must_use]
    pub fn hold_release(amount: Decimal) -> Self {
        Self {
            available: amount,
            ledger: Decimal::ZERO,
        }
    }

    /// Returns true if the delta changes nothing.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.ledger.is_zero()
    }
}
