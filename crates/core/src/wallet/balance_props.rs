//! Property-based tests for the wallet balance algebra.

use proptest::prelude::*;
use rust_decimal::Decimal;
use storeledger_shared::types::{AccountId, Currency};

use super::balance::BalanceDelta;
use super::types::{SettlementOutcome, TransactionType, Wallet};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a settled wallet (ledger >= available >= 0).
fn wallet_strategy() -> impl Strategy<Value = Wallet> {
    (0i64..10_000_000i64, 0i64..1_000_000i64).prop_map(|(available, pending)| {
        let mut wallet = Wallet::open(AccountId::new(), Currency::Ngn);
        wallet.available = Decimal::new(available, 2);
        wallet.ledger = Decimal::new(available + pending, 2);
        wallet
    })
}

fn outcome_strategy() -> impl Strategy<Value = SettlementOutcome> {
    prop_oneof![
        Just(SettlementOutcome::Successful),
        Just(SettlementOutcome::Failed)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Funding only moves money once it settles, and then moves both balances together.
    #[test]
    fn prop_credit_settlement(
        mut wallet in wallet_strategy(),
        amount in positive_amount(),
        outcome in outcome_strategy(),
    ) {
        let before = wallet.clone();
        wallet.apply(BalanceDelta::settlement(TransactionType::Credit, outcome, amount));

        match outcome {
            SettlementOutcome::Successful => {
                prop_assert_eq!(wallet.available, before.available + amount);
                prop_assert_eq!(wallet.ledger, before.ledger + amount);
            }
            SettlementOutcome::Failed => {
                prop_assert_eq!(wallet.available, before.available);
                prop_assert_eq!(wallet.ledger, before.ledger);
            }
        }
    }

    /// A withdrawal takes money out of `available` at once and out of `ledger`
    /// only on success; a failed withdrawal restores the starting balances.
    #[test]
    fn prop_withdrawal_lifecycle(
        mut wallet in wallet_strategy(),
        amount in positive_amount(),
        outcome in outcome_strategy(),
    ) {
        prop_assume!(wallet.available >= amount);
        let before = wallet.clone();

        wallet.apply(BalanceDelta::hold(amount));
        prop_assert!(wallet.ledger >= wallet.available);
        prop_assert!(wallet.available >= Decimal::ZERO);

        wallet.apply(BalanceDelta::settlement(TransactionType::Debit, outcome, amount));
        match outcome {
            SettlementOutcome::Successful => {
                prop_assert_eq!(wallet.available, before.available - amount);
                prop_assert_eq!(wallet.ledger, before.ledger - amount);
            }
            SettlementOutcome::Failed => {
                prop_assert_eq!(wallet.available, before.available);
                prop_assert_eq!(wallet.ledger, before.ledger);
            }
        }
        prop_assert!(wallet.ledger >= wallet.available);
    }

    /// Reversing a successful settlement restores the balances from before it.
    #[test]
    fn prop_reversal_undoes_successful_settlement(
        mut wallet in wallet_strategy(),
        amount in positive_amount(),
        is_credit in any::<bool>(),
    ) {
        let kind = if is_credit { TransactionType::Credit } else { TransactionType::Debit };
        let before = wallet.clone();

        if kind == TransactionType::Debit {
            prop_assume!(wallet.available >= amount);
            wallet.apply(BalanceDelta::hold(amount));
            wallet.apply(BalanceDelta::settlement(kind, SettlementOutcome::Successful, amount));
            wallet.apply(BalanceDelta::reversal(kind, amount));
        } else {
            wallet.apply(BalanceDelta::settlement(kind, SettlementOutcome::Successful, amount));
            wallet.apply(BalanceDelta::reversal(kind, amount));
        }

        prop_assert_eq!(wallet.available, before.available);
        prop_assert_eq!(wallet.ledger, before.ledger);
    }

    /// Placing and releasing a hold is a no-op overall.
    #[test]
    fn prop_hold_release_round_trip(
        mut wallet in wallet_strategy(),
        amount in positive_amount(),
    ) {
        let before = wallet.clone();
        wallet.apply(BalanceDelta::hold(amount));
        wallet.apply(BalanceDelta::hold_release(amount));
        prop_assert_eq!(wallet, before);
    }
}
