//! The reconciler state machine.
//!
//! ```text
//! Sale:               pending -> paid | failed | cancelled
//! LedgerTransaction:  pending -> successful | failed
//!                     successful -> reversed
//! ```
//!
//! There are no in-process locks. The only gate is the store's atomic
//! conditional update; side effects run only when it reports that this call
//! moved the record out of `pending`.

use std::sync::Arc;

use rust_decimal::Decimal;
use storeledger_shared::types::{Currency, amounts_match};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::ReconcileError;
use super::types::{
    AssertedOutcome, Notification, NotificationSource, ReconcileOutcome, SettlementState,
    SettlementTarget,
};
use crate::gateway::PaymentGateway;
use crate::inventory::InventoryApplier;
use crate::reference::PaymentReference;
use crate::sale::{PaymentStatus, Sale, SaleKind, SaleTransition};
use crate::store::{InventoryStore, LedgerStore, SaleStore};
use crate::wallet::{LedgerTransaction, SettlementOutcome};

/// Applies payment notifications exactly once.
#[derive(Clone)]
pub struct Reconciler {
    sales: Arc<dyn SaleStore>,
    ledger: Arc<dyn LedgerStore>,
    inventory: InventoryApplier,
    gateway: Arc<dyn PaymentGateway>,
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(
        sales: Arc<dyn SaleStore>,
        ledger: Arc<dyn LedgerStore>,
        inventory: Arc<dyn InventoryStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            sales,
            ledger,
            inventory: InventoryApplier::new(inventory),
            gateway,
        }
    }

    /// Processes one notification.
    ///
    /// Re-delivery of an already settled event is a successful no-op with
    /// `applied == false`.
    pub async fn process(
        &self,
        notification: &Notification,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = PaymentReference::parse(&notification.reference)?;

        match SaleKind::from_reference_kind(reference.kind) {
            Some(kind) => self.settle_sale(reference, kind, notification).await,
            None => self.settle_ledger(reference, notification).await,
        }
    }

    /// Marks a sale paid for its own total, e.g. cash at the till.
    pub async fn complete_locally(
        &self,
        kind: SaleKind,
        id: Uuid,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let sale = self
            .sales
            .find_sale(kind, id)
            .await?
            .ok_or_else(|| ReconcileError::SaleNotFound(id.to_string()))?;

        self.process(&Notification {
            reference: sale.reference,
            outcome: AssertedOutcome::Successful,
            amount: Some(sale.total),
            currency: Some(sale.currency.code().to_string()),
            gateway_transaction_id: None,
            source: NotificationSource::Local,
        })
        .await
    }

    /// Settles a charge from the gateway's own record of it.
    ///
    /// Used by the redirect callback: the query-string status is ignored and
    /// the gateway is asked directly. A charge the gateway still reports as
    /// pending is left untouched.
    pub async fn verify_and_process(
        &self,
        tx_ref: &str,
        transaction_id: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = PaymentReference::parse(tx_ref)?;
        let verified = self.gateway.verify_transaction(transaction_id).await?;

        if verified.tx_ref != tx_ref {
            warn!(
                reference = tx_ref,
                gateway_reference = %verified.tx_ref,
                "Verified transaction belongs to another reference"
            );
            return Err(ReconcileError::ReferenceMismatch {
                expected: tx_ref.to_string(),
                actual: verified.tx_ref,
            });
        }

        if verified.is_pending() {
            return self.lookup(&reference, tx_ref).await;
        }

        let outcome = if verified.is_successful() {
            AssertedOutcome::Successful
        } else if verified.status.eq_ignore_ascii_case("cancelled") {
            AssertedOutcome::Cancelled
        } else {
            AssertedOutcome::Failed
        };

        self.process(&Notification {
            reference: tx_ref.to_string(),
            outcome,
            amount: Some(verified.amount),
            currency: Some(verified.currency),
            gateway_transaction_id: Some(verified.id),
            source: NotificationSource::Callback,
        })
        .await
    }

    /// Reports where a reference stands without changing anything.
    pub async fn current_state(&self, raw: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = PaymentReference::parse(raw)?;
        self.lookup(&reference, raw).await
    }

    async fn lookup(
        &self,
        reference: &PaymentReference,
        raw: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match SaleKind::from_reference_kind(reference.kind) {
            Some(kind) => {
                let sale = self.load_sale(kind, reference, raw).await?;
                Ok(ReconcileOutcome::unchanged(
                    *reference,
                    SettlementTarget::Sale { kind, id: sale.id },
                    sale.payment_status.into(),
                ))
            }
            None => {
                let tx = self.load_transaction(raw).await?;
                Ok(ReconcileOutcome::unchanged(
                    *reference,
                    ledger_target(&tx),
                    tx.status.into(),
                ))
            }
        }
    }

    async fn load_sale(
        &self,
        kind: SaleKind,
        reference: &PaymentReference,
        raw: &str,
    ) -> Result<Sale, ReconcileError> {
        // The id inside the reference finds the row; the full reference must
        // still match so a stale or forged timestamp cannot settle it.
        match self.sales.find_sale(kind, reference.id).await? {
            Some(sale) if sale.reference == raw => Ok(sale),
            _ => Err(ReconcileError::SaleNotFound(raw.to_string())),
        }
    }

    async fn load_transaction(&self, raw: &str) -> Result<LedgerTransaction, ReconcileError> {
        self.ledger
            .find_transaction_by_reference(raw)
            .await?
            .ok_or_else(|| ReconcileError::SaleNotFound(raw.to_string()))
    }

    async fn settle_sale(
        &self,
        reference: PaymentReference,
        kind: SaleKind,
        notification: &Notification,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let sale = self
            .load_sale(kind, &reference, &notification.reference)
            .await?;
        let target = SettlementTarget::Sale { kind, id: sale.id };

        if !sale.payment_status.is_pending() {
            info!(
                reference = %notification.reference,
                status = ?sale.payment_status,
                source = ?notification.source,
                "Sale already settled"
            );
            return Ok(ReconcileOutcome::unchanged(
                reference,
                target,
                sale.payment_status.into(),
            ));
        }

        let transition = match notification.outcome {
            AssertedOutcome::Successful => {
                check_amount(notification, sale.total)?;
                check_currency(notification, sale.currency)?;
                SaleTransition::paid(kind, notification.gateway_transaction_id.clone())
            }
            AssertedOutcome::Failed => SaleTransition::unpaid(
                PaymentStatus::Failed,
                notification.gateway_transaction_id.clone(),
            ),
            AssertedOutcome::Cancelled => SaleTransition::unpaid(
                PaymentStatus::Cancelled,
                notification.gateway_transaction_id.clone(),
            ),
            AssertedOutcome::Reversed => {
                return Err(ReconcileError::UnsupportedOutcome {
                    reference: notification.reference.clone(),
                    outcome: "reversed".to_string(),
                });
            }
        };

        let performed = self
            .sales
            .transition_payment_status(kind, sale.id, &transition)
            .await?;

        if !performed {
            let current = self
                .sales
                .find_sale(kind, sale.id)
                .await?
                .map_or(transition.to, |s| s.payment_status);
            info!(
                reference = %notification.reference,
                status = ?current,
                source = ?notification.source,
                "Sale settled concurrently"
            );
            return Ok(ReconcileOutcome::unchanged(reference, target, current.into()));
        }

        info!(
            reference = %notification.reference,
            sale_id = %sale.id,
            status = ?transition.to,
            source = ?notification.source,
            "Sale payment status updated"
        );

        let inventory = if transition.to == PaymentStatus::Paid {
            Some(
                self.inventory
                    .apply_sale_effects(&sale.reference, &sale.items)
                    .await,
            )
        } else {
            None
        };

        Ok(ReconcileOutcome {
            reference,
            target,
            state: transition.to.into(),
            applied: true,
            inventory,
        })
    }

    async fn settle_ledger(
        &self,
        reference: PaymentReference,
        notification: &Notification,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let tx = self.load_transaction(&notification.reference).await?;
        let target = ledger_target(&tx);

        if notification.outcome == AssertedOutcome::Reversed {
            let performed = self.ledger.reverse(tx.id).await?;
            let state = if performed {
                info!(
                    reference = %notification.reference,
                    wallet_id = %tx.wallet_id,
                    "Ledger transaction reversed"
                );
                SettlementState::Reversed
            } else {
                let current = self.load_transaction(&notification.reference).await?;
                warn!(
                    reference = %notification.reference,
                    status = ?current.status,
                    "Reversal ignored"
                );
                current.status.into()
            };
            return Ok(ReconcileOutcome {
                reference,
                target,
                state,
                applied: performed,
                inventory: None,
            });
        }

        if tx.status.is_settled() {
            info!(
                reference = %notification.reference,
                status = ?tx.status,
                source = ?notification.source,
                "Ledger transaction already settled"
            );
            return Ok(ReconcileOutcome::unchanged(reference, target, tx.status.into()));
        }

        let outcome = if notification.outcome == AssertedOutcome::Successful {
            check_amount(notification, tx.amount)?;
            let wallet = self.ledger.wallet_by_id(tx.wallet_id).await?;
            check_currency(notification, wallet.currency)?;
            SettlementOutcome::Successful
        } else {
            SettlementOutcome::Failed
        };

        let applied = self.ledger.apply_settlement(tx.id, outcome).await?;
        let settled = applied.transaction();

        if applied.was_applied() {
            info!(
                reference = %notification.reference,
                wallet_id = %settled.wallet_id,
                status = ?settled.status,
                source = ?notification.source,
                "Ledger transaction settled"
            );
        }

        Ok(ReconcileOutcome {
            reference,
            target,
            state: settled.status.into(),
            applied: applied.was_applied(),
            inventory: None,
        })
    }
}

fn ledger_target(tx: &LedgerTransaction) -> SettlementTarget {
    SettlementTarget::Ledger {
        id: tx.id,
        transaction_type: tx.transaction_type,
    }
}

fn check_amount(notification: &Notification, expected: Decimal) -> Result<(), ReconcileError> {
    match notification.amount {
        Some(actual) if amounts_match(actual, expected) => Ok(()),
        actual => {
            warn!(
                reference = %notification.reference,
                %expected,
                ?actual,
                source = ?notification.source,
                "Amount mismatch, notification rejected"
            );
            Err(ReconcileError::AmountMismatch {
                reference: notification.reference.clone(),
                expected,
                actual,
            })
        }
    }
}

fn check_currency(notification: &Notification, expected: Currency) -> Result<(), ReconcileError> {
    match &notification.currency {
        Some(actual) if !actual.eq_ignore_ascii_case(expected.code()) => {
            warn!(
                reference = %notification.reference,
                expected = expected.code(),
                actual = %actual,
                "Currency mismatch, notification rejected"
            );
            Err(ReconcileError::CurrencyMismatch {
                reference: notification.reference.clone(),
                expected: expected.code().to_string(),
                actual: actual.clone(),
            })
        }
        _ => Ok(()),
    }
}
