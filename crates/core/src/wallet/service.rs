//! Wallet funding and withdrawals.
//!
//! Funding records a pending credit and hands back a gateway payment link;
//! the balance only moves when the reconciler settles the credit.
//!
//! Withdrawals move money out of `available` before the transfer is sent, so
//! the same funds cannot be withdrawn twice. The hold is returned if the
//! debit cannot be recorded or the gateway refuses the transfer.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use storeledger_shared::types::{
    AccountId, Currency, LedgerTransactionId, PageRequest, is_whole_minor_units,
};
use tracing::{error, info, warn};

use super::error::LedgerError;
use super::types::{
    LedgerTransaction, NewLedgerTransaction, SettlementOutcome, TransactionType, Wallet,
};
use crate::gateway::{ChargeRequest, GatewayError, PaymentGateway, TransferRequest};
use crate::reference::{PaymentReference, ReferenceKind};
use crate::sale::Customer;
use crate::store::LedgerStore;

/// A started wallet funding.
#[derive(Debug, Clone, Serialize)]
pub struct FundingInitiated {
    /// The pending credit.
    pub transaction: LedgerTransaction,
    /// Hosted checkout link.
    pub payment_link: String,
}

/// Destination of a withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    /// Amount to withdraw.
    pub amount: Decimal,
    /// Destination account number.
    pub account_number: String,
    /// Destination bank code.
    pub bank_code: String,
    /// Webhook target for the transfer result.
    pub callback_url: String,
}

/// Where a withdrawal stands after initiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalState {
    /// Transfer accepted by the gateway; the webhook settles it.
    Submitted,
    /// Transfer outcome unknown (timeout, 5xx or lost connection); the
    /// webhook settles it.
    Pending,
}

/// A started withdrawal.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalInitiated {
    /// The pending debit.
    pub transaction: LedgerTransaction,
    /// Verified account holder name.
    pub account_name: String,
    /// Submission state.
    pub state: WithdrawalState,
}

/// Wallet operations that involve the payment gateway.
#[derive(Clone)]
pub struct WalletService {
    ledger: Arc<dyn LedgerStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl WalletService {
    /// Creates a new wallet service.
    pub fn new(ledger: Arc<dyn LedgerStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { ledger, gateway }
    }

    /// Returns the account's wallet, creating it on first use.
    pub async fn wallet(&self, account_id: AccountId, currency: Currency) -> Result<Wallet, LedgerError> {
        self.ledger.get_or_create_wallet(account_id, currency).await
    }

    /// Records a pending credit and opens a hosted checkout for it.
    ///
    /// No balance changes here. If the checkout cannot be opened the credit
    /// is settled as failed, which also changes no balance.
    pub async fn fund(
        &self,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
        customer: Customer,
        redirect_url: String,
    ) -> Result<FundingInitiated, LedgerError> {
        ensure_valid_amount(amount)?;
        let wallet = self.ledger.get_or_create_wallet(account_id, currency).await?;
        let id = LedgerTransactionId::new();
        let reference =
            PaymentReference::issue(ReferenceKind::WalletFunding, id.into_inner()).to_string();

        let transaction = self
            .ledger
            .create_transaction(NewLedgerTransaction {
                id,
                wallet_id: wallet.id,
                amount,
                transaction_type: TransactionType::Credit,
                description: "Wallet funding".to_string(),
                reference: reference.clone(),
                counterparty: customer.email.clone(),
            })
            .await?;

        let charge = ChargeRequest {
            reference: reference.clone(),
            amount,
            currency: wallet.currency,
            redirect_url,
            customer,
            meta: serde_json::json!({ "wallet_id": wallet.id, "kind": "wallet_funding" }),
        };

        match self.gateway.initialize_charge(&charge).await {
            Ok(payment_link) => {
                info!(reference = %reference, wallet_id = %wallet.id, %amount, "Wallet funding initiated");
                Ok(FundingInitiated {
                    transaction,
                    payment_link,
                })
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Could not open checkout for wallet funding");
                if let Err(settle_err) = self
                    .ledger
                    .apply_settlement(transaction.id, SettlementOutcome::Failed)
                    .await
                {
                    error!(reference = %reference, error = %settle_err, "Failed to close abandoned funding");
                }
                Err(e.into())
            }
        }
    }

    /// Holds funds, records a pending debit and starts the bank transfer.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        currency: Currency,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalInitiated, LedgerError> {
        ensure_valid_amount(request.amount)?;

        let account_name = self
            .gateway
            .verify_bank_account(&request.account_number, &request.bank_code)
            .await?;

        let wallet = self.ledger.get_or_create_wallet(account_id, currency).await?;
        self.ledger.place_hold(wallet.id, request.amount).await?;

        let id = LedgerTransactionId::new();
        let reference =
            PaymentReference::issue(ReferenceKind::Withdrawal, id.into_inner()).to_string();

        let transaction = match self
            .ledger
            .create_transaction(NewLedgerTransaction {
                id,
                wallet_id: wallet.id,
                amount: request.amount,
                transaction_type: TransactionType::Debit,
                description: format!("Withdrawal to {account_name}"),
                reference: reference.clone(),
                counterparty: format!("{}:{}", request.bank_code, request.account_number),
            })
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                if let Err(release_err) = self.ledger.release_hold(wallet.id, request.amount).await {
                    error!(
                        wallet_id = %wallet.id,
                        amount = %request.amount,
                        error = %release_err,
                        "Failed to release withdrawal hold"
                    );
                }
                return Err(e);
            }
        };

        let transfer = TransferRequest {
            account_number: request.account_number,
            bank_code: request.bank_code,
            amount: request.amount,
            currency: wallet.currency,
            reference: reference.clone(),
            callback_url: request.callback_url,
            narration: format!("Wallet withdrawal {reference}"),
        };

        match self.gateway.initiate_transfer(&transfer).await {
            Ok(receipt) if receipt.is_failed() => {
                self.refund(&transaction, &reference).await;
                Err(GatewayError::Rejected(format!("transfer {} failed", receipt.transfer_id)).into())
            }
            Ok(receipt) => {
                if let Err(e) = self
                    .ledger
                    .set_gateway_reference(transaction.id, &receipt.transfer_id)
                    .await
                {
                    error!(reference = %reference, error = %e, "Failed to record transfer id");
                }
                info!(reference = %reference, wallet_id = %wallet.id, transfer_id = %receipt.transfer_id, "Withdrawal submitted");
                Ok(WithdrawalInitiated {
                    transaction,
                    account_name,
                    state: WithdrawalState::Submitted,
                })
            }
            Err(e @ GatewayError::Rejected(_)) => {
                warn!(reference = %reference, error = %e, "Transfer not accepted, refunding hold");
                self.refund(&transaction, &reference).await;
                Err(e.into())
            }
            Err(e) => {
                // The transfer may have gone out: keep the hold, the transfer
                // webhook settles it.
                warn!(reference = %reference, error = %e, "Transfer outcome unknown, left pending");
                Ok(WithdrawalInitiated {
                    transaction,
                    account_name,
                    state: WithdrawalState::Pending,
                })
            }
        }
    }

    /// Lists the account's ledger history, newest first.
    pub async fn history(
        &self,
        account_id: AccountId,
        currency: Currency,
        page: &PageRequest,
    ) -> Result<(Vec<LedgerTransaction>, u64), LedgerError> {
        let wallet = self.ledger.get_or_create_wallet(account_id, currency).await?;
        self.ledger.list_transactions(wallet.id, page).await
    }

    async fn refund(&self, transaction: &LedgerTransaction, reference: &str) {
        if let Err(e) = self
            .ledger
            .apply_settlement(transaction.id, SettlementOutcome::Failed)
            .await
        {
            error!(reference, error = %e, "Failed to refund withdrawal hold");
        }
    }
}

fn ensure_valid_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount > Decimal::ZERO && is_whole_minor_units(amount) {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryLedgerStore, ScriptedGateway};
    use crate::wallet::TransactionStatus;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn customer() -> Customer {
        Customer {
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
            phone: None,
        }
    }

    fn withdrawal(amount: Decimal) -> WithdrawalRequest {
        WithdrawalRequest {
            amount,
            account_number: "0690000031".to_string(),
            bank_code: "044".to_string(),
            callback_url: "https://api.shop.test/api/v1/webhooks/flutterwave".to_string(),
        }
    }

    async fn funded_wallet(ledger: &MemoryLedgerStore, account_id: AccountId, amount: Decimal) {
        let wallet = ledger
            .get_or_create_wallet(account_id, Currency::Ngn)
            .await
            .unwrap();
        ledger.set_balances(wallet.id, amount, amount);
    }

    #[tokio::test]
    async fn test_fund_records_pending_credit_without_balance_change() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let service = WalletService::new(ledger.clone(), gateway.clone());
        let account_id = AccountId::new();

        let funding = service
            .fund(account_id, Currency::Ngn, dec!(5000), customer(), "https://cb".into())
            .await
            .unwrap();

        assert!(funding.transaction.reference.starts_with("WAL-"));
        assert_eq!(funding.transaction.status, TransactionStatus::Pending);
        assert_eq!(funding.payment_link, ScriptedGateway::PAYMENT_LINK);

        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, Decimal::ZERO);
        assert_eq!(wallet.ledger, Decimal::ZERO);

        let charges = gateway.charges();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].reference, funding.transaction.reference);
    }

    #[rstest]
    #[case::zero(dec!(0))]
    #[case::negative(dec!(-50))]
    #[case::below_one_kobo(dec!(0.004))]
    #[case::fraction_of_a_kobo(dec!(10.125))]
    #[tokio::test]
    async fn test_fund_rejects_invalid_amount(#[case] amount: Decimal) {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let service = WalletService::new(ledger.clone(), gateway.clone());
        let account_id = AccountId::new();

        let err = service
            .fund(account_id, Currency::Ngn, amount, customer(), "https://cb".into())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert!(gateway.charges().is_empty());
        assert!(ledger.find_wallet_by_account(account_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_withdraw_rejects_sub_minor_amount_before_holding() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let service = WalletService::new(ledger.clone(), gateway.clone());
        let account_id = AccountId::new();
        funded_wallet(&ledger, account_id, dec!(100)).await;

        let err = service
            .withdraw(account_id, Currency::Ngn, withdrawal(dec!(0.004)))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert!(gateway.transfers().is_empty());
        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, dec!(100));
    }

    #[tokio::test]
    async fn test_fund_closes_credit_when_checkout_fails() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.fail_charges(GatewayError::Rejected("invalid amount".into()));
        let service = WalletService::new(ledger.clone(), gateway);
        let account_id = AccountId::new();

        let err = service
            .fund(account_id, Currency::Ngn, dec!(100), customer(), "https://cb".into())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "GATEWAY_REJECTED");

        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        let (txs, _) = ledger
            .list_transactions(wallet.id, &Default::default())
            .await
            .unwrap();
        assert_eq!(txs[0].status, TransactionStatus::Failed);
        assert_eq!(wallet.available, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_withdraw_holds_funds_and_submits_transfer() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let service = WalletService::new(ledger.clone(), gateway.clone());
        let account_id = AccountId::new();
        funded_wallet(&ledger, account_id, dec!(10000)).await;

        let result = service
            .withdraw(account_id, Currency::Ngn, withdrawal(dec!(4000)))
            .await
            .unwrap();

        assert_eq!(result.state, WithdrawalState::Submitted);
        assert_eq!(result.account_name, ScriptedGateway::ACCOUNT_NAME);
        assert!(result.transaction.reference.starts_with("WDR-"));
        assert_eq!(result.transaction.transaction_type, TransactionType::Debit);

        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, dec!(6000));
        assert_eq!(wallet.ledger, dec!(10000));

        let stored = ledger
            .find_transaction_by_reference(&result.transaction.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.gateway_reference.as_deref(), Some(ScriptedGateway::TRANSFER_ID));
        assert_eq!(gateway.transfers().len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_insufficient_funds_sends_nothing() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let service = WalletService::new(ledger.clone(), gateway.clone());
        let account_id = AccountId::new();
        funded_wallet(&ledger, account_id, dec!(100)).await;

        let err = service
            .withdraw(account_id, Currency::Ngn, withdrawal(dec!(100.01)))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(gateway.transfers().is_empty());
        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, dec!(100));
    }

    #[tokio::test]
    async fn test_withdraw_rejected_transfer_refunds_hold() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.fail_transfers(GatewayError::Rejected("insufficient payout balance".into()));
        let service = WalletService::new(ledger.clone(), gateway);
        let account_id = AccountId::new();
        funded_wallet(&ledger, account_id, dec!(500)).await;

        let err = service
            .withdraw(account_id, Currency::Ngn, withdrawal(dec!(200)))
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), 502);

        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, dec!(500));
        assert_eq!(wallet.ledger, dec!(500));
        let (txs, _) = ledger
            .list_transactions(wallet.id, &Default::default())
            .await
            .unwrap();
        assert_eq!(txs[0].status, TransactionStatus::Failed);
    }

    #[rstest]
    #[case::timeout(GatewayError::Timeout("30s".into()))]
    #[case::connection_reset(GatewayError::Unavailable("connection reset".into()))]
    #[case::server_error(GatewayError::Unavailable("HTTP 502".into()))]
    #[case::garbled(GatewayError::InvalidResponse("truncated body".into()))]
    #[tokio::test]
    async fn test_withdraw_unknown_outcome_leaves_debit_pending(#[case] failure: GatewayError) {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.fail_transfers(failure);
        let service = WalletService::new(ledger.clone(), gateway);
        let account_id = AccountId::new();
        funded_wallet(&ledger, account_id, dec!(500)).await;

        let result = service
            .withdraw(account_id, Currency::Ngn, withdrawal(dec!(200)))
            .await
            .unwrap();
        assert_eq!(result.state, WithdrawalState::Pending);
        assert_eq!(result.transaction.status, TransactionStatus::Pending);

        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, dec!(300));
        assert_eq!(wallet.ledger, dec!(500));
    }

    #[tokio::test]
    async fn test_withdraw_unverifiable_account_holds_nothing() {
        let ledger = Arc::new(MemoryLedgerStore::default());
        let gateway = Arc::new(ScriptedGateway::default());
        gateway.fail_account_lookup(GatewayError::Rejected("invalid account".into()));
        let service = WalletService::new(ledger.clone(), gateway);
        let account_id = AccountId::new();
        funded_wallet(&ledger, account_id, dec!(500)).await;

        assert!(service
            .withdraw(account_id, Currency::Ngn, withdrawal(dec!(200)))
            .await
            .is_err());
        let wallet = ledger.find_wallet_by_account(account_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, dec!(500));
    }
}
