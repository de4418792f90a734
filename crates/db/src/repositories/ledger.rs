//! Ledger repository: wallets and their transactions.
//!
//! A settlement changes the transaction status and the wallet balances in one
//! database transaction. The status change is a conditional `UPDATE` on the
//! expected source status, so a notification that loses a race (or arrives
//! after settlement) never touches the balances.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use storeledger_core::store::LedgerStore;
use storeledger_core::wallet::{
    BalanceDelta, LedgerError, LedgerTransaction, NewLedgerTransaction, SettlementApplied,
    SettlementOutcome, TransactionStatus, Wallet,
};
use storeledger_shared::types::{
    AccountId, Currency, LedgerTransactionId, PageRequest, WalletId, from_minor_units,
};
use tracing::info;
use uuid::Uuid;

use super::error::{RepositoryError, is_unique_violation};
use super::mapping::{minor, now, transaction, utc, wallet};
use crate::entities::{ledger_transactions, sea_orm_active_enums as db, wallets};

/// Ledger repository for database operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the wallet owned by an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_wallet(&self, account_id: AccountId) -> Result<Option<Wallet>, RepositoryError> {
        wallets::Entity::find()
            .filter(wallets::Column::AccountId.eq(account_id.into_inner()))
            .one(&self.db)
            .await?
            .map(wallet)
            .transpose()
    }

    /// Loads a wallet by id.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the wallet does not exist.
    pub async fn wallet_by_id(&self, wallet_id: WalletId) -> Result<Wallet, RepositoryError> {
        let model = wallets::Entity::find_by_id(wallet_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::WalletNotFound(wallet_id.into_inner()))?;
        wallet(model)
    }

    /// Returns the account's wallet, creating an empty one on first use.
    ///
    /// The insert ignores a conflict on `account_id`, so concurrent first
    /// calls all read back the single stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_or_create_wallet(
        &self,
        account_id: AccountId,
        currency: Currency,
    ) -> Result<Wallet, RepositoryError> {
        if let Some(existing) = self.find_wallet(account_id).await? {
            return Ok(existing);
        }

        let now = now();
        let model = wallets::ActiveModel {
            id: Set(WalletId::new().into_inner()),
            account_id: Set(account_id.into_inner()),
            available_minor: Set(0),
            ledger_minor: Set(0),
            currency: Set(currency.code().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = wallets::Entity::insert(model)
            .on_conflict(
                OnConflict::column(wallets::Column::AccountId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        if inserted == 1 {
            info!(account_id = %account_id, "Wallet created");
        }

        self.find_wallet(account_id)
            .await?
            .ok_or(RepositoryError::WalletNotFound(account_id.into_inner()))
    }

    /// Inserts a pending transaction.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateReference` if the reference is taken.
    pub async fn create_transaction(
        &self,
        tx: NewLedgerTransaction,
    ) -> Result<LedgerTransaction, RepositoryError> {
        let now = now();
        let reference = tx.reference.clone();
        let model = ledger_transactions::ActiveModel {
            id: Set(tx.id.into_inner()),
            wallet_id: Set(tx.wallet_id.into_inner()),
            amount_minor: Set(minor(tx.amount)?),
            transaction_type: Set(tx.transaction_type.into()),
            status: Set(db::TransactionStatus::Pending),
            description: Set(tx.description),
            reference: Set(tx.reference),
            counterparty: Set(tx.counterparty),
            gateway_reference: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&self.db).await {
            Ok(created) => Ok(transaction(created)),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::DuplicateReference(reference)),
            Err(e) => Err(e.into()),
        }
    }

    /// Finds a transaction by reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, RepositoryError> {
        Ok(ledger_transactions::Entity::find()
            .filter(ledger_transactions::Column::Reference.eq(reference))
            .one(&self.db)
            .await?
            .map(transaction))
    }

    /// Records the gateway's id for a transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if no row matches.
    pub async fn set_gateway_reference(
        &self,
        id: LedgerTransactionId,
        gateway_reference: &str,
    ) -> Result<(), RepositoryError> {
        let result = ledger_transactions::Entity::update_many()
            .col_expr(
                ledger_transactions::Column::GatewayReference,
                Expr::value(gateway_reference.to_string()),
            )
            .col_expr(ledger_transactions::Column::UpdatedAt, Expr::value(now()))
            .filter(ledger_transactions::Column::Id.eq(id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::TransactionNotFound(id.into_inner()));
        }
        Ok(())
    }

    /// Settles a pending transaction and applies its balance delta.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if the transaction does not exist.
    pub async fn settle(
        &self,
        id: LedgerTransactionId,
        outcome: SettlementOutcome,
    ) -> Result<SettlementApplied, RepositoryError> {
        let status = outcome.status();
        let txn = self.db.begin().await?;

        let Some(current) = ledger_transactions::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await?
        else {
            return Err(RepositoryError::TransactionNotFound(id.into_inner()));
        };

        let now = now();
        if !Self::compare_and_set_status(&txn, id, TransactionStatus::Pending, status, now).await? {
            let latest = ledger_transactions::Entity::find_by_id(id.into_inner())
                .one(&txn)
                .await?
                .unwrap_or(current);
            txn.commit().await?;
            return Ok(SettlementApplied::AlreadySettled(transaction(latest)));
        }

        let delta = BalanceDelta::settlement(
            current.transaction_type.into(),
            outcome,
            from_minor_units(current.amount_minor),
        );
        Self::shift_balances(&txn, current.wallet_id, delta, now).await?;
        txn.commit().await?;

        let mut settled = transaction(current);
        settled.status = status;
        settled.updated_at = utc(now);
        info!(
            reference = %settled.reference,
            wallet_id = %settled.wallet_id,
            status = ?status,
            "Ledger transaction settled"
        );
        Ok(SettlementApplied::Applied(settled))
    }

    /// Reverses a successful transaction and undoes its balance delta.
    ///
    /// Returns `true` only if this call performed the reversal.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if the transaction does not exist.
    pub async fn reverse(&self, id: LedgerTransactionId) -> Result<bool, RepositoryError> {
        let txn = self.db.begin().await?;

        let Some(current) = ledger_transactions::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await?
        else {
            return Err(RepositoryError::TransactionNotFound(id.into_inner()));
        };

        let now = now();
        if !Self::compare_and_set_status(
            &txn,
            id,
            TransactionStatus::Successful,
            TransactionStatus::Reversed,
            now,
        )
        .await?
        {
            txn.commit().await?;
            return Ok(false);
        }

        let delta = BalanceDelta::reversal(
            current.transaction_type.into(),
            from_minor_units(current.amount_minor),
        );
        Self::shift_balances(&txn, current.wallet_id, delta, now).await?;
        txn.commit().await?;

        info!(reference = %current.reference, "Ledger transaction reversed");
        Ok(true)
    }

    /// Moves `amount` from `available` into a hold, if enough is available.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` when the conditional update matches nothing.
    pub async fn place_hold(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, RepositoryError> {
        let amount_minor = minor(amount)?;
        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::AvailableMinor,
                Expr::col(wallets::Column::AvailableMinor).sub(amount_minor),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now()))
            .filter(wallets::Column::Id.eq(wallet_id.into_inner()))
            .filter(wallets::Column::AvailableMinor.gte(amount_minor))
            .exec(&self.db)
            .await?;

        let wallet = self.wallet_by_id(wallet_id).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::InsufficientFunds {
                available: wallet.available,
                requested: amount,
            });
        }
        Ok(wallet)
    }

    /// Returns a hold to `available`.
    ///
    /// # Errors
    ///
    /// Returns `WalletNotFound` if the wallet does not exist.
    pub async fn release_hold(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, RepositoryError> {
        Self::shift_balances(
            &self.db,
            wallet_id.into_inner(),
            BalanceDelta::hold_release(amount),
            now(),
        )
        .await?;
        self.wallet_by_id(wallet_id).await
    }

    /// Lists a wallet's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(
        &self,
        wallet_id: WalletId,
        page: &PageRequest,
    ) -> Result<(Vec<LedgerTransaction>, u64), RepositoryError> {
        let query = ledger_transactions::Entity::find()
            .filter(ledger_transactions::Column::WalletId.eq(wallet_id.into_inner()));

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(ledger_transactions::Column::CreatedAt)
            .order_by_desc(ledger_transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok((rows.into_iter().map(transaction).collect(), total))
    }

    async fn compare_and_set_status<C: ConnectionTrait>(
        conn: &C,
        id: LedgerTransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        now: sea_orm::prelude::DateTimeWithTimeZone,
    ) -> Result<bool, RepositoryError> {
        let result = ledger_transactions::Entity::update_many()
            .col_expr(
                ledger_transactions::Column::Status,
                Expr::value(db::TransactionStatus::from(to)),
            )
            .col_expr(ledger_transactions::Column::UpdatedAt, Expr::value(now))
            .filter(ledger_transactions::Column::Id.eq(id.into_inner()))
            .filter(ledger_transactions::Column::Status.eq(db::TransactionStatus::from(from)))
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn shift_balances<C: ConnectionTrait>(
        conn: &C,
        wallet_id: Uuid,
        delta: BalanceDelta,
        now: sea_orm::prelude::DateTimeWithTimeZone,
    ) -> Result<(), RepositoryError> {
        if delta.is_zero() {
            return Ok(());
        }

        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::AvailableMinor,
                Expr::col(wallets::Column::AvailableMinor).add(minor(delta.available)?),
            )
            .col_expr(
                wallets::Column::LedgerMinor,
                Expr::col(wallets::Column::LedgerMinor).add(minor(delta.ledger)?),
            )
            .col_expr(wallets::Column::UpdatedAt, Expr::value(now))
            .filter(wallets::Column::Id.eq(wallet_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::WalletNotFound(wallet_id));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn get_or_create_wallet(
        &self,
        account_id: AccountId,
        currency: Currency,
    ) -> Result<Wallet, LedgerError> {
        Ok(Self::get_or_create_wallet(self, account_id, currency).await?)
    }

    async fn find_wallet_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Wallet>, LedgerError> {
        Ok(self.find_wallet(account_id).await?)
    }

    async fn wallet_by_id(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError> {
        Ok(Self::wallet_by_id(self, wallet_id).await?)
    }

    async fn create_transaction(
        &self,
        tx: NewLedgerTransaction,
    ) -> Result<LedgerTransaction, LedgerError> {
        Ok(Self::create_transaction(self, tx).await?)
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        Ok(self.find_by_reference(reference).await?)
    }

    async fn set_gateway_reference(
        &self,
        id: LedgerTransactionId,
        gateway_reference: &str,
    ) -> Result<(), LedgerError> {
        Ok(Self::set_gateway_reference(self, id, gateway_reference).await?)
    }

    async fn apply_settlement(
        &self,
        id: LedgerTransactionId,
        outcome: SettlementOutcome,
    ) -> Result<SettlementApplied, LedgerError> {
        Ok(self.settle(id, outcome).await?)
    }

    async fn reverse(&self, id: LedgerTransactionId) -> Result<bool, LedgerError> {
        Ok(Self::reverse(self, id).await?)
    }

    async fn place_hold(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, LedgerError> {
        Ok(Self::place_hold(self, wallet_id, amount).await?)
    }

    async fn release_hold(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, LedgerError> {
        Ok(Self::release_hold(self, wallet_id, amount).await?)
    }

    async fn list_transactions(
        &self,
        wallet_id: WalletId,
        page: &PageRequest,
    ) -> Result<(Vec<LedgerTransaction>, u64), LedgerError> {
        Ok(self.list(wallet_id, page).await?)
    }
}
