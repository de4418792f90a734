//! In-memory port implementations for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use storeledger_shared::types::{
    AccountId, Currency, LedgerTransactionId, PageRequest, ProductId, VariantId, WalletId,
};
use uuid::Uuid;

use crate::gateway::{
    ChargeRequest, GatewayError, PaymentGateway, TransferReceipt, TransferRequest,
    VerifiedTransaction,
};
use crate::inventory::{Product, floored_decrement};
use crate::reconcile::Reconciler;
use crate::reference::PaymentReference;
use crate::sale::{
    CheckoutService, Customer, NewSale, PaymentMethod, PaymentStatus, Sale, SaleKind,
    SaleLineItem, SaleTransition,
};
use crate::store::{InventoryStore, LedgerStore, SaleStore, StoreError};
use crate::wallet::{
    BalanceDelta, LedgerError, LedgerTransaction, NewLedgerTransaction, SettlementApplied,
    SettlementOutcome, TransactionStatus, Wallet,
};

// ============================================================================
// Sales
// ============================================================================

#[derive(Default)]
pub(crate) struct MemorySaleStore {
    sales: Mutex<HashMap<(SaleKind, Uuid), Sale>>,
    lookups: AtomicUsize,
}

impl MemorySaleStore {
    pub(crate) fn all(&self) -> Vec<Sale> {
        self.sales.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn get(&self, kind: SaleKind, id: Uuid) -> Option<Sale> {
        self.sales.lock().unwrap().get(&(kind, id)).cloned()
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SaleStore for MemorySaleStore {
    async fn create_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        let now = Utc::now();
        let stored = Sale {
            id: sale.id,
            kind: sale.kind,
            reference: sale.reference,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: matches!(sale.kind, SaleKind::Order)
                .then_some(crate::sale::FulfillmentStatus::Pending),
            total: sale.total,
            currency: sale.currency,
            items: sale.items,
            payment_method: sale.payment_method,
            gateway_transaction_id: None,
            customer: sale.customer,
            created_at: now,
            updated_at: now,
        };
        let mut sales = self.sales.lock().unwrap();
        if sales.values().any(|s| s.reference == stored.reference) {
            return Err(StoreError::Conflict(stored.reference));
        }
        sales.insert((stored.kind, stored.id), stored.clone());
        Ok(stored)
    }

    async fn find_sale(&self, kind: SaleKind, id: Uuid) -> Result<Option<Sale>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(kind, id))
    }

    async fn transition_payment_status(
        &self,
        kind: SaleKind,
        id: Uuid,
        transition: &SaleTransition,
    ) -> Result<bool, StoreError> {
        let mut sales = self.sales.lock().unwrap();
        let Some(sale) = sales.get_mut(&(kind, id)) else {
            return Ok(false);
        };
        if !sale.payment_status.is_pending() {
            return Ok(false);
        }
        sale.payment_status = transition.to;
        if transition.fulfillment.is_some() {
            sale.fulfillment_status = transition.fulfillment;
        }
        if transition.gateway_transaction_id.is_some() {
            sale.gateway_transaction_id.clone_from(&transition.gateway_transaction_id);
        }
        sale.updated_at = Utc::now();
        Ok(true)
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Default)]
struct LedgerState {
    wallets: HashMap<WalletId, Wallet>,
    transactions: Vec<LedgerTransaction>,
}

impl LedgerState {
    fn wallet_mut(&mut self, id: WalletId) -> Result<&mut Wallet, LedgerError> {
        self.wallets
            .get_mut(&id)
            .ok_or_else(|| LedgerError::WalletNotFound(id.to_string()))
    }

    fn index_of(&self, id: LedgerTransactionId) -> Result<usize, LedgerError> {
        self.transactions
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))
    }
}

#[derive(Default)]
pub(crate) struct MemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl MemoryLedgerStore {
    pub(crate) fn set_balances(&self, wallet_id: WalletId, available: Decimal, ledger: Decimal) {
        let mut state = self.state.lock().unwrap();
        let wallet = state.wallets.get_mut(&wallet_id).unwrap();
        wallet.available = available;
        wallet.ledger = ledger;
    }

    pub(crate) fn wallet(&self, wallet_id: WalletId) -> Wallet {
        self.state.lock().unwrap().wallets[&wallet_id].clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_or_create_wallet(
        &self,
        account_id: AccountId,
        currency: Currency,
    ) -> Result<Wallet, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(wallet) = state.wallets.values().find(|w| w.account_id == account_id) {
            return Ok(wallet.clone());
        }
        let wallet = Wallet::open(account_id, currency);
        state.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn find_wallet_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Wallet>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .wallets
            .values()
            .find(|w| w.account_id == account_id)
            .cloned())
    }

    async fn wallet_by_id(&self, wallet_id: WalletId) -> Result<Wallet, LedgerError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.wallet_mut(wallet_id)?.clone())
    }

    async fn create_transaction(
        &self,
        tx: NewLedgerTransaction,
    ) -> Result<LedgerTransaction, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.wallet_mut(tx.wallet_id)?;
        if state.transactions.iter().any(|t| t.reference == tx.reference) {
            return Err(LedgerError::DuplicateReference(tx.reference));
        }
        let now = Utc::now();
        let stored = LedgerTransaction {
            id: tx.id,
            wallet_id: tx.wallet_id,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            status: TransactionStatus::Pending,
            description: tx.description,
            reference: tx.reference,
            counterparty: tx.counterparty,
            gateway_reference: None,
            created_at: now,
            updated_at: now,
        };
        state.transactions.push(stored.clone());
        Ok(stored)
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .transactions
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn set_gateway_reference(
        &self,
        id: LedgerTransactionId,
        gateway_reference: &str,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let idx = state.index_of(id)?;
        state.transactions[idx].gateway_reference = Some(gateway_reference.to_string());
        Ok(())
    }

    async fn apply_settlement(
        &self,
        id: LedgerTransactionId,
        outcome: SettlementOutcome,
    ) -> Result<SettlementApplied, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let idx = state.index_of(id)?;
        let tx = state.transactions[idx].clone();
        if tx.status.is_settled() {
            return Ok(SettlementApplied::AlreadySettled(tx));
        }
        let delta = BalanceDelta::settlement(tx.transaction_type, outcome, tx.amount);
        state.wallet_mut(tx.wallet_id)?.apply(delta);
        let stored = &mut state.transactions[idx];
        stored.status = outcome.status();
        stored.updated_at = Utc::now();
        Ok(SettlementApplied::Applied(stored.clone()))
    }

    async fn reverse(&self, id: LedgerTransactionId) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let idx = state.index_of(id)?;
        let tx = state.transactions[idx].clone();
        if !tx.status.can_transition_to(TransactionStatus::Reversed) {
            return Ok(false);
        }
        state
            .wallet_mut(tx.wallet_id)?
            .apply(BalanceDelta::reversal(tx.transaction_type, tx.amount));
        state.transactions[idx].status = TransactionStatus::Reversed;
        Ok(true)
    }

    async fn place_hold(&self, wallet_id: WalletId, amount: Decimal) -> Result<Wallet, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let wallet = state.wallet_mut(wallet_id)?;
        if wallet.available < amount {
            return Err(LedgerError::InsufficientFunds {
                available: wallet.available,
                requested: amount,
            });
        }
        wallet.apply(BalanceDelta::hold(amount));
        Ok(wallet.clone())
    }

    async fn release_hold(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Wallet, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let wallet = state.wallet_mut(wallet_id)?;
        wallet.apply(BalanceDelta::hold_release(amount));
        Ok(wallet.clone())
    }

    async fn list_transactions(
        &self,
        wallet_id: WalletId,
        page: &PageRequest,
    ) -> Result<(Vec<LedgerTransaction>, u64), LedgerError> {
        let state = self.state.lock().unwrap();
        let all: Vec<_> = state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect();
        let total = all.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap();
        let limit = usize::try_from(page.limit()).unwrap();
        Ok((all.into_iter().skip(offset).take(limit).collect(), total))
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Default)]
pub(crate) struct MemoryInventoryStore {
    products: Mutex<HashMap<ProductId, Product>>,
    decrements: AtomicUsize,
}

impl MemoryInventoryStore {
    pub(crate) fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: Mutex::new(products.into_iter().map(|p| (p.id, p)).collect()),
            decrements: AtomicUsize::new(0),
        }
    }

    pub(crate) fn product(&self, id: ProductId) -> Option<Product> {
        self.products.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn decrements(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.product(id))
    }

    async fn decrement_variant_stock(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        let mut products = self.products.lock().unwrap();
        let variant = products
            .values_mut()
            .flat_map(|p| p.variants.iter_mut())
            .find(|v| v.id == variant_id)
            .ok_or_else(|| StoreError::NotFound(variant_id.to_string()))?;
        variant.stock = floored_decrement(variant.stock, quantity);
        self.decrements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn decrement_product_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::NotFound(product_id.to_string()))?;
        product.stock = floored_decrement(product.stock, quantity);
        self.decrements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: u32,
        revenue: Decimal,
    ) -> Result<(), StoreError> {
        let mut products = self.products.lock().unwrap();
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::NotFound(product_id.to_string()))?;
        product.sold += i64::from(quantity);
        product.revenue += revenue;
        Ok(())
    }
}

// ============================================================================
// Gateway
// ============================================================================

#[derive(Default)]
pub(crate) struct ScriptedGateway {
    charge_error: Mutex<Option<GatewayError>>,
    account_error: Mutex<Option<GatewayError>>,
    transfer_error: Mutex<Option<GatewayError>>,
    verified: Mutex<HashMap<String, Result<VerifiedTransaction, GatewayError>>>,
    charges: Mutex<Vec<ChargeRequest>>,
    transfers: Mutex<Vec<TransferRequest>>,
}

impl ScriptedGateway {
    pub(crate) const PAYMENT_LINK: &'static str = "https://checkout.flutterwave.test/pay/abc";
    pub(crate) const ACCOUNT_NAME: &'static str = "ADA LOVELACE";
    pub(crate) const TRANSFER_ID: &'static str = "26251";

    pub(crate) fn fail_charges(&self, err: GatewayError) {
        *self.charge_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_account_lookup(&self, err: GatewayError) {
        *self.account_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_transfers(&self, err: GatewayError) {
        *self.transfer_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn script_verify(
        &self,
        transaction_id: &str,
        result: Result<VerifiedTransaction, GatewayError>,
    ) {
        self.verified
            .lock()
            .unwrap()
            .insert(transaction_id.to_string(), result);
    }

    pub(crate) fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().unwrap().clone()
    }

    pub(crate) fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize_charge(&self, request: &ChargeRequest) -> Result<String, GatewayError> {
        if let Some(err) = self.charge_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.charges.lock().unwrap().push(request.clone());
        Ok(Self::PAYMENT_LINK.to_string())
    }

    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, GatewayError> {
        self.verified
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::Rejected("No transaction was found".into())))
    }

    async fn verify_bank_account(
        &self,
        _account_number: &str,
        _bank_code: &str,
    ) -> Result<String, GatewayError> {
        match self.account_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(Self::ACCOUNT_NAME.to_string()),
        }
    }

    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, GatewayError> {
        self.transfers.lock().unwrap().push(request.clone());
        if let Some(err) = self.transfer_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(TransferReceipt {
            transfer_id: Self::TRANSFER_ID.to_string(),
            status: "NEW".to_string(),
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub(crate) fn sample_product(price: Decimal, stock: i64) -> Product {
    Product {
        id: ProductId::new(),
        name: "Ankara shirt".to_string(),
        price,
        stock,
        sold: 0,
        revenue: Decimal::ZERO,
        variants: vec![],
    }
}

pub(crate) struct Harness {
    pub sales: Arc<MemorySaleStore>,
    pub ledger: Arc<MemoryLedgerStore>,
    pub inventory: Arc<MemoryInventoryStore>,
    pub gateway: Arc<ScriptedGateway>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_products(Vec::<Product>::new())
    }

    pub(crate) fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            sales: Arc::new(MemorySaleStore::default()),
            ledger: Arc::new(MemoryLedgerStore::default()),
            inventory: Arc::new(MemoryInventoryStore::with_products(products)),
            gateway: Arc::new(ScriptedGateway::default()),
        }
    }

    pub(crate) fn customer() -> Customer {
        Customer {
            email: "ada@example.com".to_string(),
            name: Some("Ada Lovelace".to_string()),
            phone: None,
        }
    }

    pub(crate) fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.sales.clone(),
            self.ledger.clone(),
            self.inventory.clone(),
            self.gateway.clone(),
        )
    }

    pub(crate) fn checkout(&self) -> CheckoutService {
        CheckoutService::new(
            self.sales.clone(),
            self.inventory.clone(),
            self.gateway.clone(),
            self.reconciler(),
            Currency::Ngn,
        )
    }

    /// Stores a pending sale for `items`, with a reference issued at `issued_at_ms`.
    pub(crate) async fn pending_sale(
        &self,
        kind: SaleKind,
        items: Vec<SaleLineItem>,
        issued_at_ms: i64,
    ) -> Sale {
        let id = Uuid::now_v7();
        let reference =
            PaymentReference::with_timestamp(kind.reference_kind(), id, issued_at_ms).to_string();
        let total = items.iter().map(SaleLineItem::line_total).sum();
        self.sales
            .create_sale(NewSale {
                id,
                kind,
                reference,
                total,
                currency: Currency::Ngn,
                items,
                payment_method: PaymentMethod::Card,
                customer: Self::customer(),
            })
            .await
            .unwrap()
    }
}
