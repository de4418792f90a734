//! Scenario tests for the reconciler.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storeledger_shared::types::{AccountId, Currency, ProductId};

use super::error::ReconcileError;
use super::types::{AssertedOutcome, Notification, NotificationSource, SettlementState};
use crate::gateway::{GatewayError, VerifiedTransaction};
use crate::inventory::{Product, Variant, VariantAttributes};
use crate::sale::{FulfillmentStatus, PaymentStatus, Sale, SaleKind, SaleLineItem};
use crate::store::LedgerStore;
use crate::testing::{Harness, sample_product};
use crate::wallet::{TransactionStatus, WalletService, WithdrawalRequest};

fn line(product_id: ProductId, quantity: u32, unit_price: Decimal) -> SaleLineItem {
    SaleLineItem {
        product_id,
        variant: None,
        quantity,
        unit_price,
    }
}

fn webhook(reference: &str, outcome: AssertedOutcome, amount: Option<Decimal>) -> Notification {
    Notification {
        reference: reference.to_string(),
        outcome,
        amount,
        currency: Some("NGN".to_string()),
        gateway_transaction_id: Some("4975363".to_string()),
        source: NotificationSource::Webhook,
    }
}

fn verified(sale: &Sale, status: &str, amount: Decimal) -> VerifiedTransaction {
    VerifiedTransaction {
        id: "4975363".to_string(),
        status: status.to_string(),
        amount,
        currency: "NGN".to_string(),
        tx_ref: sale.reference.clone(),
    }
}

async fn order_of_5000(harness: &Harness, product: &Product) -> Sale {
    harness
        .pending_sale(
            SaleKind::Order,
            vec![line(product.id, 2, dec!(2500))],
            1_700_000_000_000,
        )
        .await
}

// ============================================================================
// Sales
// ============================================================================

#[tokio::test]
async fn test_success_marks_order_paid_and_applies_inventory() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;

    let outcome = harness
        .reconciler()
        .process(&webhook(&sale.reference, AssertedOutcome::Successful, Some(dec!(5000))))
        .await
        .unwrap();

    assert!(outcome.applied);
    assert_eq!(outcome.state, SettlementState::Succeeded);
    assert!(outcome.inventory.unwrap().is_complete());

    let stored = harness.sales.get(SaleKind::Order, sale.id).unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.fulfillment_status, Some(FulfillmentStatus::Processing));
    assert_eq!(stored.gateway_transaction_id.as_deref(), Some("4975363"));

    let product = harness.inventory.product(product.id).unwrap();
    assert_eq!(product.stock, 8);
    assert_eq!(product.sold, 2);
    assert_eq!(product.revenue, dec!(5000));
}

#[tokio::test]
async fn test_duplicate_deliveries_apply_once() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    let reconciler = harness.reconciler();

    let mut applied = 0;
    for _ in 0..5 {
        let outcome = reconciler
            .process(&webhook(&sale.reference, AssertedOutcome::Successful, Some(dec!(5000))))
            .await
            .unwrap();
        assert_eq!(outcome.state, SettlementState::Succeeded);
        if outcome.applied {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(harness.inventory.decrements(), 1);
    assert_eq!(harness.inventory.product(product.id).unwrap().stock, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_webhook_and_callback_race_decrements_stock_once() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    assert!(sale.reference.ends_with("-1700000000000"));
    harness
        .gateway
        .script_verify("4975363", Ok(verified(&sale, "successful", dec!(5000))));

    let mut handles = Vec::new();
    for i in 0..8 {
        let reconciler = harness.reconciler();
        let reference = sale.reference.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                reconciler
                    .process(&webhook(&reference, AssertedOutcome::Successful, Some(dec!(5000))))
                    .await
            } else {
                reconciler.verify_and_process(&reference, "4975363").await
            }
        }));
    }

    let mut applied = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.state, SettlementState::Succeeded);
        if outcome.applied {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(harness.inventory.decrements(), 1);
    let product = harness.inventory.product(product.id).unwrap();
    assert_eq!(product.stock, 8);
    assert_eq!(product.sold, 2);
}

#[tokio::test]
async fn test_amount_mismatch_leaves_sale_pending() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    let reconciler = harness.reconciler();

    let err = reconciler
        .process(&webhook(&sale.reference, AssertedOutcome::Successful, Some(dec!(50))))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::AmountMismatch { .. }));

    let err = reconciler
        .process(&webhook(&sale.reference, AssertedOutcome::Successful, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::AmountMismatch { actual: None, .. }));

    assert_eq!(
        harness.sales.get(SaleKind::Order, sale.id).unwrap().payment_status,
        PaymentStatus::Pending
    );
    assert_eq!(harness.inventory.decrements(), 0);

    // A correct payment can still settle it.
    let outcome = reconciler
        .process(&webhook(&sale.reference, AssertedOutcome::Successful, Some(dec!(5000.00))))
        .await
        .unwrap();
    assert!(outcome.applied);
}

#[tokio::test]
async fn test_currency_mismatch_is_rejected() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;

    let mut notification = webhook(&sale.reference, AssertedOutcome::Successful, Some(dec!(5000)));
    notification.currency = Some("USD".to_string());

    let err = harness.reconciler().process(&notification).await.unwrap_err();
    assert_eq!(err.error_code(), "CURRENCY_MISMATCH");
    assert_eq!(
        harness.sales.get(SaleKind::Order, sale.id).unwrap().payment_status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn test_malformed_reference_does_no_lookup() {
    let harness = Harness::new();

    let err = harness
        .reconciler()
        .process(&webhook("garbage", AssertedOutcome::Successful, Some(dec!(5000))))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::MalformedReference(_)));
    assert_eq!(harness.sales.lookups(), 0);
    assert!(harness.sales.all().is_empty());
}

#[tokio::test]
async fn test_unknown_or_stale_reference_is_not_found() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    let reconciler = harness.reconciler();

    let unknown = format!("ORD-{}-1700000000000", uuid::Uuid::now_v7().simple());
    let err = reconciler
        .process(&webhook(&unknown, AssertedOutcome::Successful, Some(dec!(5000))))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::SaleNotFound(_)));

    let stale = format!("ORD-{}-1600000000000", sale.id.simple());
    let err = reconciler
        .process(&webhook(&stale, AssertedOutcome::Successful, Some(dec!(5000))))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::SaleNotFound(_)));

    assert_eq!(harness.inventory.decrements(), 0);
}

#[tokio::test]
async fn test_failed_sale_is_terminal() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    let reconciler = harness.reconciler();

    let failed = reconciler
        .process(&webhook(&sale.reference, AssertedOutcome::Failed, Some(dec!(5000))))
        .await
        .unwrap();
    assert!(failed.applied);
    assert_eq!(failed.state, SettlementState::Failed);
    assert!(failed.inventory.is_none());

    let late_success = reconciler
        .process(&webhook(&sale.reference, AssertedOutcome::Successful, Some(dec!(5000))))
        .await
        .unwrap();
    assert!(!late_success.applied);
    assert_eq!(late_success.state, SettlementState::Failed);
    assert_eq!(harness.inventory.decrements(), 0);
}

#[tokio::test]
async fn test_cancelled_sale() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;

    let outcome = harness
        .reconciler()
        .process(&webhook(&sale.reference, AssertedOutcome::Cancelled, None))
        .await
        .unwrap();

    assert_eq!(outcome.state, SettlementState::Cancelled);
    assert_eq!(
        harness.sales.get(SaleKind::Order, sale.id).unwrap().payment_status,
        PaymentStatus::Cancelled
    );
}

#[tokio::test]
async fn test_reversal_does_not_apply_to_sales() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;

    let err = harness
        .reconciler()
        .process(&webhook(&sale.reference, AssertedOutcome::Reversed, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::UnsupportedOutcome { .. }));
}

#[tokio::test]
async fn test_variant_stock_resolution_through_reconciler() {
    let mut product = sample_product(dec!(2500), 0);
    product.variants = vec![
        Variant {
            id: storeledger_shared::types::VariantId::new(),
            attributes: VariantAttributes::from_pairs([("Size", "S"), ("Color", "Red")]),
            price: dec!(2500),
            stock: 10,
        },
        Variant {
            id: storeledger_shared::types::VariantId::new(),
            attributes: VariantAttributes::from_pairs([("Size", "M"), ("Color", "Red")]),
            price: dec!(2500),
            stock: 5,
        },
    ];
    let harness = Harness::with_products([product.clone()]);
    let sale = harness
        .pending_sale(
            SaleKind::Pos,
            vec![SaleLineItem {
                product_id: product.id,
                variant: Some(VariantAttributes::from_pairs([("Size", "M"), ("Color", "Red")])),
                quantity: 2,
                unit_price: dec!(2500),
            }],
            1_700_000_000_000,
        )
        .await;

    harness
        .reconciler()
        .complete_locally(SaleKind::Pos, sale.id)
        .await
        .unwrap();

    let stored = harness.inventory.product(product.id).unwrap();
    assert_eq!(stored.variants[0].stock, 10);
    assert_eq!(stored.variants[1].stock, 3);
    assert_eq!(stored.stock, 0);
}

#[tokio::test]
async fn test_complete_locally_is_idempotent() {
    let product = sample_product(dec!(1000), 3);
    let harness = Harness::with_products([product.clone()]);
    let sale = harness
        .pending_sale(SaleKind::Pos, vec![line(product.id, 5, dec!(1000))], 1)
        .await;
    let reconciler = harness.reconciler();

    let first = reconciler.complete_locally(SaleKind::Pos, sale.id).await.unwrap();
    let second = reconciler.complete_locally(SaleKind::Pos, sale.id).await.unwrap();

    assert!(first.applied);
    assert!(!second.applied);
    assert_eq!(second.state, SettlementState::Succeeded);
    // Stock is floored at zero.
    assert_eq!(harness.inventory.product(product.id).unwrap().stock, 0);

    let missing = reconciler
        .complete_locally(SaleKind::Pos, uuid::Uuid::now_v7())
        .await
        .unwrap_err();
    assert_eq!(missing.http_status_code(), 404);
}

// ============================================================================
// Callback verification
// ============================================================================

#[tokio::test]
async fn test_verify_rejects_foreign_transaction() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    let mut foreign = verified(&sale, "successful", dec!(5000));
    foreign.tx_ref = format!("ORD-{}-1", uuid::Uuid::now_v7().simple());
    harness.gateway.script_verify("4975363", Ok(foreign));

    let err = harness
        .reconciler()
        .verify_and_process(&sale.reference, "4975363")
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::ReferenceMismatch { .. }));
    assert_eq!(
        harness.sales.get(SaleKind::Order, sale.id).unwrap().payment_status,
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn test_verify_pending_changes_nothing() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    harness
        .gateway
        .script_verify("4975363", Ok(verified(&sale, "pending", dec!(5000))));

    let outcome = harness
        .reconciler()
        .verify_and_process(&sale.reference, "4975363")
        .await
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.state, SettlementState::Pending);
}

#[tokio::test]
async fn test_verify_timeout_is_retryable_and_changes_nothing() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    harness
        .gateway
        .script_verify("4975363", Err(GatewayError::Timeout("30s".into())));

    let err = harness
        .reconciler()
        .verify_and_process(&sale.reference, "4975363")
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.http_status_code(), 504);
    assert_eq!(harness.inventory.decrements(), 0);
}

#[tokio::test]
async fn test_verify_failed_marks_sale_failed() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;
    harness
        .gateway
        .script_verify("4975363", Ok(verified(&sale, "failed", dec!(5000))));

    let outcome = harness
        .reconciler()
        .verify_and_process(&sale.reference, "4975363")
        .await
        .unwrap();

    assert_eq!(outcome.state, SettlementState::Failed);
    assert_eq!(
        harness.sales.get(SaleKind::Order, sale.id).unwrap().payment_status,
        PaymentStatus::Failed
    );
}

#[tokio::test]
async fn test_current_state_reads_without_mutation() {
    let product = sample_product(dec!(2500), 10);
    let harness = Harness::with_products([product.clone()]);
    let sale = order_of_5000(&harness, &product).await;

    let outcome = harness.reconciler().current_state(&sale.reference).await.unwrap();
    assert_eq!(outcome.state, SettlementState::Pending);
    assert!(!outcome.applied);
}

// ============================================================================
// Wallet ledger
// ============================================================================

fn withdrawal(amount: Decimal) -> WithdrawalRequest {
    WithdrawalRequest {
        amount,
        account_number: "0690000031".to_string(),
        bank_code: "044".to_string(),
        callback_url: "https://api.shop.test/api/v1/webhooks/flutterwave".to_string(),
    }
}

#[tokio::test]
async fn test_webhook_retry_storm_funds_wallet_once() {
    let harness = Harness::new();
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let account_id = AccountId::new();
    let funding = wallets
        .fund(account_id, Currency::Ngn, dec!(5000), Harness::customer(), "https://cb".into())
        .await
        .unwrap();
    let reconciler = harness.reconciler();

    let mut applied = 0;
    for _ in 0..5 {
        let outcome = reconciler
            .process(&webhook(
                &funding.transaction.reference,
                AssertedOutcome::Successful,
                Some(dec!(5000)),
            ))
            .await
            .unwrap();
        if outcome.applied {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    let wallet = harness.ledger.wallet(funding.transaction.wallet_id);
    assert_eq!(wallet.available, dec!(5000));
    assert_eq!(wallet.ledger, dec!(5000));
}

#[tokio::test]
async fn test_funding_amount_mismatch_credits_nothing() {
    let harness = Harness::new();
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let funding = wallets
        .fund(AccountId::new(), Currency::Ngn, dec!(5000), Harness::customer(), "https://cb".into())
        .await
        .unwrap();

    let err = harness
        .reconciler()
        .process(&webhook(
            &funding.transaction.reference,
            AssertedOutcome::Successful,
            Some(dec!(500)),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::AmountMismatch { .. }));
    assert_eq!(
        harness.ledger.wallet(funding.transaction.wallet_id).available,
        Decimal::ZERO
    );
}

#[tokio::test]
async fn test_funding_in_other_currency_credits_nothing() {
    let harness = Harness::new();
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let funding = wallets
        .fund(AccountId::new(), Currency::Ngn, dec!(5000), Harness::customer(), "https://cb".into())
        .await
        .unwrap();

    let mut notification = webhook(
        &funding.transaction.reference,
        AssertedOutcome::Successful,
        Some(dec!(5000)),
    );
    notification.currency = Some("USD".to_string());

    let err = harness
        .reconciler()
        .process(&notification)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::CurrencyMismatch { .. }));
    let wallet = harness.ledger.wallet(funding.transaction.wallet_id);
    assert_eq!(wallet.available, Decimal::ZERO);
    assert_eq!(wallet.ledger, Decimal::ZERO);
    let tx = harness
        .ledger
        .find_transaction_by_reference(&funding.transaction.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn test_withdrawal_settlement_and_reversal() {
    let harness = Harness::new();
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let account_id = AccountId::new();
    let wallet = harness
        .ledger
        .get_or_create_wallet(account_id, Currency::Ngn)
        .await
        .unwrap();
    harness.ledger.set_balances(wallet.id, dec!(10000), dec!(10000));

    let started = wallets
        .withdraw(account_id, Currency::Ngn, withdrawal(dec!(3000)))
        .await
        .unwrap();
    let reference = started.transaction.reference.clone();
    let reconciler = harness.reconciler();

    let settled = reconciler
        .process(&webhook(&reference, AssertedOutcome::Successful, Some(dec!(3000))))
        .await
        .unwrap();
    assert!(settled.applied);
    let after_debit = harness.ledger.wallet(wallet.id);
    assert_eq!(after_debit.available, dec!(7000));
    assert_eq!(after_debit.ledger, dec!(7000));

    let reversed = reconciler
        .process(&webhook(&reference, AssertedOutcome::Reversed, None))
        .await
        .unwrap();
    assert!(reversed.applied);
    assert_eq!(reversed.state, SettlementState::Reversed);

    let again = reconciler
        .process(&webhook(&reference, AssertedOutcome::Reversed, None))
        .await
        .unwrap();
    assert!(!again.applied);

    let restored = harness.ledger.wallet(wallet.id);
    assert_eq!(restored.available, dec!(10000));
    assert_eq!(restored.ledger, dec!(10000));
}

#[tokio::test]
async fn test_failed_withdrawal_refunds_available_once() {
    let harness = Harness::new();
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let account_id = AccountId::new();
    let wallet = harness
        .ledger
        .get_or_create_wallet(account_id, Currency::Ngn)
        .await
        .unwrap();
    harness.ledger.set_balances(wallet.id, dec!(1000), dec!(1000));

    let started = wallets
        .withdraw(account_id, Currency::Ngn, withdrawal(dec!(400)))
        .await
        .unwrap();
    let reconciler = harness.reconciler();

    for _ in 0..3 {
        reconciler
            .process(&webhook(
                &started.transaction.reference,
                AssertedOutcome::Failed,
                Some(dec!(400)),
            ))
            .await
            .unwrap();
    }

    let wallet = harness.ledger.wallet(wallet.id);
    assert_eq!(wallet.available, dec!(1000));
    assert_eq!(wallet.ledger, dec!(1000));
    let tx = harness
        .ledger
        .find_transaction_by_reference(&started.transaction.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Failed);
}

#[tokio::test]
async fn test_transfer_sent_while_gateway_unavailable_settles_from_webhook() {
    let harness = Harness::new();
    harness
        .gateway
        .fail_transfers(GatewayError::Unavailable("connection reset".into()));
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let account_id = AccountId::new();
    let wallet = harness
        .ledger
        .get_or_create_wallet(account_id, Currency::Ngn)
        .await
        .unwrap();
    harness.ledger.set_balances(wallet.id, dec!(1000), dec!(1000));

    let started = wallets
        .withdraw(account_id, Currency::Ngn, withdrawal(dec!(400)))
        .await
        .unwrap();
    assert_eq!(started.transaction.status, TransactionStatus::Pending);
    let held = harness.ledger.wallet(wallet.id);
    assert_eq!(held.available, dec!(600));
    assert_eq!(held.ledger, dec!(1000));

    let outcome = harness
        .reconciler()
        .process(&webhook(
            &started.transaction.reference,
            AssertedOutcome::Successful,
            Some(dec!(400)),
        ))
        .await
        .unwrap();

    assert!(outcome.applied);
    let settled = harness.ledger.wallet(wallet.id);
    assert_eq!(settled.available, dec!(600));
    assert_eq!(settled.ledger, dec!(600));
}

#[tokio::test]
async fn test_reversal_of_pending_transaction_is_ignored() {
    let harness = Harness::new();
    let wallets = WalletService::new(harness.ledger.clone(), harness.gateway.clone());
    let funding = wallets
        .fund(AccountId::new(), Currency::Ngn, dec!(100), Harness::customer(), "https://cb".into())
        .await
        .unwrap();

    let outcome = harness
        .reconciler()
        .process(&webhook(&funding.transaction.reference, AssertedOutcome::Reversed, None))
        .await
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.state, SettlementState::Pending);
}
