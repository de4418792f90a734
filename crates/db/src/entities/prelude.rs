//! Entity re-exports.

pub use super::ledger_transactions::Entity as LedgerTransactions;
pub use super::orders::Entity as Orders;
pub use super::pos_transactions::Entity as PosTransactions;
pub use super::product_variants::Entity as ProductVariants;
pub use super::products::Entity as Products;
pub use super::wallets::Entity as Wallets;
