//! `SeaORM` entities.

pub mod prelude;

pub mod ledger_transactions;
pub mod orders;
pub mod pos_transactions;
pub mod product_variants;
pub mod products;
pub mod sea_orm_active_enums;
pub mod wallets;
