//! Repository abstractions for data access.
//!
//! Repositories implement the storage ports of `storeledger-core`, hiding the
//! `SeaORM` implementation details from the settlement logic.

mod error;
mod mapping;

pub mod ledger;
pub mod product;
pub mod sale;

pub use error::RepositoryError;
pub use ledger::LedgerRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
