//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{
    Currency, MoneyError, amounts_match, from_minor_units, is_whole_minor_units, to_minor_units,
};
pub use pagination::{PageMeta, PageRequest, PageResponse};
