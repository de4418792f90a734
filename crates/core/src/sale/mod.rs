//! Sales: e-commerce orders and point-of-sale transactions.
//!
//! - Sale types and payment/fulfillment statuses
//! - Cart pricing and checkout initiation

pub mod checkout;
pub mod types;

pub use checkout::{CartItem, CheckoutError, CheckoutResult, CheckoutService, PricedCart, price_cart};
pub use types::{
    Customer, FulfillmentStatus, NewSale, PaymentMethod, PaymentStatus, Sale, SaleKind,
    SaleLineItem, SaleTransition,
};
