//! Product and variant types.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{ProductId, VariantId};

use super::error::InventoryError;
use super::matcher::attributes_match;

/// One (name, value) pair of a variant, e.g. `Size = M`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl VariantAttribute {
    /// Creates an attribute pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered attribute set of a variant; also used as a selector in cart items.
///
/// Accepts either a list of `{name, value}` objects or a plain
/// `{"Size": "M"}` object when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttributesRepr")]
pub struct VariantAttributes(pub Vec<VariantAttribute>);

#[derive(Deserialize)]
#[serde(untagged)]
enum AttributesRepr {
    List(Vec<VariantAttribute>),
    Map(BTreeMap<String, String>),
}

impl From<AttributesRepr> for VariantAttributes {
    fn from(repr: AttributesRepr) -> Self {
        match repr {
            AttributesRepr::List(list) => Self(list),
            AttributesRepr::Map(map) => Self(
                map.into_iter()
                    .map(|(name, value)| VariantAttribute { name, value })
                    .collect(),
            ),
        }
    }
}

impl VariantAttributes {
    /// Builds an attribute set from pairs.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(n, v)| VariantAttribute::new(n, v))
                .collect(),
        )
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the pairs in order.
    pub fn iter(&self) -> std::slice::Iter<'_, VariantAttribute> {
        self.0.iter()
    }
}

impl fmt::Display for VariantAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for attr in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", attr.name, attr.value)?;
            first = false;
        }
        Ok(())
    }
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Unique identifier.
    pub id: VariantId,
    /// Composite key of the variant.
    pub attributes: VariantAttributes,
    /// Unit price of this variant.
    pub price: Decimal,
    /// Units in stock, never negative.
    pub stock: i64,
}

/// A catalog product with its stock counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Base unit price.
    pub price: Decimal,
    /// Flat stock used when no variant applies.
    pub stock: i64,
    /// Units sold through confirmed sales.
    pub sold: i64,
    /// Revenue from confirmed sales.
    pub revenue: Decimal,
    /// Variants, possibly empty.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

/// Which stock counter a line item draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget<'a> {
    /// A specific variant.
    Variant(&'a Variant),
    /// The product's flat stock.
    Product,
}

impl Product {
    /// Returns the variant whose attribute set equals `selector`.
    #[must_use]
    pub fn find_variant(&self, selector: &VariantAttributes) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| attributes_match(selector, &v.attributes))
    }

    /// Resolves the stock counter for an optional selector.
    ///
    /// A non-empty selector on a product with variants must match one of
    /// them. Anything else draws from the flat stock.
    pub fn resolve(
        &self,
        selector: Option<&VariantAttributes>,
    ) -> Result<StockTarget<'_>, InventoryError> {
        match selector {
            Some(selector) if !selector.is_empty() && !self.variants.is_empty() => self
                .find_variant(selector)
                .map(StockTarget::Variant)
                .ok_or_else(|| InventoryError::VariantNotFound {
                    product_id: self.id,
                    selector: selector.to_string(),
                }),
            _ => Ok(StockTarget::Product),
        }
    }

    /// Unit price for an optional selector.
    pub fn unit_price(&self, selector: Option<&VariantAttributes>) -> Result<Decimal, InventoryError> {
        Ok(match self.resolve(selector)? {
            StockTarget::Variant(v) => v.price,
            StockTarget::Product => self.price,
        })
    }
}

/// Stock after removing `quantity` units, never below zero.
#[must_use]
pub fn floored_decrement(stock: i64, quantity: u32) -> i64 {
    stock.saturating_sub(i64::from(quantity)).max(0)
}
