//! Product repository: catalog rows and their stock counters.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use storeledger_core::inventory::Product;
use storeledger_core::store::{InventoryStore, StoreError};
use storeledger_shared::types::{ProductId, VariantId};

use super::error::RepositoryError;
use super::mapping::{minor, now, product};
use crate::entities::{product_variants, products};

/// Product repository for database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    db: DatabaseConnection,
}

impl ProductRepository {
    /// Creates a new product repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a product and its variants.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is stored in that case.
    pub async fn create(&self, product: &Product) -> Result<(), RepositoryError> {
        let now = now();
        let txn = self.db.begin().await?;

        products::ActiveModel {
            id: Set(product.id.into_inner()),
            name: Set(product.name.clone()),
            price_minor: Set(minor(product.price)?),
            stock: Set(product.stock.max(0)),
            sold: Set(product.sold),
            revenue_minor: Set(minor(product.revenue)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (position, variant) in (0_i32..).zip(&product.variants) {
            let attributes =
                serde_json::to_value(&variant.attributes).map_err(RepositoryError::corrupt)?;
            product_variants::ActiveModel {
                id: Set(variant.id.into_inner()),
                product_id: Set(product.id.into_inner()),
                position: Set(position),
                attributes: Set(attributes),
                price_minor: Set(minor(variant.price)?),
                stock: Set(variant.stock.max(0)),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Loads a product with its variants in their stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be mapped.
    pub async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(model) = products::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let variants = product_variants::Entity::find()
            .filter(product_variants::Column::ProductId.eq(id.into_inner()))
            .order_by_asc(product_variants::Column::Position)
            .all(&self.db)
            .await?;

        product(model, variants).map(Some)
    }

    /// Lists all products, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let models = products::Entity::find()
            .order_by_asc(products::Column::Name)
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(models.len());
        for model in models {
            let variants = product_variants::Entity::find()
                .filter(product_variants::Column::ProductId.eq(model.id))
                .order_by_asc(product_variants::Column::Position)
                .all(&self.db)
                .await?;
            result.push(product(model, variants)?);
        }
        Ok(result)
    }

    /// `stock - quantity` if positive, else `0`, as a single SQL expression.
    fn floored_stock<C: ColumnTrait>(column: C, quantity: u32) -> SimpleExpr {
        let quantity = i64::from(quantity);
        Expr::case(
            Expr::col(column).gt(quantity),
            Expr::col(column).sub(quantity),
        )
        .finally(0_i64)
        .into()
    }

    /// Decrements a variant's stock, never below zero.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the variant does not exist.
    pub async fn decrement_variant(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = product_variants::Entity::update_many()
            .col_expr(
                product_variants::Column::Stock,
                Self::floored_stock(product_variants::Column::Stock, quantity),
            )
            .col_expr(product_variants::Column::UpdatedAt, Expr::value(now()))
            .filter(product_variants::Column::Id.eq(variant_id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(format!("variant {variant_id}")));
        }
        Ok(())
    }

    /// Decrements a product's flat stock, never below zero.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn decrement_product(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = products::Entity::update_many()
            .col_expr(
                products::Column::Stock,
                Self::floored_stock(products::Column::Stock, quantity),
            )
            .col_expr(products::Column::UpdatedAt, Expr::value(now()))
            .filter(products::Column::Id.eq(product_id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(format!("product {product_id}")));
        }
        Ok(())
    }

    /// Adds a confirmed sale to the `sold` and `revenue` counters.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: u32,
        revenue: Decimal,
    ) -> Result<(), RepositoryError> {
        let result = products::Entity::update_many()
            .col_expr(
                products::Column::Sold,
                Expr::col(products::Column::Sold).add(i64::from(quantity)),
            )
            .col_expr(
                products::Column::RevenueMinor,
                Expr::col(products::Column::RevenueMinor).add(minor(revenue)?),
            )
            .col_expr(products::Column::UpdatedAt, Expr::value(now()))
            .filter(products::Column::Id.eq(product_id.into_inner()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound(format!("product {product_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for ProductRepository {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.find(id).await?)
    }

    async fn decrement_variant_stock(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        Ok(self.decrement_variant(variant_id, quantity).await?)
    }

    async fn decrement_product_stock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        Ok(self.decrement_product(product_id, quantity).await?)
    }

    async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: u32,
        revenue: Decimal,
    ) -> Result<(), StoreError> {
        Ok(Self::record_sale(self, product_id, quantity, revenue).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;
    use rust_decimal_macros::dec;
    use storeledger_core::inventory::{Variant, VariantAttributes};

    fn shirt() -> Product {
        Product {
            id: ProductId::new(),
            name: "Shirt".into(),
            price: dec!(5000),
            stock: 4,
            sold: 0,
            revenue: Decimal::ZERO,
            variants: vec![
                Variant {
                    id: VariantId::new(),
                    attributes: VariantAttributes::from_pairs([("Size", "S"), ("Color", "Red")]),
                    price: dec!(4500),
                    stock: 10,
                },
                Variant {
                    id: VariantId::new(),
                    attributes: VariantAttributes::from_pairs([("Size", "M"), ("Color", "Red")]),
                    price: dec!(5500),
                    stock: 5,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_and_find_keeps_variant_order() {
        let repo = ProductRepository::new(memory_db().await);
        let product = shirt();
        repo.create(&product).await.unwrap();

        let found = repo.find(product.id).await.unwrap().unwrap();
        assert_eq!(found, product);
        assert!(repo.find(ProductId::new()).await.unwrap().is_none());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_variant_decrement_only_touches_target() {
        let repo = ProductRepository::new(memory_db().await);
        let product = shirt();
        repo.create(&product).await.unwrap();

        repo.decrement_variant(product.variants[1].id, 2).await.unwrap();

        let found = repo.find(product.id).await.unwrap().unwrap();
        assert_eq!(found.variants[0].stock, 10);
        assert_eq!(found.variants[1].stock, 3);
        assert_eq!(found.stock, 4);
    }

    #[tokio::test]
    async fn test_decrements_floor_at_zero() {
        let repo = ProductRepository::new(memory_db().await);
        let product = shirt();
        repo.create(&product).await.unwrap();

        repo.decrement_product(product.id, 9).await.unwrap();
        repo.decrement_variant(product.variants[1].id, 5).await.unwrap();

        let found = repo.find(product.id).await.unwrap().unwrap();
        assert_eq!(found.stock, 0);
        assert_eq!(found.variants[1].stock, 0);
    }

    #[tokio::test]
    async fn test_record_sale_accumulates() {
        let repo = ProductRepository::new(memory_db().await);
        let product = shirt();
        repo.create(&product).await.unwrap();

        repo.record_sale(product.id, 2, dec!(11000)).await.unwrap();
        repo.record_sale(product.id, 1, dec!(4500.25)).await.unwrap();

        let found = repo.find(product.id).await.unwrap().unwrap();
        assert_eq!(found.sold, 3);
        assert_eq!(found.revenue, dec!(15500.25));
    }

    #[tokio::test]
    async fn test_missing_rows_are_reported() {
        let repo = ProductRepository::new(memory_db().await);
        let err: StoreError = repo
            .decrement_variant(VariantId::new(), 1)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
