//! Sale repository: storefront orders and POS transactions.
//!
//! Both tables share the same settlement columns. The payment status only
//! leaves `pending` through a single conditional `UPDATE`, which is what makes
//! paid side effects run at most once per sale.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use storeledger_core::sale::{NewSale, Sale, SaleKind, SaleTransition};
use storeledger_core::store::{SaleStore, StoreError};
use storeledger_shared::types::from_minor_units;
use uuid::Uuid;

use super::error::{RepositoryError, is_unique_violation};
use super::mapping::{currency, customer, items_from_json, items_to_json, minor, now, utc};
use crate::entities::{orders, pos_transactions, sea_orm_active_enums as db};

/// Sale repository for database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: DatabaseConnection,
}

impl SaleRepository {
    /// Creates a new sale repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a pending sale.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateReference` if the reference is taken, or a database
    /// error.
    pub async fn create(&self, sale: NewSale) -> Result<Sale, RepositoryError> {
        let now = now();
        let total_minor = minor(sale.total)?;
        let items = items_to_json(&sale.items)?;
        let reference = sale.reference.clone();

        let inserted = match sale.kind {
            SaleKind::Order => orders::ActiveModel {
                id: Set(sale.id),
                reference: Set(sale.reference),
                payment_status: Set(db::PaymentStatus::Pending),
                status: Set(db::FulfillmentStatus::Pending),
                total_minor: Set(total_minor),
                currency: Set(sale.currency.code().to_string()),
                items: Set(items),
                payment_method: Set(sale.payment_method.into()),
                gateway_transaction_id: Set(None),
                customer_email: Set(sale.customer.email),
                customer_name: Set(sale.customer.name),
                customer_phone: Set(sale.customer.phone),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await
            .map(order_to_sale),
            SaleKind::Pos => pos_transactions::ActiveModel {
                id: Set(sale.id),
                reference: Set(sale.reference),
                payment_status: Set(db::PaymentStatus::Pending),
                total_minor: Set(total_minor),
                currency: Set(sale.currency.code().to_string()),
                items: Set(items),
                payment_method: Set(sale.payment_method.into()),
                gateway_transaction_id: Set(None),
                customer_email: Set(sale.customer.email),
                customer_name: Set(sale.customer.name),
                customer_phone: Set(sale.customer.phone),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&self.db)
            .await
            .map(pos_to_sale),
        };

        match inserted {
            Ok(sale) => sale,
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::DuplicateReference(reference)),
            Err(e) => Err(e.into()),
        }
    }

    /// Finds a sale by kind and id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be mapped.
    pub async fn find(&self, kind: SaleKind, id: Uuid) -> Result<Option<Sale>, RepositoryError> {
        match kind {
            SaleKind::Order => orders::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(order_to_sale)
                .transpose(),
            SaleKind::Pos => pos_transactions::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .map(pos_to_sale)
                .transpose(),
        }
    }

    /// Moves a pending sale to `transition.to`.
    ///
    /// Returns `true` only if this call changed the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn transition(
        &self,
        kind: SaleKind,
        id: Uuid,
        transition: &SaleTransition,
    ) -> Result<bool, RepositoryError> {
        let now = now();
        let to = db::PaymentStatus::from(transition.to);

        let rows_affected = match kind {
            SaleKind::Order => {
                let mut update = orders::Entity::update_many()
                    .col_expr(orders::Column::PaymentStatus, Expr::value(to))
                    .col_expr(orders::Column::UpdatedAt, Expr::value(now));
                if let Some(fulfillment) = transition.fulfillment {
                    update = update.col_expr(
                        orders::Column::Status,
                        Expr::value(db::FulfillmentStatus::from(fulfillment)),
                    );
                }
                if let Some(gateway_id) = &transition.gateway_transaction_id {
                    update = update.col_expr(
                        orders::Column::GatewayTransactionId,
                        Expr::value(gateway_id.clone()),
                    );
                }
                update
                    .filter(orders::Column::Id.eq(id))
                    .filter(orders::Column::PaymentStatus.eq(db::PaymentStatus::Pending))
                    .exec(&self.db)
                    .await?
                    .rows_affected
            }
            SaleKind::Pos => {
                let mut update = pos_transactions::Entity::update_many()
                    .col_expr(pos_transactions::Column::PaymentStatus, Expr::value(to))
                    .col_expr(pos_transactions::Column::UpdatedAt, Expr::value(now));
                if let Some(gateway_id) = &transition.gateway_transaction_id {
                    update = update.col_expr(
                        pos_transactions::Column::GatewayTransactionId,
                        Expr::value(gateway_id.clone()),
                    );
                }
                update
                    .filter(pos_transactions::Column::Id.eq(id))
                    .filter(pos_transactions::Column::PaymentStatus.eq(db::PaymentStatus::Pending))
                    .exec(&self.db)
                    .await?
                    .rows_affected
            }
        };

        Ok(rows_affected == 1)
    }
}

fn order_to_sale(model: orders::Model) -> Result<Sale, RepositoryError> {
    Ok(Sale {
        id: model.id,
        kind: SaleKind::Order,
        reference: model.reference,
        payment_status: model.payment_status.into(),
        fulfillment_status: Some(model.status.into()),
        total: from_minor_units(model.total_minor),
        currency: currency(&model.currency)?,
        items: items_from_json(model.items)?,
        payment_method: model.payment_method.into(),
        gateway_transaction_id: model.gateway_transaction_id,
        customer: customer(
            model.customer_email,
            model.customer_name,
            model.customer_phone,
        ),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

fn pos_to_sale(model: pos_transactions::Model) -> Result<Sale, RepositoryError> {
    Ok(Sale {
        id: model.id,
        kind: SaleKind::Pos,
        reference: model.reference,
        payment_status: model.payment_status.into(),
        fulfillment_status: None,
        total: from_minor_units(model.total_minor),
        currency: currency(&model.currency)?,
        items: items_from_json(model.items)?,
        payment_method: model.payment_method.into(),
        gateway_transaction_id: model.gateway_transaction_id,
        customer: customer(
            model.customer_email,
            model.customer_name,
            model.customer_phone,
        ),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

#[async_trait]
impl SaleStore for SaleRepository {
    async fn create_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        Ok(self.create(sale).await?)
    }

    async fn find_sale(&self, kind: SaleKind, id: Uuid) -> Result<Option<Sale>, StoreError> {
        Ok(self.find(kind, id).await?)
    }

    async fn transition_payment_status(
        &self,
        kind: SaleKind,
        id: Uuid,
        transition: &SaleTransition,
    ) -> Result<bool, StoreError> {
        Ok(self.transition(kind, id, transition).await?)
    }
}
