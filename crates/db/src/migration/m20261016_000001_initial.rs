//! Initial schema: wallets, ledger transactions, sales and catalog.
//!
//! Money columns hold integer minor units. Status columns hold the string
//! values of the active enums in `entities::sea_orm_active_enums`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // WALLETS & LEDGER
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Wallets::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Wallets::AccountId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::AvailableMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::LedgerMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Wallets::Currency).string_len(3).not_null())
                    .col(timestamp(Wallets::CreatedAt))
                    .col(timestamp(Wallets::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::WalletId).uuid().not_null())
                    .col(
                        ColumnDef::new(LedgerTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(enum_string(LedgerTransactions::TransactionType))
                    .col(enum_string(LedgerTransactions::Status))
                    .col(
                        ColumnDef::new(LedgerTransactions::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::Reference)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::Counterparty)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::GatewayReference)
                            .string_len(128)
                            .null(),
                    )
                    .col(timestamp(LedgerTransactions::CreatedAt))
                    .col(timestamp(LedgerTransactions::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_wallet")
                            .from(LedgerTransactions::Table, LedgerTransactions::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_wallet_created")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::WalletId)
                    .col(LedgerTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // SALES
        // ============================================================
        manager
            .create_table(
                sale_table(Orders::Table)
                    .col(enum_string(Orders::Status))
                    .to_owned(),
            )
            .await?;

        manager.create_table(sale_table(PosTransactions::Table)).await?;

        // ============================================================
        // CATALOG
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Products::PriceMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Products::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::Sold)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::RevenueMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(timestamp(Products::CreatedAt))
                    .col(timestamp(Products::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductVariants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVariants::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(ProductVariants::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProductVariants::Attributes).json().not_null())
                    .col(
                        ColumnDef::new(ProductVariants::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVariants::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(timestamp(ProductVariants::CreatedAt))
                    .col(timestamp(ProductVariants::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_variants_product")
                            .from(ProductVariants::Table, ProductVariants::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_variants_product")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            ProductVariants::Table.into_iden(),
            Products::Table.into_iden(),
            PosTransactions::Table.into_iden(),
            Orders::Table.into_iden(),
            LedgerTransactions::Table.into_iden(),
            Wallets::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

fn timestamp<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

fn enum_string<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).string_len(16).not_null().to_owned()
}

/// Columns shared by `orders` and `pos_transactions`.
fn sale_table<T: IntoIden + Copy + 'static>(table: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Sales::Id).uuid().not_null().primary_key())
        .col(
            ColumnDef::new(Sales::Reference)
                .string_len(128)
                .not_null()
                .unique_key(),
        )
        .col(enum_string(Sales::PaymentStatus))
        .col(ColumnDef::new(Sales::TotalMinor).big_integer().not_null())
        .col(ColumnDef::new(Sales::Currency).string_len(3).not_null())
        .col(ColumnDef::new(Sales::Items).json().not_null())
        .col(enum_string(Sales::PaymentMethod))
        .col(
            ColumnDef::new(Sales::GatewayTransactionId)
                .string_len(128)
                .null(),
        )
        .col(
            ColumnDef::new(Sales::CustomerEmail)
                .string_len(255)
                .not_null(),
        )
        .col(ColumnDef::new(Sales::CustomerName).string_len(255).null())
        .col(ColumnDef::new(Sales::CustomerPhone).string_len(64).null())
        .col(timestamp(Sales::CreatedAt))
        .col(timestamp(Sales::UpdatedAt))
        .to_owned()
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    AccountId,
    AvailableMinor,
    LedgerMinor,
    Currency,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LedgerTransactions {
    Table,
    Id,
    WalletId,
    AmountMinor,
    TransactionType,
    Status,
    Description,
    Reference,
    Counterparty,
    GatewayReference,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Orders {
    Table,
    Status,
}

#[derive(DeriveIden, Clone, Copy)]
enum PosTransactions {
    Table,
}

#[derive(DeriveIden)]
enum Sales {
    Id,
    Reference,
    PaymentStatus,
    TotalMinor,
    Currency,
    Items,
    PaymentMethod,
    GatewayTransactionId,
    CustomerEmail,
    CustomerName,
    CustomerPhone,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    PriceMinor,
    Stock,
    Sold,
    RevenueMinor,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProductVariants {
    Table,
    Id,
    ProductId,
    Position,
    Attributes,
    PriceMinor,
    Stock,
    CreatedAt,
    UpdatedAt,
}
