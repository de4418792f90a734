//! Database seeder for Storeledger development and testing.
//!
//! Seeds a small catalog (one plain product, two with size and color
//! variants) and an empty wallet for a demo account. Fixed ids make reruns
//! a no-op.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use storeledger_core::inventory::{Product, Variant, VariantAttributes};
use storeledger_db::{LedgerRepository, ProductRepository};
use storeledger_shared::types::{AccountId, Currency, ProductId, VariantId};

/// Demo account whose wallet is created up front.
const DEMO_ACCOUNT_ID: u128 = 0x0000_0000_0000_0000_0000_0000_0000_0001;

fn product_id(n: u128) -> ProductId {
    ProductId::from_uuid(Uuid::from_u128(0x1000 + n))
}

fn variant_id(product: u128, n: u128) -> VariantId {
    VariantId::from_uuid(Uuid::from_u128(0x2000 + product * 0x100 + n))
}

fn variant(product: u128, n: u128, size: &str, color: &str, price: Decimal, stock: i64) -> Variant {
    Variant {
        id: variant_id(product, n),
        attributes: VariantAttributes::from_pairs([("Size", size), ("Color", color)]),
        price,
        stock,
    }
}

fn catalog() -> Vec<Product> {
    vec![
        Product {
            id: product_id(1),
            name: "Canvas Tote Bag".to_string(),
            price: dec!(3500),
            stock: 40,
            sold: 0,
            revenue: Decimal::ZERO,
            variants: Vec::new(),
        },
        Product {
            id: product_id(2),
            name: "Classic T-Shirt".to_string(),
            price: dec!(6000),
            stock: 0,
            sold: 0,
            revenue: Decimal::ZERO,
            variants: vec![
                variant(2, 1, "S", "Black", dec!(5500), 12),
                variant(2, 2, "M", "Black", dec!(6000), 20),
                variant(2, 3, "L", "Black", dec!(6500), 8),
                variant(2, 4, "M", "White", dec!(6000), 15),
            ],
        },
        Product {
            id: product_id(3),
            name: "Hooded Sweatshirt".to_string(),
            price: dec!(15000),
            stock: 0,
            sold: 0,
            revenue: Decimal::ZERO,
            variants: vec![
                variant(3, 1, "M", "Grey", dec!(15000), 6),
                variant(3, 2, "XL", "Grey", dec!(16500), 3),
            ],
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = storeledger_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    println!("Seeding catalog...");
    let products = ProductRepository::new(db.clone());
    for product in catalog() {
        if products.find(product.id).await?.is_some() {
            println!("  {} already exists, skipping...", product.name);
            continue;
        }
        products.create(&product).await?;
        println!(
            "  {} ({} variants)",
            product.name,
            product.variants.len()
        );
    }

    println!("Seeding demo wallet...");
    let wallet = LedgerRepository::new(db)
        .get_or_create_wallet(
            AccountId::from_uuid(Uuid::from_u128(DEMO_ACCOUNT_ID)),
            Currency::Ngn,
        )
        .await?;
    println!("  wallet {} for account {}", wallet.id, wallet.account_id);

    println!("Seeding complete!");
    Ok(())
}
