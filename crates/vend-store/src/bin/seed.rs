//! # Seed Data Generator
//!
//! Populates a local embedded database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database (./vend.db)
//! cargo run -p vend-store --bin seed
//!
//! # Custom database path and product count
//! cargo run -p vend-store --bin seed -- --db ./data/vend.db --count 200
//! ```
//!
//! ## Generated Data
//! - Products across a few retail categories, with initial stock
//!   (each initial quantity emits its own movement row)
//! - One walk-in customer and one operator, so sales can be written
//!   immediately against the seeded database

use std::env;

use chrono::Utc;
use uuid::Uuid;

use vend_core::{Customer, Product, User, DEFAULT_TENANT_ID};
use vend_store::{SqliteConfig, SqliteStore, StorageAdapter};

/// Product categories for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEV",
        &[
            "Coca-Cola 330ml",
            "Pepsi 330ml",
            "Sprite 330ml",
            "Red Bull 250ml",
            "Orange Juice 1L",
            "Still Water 500ml",
            "Iced Tea 500ml",
        ],
    ),
    (
        "SNK",
        &[
            "Lays Classic",
            "Doritos Nacho",
            "Pringles Original",
            "Snickers",
            "KitKat",
            "Salted Peanuts",
        ],
    ),
    (
        "GRO",
        &[
            "Basmati Rice 1kg",
            "Penne Pasta 500g",
            "Sunflower Oil 1L",
            "White Sugar 1kg",
            "Table Salt 750g",
        ],
    ),
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let db_path = arg_value(&args, "--db").unwrap_or_else(|| "./vend.db".to_string());
    let count: usize = arg_value(&args, "--count")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    println!("Seeding {} products into {}", count, db_path);

    let store = SqliteStore::connect(SqliteConfig::new(&db_path))
        .await
        .expect("failed to open database");

    let now = Utc::now();
    let mut seeded = 0usize;

    'outer: for (category, names) in CATEGORIES {
        for (index, name) in names.iter().enumerate() {
            if seeded >= count {
                break 'outer;
            }

            let price_cents = 99 + ((seeded as i64 * 37) % 1900);
            let product = Product {
                id: Uuid::new_v4().to_string(),
                tenant_id: DEFAULT_TENANT_ID.to_string(),
                sku: format!("{}-{:03}", category, index + 1),
                name: (*name).to_string(),
                category_id: None,
                supplier_id: None,
                cost_cents: price_cents / 2,
                price_cents,
                quantity: (seeded as i64 * 13) % 100,
                min_stock: 5,
                is_active: true,
                created_at: now,
                updated_at: now,
            };

            match store.insert_product(&product).await {
                Ok(()) => seeded += 1,
                // Re-running against an existing database: skip dupes
                Err(vend_store::StoreError::UniqueViolation { .. }) => {}
                Err(err) => panic!("seed failed: {err}"),
            }
        }
    }

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        name: "Walk-in Customer".to_string(),
        phone: Some("555-0100".to_string()),
        address: Some("12 Market Street".to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let _ = store.insert_customer(&customer).await;

    let operator = User {
        id: Uuid::new_v4().to_string(),
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        name: "Demo Cashier".to_string(),
        username: "demo".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    let _ = store.insert_user(&operator).await;

    println!("Done: {} products, 1 customer, 1 operator", seeded);
}

/// Returns the value following a `--flag` argument, if present.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
