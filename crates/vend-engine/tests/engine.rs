//! Full-engine integration tests.
//!
//! The whole engine runs against an in-memory SQLite store through the
//! `StorageAdapter` trait, exactly as production code would wire it up.
//! Backend-specific mechanics of the hosted path (time-suffixed
//! invoices, error classification) are unit-tested in their own crates;
//! everything protocol-level here holds for both backends.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use vend_core::{Customer, Money, MovementKind, PaymentMethod, User, DEFAULT_TENANT_ID};
use vend_engine::{
    EngineConfig, EngineError, NewProduct, OversellPolicy, SaleLineRequest, SaleRequest,
    SalesEngine, StockMovementInput,
};
use vend_store::{SqliteConfig, SqliteStore, StorageAdapter};

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    engine: SalesEngine,
    user_id: String,
    customer_id: String,
}

async fn fixture() -> Fixture {
    fixture_with(EngineConfig::default()).await
}

async fn fixture_with(config: EngineConfig) -> Fixture {
    let store = Arc::new(
        SqliteStore::connect(SqliteConfig::in_memory())
            .await
            .expect("in-memory store"),
    );

    let now = Utc::now();
    let user_id = Uuid::new_v4().to_string();
    store
        .insert_user(&User {
            id: user_id.clone(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: "Ana Cashier".to_string(),
            username: "ana".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed user");

    let customer_id = Uuid::new_v4().to_string();
    store
        .insert_customer(&Customer {
            id: customer_id.clone(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: "Bob Buyer".to_string(),
            phone: Some("555-0101".to_string()),
            address: Some("7 High Street".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await
        .expect("seed customer");

    let engine = SalesEngine::new(store as Arc<dyn StorageAdapter>, config);

    Fixture {
        engine,
        user_id,
        customer_id,
    }
}

impl Fixture {
    async fn product(&self, sku: &str, initial_quantity: i64, price_cents: i64) -> String {
        self.engine
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: format!("Product {}", sku),
                category_id: None,
                supplier_id: None,
                cost_cents: price_cents / 2,
                price_cents,
                initial_quantity,
                min_stock: 0,
            })
            .await
            .expect("create product")
            .id
    }

    fn sale(&self, items: Vec<SaleLineRequest>) -> SaleRequest {
        let subtotal: i64 = items.iter().map(|i| i.line_total_cents).sum();
        SaleRequest {
            customer_id: None,
            user_id: self.user_id.clone(),
            subtotal_cents: subtotal,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: subtotal,
            payment_method: PaymentMethod::Cash,
            items,
        }
    }
}

// =============================================================================
// Scenario A: happy path sale
// =============================================================================

#[tokio::test]
async fn sale_decrements_stock_and_logs_one_movement() {
    let fx = fixture().await;
    let product_id = fx.product("COKE-330", 20, 100).await;

    let receipt = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 3, 100)]))
        .await
        .expect("sale should succeed");

    // Total as submitted
    let detail = fx
        .engine
        .sale_by_id(&receipt.sale_id)
        .await
        .unwrap()
        .expect("sale readable");
    assert_eq!(detail.total(), Money::from_cents(300));
    assert_eq!(detail.invoice_no, receipt.invoice_no);
    assert_eq!(detail.cashier_name, "Ana Cashier");
    assert_eq!(detail.items[0].line_total(), Money::from_cents(300));

    // 20 - 3 = 17
    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 17);

    // Exactly one `out` movement, magnitude 3, pointing back at the sale
    let movements = fx.engine.stock_movements(&product_id).await.unwrap();
    let outs: Vec<_> = movements
        .iter()
        .filter(|m| m.kind == MovementKind::Out)
        .collect();
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].quantity, 3);
    assert_eq!(outs[0].reference_type.as_deref(), Some("sale"));
    assert_eq!(outs[0].reference_id.as_deref(), Some(receipt.sale_id.as_str()));
    assert_eq!(outs[0].note.as_deref(), Some(receipt.invoice_no.as_str()));
}

#[tokio::test]
async fn item_count_matches_submission() {
    let fx = fixture().await;
    let a = fx.product("SKU-A", 10, 100).await;
    let b = fx.product("SKU-B", 10, 250).await;

    let receipt = fx
        .engine
        .create_sale(fx.sale(vec![
            SaleLineRequest::product(&a, 2, 100),
            SaleLineRequest::product(&b, 1, 250),
            SaleLineRequest::service_charge(500),
        ]))
        .await
        .unwrap();

    let detail = fx.engine.sale_by_id(&receipt.sale_id).await.unwrap().unwrap();
    assert_eq!(detail.items.len(), 3);

    // Cart order is preserved
    assert_eq!(detail.items[0].product_sku.as_deref(), Some("SKU-A"));
    assert_eq!(detail.items[1].product_sku.as_deref(), Some("SKU-B"));
    assert!(detail.items[2].product_id.is_none());
}

#[tokio::test]
async fn same_product_on_two_lines_yields_two_movements() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-TWICE", 10, 100).await;

    fx.engine
        .create_sale(fx.sale(vec![
            SaleLineRequest::product(&product_id, 2, 100),
            SaleLineRequest::product(&product_id, 3, 100),
        ]))
        .await
        .unwrap();

    let movements = fx.engine.stock_movements(&product_id).await.unwrap();
    let out_quantities: Vec<i64> = movements
        .iter()
        .filter(|m| m.kind == MovementKind::Out)
        .map(|m| m.quantity)
        .collect();
    // Two rows, never merged
    assert_eq!(out_quantities, vec![2, 3]);

    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 5);
}

// =============================================================================
// Scenario B: sequential invoice numbers
// =============================================================================

#[tokio::test]
async fn sequential_sales_step_the_invoice_suffix_by_one() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-SEQ", 50, 100).await;

    let first = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 1, 100)]))
        .await
        .unwrap();
    let second = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 1, 100)]))
        .await
        .unwrap();

    assert_ne!(first.invoice_no, second.invoice_no);

    // Same day prefix, trailing sequence exactly one greater
    let prefix_len = first.invoice_no.len() - 4;
    assert_eq!(
        &first.invoice_no[..prefix_len],
        &second.invoice_no[..prefix_len]
    );

    let seq1 = vend_core::invoice::parse_sequence(&first.invoice_no).unwrap();
    let seq2 = vend_core::invoice::parse_sequence(&second.invoice_no).unwrap();
    assert_eq!(seq2, seq1 + 1);
}

#[tokio::test]
async fn invoice_numbers_are_pairwise_distinct() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-MANY", 100, 100).await;

    let mut seen = std::collections::HashSet::new();
    for _ in 0..5 {
        let receipt = fx
            .engine
            .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 1, 100)]))
            .await
            .unwrap();
        assert!(seen.insert(receipt.invoice_no));
    }
}

// =============================================================================
// Scenario C: referential failure leaves nothing behind
// =============================================================================

#[tokio::test]
async fn unknown_product_fails_referentially_with_no_residue() {
    let fx = fixture().await;

    let err = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product("no-such-product", 1, 100)]))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Referential { .. }));

    // Full rollback on the embedded backend: no header row survives
    assert!(fx.engine.sales_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_customer_fails_referentially() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-CUST", 5, 100).await;

    let mut request = fx.sale(vec![SaleLineRequest::product(&product_id, 1, 100)]);
    request.customer_id = Some("no-such-customer".to_string());

    let err = fx.engine.create_sale(request).await.unwrap_err();
    assert!(matches!(err, EngineError::Referential { .. }));

    // Pre-checks run before any write: stock untouched
    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 5);
}

#[tokio::test]
async fn soft_deleted_product_is_not_sellable() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-GONE", 5, 100).await;
    fx.engine.deactivate_product(&product_id).await.unwrap();

    let err = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 1, 100)]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Referential { .. }));
}

// =============================================================================
// Scenario D: non-inventory line
// =============================================================================

#[tokio::test]
async fn service_charge_line_produces_no_movement() {
    let fx = fixture().await;

    let receipt = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::service_charge(1500)]))
        .await
        .expect("service-only sale should succeed");

    let detail = fx.engine.sale_by_id(&receipt.sale_id).await.unwrap().unwrap();
    assert_eq!(detail.items.len(), 1);
    assert!(detail.items[0].product_id.is_none());
    assert!(detail.items[0].product_name.is_none());
    assert_eq!(detail.total_cents, 1500);
}

// =============================================================================
// Scenario E: lost-update race vs. atomic decrement
// =============================================================================

/// Reenacts the legacy read-then-write bug: two writers read the same
/// stale quantity (6), each computes 6 - 5 locally, and each writes
/// back its own answer as an absolute value. The second write clobbers
/// the first and the product ends at 1 instead of reflecting both
/// decrements.
#[tokio::test]
async fn read_then_write_loses_an_update() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-RACE", 6, 100).await;

    // Both "terminals" read before either writes
    let stale_a = fx.engine.product_by_id(&product_id).await.unwrap().unwrap().quantity;
    let stale_b = fx.engine.product_by_id(&product_id).await.unwrap().unwrap().quantity;
    assert_eq!((stale_a, stale_b), (6, 6));

    for stale in [stale_a, stale_b] {
        fx.engine
            .apply_stock_movement(StockMovementInput {
                product_id: product_id.clone(),
                kind: MovementKind::Adjustment,
                quantity: stale - 5,
                note: Some("legacy read-then-write".to_string()),
            })
            .await
            .unwrap();
    }

    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    // 10 units left the shelf, the books say 5 did. The lost update.
    assert_eq!(product.quantity, 1);
}

/// The engine's own decrement path is an atomic in-place UPDATE, so the
/// same two writes serialize and both land.
#[tokio::test]
async fn atomic_decrements_both_land() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-ATOMIC", 6, 100).await;

    for _ in 0..2 {
        fx.engine
            .apply_stock_movement(StockMovementInput {
                product_id: product_id.clone(),
                kind: MovementKind::Out,
                quantity: 5,
                note: None,
            })
            .await
            .unwrap();
    }

    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    // Allow policy: honest negative, not a silently lost decrement
    assert_eq!(product.quantity, -4);
}

/// Under the Reject policy the guard rides in the same atomic UPDATE,
/// so the second decrement is refused instead of overselling.
#[tokio::test]
async fn reject_policy_refuses_the_second_decrement() {
    let fx = fixture_with(EngineConfig {
        oversell: OversellPolicy::Reject,
        ..EngineConfig::default()
    })
    .await;
    let product_id = fx.product("SKU-GUARD", 6, 100).await;

    let first = fx
        .engine
        .apply_stock_movement(StockMovementInput {
            product_id: product_id.clone(),
            kind: MovementKind::Out,
            quantity: 5,
            note: None,
        })
        .await
        .unwrap();
    assert_eq!(first, 1);

    let err = fx
        .engine
        .apply_stock_movement(StockMovementInput {
            product_id: product_id.clone(),
            kind: MovementKind::Out,
            quantity: 5,
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientStock { available: 1, requested: 5, .. }
    ));

    // Refusal leaves quantity and the audit log untouched
    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 1);
    let outs = fx
        .engine
        .stock_movements(&product_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.kind == MovementKind::Out)
        .count();
    assert_eq!(outs, 1);
}

#[tokio::test]
async fn reject_policy_rolls_back_the_whole_sale() {
    let fx = fixture_with(EngineConfig {
        oversell: OversellPolicy::Reject,
        ..EngineConfig::default()
    })
    .await;
    let plenty = fx.product("SKU-PLENTY", 100, 100).await;
    let scarce = fx.product("SKU-SCARCE", 1, 100).await;

    let err = fx
        .engine
        .create_sale(fx.sale(vec![
            SaleLineRequest::product(&plenty, 2, 100),
            SaleLineRequest::product(&scarce, 3, 100),
        ]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock { .. }));

    // Embedded backend: the earlier line's effects rolled back too
    assert_eq!(
        fx.engine.product_by_id(&plenty).await.unwrap().unwrap().quantity,
        100
    );
    assert!(fx.engine.sales_all().await.unwrap().is_empty());
}

// =============================================================================
// Quantity reconciliation invariant
// =============================================================================

#[tokio::test]
async fn quantity_reconciles_with_movement_history() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-LEDGER", 20, 100).await;

    fx.engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 4, 100)]))
        .await
        .unwrap();
    fx.engine
        .apply_stock_movement(StockMovementInput {
            product_id: product_id.clone(),
            kind: MovementKind::In,
            quantity: 10,
            note: Some("restock".to_string()),
        })
        .await
        .unwrap();
    fx.engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 6, 100)]))
        .await
        .unwrap();

    let product = fx.engine.product_by_id(&product_id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 20 - 4 + 10 - 6);

    // Replay the full movement log: adjustments reset the baseline,
    // in/out apply signed magnitudes
    let movements = fx.engine.stock_movements(&product_id).await.unwrap();
    let replayed = movements.iter().fold(0i64, |acc, m| match m.kind {
        MovementKind::In => acc + m.quantity,
        MovementKind::Out => acc - m.quantity,
        MovementKind::Adjustment => m.quantity,
    });
    assert_eq!(replayed, product.quantity);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn empty_cart_is_rejected_before_any_write() {
    let fx = fixture().await;

    let err = fx.engine.create_sale(fx.sale(vec![])).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(fx.engine.sales_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-ZERO", 5, 100).await;

    let err = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 0, 100)]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn sale_by_id_is_idempotent() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-READ", 5, 100).await;

    let receipt = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 2, 100)]))
        .await
        .unwrap();

    let first = fx.engine.sale_by_id(&receipt.sale_id).await.unwrap().unwrap();
    let second = fx.engine.sale_by_id(&receipt.sale_id).await.unwrap().unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[tokio::test]
async fn unknown_sale_id_reads_as_none() {
    let fx = fixture().await;
    assert!(fx.engine.sale_by_id("no-such-sale").await.unwrap().is_none());
}

#[tokio::test]
async fn listings_filter_and_order() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-LIST", 50, 100).await;

    let anonymous = fx
        .engine
        .create_sale(fx.sale(vec![SaleLineRequest::product(&product_id, 1, 100)]))
        .await
        .unwrap();

    let mut with_customer = fx.sale(vec![SaleLineRequest::product(&product_id, 2, 100)]);
    with_customer.customer_id = Some(fx.customer_id.clone());
    let named = fx.engine.create_sale(with_customer).await.unwrap();

    // Newest first, both present
    let all = fx.engine.sales_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, named.sale_id);
    assert_eq!(all[1].id, anonymous.sale_id);
    assert_eq!(all[0].customer_name.as_deref(), Some("Bob Buyer"));
    assert_eq!(all[1].customer_name, None);

    // Both sales were created "now", so the today view sees them
    let today = fx.engine.sales_today().await.unwrap();
    assert_eq!(today.len(), 2);

    // Purchase history filters to the one customer
    let history = fx.engine.sales_for_customer(&fx.customer_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, named.sale_id);

    // Customer display fields ride along on the detail view
    let detail = fx.engine.sale_by_id(&named.sale_id).await.unwrap().unwrap();
    assert_eq!(detail.customer_name.as_deref(), Some("Bob Buyer"));
    assert_eq!(detail.customer_phone.as_deref(), Some("555-0101"));
    assert_eq!(detail.customer_address.as_deref(), Some("7 High Street"));
}

// =============================================================================
// Product lifecycle
// =============================================================================

#[tokio::test]
async fn initial_stock_emits_its_own_movement() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-INIT", 20, 100).await;

    let movements = fx.engine.stock_movements(&product_id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].kind, MovementKind::In);
    assert_eq!(movements[0].quantity, 20);
    assert_eq!(movements[0].note.as_deref(), Some("initial stock"));
}

#[tokio::test]
async fn products_resolve_by_sku() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-FIND", 3, 100).await;

    let found = fx
        .engine
        .product_by_sku("SKU-FIND")
        .await
        .unwrap()
        .expect("sku lookup");
    assert_eq!(found.id, product_id);
    assert!(fx.engine.product_by_sku("SKU-NONE").await.unwrap().is_none());
}

#[tokio::test]
async fn zero_initial_stock_emits_no_movement() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-EMPTY", 0, 100).await;
    assert!(fx.engine.stock_movements(&product_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_sku_is_a_duplicate_error() {
    let fx = fixture().await;
    fx.product("SKU-DUP", 0, 100).await;

    let err = fx
        .engine
        .create_product(NewProduct {
            sku: "SKU-DUP".to_string(),
            name: "Other".to_string(),
            category_id: None,
            supplier_id: None,
            cost_cents: 1,
            price_cents: 2,
            initial_quantity: 0,
            min_stock: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Duplicate { .. }));
}

#[tokio::test]
async fn adjustment_records_absolute_target_and_previous_value() {
    let fx = fixture().await;
    let product_id = fx.product("SKU-ADJ", 12, 100).await;

    let new_quantity = fx
        .engine
        .apply_stock_movement(StockMovementInput {
            product_id: product_id.clone(),
            kind: MovementKind::Adjustment,
            quantity: 7,
            note: Some("stocktake".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(new_quantity, 7);

    let movements = fx.engine.stock_movements(&product_id).await.unwrap();
    let adj = movements
        .iter()
        .find(|m| m.kind == MovementKind::Adjustment)
        .expect("adjustment row");
    assert_eq!(adj.quantity, 7);
    assert_eq!(adj.note.as_deref(), Some("stocktake (was 12)"));
}
