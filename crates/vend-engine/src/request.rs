//! # Engine Boundary Requests
//!
//! Input DTOs for the engine's produced interface. Callers (POS screen,
//! service-job screen) build these; the engine validates, mints ids and
//! timestamps, and drives the storage adapter.

use serde::{Deserialize, Serialize};

use vend_core::{MovementKind, PaymentMethod};

/// One line of a sale request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineRequest {
    /// `None` for a non-inventory charge (service fee line).
    pub product_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub tax_rate_bps: i64,
    /// Caller-computed line total.
    pub line_total_cents: i64,
}

impl SaleLineRequest {
    /// A plain product line: quantity at unit price, no discount or tax.
    pub fn product(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        SaleLineRequest {
            product_id: Some(product_id.into()),
            quantity,
            unit_price_cents,
            discount_cents: 0,
            tax_rate_bps: 0,
            line_total_cents: unit_price_cents * quantity,
        }
    }

    /// A flat non-inventory charge (e.g. a service fee).
    pub fn service_charge(amount_cents: i64) -> Self {
        SaleLineRequest {
            product_id: None,
            quantity: 1,
            unit_price_cents: amount_cents,
            discount_cents: 0,
            tax_rate_bps: 0,
            line_total_cents: amount_cents,
        }
    }
}

/// A fully-formed sale request.
///
/// The monetary breakdown is computed by the caller and trusted by the
/// writer: total = subtotal - discount + tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Optional customer reference (walk-in sales have none).
    pub customer_id: Option<String>,
    /// Acting operator, supplied by the session layer and trusted.
    pub user_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Ordered line items; at least one required.
    pub items: Vec<SaleLineRequest>,
}

/// A standalone stock mutation (restock, correction, manual write-off).
///
/// Sale decrements do not come through here; the sale writer folds them
/// into the sale's own unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovementInput {
    pub product_id: String,
    pub kind: MovementKind,
    /// Positive magnitude for `in`/`out`; absolute target for
    /// `adjustment`.
    pub quantity: i64,
    pub note: Option<String>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category_id: Option<String>,
    pub supplier_id: Option<String>,
    pub cost_cents: i64,
    pub price_cents: i64,
    /// Non-zero initial stock emits one `in` movement ("initial stock").
    pub initial_quantity: i64,
    pub min_stock: i64,
}
