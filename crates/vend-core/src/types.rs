//! # Domain Types
//!
//! Core domain types for the sale transaction engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Entities          ┌────────────┐ ┌──────────┐ ┌──────┐ ┌────────────┐ │
//! │  (rows)            │  Product   │ │ Customer │ │ User │ │StockMovemnt│ │
//! │                    └────────────┘ └──────────┘ └──────┘ └────────────┘ │
//! │                                                                         │
//! │  Write model       ┌────────────┐      one validated unit handed to    │
//! │                    │ SaleDraft  │───►  the storage adapter; lines with │
//! │                    │ +ItemDrafts│      NULL product_id are flat charges│
//! │                    └────────────┘                                       │
//! │                                                                         │
//! │  Read model        ┌────────────┐ ┌─────────────┐                      │
//! │                    │ SaleDetail │ │ SaleSummary │  display names joined│
//! │                    │ +LineDetail│ │ (listings)  │  at read time        │
//! │                    └────────────┘ └─────────────┘                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations, minted by the
//!   engine so both storage backends behave identically
//! - Business ID where one exists: (sku, invoice_no) - human-readable
//!
//! ## Read-Time Enrichment
//! Sale lines do NOT snapshot product name/SKU. [`SaleDetail`] and
//! [`SaleLineDetail`] look them up at read time, so renaming a product is
//! reflected in older sales' listing views. Intentional trade-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Stock Keeping Unit - business identifier, unique per tenant,
    /// immutable after creation.
    pub sku: String,

    /// Display name shown on receipts and sale listings.
    pub name: String,

    /// Optional category reference. Category CRUD lives outside the engine.
    pub category_id: Option<String>,

    /// Optional supplier reference. Supplier CRUD lives outside the engine.
    pub supplier_id: Option<String>,

    /// Cost price in cents.
    pub cost_cents: i64,

    /// Selling price in cents.
    pub price_cents: i64,

    /// On-hand quantity. Transiently negative when oversold under the
    /// Allow policy.
    pub quantity: i64,

    /// Minimum-stock threshold for low-stock reporting.
    pub min_stock: i64,

    /// Whether product is active (soft delete). Historical sales keep
    /// valid references to inactive products.
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when on-hand quantity sits at or below the minimum-stock
    /// threshold. Display/reporting concern, never a hard error.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record.
///
/// The engine only needs insert + point lookup: enough for referential
/// checks and the reader's display join. Full customer management is a
/// consumer of this engine, not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// An operator (cashier) record.
///
/// The acting user id arrives from the session layer and is trusted;
/// the engine stores the reference and joins the display name at read
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Login name, unique per tenant. Authentication is out of scope.
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock received (restock, initial stock).
    In,
    /// Stock sold or otherwise removed.
    Out,
    /// On-hand quantity replaced absolutely (stocktake correction).
    Adjustment,
}

impl MovementKind {
    /// Stable string form, matching what the storage layer persists.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

/// Append-only audit record explaining one change to a product's
/// on-hand quantity.
///
/// Never updated or deleted. One row per product per mutating event:
/// a sale with two lines for the same product yields two rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Positive magnitude; direction lives in `kind`. Adjustment rows
    /// record the absolute quantity that was set.
    pub quantity: i64,
    /// Kind of causing entity, e.g. "sale".
    pub reference_type: Option<String>,
    /// Id of the causing entity.
    pub reference_id: Option<String>,
    /// Free-text note; sale decrements carry the invoice number here.
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment method tag on a sale header.
///
/// A tag, not a payments integration: gateways, split tender and
/// settlement are outside this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Credit,
    Other,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Write-Side DTOs
// =============================================================================

/// One line of a [`SaleDraft`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemDraft {
    /// Pre-minted item id (UUID v4).
    pub id: String,
    /// NULL marks a non-inventory charge; no stock effect, no movement.
    pub product_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub tax_rate_bps: i64,
    pub line_total_cents: i64,
}

/// A fully validated sale, ready for a storage backend to persist as
/// one logical unit.
///
/// The invoice number is deliberately absent: the embedded backend
/// mints it inside the same transaction that consumes it, the hosted
/// backend mints a time-suffixed one just before the header insert.
/// Every backend fills each decrement's movement note with the minted
/// number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDraft {
    /// Pre-minted sale id (UUID v4).
    pub id: String,
    pub customer_id: Option<String>,
    pub user_id: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    /// Ordered line items.
    pub items: Vec<SaleItemDraft>,
    /// Fixed prefix for the invoice number, e.g. "INV".
    pub invoice_prefix: String,
    /// Oversell guard: `Some(floor)` rejects any decrement that would
    /// drive on-hand quantity below `floor`; `None` allows negative
    /// stock (observed legacy behavior).
    pub stock_floor: Option<i64>,
}

/// Outcome of a successful sale write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale_id: String,
    pub invoice_no: String,
}

/// A single stock mutation for the ledger to apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRequest {
    /// Pre-minted movement id (UUID v4).
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    /// Positive magnitude for `in`/`out`; the absolute target quantity
    /// for `adjustment`.
    pub quantity: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    /// Oversell guard for `out` movements, as in [`SaleDraft`].
    pub floor: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Read-Side DTOs
// =============================================================================

/// A sale line enriched with the product's current display name and SKU.
///
/// `product_name`/`product_sku` are `None` for non-inventory lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineDetail {
    pub id: String,
    pub sale_id: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_sku: Option<String>,
    pub line_no: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub tax_rate_bps: i64,
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleLineDetail {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A sale reconstructed for display or printing: header plus customer
/// and operator display fields plus enriched lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleDetail {
    pub id: String,
    pub tenant_id: String,
    pub invoice_no: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub user_id: String,
    pub cashier_name: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    /// Ordered line items, filled in after the header join.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<SaleLineDetail>,
}

impl SaleDetail {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// One row of a sale listing (newest first, non-paginated).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleSummary {
    pub id: String,
    pub invoice_no: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub cashier_name: String,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_movement_kind_strings() {
        assert_eq!(MovementKind::In.as_str(), "in");
        assert_eq!(MovementKind::Out.as_str(), "out");
        assert_eq!(MovementKind::Adjustment.as_str(), "adjustment");
    }

    #[test]
    fn test_payment_method_default() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_low_stock_threshold() {
        let product = Product {
            id: "p1".into(),
            tenant_id: "t1".into(),
            sku: "COKE-330".into(),
            name: "Coca-Cola 330ml".into(),
            category_id: None,
            supplier_id: None,
            cost_cents: 40,
            price_cents: 100,
            quantity: 5,
            min_stock: 5,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(product.is_low_stock());
    }
}
