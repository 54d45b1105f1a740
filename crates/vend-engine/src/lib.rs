//! # vend-engine: Sale Transaction Engine
//!
//! The one subsystem of a POS with real invariants: given a cart of
//! line items, atomically (to the limit of the selected backend) mint a
//! unique invoice number, persist the sale header and its lines,
//! decrement on-hand stock for every inventory-backed line, and append
//! an auditable movement record per decrement. Plus the read side that
//! reconstructs a sale with enriched lines.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SalesEngine (facade)                            │
//! │                                                                         │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐               │
//! │   │  SaleWriter  │   │  StockLedger │   │  SaleReader  │               │
//! │   │ write proto  │   │ qty + audit  │   │ enriched     │               │
//! │   │ + invoices   │   │ movements    │   │ projections  │               │
//! │   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘               │
//! │          └─────────────────┬┴─────────────────┬┘                       │
//! │                            ▼                                            │
//! │                 Arc<dyn StorageAdapter>                                 │
//! │            (SqliteStore or PgStore, chosen at startup)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No Global State
//! The engine is an explicitly constructed, dependency-injected value.
//! Construct one per process (or per test) and hand it to whatever
//! layer needs it; there is no ambient singleton.
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use vend_engine::{EngineConfig, SalesEngine, SaleRequest, SaleLineRequest};
//! use vend_store::{SqliteConfig, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::connect(SqliteConfig::new("./vend.db")).await?);
//! let engine = SalesEngine::new(store, EngineConfig::default());
//!
//! let receipt = engine
//!     .create_sale(SaleRequest {
//!         customer_id: None,
//!         user_id: operator_id,
//!         subtotal_cents: 300,
//!         discount_cents: 0,
//!         tax_cents: 0,
//!         total_cents: 300,
//!         payment_method: PaymentMethod::Cash,
//!         items: vec![SaleLineRequest::product(product_id, 3, 100)],
//!     })
//!     .await?;
//! println!("invoice {}", receipt.invoice_no);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod reader;
pub mod request;
pub mod writer;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use ledger::StockLedger;
pub use reader::SaleReader;
pub use request::{NewProduct, SaleLineRequest, SaleRequest, StockMovementInput};
pub use writer::SaleWriter;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use vend_core::{
    invoice, validation, Product, SaleDetail, SaleReceipt, SaleSummary, StockMovement,
    DEFAULT_TENANT_ID,
};
use vend_store::{BackendKind, StorageAdapter};

// =============================================================================
// Configuration
// =============================================================================

/// Whether a sale may drive on-hand quantity below zero.
///
/// The legacy system never validated stock before decrementing, so
/// overselling was observable behavior. Here it is a named policy:
/// pick one, and the guard (or its absence) rides inside the atomic
/// stock UPDATE itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversellPolicy {
    /// Quantity may go negative; low stock is a reporting concern.
    /// Matches the observed legacy behavior.
    #[default]
    Allow,
    /// Reject any decrement that would drive quantity below zero with a
    /// structured insufficient-stock error.
    Reject,
}

impl OversellPolicy {
    /// The floor handed to guarded decrements, if any.
    pub fn stock_floor(&self) -> Option<i64> {
        match self {
            OversellPolicy::Allow => None,
            OversellPolicy::Reject => Some(0),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed prefix for invoice numbers, e.g. "INV".
    pub invoice_prefix: String,
    /// Oversell policy for sale decrements and standalone `out`
    /// movements.
    pub oversell: OversellPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            invoice_prefix: invoice::DEFAULT_INVOICE_PREFIX.to_string(),
            oversell: OversellPolicy::default(),
        }
    }
}

// =============================================================================
// Sales Engine Facade
// =============================================================================

/// The engine facade: everything the rest of the application calls.
///
/// Cheap to clone; all services share the same adapter handle.
#[derive(Clone)]
pub struct SalesEngine {
    store: Arc<dyn StorageAdapter>,
    writer: SaleWriter,
    ledger: StockLedger,
    reader: SaleReader,
}

impl SalesEngine {
    /// Constructs the engine over a storage adapter selected at
    /// process start.
    pub fn new(store: Arc<dyn StorageAdapter>, config: EngineConfig) -> Self {
        let floor = config.oversell.stock_floor();

        SalesEngine {
            writer: SaleWriter::new(store.clone(), config.invoice_prefix.clone(), floor),
            ledger: StockLedger::new(store.clone(), floor),
            reader: SaleReader::new(store.clone()),
            store,
        }
    }

    /// Which backend sits underneath, including whether sale writes are
    /// all-or-nothing there.
    pub fn backend(&self) -> BackendKind {
        self.store.backend()
    }

    // -------------------------------------------------------------------------
    // Write Operations
    // -------------------------------------------------------------------------

    /// Creates a sale; see [`SaleWriter::create`].
    pub async fn create_sale(&self, request: SaleRequest) -> EngineResult<SaleReceipt> {
        self.writer.create(request).await
    }

    /// Applies a standalone stock movement; see [`StockLedger::apply`].
    pub async fn apply_stock_movement(&self, input: StockMovementInput) -> EngineResult<i64> {
        self.ledger.apply(input).await
    }

    /// Creates a product. Non-zero initial stock emits one `in`
    /// movement in the same unit of work.
    pub async fn create_product(&self, new: NewProduct) -> EngineResult<Product> {
        validation::validate_sku(&new.sku)?;
        validation::validate_name("name", &new.name)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            sku: new.sku,
            name: new.name,
            category_id: new.category_id,
            supplier_id: new.supplier_id,
            cost_cents: new.cost_cents,
            price_cents: new.price_cents,
            quantity: new.initial_quantity,
            min_stock: new.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_product(&product).await?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Soft-deletes a product. The row survives so historical sales
    /// keep valid references.
    pub async fn deactivate_product(&self, id: &str) -> EngineResult<()> {
        Ok(self.store.deactivate_product(id).await?)
    }

    // -------------------------------------------------------------------------
    // Read Operations
    // -------------------------------------------------------------------------

    /// Point lookup; `Ok(None)` for unknown ids.
    pub async fn product_by_id(&self, id: &str) -> EngineResult<Option<Product>> {
        Ok(self.store.product_by_id(id).await?)
    }

    /// Point lookup by SKU.
    pub async fn product_by_sku(&self, sku: &str) -> EngineResult<Option<Product>> {
        Ok(self.store.product_by_sku(sku).await?)
    }

    /// Movement history for one product, oldest first.
    pub async fn stock_movements(&self, product_id: &str) -> EngineResult<Vec<StockMovement>> {
        self.ledger.history(product_id).await
    }

    /// Reconstructs one sale with enriched lines; `Ok(None)` for
    /// unknown ids.
    pub async fn sale_by_id(&self, id: &str) -> EngineResult<Option<SaleDetail>> {
        self.reader.by_id(id).await
    }

    /// All sales, newest first.
    pub async fn sales_all(&self) -> EngineResult<Vec<SaleSummary>> {
        self.reader.all().await
    }

    /// Sales created today (UTC).
    pub async fn sales_today(&self) -> EngineResult<Vec<SaleSummary>> {
        self.reader.today().await
    }

    /// Sales created on the given calendar day.
    pub async fn sales_on(&self, day: NaiveDate) -> EngineResult<Vec<SaleSummary>> {
        self.reader.on(day).await
    }

    /// Purchase history for one customer.
    pub async fn sales_for_customer(&self, customer_id: &str) -> EngineResult<Vec<SaleSummary>> {
        self.reader.for_customer(customer_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.invoice_prefix, "INV");
        assert_eq!(config.oversell, OversellPolicy::Allow);
    }

    #[test]
    fn test_policy_floor_mapping() {
        assert_eq!(OversellPolicy::Allow.stock_floor(), None);
        assert_eq!(OversellPolicy::Reject.stock_floor(), Some(0));
    }
}
