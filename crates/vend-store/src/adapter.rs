//! # Storage Adapter
//!
//! The capability interface the engine is written against. Implemented
//! twice: [`SqliteStore`](crate::sqlite::SqliteStore) for the embedded
//! backend, [`PgStore`](crate::postgres::PgStore) for the hosted
//! multi-tenant backend. Selected at process start; everything above
//! this trait holds an `Arc<dyn StorageAdapter>` and never names a
//! concrete backend.
//!
//! ## Why the sale write is one trait method
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            persist_sale: one call, two very different units             │
//! │                                                                         │
//! │  SqliteStore                         PgStore                            │
//! │  ───────────                         ───────                            │
//! │  BEGIN                               (no transaction)                   │
//! │    mint sequential invoice           mint time-suffixed invoice         │
//! │    INSERT sale header                INSERT sale header      ──┐        │
//! │    per line:                         per line:                 │ each   │
//! │      INSERT sale_item                  INSERT sale_item        │ an     │
//! │      UPDATE stock (atomic)             UPDATE stock (atomic)   │ indep. │
//! │      INSERT movement                   INSERT movement       ──┘ call   │
//! │  COMMIT (all-or-nothing)             failure partway leaves a           │
//! │                                      PARTIAL SALE (documented)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! If the whole protocol were expressed as fine-grained trait calls, the
//! embedded backend could not wrap them in its native transaction. The
//! unit of work lives behind the interface; the orchestration that
//! builds it stays in the engine.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreResult;
use vend_core::{
    Customer, MovementRequest, Product, SaleDetail, SaleDraft, SaleReceipt, SaleSummary,
    StockMovement, User,
};

// =============================================================================
// Backend Kind
// =============================================================================

/// Which concrete backend sits behind the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local embedded SQLite database. Single-writer, native
    /// transactions, strict all-or-nothing sale writes.
    Embedded,
    /// Hosted multi-tenant Postgres database. Concurrent writers from
    /// multiple terminals; the sale write protocol runs as independent
    /// network calls with no cross-call rollback.
    Hosted,
}

impl BackendKind {
    /// Whether `persist_sale` is all-or-nothing on this backend.
    ///
    /// The hosted path answers `false`: a failure partway through the
    /// write protocol leaves a partial sale behind. Callers that care
    /// (operational tooling, docs) can surface this honestly instead of
    /// assuming atomicity the backend does not provide.
    pub fn atomic_writes(&self) -> bool {
        matches!(self, BackendKind::Embedded)
    }
}

// =============================================================================
// Storage Adapter Trait
// =============================================================================

/// Capability interface over a persistence backend.
///
/// All ids are engine-minted UUID v4 strings, so inserts do not return
/// generated keys. Tenancy is a backend concern: implementations scope
/// every query to their configured tenant.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> BackendKind;

    /// Checks the backend is reachable and responsive.
    async fn health_check(&self) -> StoreResult<()>;

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Inserts a product. A non-zero initial quantity also appends one
    /// `in` StockMovement ("initial stock") in the same unit of work.
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    /// Point lookup by id. `Ok(None)` for unknown ids.
    async fn product_by_id(&self, id: &str) -> StoreResult<Option<Product>>;

    /// Point lookup by SKU within the tenant.
    async fn product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>>;

    /// Soft delete: clears the active flag, never removes the row.
    /// Historical sales keep valid references.
    async fn deactivate_product(&self, id: &str) -> StoreResult<()>;

    // -------------------------------------------------------------------------
    // Customers & Users (read-side collaborators)
    // -------------------------------------------------------------------------

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;

    async fn customer_by_id(&self, id: &str) -> StoreResult<Option<Customer>>;

    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    // -------------------------------------------------------------------------
    // Stock Ledger
    // -------------------------------------------------------------------------

    /// Applies one stock mutation and appends exactly one movement row.
    ///
    /// The quantity write is a single atomic in-place UPDATE, never
    /// read-then-write. Returns the new on-hand quantity.
    async fn apply_movement(&self, request: &MovementRequest) -> StoreResult<i64>;

    /// Movement history for a product, oldest first.
    async fn movements_for_product(&self, product_id: &str) -> StoreResult<Vec<StockMovement>>;

    // -------------------------------------------------------------------------
    // Sales: write
    // -------------------------------------------------------------------------

    /// Persists a validated sale draft: mints the invoice number,
    /// inserts the header and every line, and for each inventory-backed
    /// line decrements stock and appends its movement row.
    ///
    /// Atomicity differs by backend; see the module docs and
    /// [`BackendKind::atomic_writes`].
    async fn persist_sale(&self, draft: &SaleDraft) -> StoreResult<SaleReceipt>;

    // -------------------------------------------------------------------------
    // Sales: read
    // -------------------------------------------------------------------------

    /// Reconstructs a sale with display names and enriched lines.
    /// `Ok(None)` for unknown ids.
    async fn sale_by_id(&self, id: &str) -> StoreResult<Option<SaleDetail>>;

    /// All sales, newest first. Non-paginated.
    async fn sales_all(&self) -> StoreResult<Vec<SaleSummary>>;

    /// Sales whose creation timestamp falls on the given calendar day.
    async fn sales_on(&self, day: NaiveDate) -> StoreResult<Vec<SaleSummary>>;

    /// Purchase history for one customer, newest first.
    async fn sales_for_customer(&self, customer_id: &str) -> StoreResult<Vec<SaleSummary>>;
}
