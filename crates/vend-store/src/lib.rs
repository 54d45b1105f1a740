//! # vend-store: Storage Layer for Vend POS
//!
//! This crate provides persistence for the sale transaction engine
//! behind a single capability trait, [`StorageAdapter`], implemented by
//! two interchangeable backends selected at startup.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vend POS Data Flow                               │
//! │                                                                         │
//! │  vend-engine (SaleWriter / StockLedger / SaleReader)                   │
//! │       │                                                                 │
//! │       │  Arc<dyn StorageAdapter>  ← the ONLY thing the engine sees    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vend-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────────┐          ┌────────────────┐               │   │
//! │  │   │  SqliteStore   │          │    PgStore     │               │   │
//! │  │   │  (embedded)    │          │   (hosted)     │               │   │
//! │  │   │  one native    │          │  independent   │               │   │
//! │  │   │  transaction   │          │  network calls │               │   │
//! │  │   └───────┬────────┘          └───────┬────────┘               │   │
//! │  └───────────│───────────────────────────│────────────────────────┘   │
//! │              ▼                           ▼                              │
//! │     local vend.db (WAL)         hosted multi-tenant Postgres           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`adapter`] - The `StorageAdapter` capability trait + `BackendKind`
//! - [`sqlite`] - Embedded backend (pool, migrations, transactions)
//! - [`postgres`] - Hosted backend (tenant-scoped, weaker write unit)
//! - [`error`] - Storage error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vend_store::{SqliteConfig, SqliteStore, StorageAdapter};
//!
//! let store = SqliteStore::connect(SqliteConfig::new("./vend.db")).await?;
//! let product = store.product_by_sku("COKE-330").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adapter;
pub mod error;
pub mod postgres;
pub mod sqlite;

// =============================================================================
// Re-exports
// =============================================================================

pub use adapter::{BackendKind, StorageAdapter};
pub use error::{StoreError, StoreResult};
pub use postgres::{PgConfig, PgStore};
pub use sqlite::{SqliteConfig, SqliteStore};
