//! # Engine Error Types
//!
//! The structured failure results callers of the engine see.
//!
//! ## Propagation Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Failure Categories                                 │
//! │                                                                         │
//! │  (1) Validation   - malformed request, caught before any write         │
//! │  (2) Referential  - unknown product/customer/user reference            │
//! │  (3) Uniqueness   - invoice number or SKU collision, surfaced,         │
//! │                     never silently retried                             │
//! │  (4) Stock        - guarded decrement refused (Reject policy only)     │
//! │  (5) Storage      - connectivity/driver failure, message attached      │
//! │                                                                         │
//! │  The engine never panics across its boundary for any of these; every  │
//! │  operation returns Result<T, EngineError> and Display gives the        │
//! │  user-facing message.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Partial failure on the hosted backend is not a distinct error value:
//! the failing call's error propagates verbatim, and whether earlier
//! calls of the same sale survived is a property of the backend
//! (`BackendKind::atomic_writes`), not of the error.

use thiserror::Error;

use vend_core::ValidationError;
use vend_store::StoreError;

/// Failures surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was malformed; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist (or is soft-deleted and no
    /// longer eligible).
    #[error("{entity} not found: {id}")]
    Referential { entity: String, id: String },

    /// Unique constraint collision. For invoice numbers this is the
    /// extremely-unlikely-but-handled case; on the hosted backend the
    /// time-suffixed scheme makes it theoretically possible.
    #[error("Duplicate {field}")]
    Duplicate { field: String },

    /// A decrement would drive on-hand quantity below the configured
    /// floor. Only produced under the Reject oversell policy.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Storage-level failure, surfaced with the underlying message.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl EngineError {
    /// User-facing message for `{success:false, message}` style callers.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Classify store failures into the engine's taxonomy.
impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => EngineError::Referential { entity, id },
            StoreError::ForeignKeyViolation { message } => EngineError::Referential {
                entity: "Reference".to_string(),
                id: message,
            },
            StoreError::UniqueViolation { field, .. } => EngineError::Duplicate { field },
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            other => EngineError::Storage(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_becomes_referential() {
        let err: EngineError = StoreError::not_found("Product", "p1").into();
        assert!(matches!(err, EngineError::Referential { .. }));
        assert_eq!(err.message(), "Product not found: p1");
    }

    #[test]
    fn test_unique_violation_becomes_duplicate() {
        let err: EngineError = StoreError::duplicate("invoice_no", "INV-260807-0001").into();
        assert!(matches!(err, EngineError::Duplicate { .. }));
    }

    #[test]
    fn test_insufficient_stock_passes_through() {
        let err: EngineError = StoreError::InsufficientStock {
            product_id: "p1".to_string(),
            available: 3,
            requested: 5,
        }
        .into();
        assert!(matches!(
            err,
            EngineError::InsufficientStock { available: 3, requested: 5, .. }
        ));
    }
}
