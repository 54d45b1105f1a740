//! # Stock Ledger
//!
//! Owns the semantics of on-hand quantity changes and their audit trail.
//!
//! ## Movement Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   kind         quantity write                    movement row           │
//! │   ──────────   ───────────────────────────────   ────────────────────   │
//! │   in           quantity = quantity + n           n (magnitude)          │
//! │   out          quantity = quantity - n           n (magnitude)          │
//! │                (guarded under Reject policy)                            │
//! │   adjustment   quantity = n (absolute replace)   n (the value set),     │
//! │                                                  previous value in note │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call appends exactly one movement row; movements are never
//! batched or merged. The quantity write itself is an atomic in-place
//! UPDATE inside the adapter, never read-then-write.
//!
//! Quantity is not clamped at zero here. Under the Allow policy an
//! oversell drives it negative and low stock stays a reporting concern.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::request::StockMovementInput;
use vend_core::{validation, MovementKind, MovementRequest, StockMovement};
use vend_store::StorageAdapter;

/// The stock ledger service.
#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn StorageAdapter>,
    stock_floor: Option<i64>,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(store: Arc<dyn StorageAdapter>, stock_floor: Option<i64>) -> Self {
        StockLedger { store, stock_floor }
    }

    /// Applies one standalone stock mutation and logs it.
    ///
    /// Returns the new on-hand quantity.
    pub async fn apply(&self, input: StockMovementInput) -> EngineResult<i64> {
        validation::validate_movement(input.kind, input.quantity)?;

        let request = MovementRequest {
            id: Uuid::new_v4().to_string(),
            product_id: input.product_id.clone(),
            kind: input.kind,
            quantity: input.quantity,
            reference_type: None,
            reference_id: None,
            note: input.note,
            // The oversell guard only ever applies to decrements
            floor: match input.kind {
                MovementKind::Out => self.stock_floor,
                _ => None,
            },
            created_at: Utc::now(),
        };

        let new_quantity = self.store.apply_movement(&request).await?;

        info!(
            product_id = %input.product_id,
            kind = input.kind.as_str(),
            quantity = input.quantity,
            new_quantity,
            "Stock movement applied"
        );

        Ok(new_quantity)
    }

    /// Movement history for one product, oldest first.
    pub async fn history(&self, product_id: &str) -> EngineResult<Vec<StockMovement>> {
        Ok(self.store.movements_for_product(product_id).await?)
    }
}
