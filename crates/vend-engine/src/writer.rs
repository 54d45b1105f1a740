//! # Sale Writer
//!
//! Orchestrates the sale write protocol.
//!
//! ## Write Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create(SaleRequest)                               │
//! │                                                                         │
//! │  1. Build draft      mint sale id + item ids, stamp created_at         │
//! │  2. Validate         shape/range checks, before any write              │
//! │  3. Pre-check refs   user, customer, every distinct product id         │
//! │  4. persist_sale     one adapter call = the whole unit of work:        │
//! │                      invoice number, header, items, and per            │
//! │                      inventory-backed line an atomic stock             │
//! │                      decrement + one `out` movement row whose          │
//! │                      note is the invoice number                        │
//! │  5. Return           SaleReceipt { sale_id, invoice_no }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Whether step 4 is all-or-nothing depends on the backend behind the
//! adapter; the writer itself is backend-agnostic.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::request::SaleRequest;
use vend_core::{validation, SaleDraft, SaleItemDraft, SaleReceipt};
use vend_store::StorageAdapter;

/// Orchestrates header + line-item persistence and the stock effects of
/// inventory-backed lines.
#[derive(Clone)]
pub struct SaleWriter {
    store: Arc<dyn StorageAdapter>,
    invoice_prefix: String,
    stock_floor: Option<i64>,
}

impl SaleWriter {
    /// Creates a new SaleWriter.
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        invoice_prefix: impl Into<String>,
        stock_floor: Option<i64>,
    ) -> Self {
        SaleWriter {
            store,
            invoice_prefix: invoice_prefix.into(),
            stock_floor,
        }
    }

    /// Creates a sale as a single logical unit.
    ///
    /// Expected failures (validation, referential, duplicate invoice,
    /// refused decrement) come back as structured [`EngineError`]
    /// values; nothing is reported as success unless the adapter
    /// completed the whole protocol.
    pub async fn create(&self, request: SaleRequest) -> EngineResult<SaleReceipt> {
        let draft = self.build_draft(&request);

        validation::validate_sale_draft(&draft)?;
        self.check_references(&request).await?;

        debug!(
            sale_id = %draft.id,
            items = draft.items.len(),
            total_cents = draft.total_cents,
            "Submitting sale draft"
        );

        let receipt = self.store.persist_sale(&draft).await?;

        info!(
            sale_id = %receipt.sale_id,
            invoice_no = %receipt.invoice_no,
            "Sale created"
        );

        Ok(receipt)
    }

    /// Mints ids and timestamps; pure assembly, no I/O.
    fn build_draft(&self, request: &SaleRequest) -> SaleDraft {
        SaleDraft {
            id: Uuid::new_v4().to_string(),
            customer_id: request.customer_id.clone(),
            user_id: request.user_id.clone(),
            subtotal_cents: request.subtotal_cents,
            discount_cents: request.discount_cents,
            tax_cents: request.tax_cents,
            total_cents: request.total_cents,
            payment_method: request.payment_method,
            created_at: Utc::now(),
            items: request
                .items
                .iter()
                .map(|line| SaleItemDraft {
                    id: Uuid::new_v4().to_string(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    discount_cents: line.discount_cents,
                    tax_rate_bps: line.tax_rate_bps,
                    line_total_cents: line.line_total_cents,
                })
                .collect(),
            invoice_prefix: self.invoice_prefix.clone(),
            stock_floor: self.stock_floor,
        }
    }

    /// Resolves every reference before the first write, so unknown ids
    /// fail with a clear message instead of a raw constraint error.
    /// Foreign keys remain the backstop underneath.
    async fn check_references(&self, request: &SaleRequest) -> EngineResult<()> {
        if self.store.user_by_id(&request.user_id).await?.is_none() {
            return Err(EngineError::Referential {
                entity: "User".to_string(),
                id: request.user_id.clone(),
            });
        }

        if let Some(customer_id) = request.customer_id.as_deref() {
            if self.store.customer_by_id(customer_id).await?.is_none() {
                return Err(EngineError::Referential {
                    entity: "Customer".to_string(),
                    id: customer_id.to_string(),
                });
            }
        }

        // Each distinct product checked once, even when it appears on
        // several lines
        let product_ids: BTreeSet<&str> = request
            .items
            .iter()
            .filter_map(|line| line.product_id.as_deref())
            .collect();

        for product_id in product_ids {
            match self.store.product_by_id(product_id).await? {
                // Soft-deleted products are not sellable
                Some(product) if product.is_active => {}
                _ => {
                    return Err(EngineError::Referential {
                        entity: "Product".to_string(),
                        id: product_id.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
