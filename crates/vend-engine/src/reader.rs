//! # Sale Reader
//!
//! Read-side reconstruction of sales for display and printing.
//!
//! All queries are read-only, non-paginated projections of the same
//! join: header + customer display fields + operator name, and for the
//! detail view each line enriched with the product's current name and
//! SKU. Enrichment happens at read time, so a product rename shows
//! through in older sales' listings.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::error::EngineResult;
use vend_core::{SaleDetail, SaleSummary};
use vend_store::StorageAdapter;

/// The sale read service.
#[derive(Clone)]
pub struct SaleReader {
    store: Arc<dyn StorageAdapter>,
}

impl SaleReader {
    /// Creates a new SaleReader.
    pub fn new(store: Arc<dyn StorageAdapter>) -> Self {
        SaleReader { store }
    }

    /// Reconstructs one sale with enriched lines.
    ///
    /// Unknown ids are a well-defined `Ok(None)`, not an error.
    pub async fn by_id(&self, id: &str) -> EngineResult<Option<SaleDetail>> {
        debug!(sale_id = %id, "Loading sale detail");
        Ok(self.store.sale_by_id(id).await?)
    }

    /// All sales, newest first.
    pub async fn all(&self) -> EngineResult<Vec<SaleSummary>> {
        Ok(self.store.sales_all().await?)
    }

    /// Sales created today (UTC calendar day).
    pub async fn today(&self) -> EngineResult<Vec<SaleSummary>> {
        self.on(Utc::now().date_naive()).await
    }

    /// Sales created on the given calendar day.
    pub async fn on(&self, day: NaiveDate) -> EngineResult<Vec<SaleSummary>> {
        Ok(self.store.sales_on(day).await?)
    }

    /// Purchase history for one customer, newest first.
    pub async fn for_customer(&self, customer_id: &str) -> EngineResult<Vec<SaleSummary>> {
        Ok(self.store.sales_for_customer(customer_id).await?)
    }
}
