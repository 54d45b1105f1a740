//! # Hosted Postgres Backend
//!
//! The [`StorageAdapter`] implementation for the hosted multi-tenant
//! database. Several shop terminals write to it concurrently.
//!
//! ## Weaker Write Guarantee (documented, not hidden)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Hosted sale write = independent network calls              │
//! │                                                                         │
//! │  INSERT header ──► INSERT item 1 ──► UPDATE stock 1 ──► INSERT mvmt 1  │
//! │                           │                                             │
//! │                           ▼  crash / connection drop here              │
//! │                                                                         │
//! │  Result: header + item 1 + its stock effect persisted,                 │
//! │          remaining items never written = a PARTIAL SALE                │
//! │                                                                         │
//! │  There is no compensating-transaction/saga logic. Callers learn        │
//! │  about the gap through BackendKind::atomic_writes() == false.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! What IS upgraded on this path: every stock decrement is a single
//! atomic conditional UPDATE, so two terminals selling the same product
//! concurrently serialize on the row instead of racing a read-then-write
//! cycle.
//!
//! ## Invoice Numbers
//! A strict daily sequence would need an exclusive lock held across a
//! network round trip. Instead the suffix comes from the millisecond
//! clock: non-sequential, practically unique, theoretically collidable
//! under very high-frequency concurrent writes. A collision surfaces as
//! a unique-violation failure, never a silent retry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use crate::adapter::{BackendKind, StorageAdapter};
use crate::error::{StoreError, StoreResult};
use vend_core::{
    invoice, Customer, MovementKind, MovementRequest, Product, SaleDetail, SaleDraft,
    SaleLineDetail, SaleReceipt, SaleSummary, StockMovement, User,
};

/// Embedded migrations from the `migrations/postgres` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/postgres");

// =============================================================================
// Configuration
// =============================================================================

/// Hosted database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = PgConfig::new("postgres://pos@db.example.com/vend", "shop-42");
/// let store = PgStore::connect(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Connection URL for the hosted database.
    pub url: String,

    /// Tenant (shop) scope. Every query filters on this; invoice and
    /// SKU uniqueness hold within it.
    pub tenant_id: String,

    /// Maximum number of connections in the pool.
    /// Default: 10
    pub max_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: false (the hosted schema is usually provisioned
    /// centrally, not by each terminal)
    pub run_migrations: bool,
}

impl PgConfig {
    /// Creates a new configuration for the given URL and tenant.
    pub fn new(url: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        PgConfig {
            url: url.into(),
            tenant_id: tenant_id.into(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(30),
            run_migrations: false,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

// =============================================================================
// Store
// =============================================================================

/// The hosted-backend storage implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    tenant_id: String,
}

impl PgStore {
    /// Connects to the hosted database.
    pub async fn connect(config: PgConfig) -> StoreResult<Self> {
        info!(tenant_id = %config.tenant_id, "Connecting to hosted database");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = PgStore {
            pool,
            tenant_id: config.tenant_id,
        };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Runs pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running hosted database migrations");
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // -------------------------------------------------------------------------
    // Shared statement helpers (each an independent network call)
    // -------------------------------------------------------------------------

    /// Atomic in-place stock delta. The row-level write serializes
    /// concurrent terminals; with a floor the guard rides in the WHERE
    /// clause. Returns the new on-hand quantity.
    async fn shift_stock(&self, product_id: &str, delta: i64, floor: Option<i64>) -> StoreResult<i64> {
        let now = Utc::now();

        let updated: Option<i64> = match floor {
            Some(floor) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE products
                    SET quantity = quantity + $1, updated_at = $2
                    WHERE id = $3 AND tenant_id = $4 AND quantity + $1 >= $5
                    RETURNING quantity
                    "#,
                )
                .bind(delta)
                .bind(now)
                .bind(product_id)
                .bind(&self.tenant_id)
                .bind(floor)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    UPDATE products
                    SET quantity = quantity + $1, updated_at = $2
                    WHERE id = $3 AND tenant_id = $4
                    RETURNING quantity
                    "#,
                )
                .bind(delta)
                .bind(now)
                .bind(product_id)
                .bind(&self.tenant_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match updated {
            Some(quantity) => Ok(quantity),
            None => {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1 AND tenant_id = $2")
                        .bind(product_id)
                        .bind(&self.tenant_id)
                        .fetch_optional(&self.pool)
                        .await?;

                match available {
                    None => Err(StoreError::not_found("Product", product_id)),
                    Some(available) => Err(StoreError::InsufficientStock {
                        product_id: product_id.to_string(),
                        available,
                        requested: delta.abs(),
                    }),
                }
            }
        }
    }

    /// Appends one immutable movement row.
    #[allow(clippy::too_many_arguments)]
    async fn append_movement(
        &self,
        product_id: &str,
        kind: MovementKind,
        quantity: i64,
        reference_type: Option<&str>,
        reference_id: Option<&str>,
        note: Option<&str>,
    ) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, product_id, kind, quantity,
                reference_type, reference_id, note, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&id)
        .bind(&self.tenant_id)
        .bind(product_id)
        .bind(kind)
        .bind(quantity)
        .bind(reference_type)
        .bind(reference_id)
        .bind(note)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}

// =============================================================================
// StorageAdapter Implementation
// =============================================================================

#[async_trait]
impl StorageAdapter for PgStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Hosted
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, category_id, supplier_id,
                cost_cents, price_cents, quantity, min_stock,
                is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(&product.id)
        .bind(&self.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(&product.supplier_id)
        .bind(product.cost_cents)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        // Separate call; a crash in between loses the audit row but
        // keeps the product. Same weaker guarantee as the sale path.
        if product.quantity > 0 {
            self.append_movement(
                &product.id,
                MovementKind::In,
                product.quantity,
                None,
                None,
                Some("initial stock"),
            )
            .await?;
        }

        Ok(())
    }

    async fn product_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name, category_id, supplier_id,
                   cost_cents, price_cents, quantity, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name, category_id, supplier_id,
                   cost_cents, price_cents, quantity, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE sku = $1 AND tenant_id = $2
            "#,
        )
        .bind(sku)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn deactivate_product(&self, id: &str) -> StoreResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query(
            "UPDATE products SET is_active = false, updated_at = $1 WHERE id = $2 AND tenant_id = $3",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(&self.tenant_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, tenant_id, name, phone, address, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&customer.id)
        .bind(&self.tenant_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn customer_by_id(&self, id: &str) -> StoreResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, tenant_id, name, phone, address, is_active, created_at, updated_at
            FROM customers
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, tenant_id, name, username, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.id)
        .bind(&self.tenant_id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, tenant_id, name, username, is_active, created_at, updated_at
            FROM users
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn apply_movement(&self, request: &MovementRequest) -> StoreResult<i64> {
        debug!(
            product_id = %request.product_id,
            kind = request.kind.as_str(),
            quantity = request.quantity,
            "Applying stock movement"
        );

        match request.kind {
            MovementKind::In => {
                let qty = self.shift_stock(&request.product_id, request.quantity, None).await?;
                self.append_movement(
                    &request.product_id,
                    MovementKind::In,
                    request.quantity,
                    request.reference_type.as_deref(),
                    request.reference_id.as_deref(),
                    request.note.as_deref(),
                )
                .await?;
                Ok(qty)
            }
            MovementKind::Out => {
                let qty = self
                    .shift_stock(&request.product_id, -request.quantity, request.floor)
                    .await?;
                self.append_movement(
                    &request.product_id,
                    MovementKind::Out,
                    request.quantity,
                    request.reference_type.as_deref(),
                    request.reference_id.as_deref(),
                    request.note.as_deref(),
                )
                .await?;
                Ok(qty)
            }
            MovementKind::Adjustment => {
                // Absolute replace: last write wins between terminals.
                // The previous value is read in a separate call, so the
                // note is best-effort on this backend.
                let previous: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1 AND tenant_id = $2")
                        .bind(&request.product_id)
                        .bind(&self.tenant_id)
                        .fetch_optional(&self.pool)
                        .await?;

                let previous =
                    previous.ok_or_else(|| StoreError::not_found("Product", &request.product_id))?;

                sqlx::query(
                    "UPDATE products SET quantity = $1, updated_at = $2 WHERE id = $3 AND tenant_id = $4",
                )
                .bind(request.quantity)
                .bind(Utc::now())
                .bind(&request.product_id)
                .bind(&self.tenant_id)
                .execute(&self.pool)
                .await?;

                let note = match request.note.as_deref() {
                    Some(note) => format!("{} (was {})", note, previous),
                    None => format!("was {}", previous),
                };
                self.append_movement(
                    &request.product_id,
                    MovementKind::Adjustment,
                    request.quantity,
                    request.reference_type.as_deref(),
                    request.reference_id.as_deref(),
                    Some(&note),
                )
                .await?;

                Ok(request.quantity)
            }
        }
    }

    async fn movements_for_product(&self, product_id: &str) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, tenant_id, product_id, kind, quantity,
                   reference_type, reference_id, note, created_at
            FROM stock_movements
            WHERE product_id = $1 AND tenant_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(product_id)
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// The sale write protocol as a sequence of independent calls.
    ///
    /// See the module docs: a failure partway leaves a partial sale.
    /// Errors are still surfaced verbatim; what this path cannot do is
    /// undo the calls that already succeeded.
    async fn persist_sale(&self, draft: &SaleDraft) -> StoreResult<SaleReceipt> {
        let invoice_no = invoice::time_suffixed(&draft.invoice_prefix, draft.created_at);

        debug!(sale_id = %draft.id, invoice_no = %invoice_no, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, invoice_no, customer_id, user_id,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                payment_method, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&draft.id)
        .bind(&self.tenant_id)
        .bind(&invoice_no)
        .bind(&draft.customer_id)
        .bind(&draft.user_id)
        .bind(draft.subtotal_cents)
        .bind(draft.discount_cents)
        .bind(draft.tax_cents)
        .bind(draft.total_cents)
        .bind(draft.payment_method)
        .bind(draft.created_at)
        .execute(&self.pool)
        .await?;

        for (line_no, item) in draft.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, line_no, quantity,
                    unit_price_cents, discount_cents, tax_rate_bps,
                    line_total_cents, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&item.id)
            .bind(&draft.id)
            .bind(&item.product_id)
            .bind(line_no as i64)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_cents)
            .bind(item.tax_rate_bps)
            .bind(item.line_total_cents)
            .bind(draft.created_at)
            .execute(&self.pool)
            .await?;

            if let Some(product_id) = item.product_id.as_deref() {
                self.shift_stock(product_id, -item.quantity, draft.stock_floor).await?;
                self.append_movement(
                    product_id,
                    MovementKind::Out,
                    item.quantity,
                    Some("sale"),
                    Some(&draft.id),
                    Some(&invoice_no),
                )
                .await?;
            }
        }

        info!(sale_id = %draft.id, invoice_no = %invoice_no, items = draft.items.len(), "Sale persisted");

        Ok(SaleReceipt {
            sale_id: draft.id.clone(),
            invoice_no,
        })
    }

    async fn sale_by_id(&self, id: &str) -> StoreResult<Option<SaleDetail>> {
        let header = sqlx::query_as::<_, SaleDetail>(
            r#"
            SELECT s.id, s.tenant_id, s.invoice_no,
                   s.customer_id, c.name AS customer_name,
                   c.phone AS customer_phone, c.address AS customer_address,
                   s.user_id, u.name AS cashier_name,
                   s.subtotal_cents, s.discount_cents, s.tax_cents, s.total_cents,
                   s.payment_method, s.created_at
            FROM sales s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.id = $1 AND s.tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut detail) = header else {
            return Ok(None);
        };

        detail.items = sqlx::query_as::<_, SaleLineDetail>(
            r#"
            SELECT si.id, si.sale_id, si.product_id,
                   p.name AS product_name, p.sku AS product_sku,
                   si.line_no, si.quantity, si.unit_price_cents,
                   si.discount_cents, si.tax_rate_bps, si.line_total_cents,
                   si.created_at
            FROM sale_items si
            LEFT JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY si.line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(detail))
    }

    async fn sales_all(&self) -> StoreResult<Vec<SaleSummary>> {
        let sales = sqlx::query_as::<_, SaleSummary>(
            r#"
            SELECT s.id, s.invoice_no, s.customer_id, c.name AS customer_name,
                   u.name AS cashier_name, s.total_cents, s.payment_method, s.created_at
            FROM sales s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.tenant_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    async fn sales_on(&self, day: NaiveDate) -> StoreResult<Vec<SaleSummary>> {
        let sales = sqlx::query_as::<_, SaleSummary>(
            r#"
            SELECT s.id, s.invoice_no, s.customer_id, c.name AS customer_name,
                   u.name AS cashier_name, s.total_cents, s.payment_method, s.created_at
            FROM sales s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.tenant_id = $1 AND s.created_at::date = $2
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(&self.tenant_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    async fn sales_for_customer(&self, customer_id: &str) -> StoreResult<Vec<SaleSummary>> {
        let sales = sqlx::query_as::<_, SaleSummary>(
            r#"
            SELECT s.id, s.invoice_no, s.customer_id, c.name AS customer_name,
                   u.name AS cashier_name, s.total_cents, s.payment_method, s.created_at
            FROM sales s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE s.tenant_id = $1 AND s.customer_id = $2
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(&self.tenant_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}
