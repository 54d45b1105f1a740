//! # Embedded SQLite Backend
//!
//! Connection pool management and the [`StorageAdapter`] implementation
//! for the local embedded database.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Backend                                     │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteConfig::new(path) ← Configure pool settings                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteStore::connect(config).await ← Create pool + run migrations    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │  (max_connections)        │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │                           │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Better crash recovery
//!
//! ## Transaction Guarantee
//! `persist_sale` and `apply_movement` run inside one native
//! transaction. SQLite's single-writer locking serializes them, which
//! also makes the in-transaction sequential invoice lookup race-free.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::adapter::{BackendKind, StorageAdapter};
use crate::error::{StoreError, StoreResult};
use vend_core::{
    invoice, Customer, MovementKind, MovementRequest, Product, SaleDetail, SaleDraft,
    SaleLineDetail, SaleReceipt, SaleSummary, StockMovement, User, DEFAULT_TENANT_ID,
};

/// Embedded migrations from the `migrations/sqlite` directory.
///
/// The `sqlx::migrate!()` macro embeds all SQL files from the specified
/// directory into the binary at compile time. No runtime file access
/// needed.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

// =============================================================================
// Configuration
// =============================================================================

/// Embedded database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = SqliteConfig::new("/path/to/vend.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a local POS terminal)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Tenant scope for every query. The embedded deployment is a
    /// single shop, so this defaults to [`DEFAULT_TENANT_ID`].
    pub tenant_id: String,
}

impl SqliteConfig {
    /// Creates a new configuration with the given path.
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let store = SqliteStore::connect(SqliteConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        SqliteConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// The embedded-engine storage backend.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    tenant_id: String,
}

impl SqliteStore {
    /// Creates the connection pool and prepares the schema.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite for POS workloads:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn connect(config: SqliteConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing embedded database"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite ships with foreign keys OFF for backwards
            // compatibility; the referential backstop needs them ON
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Embedded database pool created"
        );

        let store = SqliteStore {
            pool,
            tenant_id: config.tenant_id,
        };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Runs pending migrations. Idempotent, safe to call repeatedly.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running embedded database migrations");
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool, for operational
    /// queries not covered by the adapter.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool. All adapter operations fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // -------------------------------------------------------------------------
    // Shared statement helpers (used inside transactions)
    // -------------------------------------------------------------------------

    /// Atomic in-place stock delta: `quantity = quantity + delta`.
    ///
    /// With a floor, the guard rides in the WHERE clause so check and
    /// write are one statement, not read-then-write. Returns the new
    /// on-hand quantity.
    async fn shift_stock(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        delta: i64,
        floor: Option<i64>,
    ) -> StoreResult<i64> {
        let now = Utc::now();

        let updated: Option<i64> = match floor {
            Some(floor) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE products
                    SET quantity = quantity + ?1, updated_at = ?2
                    WHERE id = ?3 AND tenant_id = ?4 AND quantity + ?1 >= ?5
                    RETURNING quantity
                    "#,
                )
                .bind(delta)
                .bind(now)
                .bind(product_id)
                .bind(&self.tenant_id)
                .bind(floor)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    UPDATE products
                    SET quantity = quantity + ?1, updated_at = ?2
                    WHERE id = ?3 AND tenant_id = ?4
                    RETURNING quantity
                    "#,
                )
                .bind(delta)
                .bind(now)
                .bind(product_id)
                .bind(&self.tenant_id)
                .fetch_optional(&mut *conn)
                .await?
            }
        };

        match updated {
            Some(quantity) => Ok(quantity),
            // No row matched: either the product is unknown or the
            // guard refused the decrement. Disambiguate for the caller.
            None => {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1 AND tenant_id = ?2")
                        .bind(product_id)
                        .bind(&self.tenant_id)
                        .fetch_optional(&mut *conn)
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
        conn: &mut SqliteConnection,
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
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
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
        .execute(&mut *conn)
        .await?;

        Ok(id)
    }
}

// =============================================================================
// StorageAdapter Implementation
// =============================================================================

#[async_trait]
impl StorageAdapter for SqliteStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Embedded
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, category_id, supplier_id,
                cost_cents, price_cents, quantity, min_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
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
        .execute(&mut *tx)
        .await?;

        // Initial stock is itself an auditable event
        if product.quantity > 0 {
            self.append_movement(
                &mut tx,
                &product.id,
                MovementKind::In,
                product.quantity,
                None,
                None,
                Some("initial stock"),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn product_by_id(&self, id: &str) -> StoreResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name, category_id, supplier_id,
                   cost_cents, price_cents, quantity, min_stock,
                   is_active, created_at, updated_at
            FROM products
            WHERE id = ?1 AND tenant_id = ?2
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
            WHERE sku = ?1 AND tenant_id = ?2
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
            "UPDATE products SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3",
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
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
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
            WHERE id = ?1 AND tenant_id = ?2
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
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
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
            WHERE id = ?1 AND tenant_id = ?2
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

        let mut tx = self.pool.begin().await?;

        let new_quantity = match request.kind {
            MovementKind::In => {
                let qty = self
                    .shift_stock(&mut tx, &request.product_id, request.quantity, None)
                    .await?;
                self.append_movement(
                    &mut tx,
                    &request.product_id,
                    MovementKind::In,
                    request.quantity,
                    request.reference_type.as_deref(),
                    request.reference_id.as_deref(),
                    request.note.as_deref(),
                )
                .await?;
                qty
            }
            MovementKind::Out => {
                let qty = self
                    .shift_stock(&mut tx, &request.product_id, -request.quantity, request.floor)
                    .await?;
                self.append_movement(
                    &mut tx,
                    &request.product_id,
                    MovementKind::Out,
                    request.quantity,
                    request.reference_type.as_deref(),
                    request.reference_id.as_deref(),
                    request.note.as_deref(),
                )
                .await?;
                qty
            }
            MovementKind::Adjustment => {
                // Absolute replace. The previous value is read inside
                // the same transaction and recorded in the note so the
                // row stays self-describing.
                let previous: Option<i64> =
                    sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1 AND tenant_id = ?2")
                        .bind(&request.product_id)
                        .bind(&self.tenant_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                let previous =
                    previous.ok_or_else(|| StoreError::not_found("Product", &request.product_id))?;

                sqlx::query(
                    "UPDATE products SET quantity = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4",
                )
                .bind(request.quantity)
                .bind(Utc::now())
                .bind(&request.product_id)
                .bind(&self.tenant_id)
                .execute(&mut *tx)
                .await?;

                let note = match request.note.as_deref() {
                    Some(note) => format!("{} (was {})", note, previous),
                    None => format!("was {}", previous),
                };
                self.append_movement(
                    &mut tx,
                    &request.product_id,
                    MovementKind::Adjustment,
                    request.quantity,
                    request.reference_type.as_deref(),
                    request.reference_id.as_deref(),
                    Some(&note),
                )
                .await?;

                request.quantity
            }
        };

        tx.commit().await?;
        Ok(new_quantity)
    }

    async fn movements_for_product(&self, product_id: &str) -> StoreResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, tenant_id, product_id, kind, quantity,
                   reference_type, reference_id, note, created_at
            FROM stock_movements
            WHERE product_id = ?1 AND tenant_id = ?2
            ORDER BY created_at
            "#,
        )
        .bind(product_id)
        .bind(&self.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// The full sale write protocol in one native transaction.
    ///
    /// Any failure (constraint violation, unknown reference, guard
    /// refusal) rolls back everything: header, items, stock, movements.
    async fn persist_sale(&self, draft: &SaleDraft) -> StoreResult<SaleReceipt> {
        let mut tx = self.pool.begin().await?;

        // Sequential invoice numbering, race-free because it shares the
        // write transaction
        let day = draft.created_at.date_naive();
        let like = format!("{}%", invoice::day_prefix(&draft.invoice_prefix, day));
        let last: Option<String> = sqlx::query_scalar(
            r#"
            SELECT invoice_no FROM sales
            WHERE tenant_id = ?1 AND invoice_no LIKE ?2
            ORDER BY invoice_no DESC
            LIMIT 1
            "#,
        )
        .bind(&self.tenant_id)
        .bind(&like)
        .fetch_optional(&mut *tx)
        .await?;

        let invoice_no = invoice::next_sequential(&draft.invoice_prefix, day, last.as_deref())?;

        debug!(sale_id = %draft.id, invoice_no = %invoice_no, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, invoice_no, customer_id, user_id,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                payment_method, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
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
        .execute(&mut *tx)
        .await?;

        for (line_no, item) in draft.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, line_no, quantity,
                    unit_price_cents, discount_cents, tax_rate_bps,
                    line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
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
            .execute(&mut *tx)
            .await?;

            // Non-inventory lines (service fees) have no stock effect
            if let Some(product_id) = item.product_id.as_deref() {
                self.shift_stock(&mut tx, product_id, -item.quantity, draft.stock_floor)
                    .await?;
                self.append_movement(
                    &mut tx,
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

        tx.commit().await?;

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
            WHERE s.id = ?1 AND s.tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut detail) = header else {
            return Ok(None);
        };

        // Product name/SKU resolved at read time, not denormalized:
        // a later rename shows through in older sales
        detail.items = sqlx::query_as::<_, SaleLineDetail>(
            r#"
            SELECT si.id, si.sale_id, si.product_id,
                   p.name AS product_name, p.sku AS product_sku,
                   si.line_no, si.quantity, si.unit_price_cents,
                   si.discount_cents, si.tax_rate_bps, si.line_total_cents,
                   si.created_at
            FROM sale_items si
            LEFT JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = ?1
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
            WHERE s.tenant_id = ?1
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
            WHERE s.tenant_id = ?1 AND date(s.created_at) = ?2
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
            WHERE s.tenant_id = ?1 AND s.customer_id = ?2
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

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vend_core::PaymentMethod;

    async fn store() -> SqliteStore {
        SqliteStore::connect(SqliteConfig::in_memory()).await.unwrap()
    }

    fn product(id: &str, sku: &str, quantity: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            category_id: None,
            supplier_id: None,
            cost_cents: 50,
            price_cents: 100,
            quantity,
            min_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(id: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            name: "Cashier One".to_string(),
            username: "cashier1".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_in_memory_store_health() {
        let store = store().await;
        assert!(store.health_check().await.is_ok());
        assert!(store.backend().atomic_writes());
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = SqliteConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
    }

    #[tokio::test]
    async fn test_initial_quantity_emits_movement() {
        let store = store().await;
        store.insert_product(&product("p1", "COKE-330", 20)).await.unwrap();

        let movements = store.movements_for_product("p1").await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::In);
        assert_eq!(movements[0].quantity, 20);
        assert_eq!(movements[0].note.as_deref(), Some("initial stock"));
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_unique_violation() {
        let store = store().await;
        store.insert_product(&product("p1", "COKE-330", 0)).await.unwrap();
        let err = store
            .insert_product(&product("p2", "COKE-330", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_guarded_decrement_refuses_oversell() {
        let store = store().await;
        store.insert_product(&product("p1", "COKE-330", 3)).await.unwrap();

        let request = MovementRequest {
            id: Uuid::new_v4().to_string(),
            product_id: "p1".to_string(),
            kind: MovementKind::Out,
            quantity: 5,
            reference_type: None,
            reference_id: None,
            note: None,
            floor: Some(0),
            created_at: Utc::now(),
        };

        let err = store.apply_movement(&request).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { available: 3, requested: 5, .. }
        ));

        // Refused movement leaves no trace: no quantity change, no row
        let p = store.product_by_id("p1").await.unwrap().unwrap();
        assert_eq!(p.quantity, 3);
        assert_eq!(store.movements_for_product("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_whole_sale() {
        let store = store().await;
        store.insert_user(&user("u1")).await.unwrap();

        let draft = SaleDraft {
            id: "s1".to_string(),
            customer_id: None,
            user_id: "u1".to_string(),
            subtotal_cents: 100,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 100,
            payment_method: PaymentMethod::Cash,
            created_at: Utc::now(),
            items: vec![vend_core::SaleItemDraft {
                id: "i1".to_string(),
                product_id: Some("ghost".to_string()),
                quantity: 1,
                unit_price_cents: 100,
                discount_cents: 0,
                tax_rate_bps: 0,
                line_total_cents: 100,
            }],
            invoice_prefix: "INV".to_string(),
            stock_floor: None,
        };

        let err = store.persist_sale(&draft).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation { .. } | StoreError::NotFound { .. }
        ));

        // Strict all-or-nothing: no header row survives
        assert!(store.sale_by_id("s1").await.unwrap().is_none());
    }
}
