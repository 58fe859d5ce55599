use async_trait::async_trait;
use futures_util::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::models::Order;
use super::{OrderRow, OrderStore, StoreError};

// ============================================================================
// Postgres Order Store
// ============================================================================

const SELECT_ORDER_ROWS: &str = "\
    SELECT o.id AS order_id, o.created_at, o.account_id, o.total_price, \
           i.product_id, i.quantity, i.unit_price \
    FROM orders o \
    LEFT JOIN order_items i ON i.order_id = o.id \
    WHERE o.account_id = $1 \
    ORDER BY o.id ASC";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Connect to Postgres and make sure the order tables exist.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Bootstrap the schema on startup.
    ///
    /// `unit_price` snapshots the catalog price at order time: catalog prices
    /// are mutable, and a historical total must stay stable no matter what
    /// the catalog says later.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL,
                account_id TEXT NOT NULL,
                total_price NUMERIC NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS order_items (
                order_id UUID NOT NULL REFERENCES orders(id),
                product_id TEXT NOT NULL,
                quantity BIGINT NOT NULL,
                unit_price NUMERIC NOT NULL,
                PRIMARY KEY (order_id, product_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_account_id ON orders (account_id)")
            .execute(&self.pool)
            .await?;

        tracing::debug!("order schema ready");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn write_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, created_at, account_id, total_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id)
        .bind(order.created_at)
        .bind(&order.account_id)
        .bind(order.total_price)
        .execute(&mut *tx)
        .await?;

        for item in &order.products {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order.id)
            .bind(&item.id)
            .bind(i64::from(item.quantity))
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        // Commit or nothing: a failure on any item insert drops the
        // transaction and rolls the order header back with it.
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            account_id = %order.account_id,
            item_count = order.products.len(),
            total_price = %order.total_price,
            "order committed"
        );

        Ok(())
    }

    async fn read_order_rows(&self, account_id: &str) -> Result<Vec<OrderRow>, StoreError> {
        let mut stream = sqlx::query_as::<_, OrderRow>(SELECT_ORDER_ROWS)
            .bind(account_id)
            .fetch(&self.pool);

        let mut rows = Vec::new();
        while let Some(row) = stream.try_next().await? {
            rows.push(row);
        }

        tracing::debug!(account_id = %account_id, row_count = rows.len(), "read order rows");
        Ok(rows)
    }
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// The Postgres paths need a live database and are integration-test
// territory:
//
// 1. write_order commits header + items atomically; an item insert failure
//    leaves no orphaned order row.
// 2. Writing the same order id twice fails with a primary-key violation.
// 3. read_order_rows returns rows ordered by order id ascending and
//    represents a zero-item order as one row with NULL item columns.
// 4. A read started concurrently with a write observes either the whole
//    order or none of it.
//
// The fold over the rows and the orchestration on top of it are covered by
// the unit tests in domain/order with an in-memory store.
//
// ============================================================================
