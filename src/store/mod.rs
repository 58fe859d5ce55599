use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::Order;
use crate::utils::DeadlineExceeded;

mod postgres;

pub use postgres::PgOrderStore;

// ============================================================================
// Order Store - Transactional Persistence for Orders and Line Items
// ============================================================================
//
// The store exposes exactly two operations: an atomic multi-row write and a
// flat join read. Nesting the flat rows back into orders is the
// reconstructor's job, not the store's.
//
// ============================================================================

/// Failure of a store call. `Database` covers everything the driver reports,
/// including the primary-key violation raised when an order id is written
/// twice - duplicates are an error condition, never silently deduplicated.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

/// One flat join row: an order's header fields combined with one of its line
/// items. For an order with no line items the read produces a single row
/// whose item columns are all NULL.
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub total_price: Decimal,
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order and all of its line items in a single transaction.
    /// Either every row commits or none do.
    async fn write_order(&self, order: &Order) -> Result<(), StoreError>;

    /// Read the flat join rows for one account, ordered by order id
    /// ascending. Within one order the item rows carry no particular
    /// secondary order.
    async fn read_order_rows(&self, account_id: &str) -> Result<Vec<OrderRow>, StoreError>;
}
