use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// ============================================================================
// Domain Models
// ============================================================================

/// An order as placed by one account, with its priced line items.
///
/// Orders are append-only: created exactly once, never updated. `total_price`
/// is computed at creation and stored; reconstruction re-displays the stored
/// value instead of re-deriving it from live catalog data.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Order {
    /// UUIDv7: unique across the store and sortable in creation order.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub account_id: String,
    pub total_price: Decimal,
    pub products: Vec<OrderedProduct>,
}

/// A single line item attached to exactly one order.
///
/// `price` is the unit price snapshotted at order time and is authoritative.
/// `name` and `description` are display metadata only: filled from the
/// catalog at creation and re-overlaid with current values on read.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderedProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// One requested line in an incoming order: product id plus desired quantity.
/// Zero quantities and unknown product ids are filtered out before
/// persistence, never stored.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RequestedItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Account as served by the Account service. Read-only here; the order
/// service uses it purely as an existence check.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Account {
    pub id: String,
    pub name: String,
}

/// Product as served by the Catalog service: a read-only reference snapshot
/// at lookup time.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

// ============================================================================
// Unit Tests
// ============================================================================
