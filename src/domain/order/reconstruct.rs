use crate::models::{Order, OrderedProduct};
use crate::store::OrderRow;

use super::errors::OrderError;

// ============================================================================
// Order Reconstruction - Flat Join Rows to Nested Orders
// ============================================================================
//
// A stateless forward fold over the store's flat read: one pass, one
// explicit current-group accumulator. The accumulator is constructed fresh
// at every group boundary and moved into the output when the group closes,
// so no value is ever aliased across groups.
//
// Input contract: rows arrive ordered by order id ascending, so all rows of
// one order are adjacent and group ids strictly increase across boundaries.
// A row that breaks that contract is a ReconstructionInconsistency.
//
// ============================================================================

/// Fold flat join rows into orders, one per distinct order id, in first
/// appearance order. Line items are appended exactly once per row; a row
/// with NULL item columns is the placeholder a zero-item order produces
/// through the outer join and contributes no item.
pub fn reconstruct_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, OrderError> {
    let mut orders: Vec<Order> = Vec::new();
    let mut current: Option<Order> = None;

    for row in rows {
        let same_group = current
            .as_ref()
            .is_some_and(|order| order.id == row.order_id);

        if !same_group {
            if let Some(finished) = current.take() {
                if row.order_id <= finished.id {
                    return Err(OrderError::ReconstructionInconsistency(format!(
                        "row for order {} arrived after group {} closed",
                        row.order_id, finished.id
                    )));
                }
                orders.push(finished);
            }
            current = Some(Order {
                id: row.order_id,
                created_at: row.created_at,
                account_id: row.account_id.clone(),
                total_price: row.total_price,
                products: Vec::new(),
            });
        }

        if let Some(order) = current.as_mut() {
            append_item(order, row)?;
        }
    }

    if let Some(finished) = current.take() {
        orders.push(finished);
    }

    Ok(orders)
}

/// Append a row's line item to its order, skipping the NULL placeholder of a
/// zero-item order. A row with only some item columns set violates the join
/// contract.
fn append_item(order: &mut Order, row: OrderRow) -> Result<(), OrderError> {
    let Some(product_id) = row.product_id else {
        return Ok(());
    };

    let (Some(quantity), Some(unit_price)) = (row.quantity, row.unit_price) else {
        return Err(OrderError::ReconstructionInconsistency(format!(
            "item {} of order {} has NULL quantity or price",
            product_id, order.id
        )));
    };

    let quantity = u32::try_from(quantity).map_err(|_| {
        OrderError::ReconstructionInconsistency(format!(
            "item {} of order {} has out-of-range quantity {}",
            product_id, order.id, quantity
        ))
    })?;

    // Stored fields only: display name/description are overlaid later from
    // the live catalog, the stored unit price stays authoritative.
    order.products.push(OrderedProduct {
        id: product_id,
        name: String::new(),
        description: String::new(),
        price: unit_price,
        quantity,
    });

    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
