use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::models::{OrderedProduct, Product, RequestedItem};

// ============================================================================
// Line Item Enrichment and Pricing
// ============================================================================
//
// Pure request-shaping: combine what the caller asked for with what the
// catalog confirmed exists, then price the result. Everything here is
// deterministic and side-effect free.
//
// ============================================================================

/// Collapse duplicate product ids in a request.
///
/// The first occurrence keeps its position; for a repeated id the last
/// occurrence's quantity wins. Quantities are taken as requested - zero
/// quantities are dropped later, in `build_line_items`, so that the distinct
/// id list still covers them for the catalog lookup.
pub fn dedupe_requested(items: &[RequestedItem]) -> Vec<RequestedItem> {
    let mut by_id: HashMap<&str, usize> = HashMap::new();
    let mut deduped: Vec<RequestedItem> = Vec::new();

    for item in items {
        match by_id.get(item.product_id.as_str()) {
            Some(&idx) => deduped[idx].quantity = item.quantity,
            None => {
                by_id.insert(item.product_id.as_str(), deduped.len());
                deduped.push(item.clone());
            }
        }
    }

    deduped
}

/// Combine deduplicated request lines with the catalog's answer.
///
/// A requested item becomes a line item only when its product exists in the
/// catalog response and its quantity is non-zero; everything else is dropped
/// silently. Line items keep the request's order and carry the catalog's
/// current name, description and price (the price snapshot that will be
/// persisted).
///
/// Returns the line items plus counts of dropped entries
/// (zero-quantity, missing-from-catalog) for observability.
pub fn build_line_items(
    requested: &[RequestedItem],
    catalog: &[Product],
) -> (Vec<OrderedProduct>, u64, u64) {
    let by_id: HashMap<&str, &Product> =
        catalog.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut items = Vec::new();
    let mut dropped_zero_quantity = 0u64;
    let mut dropped_missing = 0u64;

    for request in requested {
        if request.quantity == 0 {
            dropped_zero_quantity += 1;
            continue;
        }
        match by_id.get(request.product_id.as_str()) {
            Some(product) => items.push(OrderedProduct {
                id: product.id.clone(),
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                quantity: request.quantity,
            }),
            None => dropped_missing += 1,
        }
    }

    (items, dropped_zero_quantity, dropped_missing)
}

/// Exact decimal sum of `price * quantity` over the final line items.
pub fn total_price(items: &[OrderedProduct]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

// ============================================================================
// Unit Tests
// ============================================================================
