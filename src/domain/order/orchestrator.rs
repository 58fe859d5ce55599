use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::models::{Order, Product, RequestedItem};
use crate::ports::{AccountPort, CatalogPort, PortError};
use crate::store::{OrderStore, StoreError};
use crate::utils::bounded;

use super::errors::OrderError;
use super::pricing;
use super::reconstruct::reconstruct_orders;

// ============================================================================
// Order Orchestrator
// ============================================================================
//
// Composes the three failure domains: Account service, Catalog service, and
// the transactional store. Placement validates the account and enriches the
// requested items before anything is written; retrieval folds the flat read
// back into orders and overlays current catalog display data.
//
// Both port lookups and every store call are bounded by the configured
// deadline. There are no internal retries - a failed operation is reported
// and the caller owns the retry decision.
//
// ============================================================================

pub struct OrderOrchestrator {
    accounts: Arc<dyn AccountPort>,
    catalog: Arc<dyn CatalogPort>,
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
    call_deadline: Duration,
}

impl OrderOrchestrator {
    pub fn new(
        accounts: Arc<dyn AccountPort>,
        catalog: Arc<dyn CatalogPort>,
        store: Arc<dyn OrderStore>,
        metrics: Arc<Metrics>,
        call_deadline: Duration,
    ) -> Self {
        Self {
            accounts,
            catalog,
            store,
            metrics,
            call_deadline,
        }
    }

    /// Validate, enrich, price and atomically persist a new order.
    ///
    /// Returns the order exactly as committed. On any error nothing has been
    /// written.
    pub async fn place_order(
        &self,
        account_id: &str,
        requested: Vec<RequestedItem>,
    ) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.place_order_inner(account_id, requested).await;

        match &result {
            Ok(order) => {
                self.metrics.record_order_placed(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %order.id,
                    account_id = %order.account_id,
                    item_count = order.products.len(),
                    total_price = %order.total_price,
                    "order placed"
                );
            }
            Err(error) => {
                self.metrics
                    .record_order_failed(error.kind(), started.elapsed().as_secs_f64());
                tracing::warn!(
                    account_id = %account_id,
                    kind = error.kind(),
                    error = %error,
                    "order placement failed"
                );
            }
        }

        result
    }

    async fn place_order_inner(
        &self,
        account_id: &str,
        requested: Vec<RequestedItem>,
    ) -> Result<Order, OrderError> {
        if account_id.is_empty() {
            return Err(OrderError::AccountNotFound(account_id.to_string()));
        }

        let deduped = pricing::dedupe_requested(&requested);
        let product_ids: Vec<String> =
            deduped.iter().map(|item| item.product_id.clone()).collect();

        // The two lookups have no data dependency; issue them concurrently.
        // The account answer still gates everything: a write only happens
        // once both have succeeded.
        let account_fut = bounded(self.call_deadline, self.accounts.get_account(account_id));
        let catalog_fut = async {
            if product_ids.is_empty() {
                // Nothing to look up; same outcome as a zero-match response.
                Ok(Ok(Vec::new()))
            } else {
                bounded(self.call_deadline, self.catalog.get_products(&product_ids)).await
            }
        };
        let (account_result, catalog_result) = tokio::join!(account_fut, catalog_fut);

        // An account we cannot confirm is treated the same as a missing one:
        // the request is invalid and nothing may be persisted.
        let account = match account_result {
            Ok(Ok(Some(account))) => account,
            Ok(Ok(None)) => return Err(OrderError::AccountNotFound(account_id.to_string())),
            Ok(Err(error)) => {
                tracing::warn!(account_id = %account_id, error = %error, "account lookup failed");
                return Err(OrderError::AccountNotFound(account_id.to_string()));
            }
            Err(elapsed) => {
                tracing::warn!(account_id = %account_id, error = %elapsed, "account lookup timed out");
                return Err(OrderError::AccountNotFound(account_id.to_string()));
            }
        };

        let catalog_products = match catalog_result {
            Ok(Ok(products)) => products,
            Ok(Err(error)) => return Err(OrderError::CatalogUnavailable(error)),
            Err(elapsed) => {
                return Err(OrderError::CatalogUnavailable(PortError::DeadlineExceeded(
                    elapsed,
                )))
            }
        };

        let (items, dropped_zero, dropped_missing) =
            pricing::build_line_items(&deduped, &catalog_products);
        self.metrics.record_items_dropped("zero_quantity", dropped_zero);
        self.metrics.record_items_dropped("not_in_catalog", dropped_missing);

        if items.is_empty() {
            // Every requested item filtered out. The order is still created:
            // a zero-item order with total 0 is a legitimate committed state.
            tracing::debug!(account_id = %account.id, "all requested items filtered out");
        }

        let order = Order {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            account_id: account.id,
            total_price: pricing::total_price(&items),
            products: items,
        };

        match bounded(self.call_deadline, self.store.write_order(&order)).await {
            Ok(Ok(())) => Ok(order),
            Ok(Err(error)) => Err(OrderError::PersistenceFailed(error)),
            Err(elapsed) => Err(OrderError::PersistenceFailed(StoreError::DeadlineExceeded(
                elapsed,
            ))),
        }
    }

    /// Return every order for one account in creation order, line items
    /// nested, display fields refreshed from the catalog where possible.
    pub async fn list_orders_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<Order>, OrderError> {
        let rows = match bounded(self.call_deadline, self.store.read_order_rows(account_id)).await
        {
            Ok(Ok(rows)) => rows,
            Ok(Err(error)) => return Err(OrderError::PersistenceFailed(error)),
            Err(elapsed) => {
                return Err(OrderError::PersistenceFailed(StoreError::DeadlineExceeded(
                    elapsed,
                )))
            }
        };

        let mut orders = reconstruct_orders(rows)?;

        // One batched catalog call for every product id across every order,
        // instead of one call per line item.
        let mut seen = HashSet::new();
        let product_ids: Vec<String> = orders
            .iter()
            .flat_map(|order| order.products.iter())
            .filter(|item| seen.insert(item.id.clone()))
            .map(|item| item.id.clone())
            .collect();

        if !product_ids.is_empty() {
            match bounded(self.call_deadline, self.catalog.get_products(&product_ids)).await {
                Ok(Ok(products)) => overlay_display_fields(&mut orders, &products),
                Ok(Err(error)) => {
                    // Enrichment is best-effort: stored orders are returned
                    // as-is when the catalog cannot be reached.
                    tracing::warn!(account_id = %account_id, error = %error, "catalog enrichment failed");
                    self.metrics.record_enrichment_failure();
                }
                Err(elapsed) => {
                    tracing::warn!(account_id = %account_id, error = %elapsed, "catalog enrichment timed out");
                    self.metrics.record_enrichment_failure();
                }
            }
        }

        self.metrics.record_orders_listed();
        Ok(orders)
    }
}

/// Overlay current catalog name/description onto matching line items. The
/// stored unit price and quantity stay untouched: they are what the order's
/// total was computed from. Items whose product left the catalog keep their
/// stored fields.
fn overlay_display_fields(orders: &mut [Order], products: &[Product]) {
    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    for order in orders.iter_mut() {
        for item in order.products.iter_mut() {
            if let Some(product) = by_id.get(item.id.as_str()) {
                item.name = product.name.clone();
                item.description = product.description.clone();
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use crate::store::OrderRow;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // In-memory fakes, injected through the port and store traits
    // ------------------------------------------------------------------

    struct FakeAccounts {
        known: Vec<Account>,
        fail: bool,
    }

    #[async_trait]
    impl AccountPort for FakeAccounts {
        async fn get_account(&self, id: &str) -> Result<Option<Account>, PortError> {
            if self.fail {
                return Err(PortError::UnexpectedStatus(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(self.known.iter().find(|a| a.id == id).cloned())
        }
    }

    struct FakeCatalog {
        products: Vec<Product>,
        fail: bool,
    }

    #[async_trait]
    impl CatalogPort for FakeCatalog {
        async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, PortError> {
            if self.fail {
                return Err(PortError::UnexpectedStatus(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ));
            }
            Ok(self
                .products
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }
    }

    /// Store fake that keeps committed orders in memory and serves the same
    /// flat rows a LEFT JOIN read would produce.
    struct InMemoryStore {
        orders: Mutex<Vec<Order>>,
        fail_writes: bool,
    }

    impl InMemoryStore {
        fn new() -> Self {
            Self {
                orders: Mutex::new(Vec::new()),
                fail_writes: false,
            }
        }

        fn failing() -> Self {
            Self {
                orders: Mutex::new(Vec::new()),
                fail_writes: true,
            }
        }
    }

    #[async_trait]
    impl OrderStore for InMemoryStore {
        async fn write_order(&self, order: &Order) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(())
        }

        async fn read_order_rows(&self, account_id: &str) -> Result<Vec<OrderRow>, StoreError> {
            let mut orders: Vec<Order> = self
                .orders
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.account_id == account_id)
                .cloned()
                .collect();
            orders.sort_by_key(|o| o.id);

            let mut rows = Vec::new();
            for order in orders {
                if order.products.is_empty() {
                    rows.push(OrderRow {
                        order_id: order.id,
                        created_at: order.created_at,
                        account_id: order.account_id.clone(),
                        total_price: order.total_price,
                        product_id: None,
                        quantity: None,
                        unit_price: None,
                    });
                    continue;
                }
                for item in &order.products {
                    rows.push(OrderRow {
                        order_id: order.id,
                        created_at: order.created_at,
                        account_id: order.account_id.clone(),
                        total_price: order.total_price,
                        product_id: Some(item.id.clone()),
                        quantity: Some(i64::from(item.quantity)),
                        unit_price: Some(item.price),
                    });
                }
            }
            Ok(rows)
        }
    }

    fn catalog_products() -> Vec<Product> {
        vec![
            Product {
                id: "P1".to_string(),
                name: "Widget".to_string(),
                description: "A widget".to_string(),
                price: Decimal::new(999, 2),
            },
            Product {
                id: "P2".to_string(),
                name: "Gadget".to_string(),
                description: "A gadget".to_string(),
                price: Decimal::new(500, 2),
            },
        ]
    }

    fn orchestrator(
        accounts: FakeAccounts,
        catalog: FakeCatalog,
        store: Arc<InMemoryStore>,
    ) -> OrderOrchestrator {
        OrderOrchestrator::new(
            Arc::new(accounts),
            Arc::new(catalog),
            store,
            Arc::new(Metrics::new().unwrap()),
            Duration::from_secs(1),
        )
    }

    fn known_account() -> FakeAccounts {
        FakeAccounts {
            known: vec![Account {
                id: "A1".to_string(),
                name: "Alice".to_string(),
            }],
            fail: false,
        }
    }

    fn requested(id: &str, quantity: u32) -> RequestedItem {
        RequestedItem {
            product_id: id.to_string(),
            quantity,
        }
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_place_order_concrete_scenario() {
        // P1 at 9.99 x 2, P2 at quantity 0, P3 unknown -> only P1 persists.
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );

        let order = orch
            .place_order("A1", vec![requested("P1", 2), requested("P2", 0), requested("P3", 1)])
            .await
            .unwrap();

        assert_eq!(order.products.len(), 1);
        assert_eq!(order.products[0].id, "P1");
        assert_eq!(order.products[0].quantity, 2);
        assert_eq!(order.products[0].price, Decimal::new(999, 2));
        assert_eq!(order.total_price, Decimal::new(1998, 2));
        assert_eq!(store.orders.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_then_list_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store,
        );

        let placed = orch
            .place_order("A1", vec![requested("P1", 2), requested("P2", 3)])
            .await
            .unwrap();

        let listed = orch.list_orders_for_account("A1").await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, placed.id);
        assert_eq!(listed[0].total_price, Decimal::new(3498, 2)); // 19.98 + 15.00
        let derived: Decimal = listed[0]
            .products
            .iter()
            .map(|p| p.price * Decimal::from(p.quantity))
            .sum();
        assert_eq!(listed[0].total_price, derived);
        // Display fields re-enriched from the catalog on read.
        assert_eq!(listed[0].products[0].name, "Widget");
    }

    #[tokio::test]
    async fn test_unknown_account_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );

        let result = orch.place_order("A9", vec![requested("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::AccountNotFound(_))));
        assert!(store.orders.lock().unwrap().is_empty());
        assert!(orch.list_orders_for_account("A9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_account_lookup_failure_is_account_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            FakeAccounts { known: vec![], fail: true },
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );

        let result = orch.place_order("A1", vec![requested("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::AccountNotFound(_))));
        assert!(store.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_account_id_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store,
        );

        let result = orch.place_order("", vec![requested("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_before_any_write() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: vec![], fail: true },
            store.clone(),
        );

        let result = orch.place_order("A1", vec![requested("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::CatalogUnavailable(_))));
        assert!(store.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_items_filtered_still_creates_order() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );

        let order = orch
            .place_order("A1", vec![requested("P9", 5), requested("P1", 0)])
            .await
            .unwrap();

        assert!(order.products.is_empty());
        assert_eq!(order.total_price, Decimal::ZERO);

        // And the degenerate order survives the read path.
        let listed = orch.list_orders_for_account("A1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, order.id);
        assert!(listed[0].products.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_request_ids_last_quantity_wins() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store,
        );

        let order = orch
            .place_order("A1", vec![requested("P1", 2), requested("P1", 5)])
            .await
            .unwrap();

        assert_eq!(order.products.len(), 1);
        assert_eq!(order.products[0].quantity, 5);
        assert_eq!(order.total_price, Decimal::new(999, 2) * Decimal::from(5u32));
    }

    #[tokio::test]
    async fn test_placement_is_not_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );

        let first = orch.place_order("A1", vec![requested("P1", 1)]).await.unwrap();
        let second = orch.place_order("A1", vec![requested("P1", 1)]).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.id < second.id); // creation-order sortable
        assert_eq!(store.orders.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_failed() {
        let store = Arc::new(InMemoryStore::failing());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store,
        );

        let result = orch.place_order("A1", vec![requested("P1", 1)]).await;

        assert!(matches!(result, Err(OrderError::PersistenceFailed(_))));
    }

    // ------------------------------------------------------------------
    // Retrieval
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_orders_in_creation_order() {
        let store = Arc::new(InMemoryStore::new());
        let orch = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store,
        );

        let first = orch.place_order("A1", vec![requested("P1", 1)]).await.unwrap();
        let second = orch.place_order("A1", vec![requested("P2", 2)]).await.unwrap();

        let listed = orch.list_orders_for_account("A1").await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn test_list_enrichment_is_best_effort() {
        let store = Arc::new(InMemoryStore::new());
        let placing = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );
        let placed = placing
            .place_order("A1", vec![requested("P1", 2)])
            .await
            .unwrap();

        // Catalog down on the read path: stored fields come back untouched.
        let listing = orchestrator(
            known_account(),
            FakeCatalog { products: vec![], fail: true },
            store,
        );
        let listed = listing.list_orders_for_account("A1").await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].total_price, placed.total_price);
        assert_eq!(listed[0].products[0].price, Decimal::new(999, 2));
        assert!(listed[0].products[0].name.is_empty());
    }

    #[tokio::test]
    async fn test_list_keeps_stored_price_under_changed_catalog() {
        let store = Arc::new(InMemoryStore::new());
        let placing = orchestrator(
            known_account(),
            FakeCatalog { products: catalog_products(), fail: false },
            store.clone(),
        );
        placing.place_order("A1", vec![requested("P1", 2)]).await.unwrap();

        // Catalog price doubled since; the stored order must not move.
        let repriced = vec![Product {
            id: "P1".to_string(),
            name: "Widget v2".to_string(),
            description: "A newer widget".to_string(),
            price: Decimal::new(1998, 2),
        }];
        let listing = orchestrator(
            known_account(),
            FakeCatalog { products: repriced, fail: false },
            store,
        );
        let listed = listing.list_orders_for_account("A1").await.unwrap();

        let item = &listed[0].products[0];
        assert_eq!(item.price, Decimal::new(999, 2)); // stored, not live
        assert_eq!(item.name, "Widget v2"); // display refreshed
        assert_eq!(listed[0].total_price, Decimal::new(1998, 2));
    }

    #[tokio::test]
    async fn test_slow_store_hits_deadline() {
        struct SlowStore;

        #[async_trait]
        impl OrderStore for SlowStore {
            async fn write_order(&self, _order: &Order) -> Result<(), StoreError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
            async fn read_order_rows(
                &self,
                _account_id: &str,
            ) -> Result<Vec<OrderRow>, StoreError> {
                Ok(Vec::new())
            }
        }

        let orch = OrderOrchestrator::new(
            Arc::new(known_account()),
            Arc::new(FakeCatalog { products: catalog_products(), fail: false }),
            Arc::new(SlowStore),
            Arc::new(Metrics::new().unwrap()),
            Duration::from_millis(20),
        );

        let result = orch.place_order("A1", vec![requested("P1", 1)]).await;

        assert!(matches!(
            result,
            Err(OrderError::PersistenceFailed(StoreError::DeadlineExceeded(_)))
        ));
    }
}
