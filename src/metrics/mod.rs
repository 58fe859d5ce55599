use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order placement (throughput, latency, failures by kind)
// - Request shaping (line items dropped and why)
// - Read-path catalog enrichment failures
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Order Placement Metrics
    pub orders_placed: IntCounter,
    pub orders_failed: IntCounterVec,
    pub place_order_duration: Histogram,

    // Request Shaping Metrics
    pub items_dropped: IntCounterVec,

    // Read Path Metrics
    pub orders_listed: IntCounter,
    pub enrichment_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Order Placement Metrics
        let orders_placed = IntCounter::new(
            "orders_placed_total",
            "Total orders successfully committed",
        )?;
        registry.register(Box::new(orders_placed.clone()))?;

        let orders_failed = IntCounterVec::new(
            Opts::new("orders_failed_total", "Total failed order placements"),
            &["kind"],
        )?;
        registry.register(Box::new(orders_failed.clone()))?;

        let place_order_duration = Histogram::with_opts(
            HistogramOpts::new("place_order_duration_seconds", "Order placement duration")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(place_order_duration.clone()))?;

        // Request Shaping Metrics
        let items_dropped = IntCounterVec::new(
            Opts::new(
                "order_items_dropped_total",
                "Requested line items dropped before persistence",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(items_dropped.clone()))?;

        // Read Path Metrics
        let orders_listed = IntCounter::new(
            "orders_listed_total",
            "Total order list reads served",
        )?;
        registry.register(Box::new(orders_listed.clone()))?;

        let enrichment_failures = IntCounter::new(
            "catalog_enrichment_failures_total",
            "Read-path catalog enrichment calls that failed (best-effort)",
        )?;
        registry.register(Box::new(enrichment_failures.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_failed,
            place_order_duration,
            items_dropped,
            orders_listed,
            enrichment_failures,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a committed order
    pub fn record_order_placed(&self, duration_secs: f64) {
        self.orders_placed.inc();
        self.place_order_duration.observe(duration_secs);
    }

    /// Helper to record a failed placement by error kind
    pub fn record_order_failed(&self, kind: &str, duration_secs: f64) {
        self.orders_failed.with_label_values(&[kind]).inc();
        self.place_order_duration.observe(duration_secs);
    }

    /// Helper to record dropped line items
    pub fn record_items_dropped(&self, reason: &str, count: u64) {
        if count > 0 {
            self.items_dropped.with_label_values(&[reason]).inc_by(count);
        }
    }

    /// Helper to record a served list read
    pub fn record_orders_listed(&self) {
        self.orders_listed.inc();
    }

    /// Helper to record a best-effort enrichment failure
    pub fn record_enrichment_failure(&self) {
        self.enrichment_failures.inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
