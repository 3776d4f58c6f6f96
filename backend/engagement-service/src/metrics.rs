use prometheus::{IntCounter, IntGauge, Opts};
use tracing::warn;

fn register(metric: Box<dyn prometheus::core::Collector>) {
    if let Err(e) = prometheus::default_registry().register(metric) {
        warn!("Failed to register metric: {}", e);
    }
}

/// Metrics for the event publisher
#[derive(Clone)]
pub struct PublisherMetrics {
    pub published: IntCounter,
    pub dropped: IntCounter,
}

impl PublisherMetrics {
    pub fn new(service: &str) -> Self {
        let published = IntCounter::with_opts(
            Opts::new(
                "engagement_events_published_total",
                "Total engagement events delivered to the event bus",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for engagement_events_published_total");

        let dropped = IntCounter::with_opts(
            Opts::new(
                "engagement_events_dropped_total",
                "Total engagement events dropped after retry exhaustion",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for engagement_events_dropped_total");

        register(Box::new(published.clone()));
        register(Box::new(dropped.clone()));

        Self { published, dropped }
    }
}

/// Metrics for the fan-out gateway
#[derive(Clone)]
pub struct GatewayMetrics {
    pub connections: IntGauge,
    pub broadcasts: IntCounter,
    pub pruned_subscribers: IntCounter,
}

impl GatewayMetrics {
    pub fn new(service: &str) -> Self {
        let connections = IntGauge::with_opts(
            Opts::new(
                "gateway_connections",
                "Currently registered WebSocket connections",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for gateway_connections");

        let broadcasts = IntCounter::with_opts(
            Opts::new(
                "gateway_broadcasts_total",
                "Total room broadcast deliveries attempted",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for gateway_broadcasts_total");

        let pruned_subscribers = IntCounter::with_opts(
            Opts::new(
                "gateway_pruned_subscribers_total",
                "Subscribers removed after a failed send",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for gateway_pruned_subscribers_total");

        register(Box::new(connections.clone()));
        register(Box::new(broadcasts.clone()));
        register(Box::new(pruned_subscribers.clone()));

        Self {
            connections,
            broadcasts,
            pruned_subscribers,
        }
    }
}

/// Metrics for the reconciliation sweep
#[derive(Clone)]
pub struct ReconciliationMetrics {
    pub sweeps: IntCounter,
    pub corrected: IntCounter,
}

impl ReconciliationMetrics {
    pub fn new(service: &str) -> Self {
        let sweeps = IntCounter::with_opts(
            Opts::new(
                "reconciliation_sweeps_total",
                "Total reconciliation sweeps completed",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for reconciliation_sweeps_total");

        let corrected = IntCounter::with_opts(
            Opts::new(
                "reconciliation_corrected_total",
                "Cached counters overwritten because they diverged from the ledger",
            )
            .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for reconciliation_corrected_total");

        register(Box::new(sweeps.clone()));
        register(Box::new(corrected.clone()));

        Self { sweeps, corrected }
    }
}
