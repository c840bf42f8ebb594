//! # Metrics
//!
//! - `fleetshard_reconciliations_total{outcome}` - reconciliation passes by outcome
//! - `fleetshard_reconciliation_duration_seconds` - duration of a reconciliation pass
//! - `fleetshard_managed_centrals` - centrals assigned to this cluster

use std::sync::LazyLock;

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fleetshard_reconciliations_total",
            "Total number of central reconciliation passes by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "fleetshard_reconciliation_duration_seconds",
            "Duration of a central reconciliation pass in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static MANAGED_CENTRALS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "fleetshard_managed_centrals",
        "Number of centrals assigned to this cluster",
    )
    .expect("Failed to create MANAGED_CENTRALS metric - this should never happen")
});

/// Register all metrics with the registry served on `/metrics`
pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(MANAGED_CENTRALS.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(outcome: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_reconciliation_duration(seconds: f64) {
    RECONCILIATION_DURATION.observe(seconds);
}

pub fn set_managed_centrals(count: usize) {
    MANAGED_CENTRALS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

#[cfg(test)]
pub(crate) fn reconciliations(outcome: &str) -> u64 {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).get()
}
