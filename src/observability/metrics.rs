use std::sync::Once;
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Cycle metrics
    pub static ref CYCLES_PUBLISHED: IntCounter = IntCounter::new(
        "aggregation_cycles_published_total",
        "Aggregation cycles that published a snapshot"
    ).unwrap();

    pub static ref CYCLES_FAILED: IntCounter = IntCounter::new(
        "aggregation_cycles_failed_total",
        "Aggregation cycles that kept the previous snapshot"
    ).unwrap();

    pub static ref SNAPSHOT_SEQUENCE: IntGauge = IntGauge::new(
        "snapshot_sequence",
        "Sequence number of the current snapshot"
    ).unwrap();

    pub static ref CYCLE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "aggregation_cycle_duration_seconds",
            "Wall time from dispatch to publish"
        ).buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0])
    ).unwrap();

    // Source metrics
    pub static ref FETCH_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("adapter_fetch_errors_total", "Failed adapter fetches"),
        &["source", "kind"]
    ).unwrap();

    // Observation metrics
    pub static ref OBSERVATIONS_INGESTED: IntCounter = IntCounter::new(
        "observations_ingested_total",
        "Observations appended to a rate series"
    ).unwrap();

    pub static ref OBSERVATIONS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("observations_dropped_total", "Observations rejected before ingest"),
        &["reason"]
    ).unwrap();
}

static REGISTER: Once = Once::new();

/// Safe to call more than once; registration happens on the first call.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(CYCLES_PUBLISHED.clone()),
            Box::new(CYCLES_FAILED.clone()),
            Box::new(SNAPSHOT_SEQUENCE.clone()),
            Box::new(CYCLE_DURATION.clone()),
            Box::new(FETCH_ERRORS.clone()),
            Box::new(OBSERVATIONS_INGESTED.clone()),
            Box::new(OBSERVATIONS_DROPPED.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!("Metric registration failed: {}", e);
            }
        }
    });
}

/// Prometheus text exposition of every registered metric.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("Metric encoding failed: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent_and_renders() {
        register_metrics();
        register_metrics();
        CYCLES_PUBLISHED.inc();
        FETCH_ERRORS.with_label_values(&["dYdX", "timeout"]).inc();

        let text = render();
        assert!(text.contains("aggregation_cycles_published_total"));
        assert!(text.contains("adapter_fetch_errors_total{kind=\"timeout\",source=\"dYdX\"}"));
    }
}
