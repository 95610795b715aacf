use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::LoggingConfig;

pub fn trace_cycle(sequence: u64) -> Span {
    tracing::info_span!(
        "aggregation_cycle",
        sequence = sequence,
    )
}

pub fn trace_fetch(source_id: &str) -> Span {
    tracing::info_span!(
        "adapter_fetch",
        source = %source_id,
    )
}

/// Install the global subscriber. `RUST_LOG` overrides the configured filter.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {}", e);
    }
}
