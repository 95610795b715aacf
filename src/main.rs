use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use defiveyor::api::query::QueryFacade;
use defiveyor::api::rest::{create_router, ApiState};
use defiveyor::config::AppConfig;
use defiveyor::observability::{metrics, tracing::init_tracing};
use defiveyor::rate_infra::aggregator::AggregationEngine;
use defiveyor::rate_infra::connectors::build_adapters;
use defiveyor::rate_infra::registry::SymbolRegistry;
use defiveyor::snapshot::SnapshotStore;
use defiveyor::utils::helper::{bind_address, environment, shutdown_signal};
use defiveyor::utils::task_supervisor::TaskSupervisor;

const SUPERVISOR_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = environment();
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.logging);
    metrics::register_metrics();
    tracing::info!(env = %env, "Starting defiveyor");

    let registry = Arc::new(
        SymbolRegistry::from_config(&config.registry.aliases).context("building symbol registry")?,
    );
    tracing::info!(aliases = registry.alias_count(), "Symbol registry loaded");

    let adapters = build_adapters(&config.sources).context("building source adapters")?;
    if adapters.is_empty() {
        tracing::warn!("No source adapters enabled; snapshots will stay empty");
    }

    let store = Arc::new(SnapshotStore::new());
    let engine = AggregationEngine::new(
        adapters,
        Arc::clone(&registry),
        Arc::clone(&store),
        config.engine.clone(),
    );

    let mut supervisor = TaskSupervisor::new();
    supervisor.spawn("aggregation_engine", engine.run());

    let state = Arc::new(ApiState {
        query: QueryFacade::new(Arc::clone(&store)),
    });
    let app = create_router(state);

    let addr = bind_address(&config.server)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    let outcome = tokio::select! {
        result = server => result.context("HTTP server failed"),
        err = supervisor.watch(SUPERVISOR_PERIOD) => Err(anyhow::Error::new(err)),
    };

    supervisor.shutdown_all();
    outcome
}
