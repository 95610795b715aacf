use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};
use crate::config::EngineConfig;
use crate::error::{Error, FetchError, Result};
use crate::observability::metrics;
use crate::observability::tracing::{trace_cycle, trace_fetch};
use crate::rate_infra::connectors::SourceAdapter;
use crate::rate_infra::registry::SymbolRegistry;
use crate::rate_infra::series::RateSeries;
use crate::rate_infra::{Observation, ObservationKind};
use crate::snapshot::{AssetRateRecord, PairRateRecord, Snapshot, SnapshotStore};
use crate::types::asset::CanonicalAsset;
use crate::types::pair::CanonicalPair;
use crate::types::protocol::Protocol;
use crate::types::timestamp::Timestamp;

type AdapterResult = std::result::Result<Vec<Observation>, FetchError>;

/// How far past the cycle clock an `observed_at` may lie before the
/// observation is rejected.
const MAX_CLOCK_SKEW: Duration = Duration::from_secs(300);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct AssetKey {
    protocol: String,
    asset: CanonicalAsset,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PairKey {
    protocol: String,
    pair: CanonicalPair,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    Published { sequence: u64 },
    Failed { reason: String },
}

/// What one polling cycle did.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub sources_ok: Vec<String>,
    pub fetch_errors: Vec<FetchError>,
    pub ingested: usize,
    pub unknown_symbols: usize,
    pub non_finite: usize,
    pub stale: usize,
    pub asset_records: usize,
    pub pair_records: usize,
}

impl CycleReport {
    fn new() -> Self {
        CycleReport {
            outcome: CycleOutcome::Failed { reason: "not run".to_string() },
            sources_ok: Vec::new(),
            fetch_errors: Vec::new(),
            ingested: 0,
            unknown_symbols: 0,
            non_finite: 0,
            stale: 0,
            asset_records: 0,
            pair_records: 0,
        }
    }

    pub fn published_sequence(&self) -> Option<u64> {
        match self.outcome {
            CycleOutcome::Published { sequence } => Some(sequence),
            CycleOutcome::Failed { .. } => None,
        }
    }

    pub fn dropped(&self) -> usize {
        self.unknown_symbols + self.non_finite + self.stale
    }
}

/// Polls every adapter once per interval, folds the observations into the
/// rolling series and publishes a fresh snapshot.
///
/// All series state is owned here and only touched between the fan-in and
/// the publish, so cycles are strictly sequential.
pub struct AggregationEngine {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    registry: Arc<SymbolRegistry>,
    store: Arc<SnapshotStore>,
    config: EngineConfig,
    asset_series: BTreeMap<AssetKey, RateSeries>,
    pair_series: BTreeMap<PairKey, RateSeries>,
    next_sequence: u64,
}

impl AggregationEngine {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        registry: Arc<SymbolRegistry>,
        store: Arc<SnapshotStore>,
        config: EngineConfig,
    ) -> Self {
        let next_sequence = store.sequence() + 1;
        AggregationEngine {
            adapters,
            registry,
            store,
            config,
            asset_series: BTreeMap::new(),
            pair_series: BTreeMap::new(),
            next_sequence,
        }
    }

    pub fn series_count(&self) -> usize {
        self.asset_series.len() + self.pair_series.len()
    }

    /// Run cycles forever on the configured interval. The first cycle starts
    /// immediately; a cycle that overruns delays the next tick instead of
    /// stacking.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            adapters = self.adapters.len(),
            interval_secs = self.config.poll_interval_secs,
            "Aggregation engine started"
        );

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Timestamp::now()).await
    }

    /// One full dispatch, ingest, derive and publish pass, with `now` as the
    /// cycle clock for eviction and `published_at`.
    pub async fn run_cycle_at(&mut self, now: Timestamp) -> CycleReport {
        let span = trace_cycle(self.next_sequence);
        let started = Instant::now();

        let report = self.cycle(now).instrument(span).await;

        metrics::CYCLE_DURATION.observe(started.elapsed().as_secs_f64());
        match &report.outcome {
            CycleOutcome::Published { sequence } => {
                metrics::CYCLES_PUBLISHED.inc();
                metrics::SNAPSHOT_SEQUENCE.set(*sequence as i64);
                info!(
                    sequence = sequence,
                    sources_ok = report.sources_ok.len(),
                    fetch_errors = report.fetch_errors.len(),
                    ingested = report.ingested,
                    dropped = report.dropped(),
                    assets = report.asset_records,
                    pairs = report.pair_records,
                    "Snapshot published"
                );
            }
            CycleOutcome::Failed { reason } => {
                metrics::CYCLES_FAILED.inc();
                error!("Aggregation cycle failed, keeping previous snapshot: {}", reason);
            }
        }

        report
    }

    async fn cycle(&mut self, now: Timestamp) -> CycleReport {
        let mut report = CycleReport::new();

        let observations = self.collect(&mut report).await;
        self.ingest(observations, now, &mut report);

        let (asset_records, pair_records) = match self.derive(now) {
            Ok(records) => records,
            Err(e) => {
                report.outcome = CycleOutcome::Failed { reason: e.to_string() };
                return report;
            }
        };

        report.asset_records = asset_records.len();
        report.pair_records = pair_records.len();

        let sequence = self.next_sequence;
        self.store.publish(Snapshot {
            sequence,
            published_at: now,
            asset_records,
            pair_records,
        });
        self.next_sequence += 1;
        report.outcome = CycleOutcome::Published { sequence };

        report
    }

    /// Fan out one fetch per adapter and gather whatever completes before the
    /// cycle deadline. Adapters still running at the deadline are aborted.
    async fn collect(&self, report: &mut CycleReport) -> Vec<Observation> {
        let timeout = self.config.adapter_timeout();
        let deadline = Instant::now() + self.config.cycle_deadline();

        let mut aborts = Vec::with_capacity(self.adapters.len());
        let mut pending = FuturesUnordered::new();

        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let source_id = adapter.source_id().to_string();
            let span = trace_fetch(&source_id);

            let task_source = source_id.clone();
            let handle = tokio::spawn(
                async move {
                    match tokio::time::timeout(timeout, adapter.fetch(timeout)).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::timeout(
                            task_source,
                            format!("no response within {:?}", timeout),
                        )),
                    }
                }
                .instrument(span),
            );

            aborts.push((source_id, handle.abort_handle()));
            pending.push(async move { (index, handle.await) });
        }

        let mut finished = vec![false; aborts.len()];
        let mut observations = Vec::new();

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((index, joined))) => {
                    finished[index] = true;
                    let source_id = &aborts[index].0;
                    let result: AdapterResult = joined.unwrap_or_else(|e| {
                        Err(FetchError::upstream(
                            source_id.as_str(),
                            format!("fetch task did not complete: {}", e),
                        ))
                    });

                    match result {
                        Ok(batch) => {
                            debug!(source = %source_id, observations = batch.len(), "Adapter fetch completed");
                            report.sources_ok.push(source_id.clone());
                            observations.extend(batch);
                        }
                        Err(e) => record_fetch_error(report, source_id, e),
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    for (index, (source_id, abort)) in aborts.iter().enumerate() {
                        if finished[index] {
                            continue;
                        }
                        abort.abort();
                        record_fetch_error(
                            report,
                            source_id,
                            FetchError::timeout(source_id.as_str(), "aborted at cycle deadline"),
                        );
                    }
                    break;
                }
            }
        }

        observations
    }

    fn ingest(&mut self, observations: Vec<Observation>, now: Timestamp, report: &mut CycleReport) {
        let cutoff = now.saturating_sub(self.config.window());
        let horizon = now + MAX_CLOCK_SKEW;

        for observation in observations {
            match self.ingest_one(observation, cutoff, horizon) {
                Ok(()) => {
                    report.ingested += 1;
                    metrics::OBSERVATIONS_INGESTED.inc();
                }
                Err(e) => {
                    let reason = match &e {
                        Error::UnknownSymbol(_) => {
                            report.unknown_symbols += 1;
                            "unknown_symbol"
                        }
                        Error::NonFiniteApy { .. } => {
                            report.non_finite += 1;
                            "non_finite"
                        }
                        Error::StaleObservation { .. } | Error::FutureObservation { .. } => {
                            report.stale += 1;
                            "stale"
                        }
                        other => {
                            error!("Unexpected ingest error: {}", other);
                            "other"
                        }
                    };
                    metrics::OBSERVATIONS_DROPPED.with_label_values(&[reason]).inc();
                    debug!("Observation dropped: {}", e);
                }
            }
        }
    }

    fn ingest_one(&mut self, observation: Observation, cutoff: Timestamp, horizon: Timestamp) -> Result<()> {
        let Observation { protocol, kind, raw_symbols, apy, observed_at } = observation;

        if !apy.is_finite() {
            return Err(Error::NonFiniteApy { protocol, apy });
        }
        if observed_at < cutoff {
            return Err(Error::StaleObservation { protocol, observed_at });
        }
        if observed_at > horizon {
            return Err(Error::FutureObservation { protocol, observed_at });
        }
        if raw_symbols.len() != kind.symbol_count() || raw_symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(crate::error::UnknownSymbolError::missing(
                &protocol,
                format!("{:?} observation with symbols {:?}", kind, raw_symbols),
            )
            .into());
        }

        let protocol = published_protocol_id(&protocol);
        let window = self.config.window();

        match kind {
            ObservationKind::Asset => {
                let asset = self.registry.resolve_asset(&protocol, &raw_symbols[0])?;
                self.asset_series
                    .entry(AssetKey { protocol, asset })
                    .or_insert_with(|| RateSeries::new(window))
                    .push(apy, observed_at, &raw_symbols);
            }
            ObservationKind::Pair => {
                let (pair, swapped) =
                    self.registry
                        .resolve_pair_oriented(&protocol, &raw_symbols[0], &raw_symbols[1])?;
                let wrapped = if swapped {
                    vec![raw_symbols[1].clone(), raw_symbols[0].clone()]
                } else {
                    raw_symbols
                };
                self.pair_series
                    .entry(PairKey { protocol, pair })
                    .or_insert_with(|| RateSeries::new(window))
                    .push(apy, observed_at, &wrapped);
            }
        }

        Ok(())
    }

    /// Evict against the cycle clock and turn every non-empty series into a
    /// record. Ingest admits only finite samples and their mean is finite, so
    /// a non-finite mean is an engine fault: the series is purged and the
    /// cycle fails.
    fn derive(&mut self, now: Timestamp) -> Result<(Vec<AssetRateRecord>, Vec<PairRateRecord>)> {
        for series in self.asset_series.values_mut().chain(self.pair_series.values_mut()) {
            series.evict_expired(now);
        }
        self.asset_series.retain(|_, s| !s.is_empty());
        self.pair_series.retain(|_, s| !s.is_empty());

        let mut asset_records = Vec::with_capacity(self.asset_series.len());
        let mut bad_assets = Vec::new();
        for (key, series) in &self.asset_series {
            match series.average() {
                Some(mean) if mean.is_finite() => asset_records.push(AssetRateRecord {
                    protocol: key.protocol.clone(),
                    asset: key.asset,
                    symbol_wrapped: wrapped_symbol(series, 0, key.asset),
                    apy_average_30days: mean,
                    sample_count: series.len(),
                }),
                _ => bad_assets.push(key.clone()),
            }
        }

        let mut pair_records = Vec::with_capacity(self.pair_series.len());
        let mut bad_pairs = Vec::new();
        for (key, series) in &self.pair_series {
            match series.average() {
                Some(mean) if mean.is_finite() => pair_records.push(PairRateRecord {
                    protocol: key.protocol.clone(),
                    pair: key.pair,
                    symbol0_wrapped: wrapped_symbol(series, 0, key.pair.symbol0()),
                    symbol1_wrapped: wrapped_symbol(series, 1, key.pair.symbol1()),
                    apy_average_30days: mean,
                    sample_count: series.len(),
                }),
                _ => bad_pairs.push(key.clone()),
            }
        }

        if bad_assets.is_empty() && bad_pairs.is_empty() {
            return Ok((asset_records, pair_records));
        }

        let mut purged: Vec<String> = Vec::new();
        for key in bad_assets {
            purged.push(format!("{}/{}", key.protocol, key.asset));
            self.asset_series.remove(&key);
        }
        for key in bad_pairs {
            purged.push(format!("{}/{}", key.protocol, key.pair));
            self.pair_series.remove(&key);
        }
        error!(series = ?purged, "Purged series with a non-finite window mean");

        Err(Error::CycleFailed(format!(
            "non-finite window mean in {} series",
            purged.len()
        )))
    }
}

fn record_fetch_error(report: &mut CycleReport, source_id: &str, e: FetchError) {
    warn!(source = %source_id, kind = %e.kind, "Adapter fetch failed: {}", e.detail);
    metrics::FETCH_ERRORS
        .with_label_values(&[source_id, e.kind.as_str()])
        .inc();
    report.fetch_errors.push(e);
}

/// Known protocols publish under their canonical id so that `uniswapv2` and
/// `uniswap-v2` share a series.
fn published_protocol_id(raw: &str) -> String {
    Protocol::from_id(raw)
        .map(|p| p.id().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

fn wrapped_symbol(series: &RateSeries, index: usize, fallback: CanonicalAsset) -> String {
    series
        .wrapped_symbols()
        .get(index)
        .cloned()
        .unwrap_or_else(|| fallback.symbol().to_string())
}
