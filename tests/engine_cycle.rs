use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use mockall::mock;
use defiveyor::api::query::QueryFacade;
use defiveyor::config::EngineConfig;
use defiveyor::error::{FetchError, FetchErrorKind};
use defiveyor::rate_infra::aggregator::AggregationEngine;
use defiveyor::rate_infra::connectors::SourceAdapter;
use defiveyor::rate_infra::registry::SymbolRegistry;
use defiveyor::rate_infra::Observation;
use defiveyor::snapshot::SnapshotStore;
use defiveyor::types::asset::CanonicalAsset;
use defiveyor::types::timestamp::Timestamp;

mock! {
    Adapter {}

    #[async_trait]
    impl SourceAdapter for Adapter {
        async fn fetch(&self, timeout: Duration) -> Result<Vec<Observation>, FetchError>;
        fn source_id(&self) -> &str;
    }
}

/// Never answers within any sane timeout.
struct StalledAdapter {
    name: String,
}

#[async_trait]
impl SourceAdapter for StalledAdapter {
    async fn fetch(&self, _timeout: Duration) -> Result<Vec<Observation>, FetchError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    fn source_id(&self) -> &str {
        &self.name
    }
}

/// Takes `delay` per fetch and records how many fetches overlap.
struct CountingAdapter {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for CountingAdapter {
    async fn fetch(&self, _timeout: Duration) -> Result<Vec<Observation>, FetchError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn source_id(&self) -> &str {
        "counting"
    }
}

const DAY: Duration = Duration::from_secs(86_400);

fn start() -> Timestamp {
    Timestamp::from_millis(1_600_000_000_000)
}

fn fixed(name: &str, observations: Vec<Observation>) -> Arc<dyn SourceAdapter> {
    let mut mock = MockAdapter::new();
    mock.expect_source_id().return_const(name.to_string());
    mock.expect_fetch().returning(move |_| Ok(observations.clone()));
    Arc::new(mock)
}

/// Returns `first` on the first fetch and nothing afterwards.
fn once(name: &str, first: Vec<Observation>) -> Arc<dyn SourceAdapter> {
    let mut mock = MockAdapter::new();
    mock.expect_source_id().return_const(name.to_string());
    let mut pending = Some(first);
    mock.expect_fetch()
        .returning(move |_| Ok(pending.take().unwrap_or_default()));
    Arc::new(mock)
}

fn config() -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 300,
        adapter_timeout_secs: 2,
        cycle_deadline_secs: 5,
        window_days: 30,
    }
}

fn engine(adapters: Vec<Arc<dyn SourceAdapter>>, config: EngineConfig) -> (AggregationEngine, Arc<SnapshotStore>) {
    let store = Arc::new(SnapshotStore::new());
    let engine = AggregationEngine::new(
        adapters,
        Arc::new(SymbolRegistry::with_defaults()),
        Arc::clone(&store),
        config,
    );
    (engine, store)
}

#[tokio::test]
async fn test_two_of_nine_adapters_timing_out_still_publishes_the_rest() {
    let now = start();
    let healthy = [
        ("uniswap-v2", "WBTC"),
        ("sushiswap", "WETH"),
        ("curve", "renBTC"),
        ("bancor", "DAI"),
        ("1inch", "USDC"),
        ("yearn", "yUSDT"),
        ("compound", "cDAI"),
    ];
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = healthy
        .iter()
        .map(|(protocol, symbol)| fixed(protocol, vec![Observation::asset(*protocol, *symbol, 0.05, now)]))
        .collect();
    adapters.push(Arc::new(StalledAdapter { name: "dYdX".to_string() }));
    adapters.push(Arc::new(StalledAdapter { name: "aave".to_string() }));

    let (mut engine, store) = engine(adapters, config());
    let started = tokio::time::Instant::now();
    let report = engine.run_cycle_at(now).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(report.published_sequence(), Some(1));
    assert_eq!(report.sources_ok.len(), 7);
    assert_eq!(report.fetch_errors.len(), 2);
    assert!(report.fetch_errors.iter().all(|e| e.kind == FetchErrorKind::Timeout));

    let snapshot = store.get();
    assert_eq!(snapshot.asset_records.len(), 7);
    let protocols = snapshot.protocols();
    assert!(!protocols.contains(&"dYdX"));
    assert!(!protocols.contains(&"aave"));
}

#[tokio::test]
async fn test_cycle_deadline_cuts_off_adapters_with_longer_timeouts() {
    let now = start();
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        fixed("aave", vec![Observation::asset("aave", "USDC", 0.03, now)]),
        Arc::new(StalledAdapter { name: "bancor".to_string() }),
    ];
    let config = EngineConfig {
        adapter_timeout_secs: 60,
        cycle_deadline_secs: 1,
        ..config()
    };

    let (mut engine, store) = engine(adapters, config);
    let started = tokio::time::Instant::now();
    let report = engine.run_cycle_at(now).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.fetch_errors.len(), 1);
    assert_eq!(report.fetch_errors[0].protocol, "bancor");
    assert_eq!(report.fetch_errors[0].kind, FetchErrorKind::Timeout);
    assert_eq!(store.get().asset_records.len(), 1);
}

#[tokio::test]
async fn test_aged_out_series_produce_no_record() {
    let now = start();
    let (mut engine, store) = engine(
        vec![
            once("compound", vec![Observation::asset("compound", "cUSDC", 0.02, now)]),
            fixed("aave", vec![Observation::asset("aave", "DAI", 0.04, now)]),
        ],
        config(),
    );

    engine.run_cycle_at(now).await;
    assert_eq!(store.get().asset_records.len(), 2);

    engine.run_cycle_at(now + DAY * 31).await;

    let snapshot = store.get();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.asset_records.len(), 1);
    assert_eq!(snapshot.asset_records[0].protocol, "aave");
}

#[tokio::test]
async fn test_pair_orders_merge_into_one_series() {
    let now = start();
    let (mut engine, store) = engine(
        vec![fixed(
            "sushiswap",
            vec![
                Observation::pair("sushiswap", "WETH", "WBTC", 0.08, now),
                Observation::pair("sushiswap", "WBTC", "WETH", 0.12, now),
            ],
        )],
        config(),
    );

    engine.run_cycle_at(now).await;

    let pairs = QueryFacade::new(Arc::clone(&store)).list_pairs();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].symbol0, CanonicalAsset::Btc);
    assert_eq!(pairs[0].symbol1, CanonicalAsset::Eth);
    assert!((pairs[0].apy_average_30days - 0.10).abs() < 1e-12);
    assert_eq!(store.get().pair_records[0].sample_count, 2);
}

#[tokio::test]
async fn test_total_outage_publishes_empty_snapshot() {
    let mut down = MockAdapter::new();
    down.expect_source_id().return_const("dYdX".to_string());
    down.expect_fetch()
        .returning(|_| Err(FetchError::upstream("dYdX", "HTTP 503")));

    let (mut engine, store) = engine(vec![Arc::new(down)], config());
    let report = engine.run_cycle_at(start()).await;

    assert_eq!(report.published_sequence(), Some(1));
    let snapshot = store.get();
    assert_eq!(snapshot.sequence, 1);
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_window_mean_over_cycles_reaches_the_query_facade() {
    let now = start();
    let mut adapter = MockAdapter::new();
    adapter.expect_source_id().return_const("aave".to_string());
    let mut readings = vec![(0.09, now + DAY), (0.05, now)];
    adapter.expect_fetch()
        .times(2)
        .returning(move |_| {
            let (apy, observed_at) = readings.pop().unwrap();
            Ok(vec![Observation::asset("aave", "DAI", apy, observed_at)])
        });

    let (mut engine, store) = engine(vec![Arc::new(adapter)], config());
    engine.run_cycle_at(now).await;
    engine.run_cycle_at(now + DAY).await;

    let assets = QueryFacade::new(store).list_assets();
    assert_eq!(
        serde_json::to_value(&assets).unwrap(),
        serde_json::json!([{
            "protocol": "aave",
            "symbol": "DAI",
            "symbol_wrapped": "DAI",
            "apy_average_30days": 0.07
        }])
    );
}

#[tokio::test]
async fn test_panicking_adapter_is_isolated() {
    let now = start();
    let mut broken = MockAdapter::new();
    broken.expect_source_id().return_const("curve".to_string());
    broken.expect_fetch().returning(|_| panic!("decoder bug"));

    let (mut engine, store) = engine(
        vec![
            Arc::new(broken),
            fixed("yearn", vec![Observation::asset("yearn", "yDAI", 0.06, now)]),
        ],
        config(),
    );

    let report = engine.run_cycle_at(now).await;

    assert_eq!(report.published_sequence(), Some(1));
    assert_eq!(report.fetch_errors.len(), 1);
    assert_eq!(report.fetch_errors[0].kind, FetchErrorKind::Upstream);
    assert_eq!(store.get().asset_records[0].symbol_wrapped, "yDAI");
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap() {
    let adapter = Arc::new(CountingAdapter {
        delay: Duration::from_secs(3),
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
        calls: AtomicUsize::new(0),
    });
    let config = EngineConfig {
        poll_interval_secs: 1,
        adapter_timeout_secs: 10,
        cycle_deadline_secs: 30,
        window_days: 30,
    };
    let (engine, store) = engine(vec![adapter.clone() as Arc<dyn SourceAdapter>], config);

    let handle = tokio::spawn(engine.run());
    tokio::time::sleep(Duration::from_secs(20)).await;
    handle.abort();

    let calls = adapter.calls.load(Ordering::SeqCst);
    assert!(calls >= 3, "expected several cycles, got {}", calls);
    assert!(calls <= 8, "cycles stacked up: {} calls in 20s", calls);
    assert_eq!(adapter.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(store.sequence() >= 3);
}
