use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use crate::config::sources::SourceConfig;
use crate::error::{FetchError, Result};
use crate::rate_infra::connectors::http::{HttpSource, Numeric};
use crate::rate_infra::connectors::SourceAdapter;
use crate::rate_infra::Observation;
use crate::types::protocol::Protocol;
use crate::types::timestamp::Timestamp;

/// dYdX solo markets: one supply APY per lendable token.
pub struct DydxAdapter {
    http: HttpSource,
}

impl DydxAdapter {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(DydxAdapter {
            http: HttpSource::new(Protocol::DyDx.id(), config)?,
        })
    }

    async fn fetch_markets(&self, timeout: Duration) -> std::result::Result<Vec<Observation>, FetchError> {
        let response: MarketsResponse = self.http.get_json("markets", timeout).await?;
        let observed_at = Timestamp::now();

        let observations = response
            .markets
            .into_iter()
            .filter_map(|market| {
                let apy = market.total_supply_apy.as_ref().and_then(Numeric::to_f64)?;
                Some(Observation::asset(Protocol::DyDx.id(), market.symbol, apy, observed_at))
            })
            .collect();

        Ok(observations)
    }
}

#[async_trait]
impl SourceAdapter for DydxAdapter {
    async fn fetch(&self, timeout: Duration) -> std::result::Result<Vec<Observation>, FetchError> {
        tokio::time::timeout(timeout, self.fetch_markets(timeout))
            .await
            .map_err(|_| FetchError::timeout(self.source_id(), format!("no response within {:?}", timeout)))?
    }

    fn source_id(&self) -> &str {
        self.http.source_id()
    }
}

#[derive(Deserialize)]
struct MarketsResponse {
    markets: Vec<Market>,
}

#[derive(Deserialize)]
struct Market {
    symbol: String,
    #[serde(rename = "totalSupplyAPY")]
    total_supply_apy: Option<Numeric>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> SourceConfig {
        SourceConfig {
            enabled: true,
            base_url,
            api_key: None,
            requests_per_second: 0.0,
        }
    }

    #[tokio::test]
    async fn test_markets_become_asset_observations() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "markets": [
                    { "symbol": "WETH", "totalSupplyAPY": "0.0123" },
                    { "symbol": "DAI", "totalSupplyAPY": 0.05 },
                    { "symbol": "USDC" }
                ]
            })))
            .mount(&server)
            .await;

        let adapter = DydxAdapter::new(&config(format!("{}/v1/", server.uri()))).unwrap();
        let observations = adapter.fetch(Duration::from_secs(5)).await.unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].protocol, "dYdX");
        assert_eq!(observations[0].raw_symbols, vec!["WETH".to_string()]);
        assert_eq!(observations[0].apy, 0.0123);
        assert_eq!(observations[1].raw_symbols, vec!["DAI".to_string()]);
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/markets"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let adapter = DydxAdapter::new(&config(format!("{}/v1", server.uri()))).unwrap();
        let err = adapter.fetch(Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Upstream);
        assert_eq!(err.protocol, "dYdX");
    }

    #[tokio::test]
    async fn test_unexpected_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let adapter = DydxAdapter::new(&config(format!("{}/v1", server.uri()))).unwrap();
        let err = adapter.fetch(Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/markets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "markets": [] }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let adapter = DydxAdapter::new(&config(format!("{}/v1", server.uri()))).unwrap();
        let err = adapter.fetch(Duration::from_millis(100)).await.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Timeout);
    }
}
