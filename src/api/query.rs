use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::snapshot::{AssetRateRecord, PairRateRecord, SnapshotStore};
use crate::types::asset::CanonicalAsset;

/// `/assets` wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub protocol: String,
    pub symbol: CanonicalAsset,
    pub symbol_wrapped: String,
    pub apy_average_30days: f64,
}

impl From<&AssetRateRecord> for AssetRecord {
    fn from(record: &AssetRateRecord) -> Self {
        AssetRecord {
            protocol: record.protocol.clone(),
            symbol: record.asset,
            symbol_wrapped: record.symbol_wrapped.clone(),
            apy_average_30days: record.apy_average_30days,
        }
    }
}

/// `/pairs` wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub protocol: String,
    pub symbol0: CanonicalAsset,
    pub symbol0_wrapped: String,
    pub symbol1: CanonicalAsset,
    pub symbol1_wrapped: String,
    pub apy_average_30days: f64,
}

impl From<&PairRateRecord> for PairRecord {
    fn from(record: &PairRateRecord) -> Self {
        PairRecord {
            protocol: record.protocol.clone(),
            symbol0: record.pair.symbol0(),
            symbol0_wrapped: record.symbol0_wrapped.clone(),
            symbol1: record.pair.symbol1(),
            symbol1_wrapped: record.symbol1_wrapped.clone(),
            apy_average_30days: record.apy_average_30days,
        }
    }
}

/// Read-only projections of the current snapshot. Never fails: before the
/// first publish both lists are empty.
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<SnapshotStore>,
}

impl QueryFacade {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        QueryFacade { store }
    }

    pub fn list_assets(&self) -> Vec<AssetRecord> {
        self.store.get().asset_records.iter().map(AssetRecord::from).collect()
    }

    pub fn list_pairs(&self) -> Vec<PairRecord> {
        self.store.get().pair_records.iter().map(PairRecord::from).collect()
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use crate::types::pair::CanonicalPair;
    use crate::types::timestamp::Timestamp;

    #[test]
    fn test_empty_before_first_publish() {
        let facade = QueryFacade::new(Arc::new(SnapshotStore::new()));
        assert!(facade.list_assets().is_empty());
        assert!(facade.list_pairs().is_empty());
    }

    #[test]
    fn test_projects_current_snapshot() {
        let store = Arc::new(SnapshotStore::new());
        let facade = QueryFacade::new(Arc::clone(&store));
        let pair = CanonicalPair::new(CanonicalAsset::Eth, CanonicalAsset::Btc).unwrap();

        store.publish(Snapshot {
            sequence: 1,
            published_at: Timestamp::from_millis(1),
            asset_records: vec![AssetRateRecord {
                protocol: "aave".to_string(),
                asset: CanonicalAsset::Dai,
                symbol_wrapped: "DAI".to_string(),
                apy_average_30days: 0.07,
                sample_count: 2,
            }],
            pair_records: vec![PairRateRecord {
                protocol: "uniswap-v2".to_string(),
                pair,
                symbol0_wrapped: "WBTC".to_string(),
                symbol1_wrapped: "WETH".to_string(),
                apy_average_30days: 0.12,
                sample_count: 1,
            }],
        });

        let assets = facade.list_assets();
        assert_eq!(
            serde_json::to_value(&assets).unwrap(),
            serde_json::json!([{
                "protocol": "aave",
                "symbol": "DAI",
                "symbol_wrapped": "DAI",
                "apy_average_30days": 0.07
            }])
        );

        let pairs = facade.list_pairs();
        assert_eq!(pairs[0].symbol0, CanonicalAsset::Btc);
        assert_eq!(pairs[0].symbol0_wrapped, "WBTC");
        assert_eq!(pairs[0].symbol1, CanonicalAsset::Eth);
    }
}
