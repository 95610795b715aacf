use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed universe of assets rates are published for.
///
/// Declaration order is the total order used to normalize pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalAsset {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "DAI")]
    Dai,
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    Usdt,
}

impl CanonicalAsset {
    pub const ALL: [CanonicalAsset; 5] = [
        CanonicalAsset::Btc,
        CanonicalAsset::Eth,
        CanonicalAsset::Dai,
        CanonicalAsset::Usdc,
        CanonicalAsset::Usdt,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            CanonicalAsset::Btc => "BTC",
            CanonicalAsset::Eth => "ETH",
            CanonicalAsset::Dai => "DAI",
            CanonicalAsset::Usdc => "USDC",
            CanonicalAsset::Usdt => "USDT",
        }
    }

    /// Exact, case-insensitive match against a canonical symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        CanonicalAsset::ALL
            .iter()
            .copied()
            .find(|asset| asset.symbol().eq_ignore_ascii_case(symbol.trim()))
    }
}

impl fmt::Display for CanonicalAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CanonicalAsset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanonicalAsset::from_symbol(s).ok_or_else(|| format!("not a canonical asset: {}", s))
    }
}
