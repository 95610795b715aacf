use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocols the bundled source adapters report for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    UniSwap,
    SushiSwap,
    Curve,
    Bancor,
    OneInch,
    Yearn,
    Compound,
    DyDx,
    Aave,
}

impl Protocol {
    pub const ALL: [Protocol; 9] = [
        Protocol::UniSwap,
        Protocol::SushiSwap,
        Protocol::Curve,
        Protocol::Bancor,
        Protocol::OneInch,
        Protocol::Yearn,
        Protocol::Compound,
        Protocol::DyDx,
        Protocol::Aave,
    ];

    /// Identifier published in rate records.
    pub fn id(&self) -> &'static str {
        match self {
            Protocol::UniSwap => "uniswap-v2",
            Protocol::SushiSwap => "sushiswap",
            Protocol::Curve => "curve",
            Protocol::Bancor => "bancor",
            Protocol::OneInch => "1inch",
            Protocol::Yearn => "yearn",
            Protocol::Compound => "compound",
            Protocol::DyDx => "dYdX",
            Protocol::Aave => "aave",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let key = protocol_key(id);
        Protocol::ALL.iter().copied().find(|p| protocol_key(p.id()) == key)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Lookup key for a protocol id: ascii alphanumerics only, lowercased.
/// `uniswap-v2`, `UniswapV2` and `uniswapv2` share one key.
pub fn protocol_key(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
