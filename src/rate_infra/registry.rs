use std::collections::HashMap;
use crate::config::AliasConfig;
use crate::error::{Error, Result, UnknownSymbolError};
use crate::types::asset::CanonicalAsset;
use crate::types::pair::CanonicalPair;
use crate::types::protocol::protocol_key;

/// Protocol key for aliases that hold under every protocol.
const ANY_PROTOCOL: &str = "*";

/// Wrapped spellings that mean the same asset everywhere.
const GLOBAL_ALIASES: &[(&str, CanonicalAsset)] = &[
    ("WBTC", CanonicalAsset::Btc),
    ("WETH", CanonicalAsset::Eth),
];

/// Protocol-specific receipt and synthetic tokens.
const PROTOCOL_ALIASES: &[(&str, &str, CanonicalAsset)] = &[
    ("curve", "renBTC", CanonicalAsset::Btc),
    ("curve", "sBTC", CanonicalAsset::Btc),
    ("curve", "HBTC", CanonicalAsset::Btc),
    ("compound", "cWBTC", CanonicalAsset::Btc),
    ("compound", "cETH", CanonicalAsset::Eth),
    ("compound", "cDAI", CanonicalAsset::Dai),
    ("compound", "cUSDC", CanonicalAsset::Usdc),
    ("compound", "cUSDT", CanonicalAsset::Usdt),
    ("aave", "aWBTC", CanonicalAsset::Btc),
    ("aave", "aETH", CanonicalAsset::Eth),
    ("aave", "aWETH", CanonicalAsset::Eth),
    ("aave", "aDAI", CanonicalAsset::Dai),
    ("aave", "aUSDC", CanonicalAsset::Usdc),
    ("aave", "aUSDT", CanonicalAsset::Usdt),
    ("yearn", "yWBTC", CanonicalAsset::Btc),
    ("yearn", "yWETH", CanonicalAsset::Eth),
    ("yearn", "yDAI", CanonicalAsset::Dai),
    ("yearn", "yUSDC", CanonicalAsset::Usdc),
    ("yearn", "yUSDT", CanonicalAsset::Usdt),
];

/// Maps protocol-specific symbol spellings onto the canonical asset set.
///
/// Resolution order for `(protocol, raw)`:
/// 1. `raw` is itself a canonical symbol
/// 2. an alias registered for `protocol`
/// 3. an alias registered for every protocol
///
/// Symbols compare case-insensitively and protocols by [`protocol_key`].
/// The table is fixed once built; changing it is a deployment concern.
#[derive(Clone, Debug)]
pub struct SymbolRegistry {
    aliases: HashMap<(String, String), CanonicalAsset>,
}

impl SymbolRegistry {
    pub fn empty() -> Self {
        SymbolRegistry {
            aliases: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = SymbolRegistry::empty();
        for (symbol, asset) in GLOBAL_ALIASES {
            registry.insert(ANY_PROTOCOL, symbol, *asset);
        }
        for (protocol, symbol, asset) in PROTOCOL_ALIASES {
            registry.insert(protocol, symbol, *asset);
        }
        registry
    }

    /// Built-in table extended with deployment-configured aliases.
    pub fn from_config(extra: &[AliasConfig]) -> Result<Self> {
        let mut registry = SymbolRegistry::with_defaults();
        for alias in extra {
            let asset = CanonicalAsset::from_symbol(&alias.canonical).ok_or_else(|| {
                Error::InvalidAlias(format!(
                    "{} -> {} under {}: target is not a canonical asset",
                    alias.symbol, alias.canonical, alias.protocol
                ))
            })?;
            if alias.symbol.trim().is_empty() {
                return Err(Error::InvalidAlias(format!(
                    "empty alias for {} under {}",
                    alias.canonical, alias.protocol
                )));
            }
            registry.insert(&alias.protocol, &alias.symbol, asset);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, protocol: &str, symbol: &str, asset: CanonicalAsset) {
        let protocol = if protocol == ANY_PROTOCOL {
            ANY_PROTOCOL.to_string()
        } else {
            protocol_key(protocol)
        };
        self.aliases.insert((protocol, symbol_key(symbol)), asset);
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn resolve_asset(
        &self,
        protocol: &str,
        raw_symbol: &str,
    ) -> std::result::Result<CanonicalAsset, UnknownSymbolError> {
        if let Some(asset) = CanonicalAsset::from_symbol(raw_symbol) {
            return Ok(asset);
        }

        let symbol = symbol_key(raw_symbol);
        self.aliases
            .get(&(protocol_key(protocol), symbol.clone()))
            .or_else(|| self.aliases.get(&(ANY_PROTOCOL.to_string(), symbol)))
            .copied()
            .ok_or_else(|| UnknownSymbolError::unrecognized(protocol, raw_symbol))
    }

    pub fn resolve_pair(
        &self,
        protocol: &str,
        raw_symbol0: &str,
        raw_symbol1: &str,
    ) -> std::result::Result<CanonicalPair, UnknownSymbolError> {
        self.resolve_pair_oriented(protocol, raw_symbol0, raw_symbol1)
            .map(|(pair, _)| pair)
    }

    /// Like [`resolve_pair`](Self::resolve_pair), also reporting whether the
    /// raw symbols had to be swapped into canonical order.
    pub fn resolve_pair_oriented(
        &self,
        protocol: &str,
        raw_symbol0: &str,
        raw_symbol1: &str,
    ) -> std::result::Result<(CanonicalPair, bool), UnknownSymbolError> {
        let a = self.resolve_asset(protocol, raw_symbol0)?;
        let b = self.resolve_asset(protocol, raw_symbol1)?;
        CanonicalPair::normalize(a, b)
            .ok_or_else(|| UnknownSymbolError::degenerate_pair(protocol, raw_symbol0, raw_symbol1))
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        SymbolRegistry::with_defaults()
    }
}

fn symbol_key(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}
