use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::utils::canonicalize_listed_address;

/// One coin from the reference list, with its contract address per platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListedCoin {
    pub id: String,
    #[serde(default)]
    pub platforms: HashMap<String, Option<String>>,
}

impl ListedCoin {
    /// Entry for `platform_id`, if the coin is deployed there under an EVM address.
    pub fn entry_for(&self, platform_id: &str) -> Option<TokenListEntry> {
        let raw = self.platforms.get(platform_id)?.as_deref()?;
        Some(TokenListEntry {
            address: canonicalize_listed_address(raw)?,
            external_id: self.id.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenListEntry {
    /// Lowercase `0x` hex address
    pub address: String,
    pub external_id: String,
}

/// A single (timestamp, price) observation returned by the oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: u64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub token_address: Address,
    pub observed_at: u64,
    pub price: f64,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnavailableReason {
    /// Block is outside the oracle's fine-grained lookback window
    TooOld,
    UnknownToken,
    NoData,
    SourceError,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::TooOld => "too_old",
            UnavailableReason::UnknownToken => "unknown_token",
            UnavailableReason::NoData => "no_data",
            UnavailableReason::SourceError => "source_error",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceResult {
    Price(f64),
    Unavailable(UnavailableReason),
}

impl PriceResult {
    pub fn price(&self) -> Option<f64> {
        match self {
            PriceResult::Price(p) => Some(*p),
            PriceResult::Unavailable(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(platforms: &[(&str, Option<&str>)]) -> ListedCoin {
        ListedCoin {
            id: "usd-coin".to_string(),
            platforms: platforms
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
        }
    }

    #[test]
    fn test_entry_for_platform() {
        let c = coin(&[
            ("ethereum", Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")),
            ("solana", Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")),
        ]);

        let entry = c.entry_for("ethereum").unwrap();
        assert_eq!(entry.address, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(entry.external_id, "usd-coin");

        assert!(c.entry_for("solana").is_none());
        assert!(c.entry_for("base").is_none());
    }

    #[test]
    fn test_entry_for_empty_mapping() {
        assert!(coin(&[("ethereum", Some(""))]).entry_for("ethereum").is_none());
        assert!(coin(&[("ethereum", None)]).entry_for("ethereum").is_none());
    }

    #[test]
    fn test_listing_deserializes_without_platforms() {
        let coins: Vec<ListedCoin> = serde_json::from_str(
            r#"[{"id":"bitcoin","symbol":"btc","name":"Bitcoin"},
                {"id":"weth","symbol":"weth","name":"WETH","platforms":{"ethereum":"0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2","xdai":null}}]"#,
        )
        .unwrap();
        assert!(coins[0].platforms.is_empty());
        assert_eq!(coins[1].platforms.len(), 2);
    }
}
