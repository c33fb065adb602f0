pub mod coingecko;
pub mod resolver;
pub mod token_list;
pub mod types;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::errors::SourceError;
pub use types::{ListedCoin, PricePoint, PriceResult, PriceSample, TokenListEntry, UnavailableReason};

/// Source of the full token reference list. Pagination and rate limiting are
/// the implementation's concern.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReferenceListSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<ListedCoin>, SourceError>;
}

/// Historical price time series keyed by the oracle's own token identifier.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Label stored alongside every price from this oracle
    fn source_name(&self) -> &'static str;

    /// Samples for `external_id` between `from` and `to` (unix seconds),
    /// ascending by timestamp. An empty vector means no data in the window.
    async fn query(
        &self,
        external_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<PricePoint>, SourceError>;
}
