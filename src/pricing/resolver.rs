use ethers::types::Address;
use log::{debug, warn};
use std::sync::Arc;

use super::token_list::TokenListCache;
use super::{PriceOracle, PriceResult, PriceSample, UnavailableReason};
use crate::chain::BlockAccess;
use crate::config::{ChainConfig, PricingConfig};
use crate::errors::{NodeError, PriceError};
use crate::metrics::record_resolution;

/// Resolves the historical price of a token at a block, denominated in the
/// chain's base asset.
pub struct PriceResolver {
    blocks: Arc<dyn BlockAccess>,
    token_list: Arc<TokenListCache>,
    oracle: Arc<dyn PriceOracle>,
    chain: ChainConfig,
    time_limit: u64,
    buffer: u64,
}

impl PriceResolver {
    pub fn new(
        blocks: Arc<dyn BlockAccess>,
        token_list: Arc<TokenListCache>,
        oracle: Arc<dyn PriceOracle>,
        chain: ChainConfig,
        config: &PricingConfig,
    ) -> Self {
        Self {
            blocks,
            token_list,
            oracle,
            chain,
            time_limit: config.time_limit,
            buffer: config.buffer,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.oracle.source_name()
    }

    /// Price of `token` closest to, and not earlier than, the start of `block_number`.
    ///
    /// Every "no price" outcome is reported as [`PriceResult::Unavailable`]; only a
    /// failing node is an error.
    pub async fn get_price(
        &self,
        block_number: u64,
        token: Address,
    ) -> Result<PriceResult, PriceError> {
        let (_, result) = self.resolve_at(block_number, token).await?;
        Ok(result)
    }

    /// Same as [`get_price`](Self::get_price), packaged as a sample observed at
    /// the block timestamp. `None` when no price is available.
    pub async fn get_price_sample(
        &self,
        block_number: u64,
        token: Address,
    ) -> Result<Option<PriceSample>, PriceError> {
        let (block_timestamp, result) = self.resolve_at(block_number, token).await?;
        Ok(result.price().map(|price| PriceSample {
            token_address: token,
            observed_at: block_timestamp,
            price,
            source: self.source_name().to_string(),
        }))
    }

    async fn resolve_at(
        &self,
        block_number: u64,
        token: Address,
    ) -> Result<(u64, PriceResult), PriceError> {
        let block_start_timestamp = self.blocks.get_block_timestamp(block_number).await?;
        let result = self.resolve_from(block_start_timestamp, token).await?;

        if let PriceResult::Unavailable(reason) = result {
            debug!(
                "No price for {:?} at block {}: {}",
                token, block_number, reason
            );
        }
        record_resolution(&result);

        Ok((block_start_timestamp, result))
    }

    async fn resolve_from(
        &self,
        block_start_timestamp: u64,
        token: Address,
    ) -> Result<PriceResult, NodeError> {
        if self.price_not_retrievable(block_start_timestamp).await? {
            return Ok(PriceResult::Unavailable(UnavailableReason::TooOld));
        }

        // Native and wrapped native are the base asset itself.
        if self.chain.is_native(&token) {
            return Ok(PriceResult::Price(1.0));
        }

        let block_end_timestamp = block_start_timestamp.saturating_add(self.buffer);

        let token_id = match self.token_list.resolve(&token).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!("Token ID not found for the given address: {:?}", token);
                return Ok(PriceResult::Unavailable(UnavailableReason::UnknownToken));
            }
            Err(e) => {
                warn!("Token list unavailable: {}", e);
                return Ok(PriceResult::Unavailable(UnavailableReason::SourceError));
            }
        };

        let mut samples = match self
            .oracle
            .query(&token_id, block_start_timestamp, block_end_timestamp)
            .await
        {
            Ok(samples) => samples,
            Err(e) => {
                warn!("Error fetching price for {}: {}", token_id, e);
                return Ok(PriceResult::Unavailable(UnavailableReason::SourceError));
            }
        };

        if samples.is_empty() {
            warn!(
                "No prices for {} between {} and {}",
                token_id, block_start_timestamp, block_end_timestamp
            );
            return Ok(PriceResult::Unavailable(UnavailableReason::NoData));
        }

        samples.sort_by_key(|s| s.timestamp);
        Ok(PriceResult::Price(samples[0].price))
    }

    /// True when the block is older than the oracle's fine-grained lookback
    /// window, measured against the finalized block. Exactly `time_limit` old is
    /// still retrievable.
    async fn price_not_retrievable(&self, block_start_timestamp: u64) -> Result<bool, NodeError> {
        let finalized = self.blocks.get_finalized_block_number().await?;
        let newest_block_timestamp = self.blocks.get_block_timestamp(finalized).await?;
        Ok(newest_block_timestamp.saturating_sub(block_start_timestamp) > self.time_limit)
    }
}
