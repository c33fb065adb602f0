#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use token_pricer::chain::BlockAccess;
use token_pricer::config::{ChainConfig, PricingConfig};
use token_pricer::errors::{NodeError, SourceError};
use token_pricer::pricing::resolver::PriceResolver;
use token_pricer::pricing::token_list::TokenListCache;
use token_pricer::pricing::{ListedCoin, PriceOracle, PricePoint, ReferenceListSource};

pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const NATIVE: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

pub const FINALIZED_BLOCK: u64 = 20_000_000;
pub const FINALIZED_TS: u64 = 1_728_500_000;

pub fn listing(id: &str, platform: &str, address: &str) -> ListedCoin {
    ListedCoin {
        id: id.to_string(),
        platforms: [(platform.to_string(), Some(address.to_string()))]
            .into_iter()
            .collect(),
    }
}

/// Reference list that counts fetches and can be switched to failing.
pub struct CountingListSource {
    coins: Mutex<Vec<ListedCoin>>,
    failing: Mutex<bool>,
    pub fetches: AtomicUsize,
}

impl CountingListSource {
    pub fn new(coins: Vec<ListedCoin>) -> Arc<Self> {
        Arc::new(Self {
            coins: Mutex::new(coins),
            failing: Mutex::new(false),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn set_coins(&self, coins: Vec<ListedCoin>) {
        *self.coins.lock().unwrap() = coins;
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceListSource for CountingListSource {
    async fn fetch_all(&self) -> Result<Vec<ListedCoin>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // let concurrent lookups pile up on the cache lock
        tokio::task::yield_now().await;
        if *self.failing.lock().unwrap() {
            return Err(SourceError::unavailable("coins/list", "503 Service Unavailable"));
        }
        Ok(self.coins.lock().unwrap().clone())
    }
}

/// Oracle answering from a fixed table keyed by external id.
pub struct FakeOracle {
    series: HashMap<String, Vec<PricePoint>>,
    pub queries: AtomicUsize,
    pub windows: Mutex<Vec<(String, u64, u64)>>,
}

impl FakeOracle {
    pub fn new(series: Vec<(&str, Vec<PricePoint>)>) -> Arc<Self> {
        Arc::new(Self {
            series: series
                .into_iter()
                .map(|(id, points)| (id.to_string(), points))
                .collect(),
            queries: AtomicUsize::new(0),
            windows: Mutex::new(Vec::new()),
        })
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for FakeOracle {
    fn source_name(&self) -> &'static str {
        "coingecko"
    }

    async fn query(
        &self,
        external_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<PricePoint>, SourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.windows
            .lock()
            .unwrap()
            .push((external_id.to_string(), from, to));
        Ok(self.series.get(external_id).cloned().unwrap_or_default())
    }
}

/// Chain where block `n` has timestamp `FINALIZED_TS - (FINALIZED_BLOCK - n) * 12`,
/// unless overridden.
pub struct FakeChain {
    overrides: HashMap<u64, u64>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Self::with_blocks(&[])
    }

    pub fn with_blocks(blocks: &[(u64, u64)]) -> Arc<Self> {
        Arc::new(Self {
            overrides: blocks.iter().copied().collect(),
        })
    }
}

#[async_trait]
impl BlockAccess for FakeChain {
    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, NodeError> {
        if let Some(ts) = self.overrides.get(&block_number) {
            return Ok(*ts);
        }
        if block_number > FINALIZED_BLOCK {
            return Err(NodeError::BlockNotFound(block_number));
        }
        Ok(FINALIZED_TS - (FINALIZED_BLOCK - block_number) * 12)
    }

    async fn get_finalized_block_number(&self) -> Result<u64, NodeError> {
        Ok(FINALIZED_BLOCK)
    }
}

pub fn mainnet_resolver(
    chain: Arc<FakeChain>,
    source: Arc<CountingListSource>,
    oracle: Arc<FakeOracle>,
) -> PriceResolver {
    mainnet_resolver_with(chain, source, oracle, &PricingConfig::default())
}

pub fn mainnet_resolver_with(
    chain: Arc<FakeChain>,
    source: Arc<CountingListSource>,
    oracle: Arc<FakeOracle>,
    pricing: &PricingConfig,
) -> PriceResolver {
    let token_list = Arc::new(TokenListCache::new(
        source,
        "ethereum",
        Duration::from_secs(86_400),
    ));
    PriceResolver::new(
        chain,
        token_list,
        oracle,
        ChainConfig::for_chain("mainnet").unwrap(),
        pricing,
    )
}

pub fn address(raw: &str) -> Address {
    raw.parse().unwrap()
}
