use anyhow::{anyhow, Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    ARBITRUM_WETH_TOKEN_ADDRESS, BUFFER_TIME, COINGECKO_TIME_LIMIT, HTTP_TIMEOUT_SECS,
    NATIVE_ETH_TOKEN_ADDRESS, OP_STACK_WETH_TOKEN_ADDRESS, TOKEN_LIST_RELOAD_TIME,
    WETH_TOKEN_ADDRESS,
};

/// Per-chain pricing parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    pub chain_name: String,
    /// CoinGecko platform key used to filter the coin list
    pub platform_id: String,
    /// `vs_currency` passed to CoinGecko; prices are denominated in this asset
    pub vs_currency: String,
    pub native_token: Address,
    pub wrapped_native_token: Address,
}

impl ChainConfig {
    pub fn for_chain(chain_name: &str) -> Option<Self> {
        let (platform_id, wrapped) = match chain_name {
            "mainnet" => ("ethereum", WETH_TOKEN_ADDRESS),
            "arbitrum" => ("arbitrum-one", ARBITRUM_WETH_TOKEN_ADDRESS),
            "optimism" => ("optimistic-ethereum", OP_STACK_WETH_TOKEN_ADDRESS),
            "base" => ("base", OP_STACK_WETH_TOKEN_ADDRESS),
            _ => return None,
        };

        Some(Self {
            chain_name: chain_name.to_string(),
            platform_id: platform_id.to_string(),
            vs_currency: "eth".to_string(),
            native_token: NATIVE_ETH_TOKEN_ADDRESS.parse().ok()?,
            wrapped_native_token: wrapped.parse().ok()?,
        })
    }

    /// True for the native asset and its wrapped representative, both priced at 1.0.
    pub fn is_native(&self, token: &Address) -> bool {
        *token == self.native_token || *token == self.wrapped_native_token
    }
}

/// Timing knobs shared by the token list cache and the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub reload_interval: Duration,
    /// Maximum age in seconds of a block relative to the finalized block
    pub time_limit: u64,
    /// Width in seconds of the query window after the block timestamp
    pub buffer: u64,
    pub http_timeout: Duration,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            reload_interval: Duration::from_secs(TOKEN_LIST_RELOAD_TIME),
            time_limit: COINGECKO_TIME_LIMIT,
            buffer: BUFFER_TIME,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub rpc_url: String,
    pub coingecko_api_key: Option<String>,
    pub database_path: String,
    pub pricing: PricingConfig,
    pub metrics_port: Option<u16>,
}

impl AppConfig {
    /// Build the configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self> {
        let chain_name = std::env::var("CHAIN").unwrap_or_else(|_| "mainnet".to_string());
        let chain = ChainConfig::for_chain(&chain_name)
            .ok_or_else(|| anyhow!("Unsupported chain: {}", chain_name))?;

        let rpc_url = std::env::var("RPC_URL").context("RPC_URL must be set")?;
        let coingecko_api_key = std::env::var("COINGECKO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| format!("{}.db", chain_name));

        let defaults = PricingConfig::default();
        let pricing = PricingConfig {
            reload_interval: env_u64("TOKEN_LIST_RELOAD_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.reload_interval),
            time_limit: env_u64("PRICE_TIME_LIMIT_SECS")?.unwrap_or(defaults.time_limit),
            buffer: env_u64("PRICE_BUFFER_SECS")?.unwrap_or(defaults.buffer),
            http_timeout: env_u64("HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        };

        let metrics_port = match std::env::var("METRICS_PORT") {
            Ok(p) => Some(p.parse().context("METRICS_PORT must be a port number")?),
            Err(_) => None,
        };

        Ok(Self {
            chain,
            rpc_url,
            coingecko_api_key,
            database_path,
            pricing,
            metrics_port,
        })
    }

    pub fn validate_all(&self) -> Result<()> {
        validate_rpc_url(&self.rpc_url)?;

        if self.pricing.reload_interval.is_zero() {
            return Err(anyhow!("Token list reload interval must be positive"));
        }
        if self.pricing.buffer == 0 {
            return Err(anyhow!("Price query buffer must be positive"));
        }
        if self.pricing.buffer > self.pricing.time_limit {
            return Err(anyhow!(
                "Price query buffer ({}s) must not exceed the price time limit ({}s)",
                self.pricing.buffer,
                self.pricing.time_limit
            ));
        }
        if self.pricing.http_timeout.is_zero() {
            return Err(anyhow!("HTTP timeout must be positive"));
        }
        if self.database_path.trim().is_empty() {
            return Err(anyhow!("Database path must not be empty"));
        }

        Ok(())
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) => Ok(Some(
            v.trim()
                .parse()
                .with_context(|| format!("{} must be an integer", key))?,
        )),
        Err(_) => Ok(None),
    }
}

fn validate_rpc_url(url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(anyhow!("Invalid RPC URL: {}", url));
    }
    Ok(())
}
