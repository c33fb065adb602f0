/// Placeholder address used across the ecosystem for the chain's native asset.
pub const NATIVE_ETH_TOKEN_ADDRESS: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// WETH on Ethereum mainnet
pub const WETH_TOKEN_ADDRESS: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

/// WETH predeploy shared by the OP stack chains (Optimism, Base)
pub const OP_STACK_WETH_TOKEN_ADDRESS: &str = "0x4200000000000000000000000000000000000006";

/// WETH on Arbitrum One
pub const ARBITRUM_WETH_TOKEN_ADDRESS: &str = "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1";

/// Token list reload interval (24 hours)
pub const TOKEN_LIST_RELOAD_TIME: u64 = 24 * 60 * 60;

/// CoinGecko only keeps 5-minutely data for the last 2 days
pub const COINGECKO_TIME_LIMIT: u64 = 2 * 24 * 60 * 60;

/// Query window past the block timestamp, two sampling intervals wide
pub const BUFFER_TIME: u64 = 10 * 60;

/// Timeout applied to every CoinGecko request
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Largest magnitude the price column accepts: NUMERIC(38, 18) leaves 20 integer digits.
/// Mirrored by the CHECK constraint in sql/schema.sql.
pub const MAX_PRICE_MAGNITUDE: f64 = 1e20;

pub const COINGECKO_SOURCE: &str = "coingecko";
pub const COINGECKO_PUBLIC_API: &str = "https://api.coingecko.com/api/v3/";
pub const COINGECKO_PRO_API: &str = "https://pro-api.coingecko.com/api/v3/";
pub const COINGECKO_API_KEY_HEADER: &str = "x-cg-pro-api-key";
