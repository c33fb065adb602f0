use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{ListedCoin, PriceOracle, PricePoint, ReferenceListSource};
use crate::constants::{
    COINGECKO_API_KEY_HEADER, COINGECKO_PRO_API, COINGECKO_PUBLIC_API, COINGECKO_SOURCE,
};
use crate::errors::SourceError;

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    /// `[unix millis, price]` pairs
    prices: Vec<(f64, f64)>,
}

/// CoinGecko-backed token list source and historical price oracle.
/// Uses the Pro API when a key is configured, the public API otherwise.
pub struct CoingeckoClient {
    client: Client,
    base: Url,
    api_key: Option<String>,
    vs_currency: String,
}

impl CoingeckoClient {
    pub fn new(
        api_key: Option<String>,
        vs_currency: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let base = if api_key.is_some() {
            COINGECKO_PRO_API
        } else {
            warn!("Coingecko API key is not set, using the public API");
            COINGECKO_PUBLIC_API
        };
        let base = Url::parse(base).map_err(|e| SourceError::malformed(base, e))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::unavailable(base.as_str(), e))?;

        Ok(Self {
            client,
            base,
            api_key,
            vs_currency: vs_currency.into(),
        })
    }

    fn coin_list_url(&self) -> Result<Url, SourceError> {
        let mut url = self.endpoint(&["coins", "list"])?;
        url.query_pairs_mut()
            .append_pair("include_platform", "true")
            .append_pair("status", "active");
        Ok(url)
    }

    fn market_chart_range_url(&self, token_id: &str, from: u64, to: u64) -> Result<Url, SourceError> {
        let mut url = self.endpoint(&["coins", token_id, "market_chart", "range"])?;
        url.query_pairs_mut()
            .append_pair("vs_currency", &self.vs_currency)
            .append_pair("from", &from.to_string())
            .append_pair("to", &to.to_string());
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::malformed(self.base.as_str(), "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_body(&self, url: Url) -> Result<Vec<u8>, SourceError> {
        let endpoint = url.path().to_string();
        let mut request = self.client.get(url).header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(COINGECKO_API_KEY_HEADER, key);
        }

        let body = request
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| SourceError::unavailable(&endpoint, e))?
            .bytes()
            .await
            .map_err(|e| SourceError::unavailable(&endpoint, e))?;

        Ok(body.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let endpoint = url.path().to_string();
        let body = self.get_body(url).await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::malformed(&endpoint, e))
    }
}

fn parse_market_chart(body: &[u8]) -> Result<Vec<PricePoint>, serde_json::Error> {
    let chart: MarketChartResponse = serde_json::from_slice(body)?;
    Ok(chart
        .prices
        .into_iter()
        .map(|(millis, price)| PricePoint {
            timestamp: (millis / 1000.0) as u64,
            price,
        })
        .collect())
}

#[async_trait]
impl ReferenceListSource for CoingeckoClient {
    async fn fetch_all(&self) -> Result<Vec<ListedCoin>, SourceError> {
        let coins: Vec<ListedCoin> = self.get_json(self.coin_list_url()?).await?;
        debug!("Fetched {} coins from Coingecko", coins.len());
        Ok(coins)
    }
}

#[async_trait]
impl PriceOracle for CoingeckoClient {
    fn source_name(&self) -> &'static str {
        COINGECKO_SOURCE
    }

    async fn query(
        &self,
        external_id: &str,
        from: u64,
        to: u64,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let url = self.market_chart_range_url(external_id, from, to)?;
        let endpoint = url.path().to_string();
        let body = self.get_body(url).await?;
        parse_market_chart(&body).map_err(|e| SourceError::malformed(&endpoint, e))
    }
}
