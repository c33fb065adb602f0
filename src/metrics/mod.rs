use anyhow::Result;
use ::metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::pricing::PriceResult;

const METRIC_PRICE_RESOLUTIONS: &str = "price_resolutions_total";
const METRIC_TOKEN_LIST_REFRESHES: &str = "token_list_refreshes_total";
const METRIC_TOKEN_LIST_ENTRIES: &str = "token_list_entries";
const METRIC_PRICES_WRITTEN: &str = "prices_written_total";
const METRIC_PRICES_SKIPPED: &str = "prices_skipped_total";

/// Serve Prometheus metrics on `127.0.0.1:port`. Must run inside a tokio runtime.
pub fn install_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

pub fn record_resolution(result: &PriceResult) {
    let outcome = match result {
        PriceResult::Price(_) => "price",
        PriceResult::Unavailable(reason) => reason.as_str(),
    };
    counter!(METRIC_PRICE_RESOLUTIONS, 1, "outcome" => outcome);
}

pub fn record_token_list_refresh(entries: Option<usize>) {
    match entries {
        Some(n) => {
            counter!(METRIC_TOKEN_LIST_REFRESHES, 1, "outcome" => "ok");
            gauge!(METRIC_TOKEN_LIST_ENTRIES, n as f64);
        }
        None => counter!(METRIC_TOKEN_LIST_REFRESHES, 1, "outcome" => "failed"),
    }
}

pub fn record_price_writes(written: usize, skipped: usize) {
    counter!(METRIC_PRICES_WRITTEN, written as u64);
    if skipped > 0 {
        counter!(METRIC_PRICES_SKIPPED, skipped as u64);
    }
}
