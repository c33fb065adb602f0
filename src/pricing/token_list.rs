use ethers::types::Address;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ReferenceListSource;
use crate::errors::SourceError;
use crate::metrics::record_token_list_refresh;
use crate::utils::canonical_address;

/// Lowercase address -> external id. Never mutated after it is published.
pub type TokenListSnapshot = HashMap<String, String>;

struct CacheState {
    snapshot: Arc<TokenListSnapshot>,
    last_refresh: Option<Instant>,
}

/// Address to external-id table for one platform, reloaded lazily on lookup
/// once `reload_interval` has passed since the last successful refresh.
pub struct TokenListCache {
    source: Arc<dyn ReferenceListSource>,
    platform_id: String,
    reload_interval: Duration,
    // held across check -> refresh -> read so concurrent lookups never refetch twice
    state: Mutex<CacheState>,
}

impl TokenListCache {
    pub fn new(
        source: Arc<dyn ReferenceListSource>,
        platform_id: impl Into<String>,
        reload_interval: Duration,
    ) -> Self {
        Self {
            source,
            platform_id: platform_id.into(),
            reload_interval,
            state: Mutex::new(CacheState {
                snapshot: Arc::new(HashMap::new()),
                last_refresh: None,
            }),
        }
    }

    /// Fetch the full list and replace the snapshot. On failure the previous
    /// snapshot stays in place. Returns the number of entries kept.
    pub async fn refresh(&self) -> Result<usize, SourceError> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await
    }

    /// External id for `address`, refreshing first if the list is due.
    ///
    /// A failed refresh is only an error when no list was ever loaded; otherwise
    /// the stale list answers and the next lookup retries the fetch.
    pub async fn resolve(&self, address: &Address) -> Result<Option<String>, SourceError> {
        let mut state = self.state.lock().await;

        if self.needs_reload(&state) {
            if let Err(e) = self.reload(&mut state).await {
                if state.last_refresh.is_none() {
                    return Err(e);
                }
                warn!("Token list refresh failed, serving stale list: {}", e);
            }
        }

        Ok(state.snapshot.get(&canonical_address(address)).cloned())
    }

    pub async fn snapshot(&self) -> Arc<TokenListSnapshot> {
        self.state.lock().await.snapshot.clone()
    }

    /// Number of addresses in the current snapshot
    pub async fn len(&self) -> usize {
        self.state.lock().await.snapshot.len()
    }

    pub async fn last_refresh(&self) -> Option<Instant> {
        self.state.lock().await.last_refresh
    }

    fn needs_reload(&self, state: &CacheState) -> bool {
        match state.last_refresh {
            Some(at) => at.elapsed() >= self.reload_interval,
            None => true,
        }
    }

    async fn reload(&self, state: &mut CacheState) -> Result<usize, SourceError> {
        let coins = match self.source.fetch_all().await {
            Ok(coins) => coins,
            Err(e) => {
                record_token_list_refresh(None);
                return Err(e);
            }
        };

        let listed = coins.len();
        let snapshot: TokenListSnapshot = coins
            .iter()
            .filter_map(|coin| coin.entry_for(&self.platform_id))
            .map(|entry| (entry.address, entry.external_id))
            .collect();
        let kept = snapshot.len();

        state.snapshot = Arc::new(snapshot);
        state.last_refresh = Some(Instant::now());

        info!(
            "Token list refreshed: {} of {} coins listed on {}",
            kept, listed, self.platform_id
        );
        record_token_list_refresh(Some(kept));

        Ok(kept)
    }
}
