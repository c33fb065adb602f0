use ethers::types::Address;
use thiserror::Error;

/// Failure of the block-access collaborator. The caller has no fallback for an
/// unreachable chain, so this is the only error the resolver propagates.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node request failed: {0}")]
    Provider(String),
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("finalized block has no number")]
    MissingBlockNumber,
}

/// Failure of the reference list source or the price oracle.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {endpoint} failed: {reason}")]
    Unavailable { endpoint: String, reason: String },
    #[error("unexpected response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },
}

impl SourceError {
    pub fn unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("node unavailable: {0}")]
    NodeUnavailable(#[from] NodeError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("price {price} for {token:?} at {time} exceeds the price column precision")]
    ValueOutOfRange { token: Address, time: u64, price: f64 },
    #[error("time {0} does not fit the time column")]
    TimeOutOfRange(u64),
    #[error("stored time {0} is negative")]
    NegativeTime(i64),
    #[error("stored {column} has invalid length {len}")]
    CorruptValue { column: &'static str, len: usize },
    #[error("store lock poisoned")]
    Poisoned,
}
