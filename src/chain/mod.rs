use async_trait::async_trait;
use ethers::{
    providers::Middleware,
    types::{BlockNumber, U64},
};
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

use crate::errors::NodeError;

/// Read access to block headers of the chain being priced.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlockAccess: Send + Sync {
    /// Unix timestamp of `block_number`
    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, NodeError>;

    /// Latest block that can no longer be reorganized
    async fn get_finalized_block_number(&self) -> Result<u64, NodeError>;
}

/// [`BlockAccess`] over any ethers middleware.
pub struct ProviderBlockAccess<M> {
    provider: Arc<M>,
}

impl<M: Middleware> ProviderBlockAccess<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M: Middleware + 'static> BlockAccess for ProviderBlockAccess<M> {
    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, NodeError> {
        let block = self
            .provider
            .get_block(BlockNumber::Number(U64::from(block_number)))
            .await
            .map_err(|e| NodeError::Provider(e.to_string()))?
            .ok_or(NodeError::BlockNotFound(block_number))?;

        Ok(block.timestamp.as_u64())
    }

    async fn get_finalized_block_number(&self) -> Result<u64, NodeError> {
        let block = self
            .provider
            .get_block(BlockNumber::Finalized)
            .await
            .map_err(|e| NodeError::Provider(e.to_string()))?
            .ok_or(NodeError::MissingBlockNumber)?;

        block
            .number
            .map(|n| n.as_u64())
            .ok_or(NodeError::MissingBlockNumber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::{Block, H256, U256};

    fn block(number: u64, timestamp: u64) -> Block<H256> {
        Block {
            number: Some(U64::from(number)),
            timestamp: U256::from(timestamp),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_block_timestamp() {
        let (provider, mock) = Provider::mocked();
        mock.push(block(18_000_000, 1_693_000_000)).unwrap();

        let access = ProviderBlockAccess::new(Arc::new(provider));
        assert_eq!(access.get_block_timestamp(18_000_000).await.unwrap(), 1_693_000_000);
    }

    #[tokio::test]
    async fn test_finalized_block_number() {
        let (provider, mock) = Provider::mocked();
        mock.push(block(20_000_000, 1_728_500_000)).unwrap();

        let access = ProviderBlockAccess::new(Arc::new(provider));
        assert_eq!(access.get_finalized_block_number().await.unwrap(), 20_000_000);
    }

    #[tokio::test]
    async fn test_missing_block() {
        let (provider, mock): (Provider<MockProvider>, MockProvider) = Provider::mocked();
        mock.push::<Option<Block<H256>>, _>(None).unwrap();

        let access = ProviderBlockAccess::new(Arc::new(provider));
        assert!(matches!(
            access.get_block_timestamp(42).await,
            Err(NodeError::BlockNotFound(42))
        ));
    }
}
