use super::ChainEndpoint;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::{TransactionReceipt, TransactionRequest, H256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// JSON-RPC transport. Under the direct strategy the middleware signs
/// locally before broadcasting; under the relayed strategy this points at
/// the relay endpoint, which signs itself.
pub struct JsonRpcEndpoint<M> {
    client: Arc<M>,
    poll_interval: Duration,
}

impl<M> JsonRpcEndpoint<M> {
    pub fn new(client: Arc<M>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainEndpoint for JsonRpcEndpoint<M> {
    async fn broadcast(&self, tx: TransactionRequest) -> Result<H256> {
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| anyhow!("broadcast rejected: {}", e))?;
        Ok(*pending)
    }

    /// Polls for the receipt until the transaction is mined. No deadline:
    /// a hung confirmation is the caller's liveness concern.
    async fn confirm(&self, tx_hash: H256) -> Result<TransactionReceipt> {
        let mut interval = time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            if let Some(receipt) = self
                .client
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| anyhow!("receipt lookup failed: {}", e))?
            {
                return Ok(receipt);
            }
        }
    }
}
