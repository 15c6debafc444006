mod direct;
mod relay;
mod rpc;

pub use direct::DirectSubmitter;
pub use relay::RelaySubmitter;
pub use rpc::JsonRpcEndpoint;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Bytes, TransactionReceipt, TransactionRequest, H256, U256, U64};
use std::sync::Arc;
use tokio::sync::mpsc;

const STAGE_BUFFER: usize = 8;

/// One encoded state-changing call plus its gas budget. Built once by the
/// orchestrator and not modified afterwards.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub calldata: Bytes,
    pub gas: U256,
}

/// Staged lifecycle of one submission, delivered in stage order:
/// `HashObtained` at most once, then exactly one of `Confirmed` or `Error`.
/// The stream closes right after the terminal stage.
///
/// A broadcast that lands but reverts on-chain is a `Confirmed` receipt with
/// a zero status flag, never an `Error`; the revert is an outcome, not a
/// transport failure.
#[derive(Debug)]
pub enum TxStage {
    HashObtained(H256),
    Confirmed(TransactionReceipt),
    Error(anyhow::Error),
}

/// Status flag of a confirmed receipt.
pub fn succeeded(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(U64::from(1u64))
}

/// Submission strategy. A session picks direct-signed or relayed once at
/// start; both deliver the identical staged lifecycle.
pub trait Submitter: Send + Sync {
    fn submit(&self, request: SubmitRequest) -> mpsc::Receiver<TxStage>;
}

/// Transport a strategy drives: hand the node (or relay) a transaction, get
/// the hash back once accepted, then wait out confirmation.
#[async_trait]
pub trait ChainEndpoint: Send + Sync {
    async fn broadcast(&self, tx: TransactionRequest) -> Result<H256>;
    async fn confirm(&self, tx_hash: H256) -> Result<TransactionReceipt>;
}

/// Drives one submission through its stages. Stage ordering and the
/// one-terminal invariant live here so both strategies share them. A caller
/// that stops listening abandons the lifecycle; the call may still land
/// on-chain.
async fn drive(
    endpoint: Arc<dyn ChainEndpoint>,
    tx: TransactionRequest,
    stages: mpsc::Sender<TxStage>,
) {
    let tx_hash = match endpoint.broadcast(tx).await {
        Ok(tx_hash) => tx_hash,
        Err(cause) => {
            let _ = stages.send(TxStage::Error(cause)).await;
            return;
        }
    };
    let _ = stages.send(TxStage::HashObtained(tx_hash)).await;
    match endpoint.confirm(tx_hash).await {
        Ok(receipt) => {
            let _ = stages.send(TxStage::Confirmed(receipt)).await;
        }
        Err(cause) => {
            let _ = stages.send(TxStage::Error(cause)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::receipt;

    #[test]
    fn receipt_status_flag_maps_to_success() {
        assert!(succeeded(&receipt(true, Vec::new())));
        assert!(!succeeded(&receipt(false, Vec::new())));
        assert!(!succeeded(&TransactionReceipt::default()));
    }
}
