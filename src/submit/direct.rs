use super::{drive, ChainEndpoint, SubmitRequest, Submitter, TxStage, STAGE_BUFFER};
use crate::wallet::Wallet;
use ethers::types::{Address, TransactionRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Direct strategy: the caller's own credentials sign and broadcast. The
/// sender address is taken from the wallet collaborator, once per
/// submission; the endpoint is a node the caller controls.
pub struct DirectSubmitter {
    endpoint: Arc<dyn ChainEndpoint>,
    wallet: Arc<dyn Wallet>,
    contract: Address,
}

impl DirectSubmitter {
    pub fn new(
        endpoint: Arc<dyn ChainEndpoint>,
        wallet: Arc<dyn Wallet>,
        contract: Address,
    ) -> Self {
        Self {
            endpoint,
            wallet,
            contract,
        }
    }
}

impl Submitter for DirectSubmitter {
    fn submit(&self, request: SubmitRequest) -> mpsc::Receiver<TxStage> {
        let (stage_tx, stage_rx) = mpsc::channel(STAGE_BUFFER);
        let tx = TransactionRequest::new()
            .from(self.wallet.address())
            .to(self.contract)
            .data(request.calldata)
            .gas(request.gas);
        tokio::spawn(drive(Arc::clone(&self.endpoint), tx, stage_tx));
        stage_rx
    }
}
