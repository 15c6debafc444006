use super::{drive, ChainEndpoint, SubmitRequest, Submitter, TxStage, STAGE_BUFFER};
use ethers::types::{Address, TransactionRequest};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Relayed strategy: the encoded call is handed to a relay service which
/// signs and broadcasts on the submitter's behalf. The destination is the
/// fixed, session-configured contract address, never caller-supplied, and
/// the value transfer is always zero.
pub struct RelaySubmitter {
    endpoint: Arc<dyn ChainEndpoint>,
    destination: Address,
}

impl RelaySubmitter {
    pub fn new(endpoint: Arc<dyn ChainEndpoint>, destination: Address) -> Self {
        Self {
            endpoint,
            destination,
        }
    }
}

impl Submitter for RelaySubmitter {
    fn submit(&self, request: SubmitRequest) -> mpsc::Receiver<TxStage> {
        let (stage_tx, stage_rx) = mpsc::channel(STAGE_BUFFER);
        let tx = TransactionRequest::new()
            .to(self.destination)
            .data(request.calldata)
            .gas(request.gas)
            .value(0u64);
        tokio::spawn(drive(Arc::clone(&self.endpoint), tx, stage_tx));
        stage_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{owner, receipt, ScriptedEndpoint};
    use ethers::types::{NameOrAddress, U256};

    #[tokio::test]
    async fn relayed_request_targets_the_configured_destination() {
        let endpoint = Arc::new(ScriptedEndpoint::confirming(receipt(true, Vec::new())));
        let destination = owner(0xDE);
        let submitter = RelaySubmitter::new(endpoint.clone(), destination);

        let mut stages = submitter.submit(SubmitRequest {
            calldata: vec![0xfe].into(),
            gas: U256::from(200_000_000u64),
        });
        assert!(matches!(stages.recv().await, Some(TxStage::HashObtained(_))));
        assert!(matches!(stages.recv().await, Some(TxStage::Confirmed(_))));
        assert!(stages.recv().await.is_none());

        let sent = endpoint.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, Some(NameOrAddress::Address(destination)));
        assert_eq!(sent[0].value, Some(U256::zero()));
        // the relay signs; the caller never names a sender
        assert_eq!(sent[0].from, None);
    }

    #[tokio::test]
    async fn relay_rejection_is_a_single_error_stage() {
        let endpoint = Arc::new(ScriptedEndpoint::rejecting("relay rejected the call"));
        let submitter = RelaySubmitter::new(endpoint, owner(0xDE));

        let mut stages = submitter.submit(SubmitRequest {
            calldata: Vec::<u8>::new().into(),
            gas: U256::from(1u64),
        });
        assert!(matches!(stages.recv().await, Some(TxStage::Error(_))));
        assert!(stages.recv().await.is_none());
    }
}
