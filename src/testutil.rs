//! Hand-rolled fakes shared by the module tests.

use super::contract::Ledger;
use super::feed::Record;
use super::notify::{Notifier, Toast, ToastStatus};
use super::submit::{ChainEndpoint, SubmitRequest, Submitter, TxStage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::abi::{Abi, Token};
use ethers::types::{Address, Log, TransactionReceipt, TransactionRequest, H256, U256, U64};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;

pub fn owner(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn record(id: u64, creator: Address) -> Record {
    Record {
        id,
        data: vec![0xab, id as u8].into(),
        owner_history: vec![creator],
        file_name: format!("photo-{}.jpg", id),
        location: "somewhere".to_string(),
        caption: format!("photo {}", id),
        uploaded_at: U256::from(id),
    }
}

pub fn receipt(success: bool, logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: H256::from_low_u64_be(0xfeed),
        block_number: Some(U64::from(7u64)),
        status: Some(U64::from(u64::from(success))),
        logs,
        ..Default::default()
    }
}

/// A log entry shaped the way the node would emit it for `name`: signature
/// topic plus ABI-encoded values.
pub fn event_log(abi: &Abi, name: &str, values: &[Token]) -> Log {
    let event = abi
        .events()
        .find(|event| event.name == name)
        .expect("event is part of the interface");
    Log {
        address: Address::zero(),
        topics: vec![event.signature()],
        data: ethers::abi::encode(values).into(),
        block_hash: None,
        block_number: None,
        transaction_hash: None,
        transaction_index: None,
        log_index: None,
        transaction_log_index: None,
        log_type: None,
        removed: None,
    }
}

pub fn uploaded_log(abi: &Abi, token_id: u64, creator: Address) -> Log {
    event_log(
        abi,
        super::contract::EVENT_PHOTO_UPLOADED,
        &[
            Token::Uint(U256::from(token_id)),
            Token::Address(creator),
            Token::String(format!("photo-{}.jpg", token_id)),
            Token::Uint(U256::zero()),
        ],
    )
}

pub fn transfer_log(abi: &Abi, token_id: u64, from: Address, to: Address) -> Log {
    event_log(
        abi,
        super::contract::EVENT_OWNERSHIP_TRANSFERRED,
        &[
            Token::Uint(U256::from(token_id)),
            Token::Address(from),
            Token::Address(to),
        ],
    )
}

/// In-memory ledger; ids 1..=count exist, each created by `owner(id)`.
#[derive(Default)]
pub struct FakeLedger {
    records: Mutex<HashMap<u64, Record>>,
    failing: Mutex<HashSet<u64>>,
}

impl FakeLedger {
    pub fn with_count(count: u64) -> Self {
        let ledger = FakeLedger::default();
        for id in 1..=count {
            ledger.insert(record(id, owner(id)));
        }
        ledger
    }

    pub fn insert(&self, record: Record) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    pub fn fail_on(&self, token_id: u64) {
        self.failing.lock().unwrap().insert(token_id);
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn total_count(&self) -> Result<u64> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .max()
            .copied()
            .unwrap_or(0))
    }

    async fn photo(&self, token_id: u64) -> Result<Record> {
        if self.failing.lock().unwrap().contains(&token_id) {
            return Err(anyhow!("getPhoto({}) failed", token_id));
        }
        self.records
            .lock()
            .unwrap()
            .get(&token_id)
            .cloned()
            .ok_or_else(|| anyhow!("no record {}", token_id))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn statuses(&self) -> Vec<ToastStatus> {
        self.toasts.lock().unwrap().iter().map(|t| t.status).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

/// Endpoint with scripted broadcast/confirm outcomes; records every
/// transaction request it is handed.
pub struct ScriptedEndpoint {
    broadcast_result: Mutex<Option<Result<H256>>>,
    confirm_result: Mutex<Option<Result<TransactionReceipt>>>,
    sent: Mutex<Vec<TransactionRequest>>,
}

impl ScriptedEndpoint {
    pub fn confirming(receipt: TransactionReceipt) -> Self {
        Self {
            broadcast_result: Mutex::new(Some(Ok(H256::from_low_u64_be(0x11)))),
            confirm_result: Mutex::new(Some(Ok(receipt))),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            broadcast_result: Mutex::new(Some(Err(anyhow!("{}", message)))),
            confirm_result: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn hash_then_error(message: &str) -> Self {
        Self {
            broadcast_result: Mutex::new(Some(Ok(H256::from_low_u64_be(0x11)))),
            confirm_result: Mutex::new(Some(Err(anyhow!("{}", message)))),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainEndpoint for ScriptedEndpoint {
    async fn broadcast(&self, tx: TransactionRequest) -> Result<H256> {
        self.sent.lock().unwrap().push(tx);
        self.broadcast_result
            .lock()
            .unwrap()
            .take()
            .expect("unscripted broadcast")
    }

    async fn confirm(&self, _tx_hash: H256) -> Result<TransactionReceipt> {
        self.confirm_result
            .lock()
            .unwrap()
            .take()
            .expect("unscripted confirm")
    }
}

/// Submitter that replays canned stage sequences, one script per submission
/// in order.
pub struct StageSubmitter {
    scripts: Mutex<VecDeque<Vec<TxStage>>>,
}

impl StageSubmitter {
    pub fn scripted(scripts: Vec<Vec<TxStage>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
        }
    }
}

impl Submitter for StageSubmitter {
    fn submit(&self, _request: SubmitRequest) -> mpsc::Receiver<TxStage> {
        let (stage_tx, stage_rx) = mpsc::channel(8);
        let stages = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        tokio::spawn(async move {
            for stage in stages {
                let _ = stage_tx.send(stage).await;
            }
        });
        stage_rx
    }
}
