use super::config::GasBudgets;
use super::contract::{
    self, encode_call, hex_payload, Ledger, LedgerCall, EVENT_OWNERSHIP_TRANSFERRED,
    EVENT_PHOTO_UPLOADED,
};
use super::events::decode_receipt_logs;
use super::feed::{load_feed, Feed, Record};
use super::notify::{Notifier, Toast};
use super::submit::{succeeded, SubmitRequest, Submitter, TxStage};
use anyhow::{anyhow, Result};
use ethers::abi::Abi;
use ethers::types::{Address, TransactionReceipt, H256, U256, U64};
use log::{debug, error};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};

/// User intents accepted by the orchestrator. Replies travel back over the
/// attached oneshot sender.
#[derive(Debug)]
pub enum Command {
    LoadFeed {
        done: oneshot::Sender<Result<Feed>>,
    },
    UploadPhoto {
        path: PathBuf,
        file_name: String,
        location: String,
        caption: String,
        done: oneshot::Sender<Result<TxOutcome>>,
    },
    TransferOwnership {
        token_id: u64,
        to: Address,
        done: oneshot::Sender<Result<TxOutcome>>,
    },
}

/// Terminal result of one submission as the caller sees it. A confirmed
/// on-chain revert is `succeeded == false`; transport and validation
/// failures arrive as `Err` instead of an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: H256,
    pub succeeded: bool,
    pub block_number: Option<U64>,
}

/// Confirmed results folded into feed state, applied strictly in arrival
/// order. Confirmation order is not submission order; each op is safe to
/// apply regardless of which lands first.
#[derive(Debug)]
enum ReconcileOp {
    Replace(Feed),
    Prepend(Record),
    AppendOwner { token_id: u64, new_owner: Address },
}

/// Everything a spawned per-action task needs.
#[derive(Clone)]
struct ActionContext {
    abi: Arc<Abi>,
    submitter: Arc<dyn Submitter>,
    ledger: Arc<dyn Ledger>,
    notifier: Arc<dyn Notifier>,
    op_tx: mpsc::Sender<ReconcileOp>,
}

/// Ties submission, decoding and reconciliation together per user action.
/// Owns the current feed; every reconciliation produces a fresh snapshot
/// published on a watch channel, so readers never observe partial edits.
pub struct Orchestrator {
    feed: Feed,
    feed_tx: watch::Sender<Feed>,
    command_tx: mpsc::Sender<Command>,
    command_rx: mpsc::Receiver<Command>,
    op_tx: mpsc::Sender<ReconcileOp>,
    op_rx: mpsc::Receiver<ReconcileOp>,
    gas: GasBudgets,
    abi: Arc<Abi>,
    submitter: Arc<dyn Submitter>,
    ledger: Arc<dyn Ledger>,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        gas: GasBudgets,
        abi: Arc<Abi>,
        submitter: Arc<dyn Submitter>,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (op_tx, op_rx) = mpsc::channel(16);
        let (feed_tx, _) = watch::channel(Feed::default());
        Self {
            feed: Feed::default(),
            feed_tx,
            command_tx,
            command_rx,
            op_tx,
            op_rx,
            gas,
            abi,
            submitter,
            ledger,
            notifier,
        }
    }

    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.command_tx.clone()
    }

    pub fn feed_watcher(&self) -> watch::Receiver<Feed> {
        self.feed_tx.subscribe()
    }

    pub async fn run(mut self) {
        loop {
            select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => return,
                    }
                }
                op = self.op_rx.recv() => {
                    match op {
                        Some(op) => self.apply(op),
                        None => return,
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::LoadFeed { done } => {
                let ledger = Arc::clone(&self.ledger);
                let op_tx = self.op_tx.clone();
                tokio::spawn(async move {
                    match load_feed(ledger.as_ref()).await {
                        Ok(feed) => {
                            let _ = op_tx.send(ReconcileOp::Replace(feed.clone())).await;
                            let _ = done.send(Ok(feed));
                        }
                        Err(cause) => {
                            error!("feed load failed: {}", cause);
                            let _ = done.send(Err(cause));
                        }
                    }
                });
            }
            Command::UploadPhoto {
                path,
                file_name,
                location,
                caption,
                done,
            } => {
                let ctx = self.action_context();
                let gas = self.gas.upload;
                tokio::spawn(run_upload(ctx, gas, path, file_name, location, caption, done));
            }
            Command::TransferOwnership { token_id, to, done } => {
                let ctx = self.action_context();
                let gas = self.gas.transfer;
                tokio::spawn(run_transfer(ctx, gas, token_id, to, done));
            }
        }
    }

    fn action_context(&self) -> ActionContext {
        ActionContext {
            abi: Arc::clone(&self.abi),
            submitter: Arc::clone(&self.submitter),
            ledger: Arc::clone(&self.ledger),
            notifier: Arc::clone(&self.notifier),
            op_tx: self.op_tx.clone(),
        }
    }

    fn apply(&mut self, op: ReconcileOp) {
        self.feed = match op {
            ReconcileOp::Replace(feed) => feed,
            ReconcileOp::Prepend(record) => self.feed.with_uploaded(record),
            ReconcileOp::AppendOwner {
                token_id,
                new_owner,
            } => self.feed.with_owner_appended(token_id, new_owner),
        };
        let _ = self.feed_tx.send(self.feed.clone());
    }
}

async fn run_upload(
    ctx: ActionContext,
    gas: U256,
    path: PathBuf,
    file_name: String,
    location: String,
    caption: String,
    done: oneshot::Sender<Result<TxOutcome>>,
) {
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(cause) => {
            let cause = anyhow!("failed to read {}: {}", path.display(), cause);
            ctx.notifier.notify(Toast::error(cause.to_string()));
            let _ = done.send(Err(cause));
            return;
        }
    };
    // the contract wire format takes the photo as 0x-prefixed hex
    let call = LedgerCall::UploadPhoto {
        photo_hex: hex_payload(&raw),
        file_name,
        location,
        caption,
    };

    if let Some(receipt) = submit_tracked(&ctx, call, gas, done).await {
        match upload_token_id(&ctx.abi, &receipt) {
            Some(token_id) => match ctx.ledger.photo(token_id).await {
                Ok(record) => {
                    let _ = ctx.op_tx.send(ReconcileOp::Prepend(record)).await;
                }
                Err(cause) => {
                    error!("failed to fetch uploaded photo {}: {}", token_id, cause);
                }
            },
            None => error!(
                "confirmed upload receipt carries no usable {} event",
                EVENT_PHOTO_UPLOADED
            ),
        }
    }
}

async fn run_transfer(
    ctx: ActionContext,
    gas: U256,
    token_id: u64,
    to: Address,
    done: oneshot::Sender<Result<TxOutcome>>,
) {
    let call = LedgerCall::TransferOwnership { token_id, to };

    if let Some(receipt) = submit_tracked(&ctx, call, gas, done).await {
        match transfer_details(&ctx.abi, &receipt) {
            Some((token_id, new_owner)) => {
                let _ = ctx
                    .op_tx
                    .send(ReconcileOp::AppendOwner {
                        token_id,
                        new_owner,
                    })
                    .await;
            }
            None => error!(
                "confirmed transfer receipt carries no usable {} event",
                EVENT_OWNERSHIP_TRANSFERRED
            ),
        }
    }
}

/// Encodes and submits one call, forwarding every lifecycle stage to the
/// notifier. Returns the receipt only on confirmed success; failure receipts
/// and transport errors resolve `done` and leave state untouched.
async fn submit_tracked(
    ctx: &ActionContext,
    call: LedgerCall,
    gas: U256,
    done: oneshot::Sender<Result<TxOutcome>>,
) -> Option<TransactionReceipt> {
    let operation = call.operation();
    let calldata = match encode_call(&ctx.abi, &call) {
        Ok(calldata) => calldata,
        Err(cause) => {
            ctx.notifier.notify(Toast::error(cause.to_string()));
            let _ = done.send(Err(cause));
            return None;
        }
    };

    let mut stages = ctx.submitter.submit(SubmitRequest {
        calldata: calldata.into(),
        gas,
    });
    while let Some(stage) = stages.recv().await {
        match stage {
            TxStage::HashObtained(tx_hash) => {
                ctx.notifier.notify(Toast::pending(
                    format!("Sending a transaction... ({})", operation),
                    tx_hash,
                ));
            }
            TxStage::Confirmed(receipt) => {
                let success = succeeded(&receipt);
                let block = receipt
                    .block_number
                    .map(|number| number.as_u64())
                    .unwrap_or_default();
                ctx.notifier.notify(Toast::receipt(
                    success,
                    format!(
                        "Received receipt! Your transaction is in block #{} ({})",
                        block, operation
                    ),
                    receipt.transaction_hash,
                ));
                let _ = done.send(Ok(TxOutcome {
                    tx_hash: receipt.transaction_hash,
                    succeeded: success,
                    block_number: receipt.block_number,
                }));
                return if success { Some(receipt) } else { None };
            }
            TxStage::Error(cause) => {
                error!("{} submission failed: {}", operation, cause);
                ctx.notifier.notify(Toast::error(cause.to_string()));
                let _ = done.send(Err(cause));
                return None;
            }
        }
    }
    debug!("{} lifecycle ended without a terminal stage", operation);
    None
}

fn upload_token_id(abi: &Abi, receipt: &TransactionReceipt) -> Option<u64> {
    let events = decode_receipt_logs(abi, &receipt.logs);
    let event = events.first(EVENT_PHOTO_UPLOADED)?;
    contract::uint_to_u64(event.uint(0)?).ok()
}

fn transfer_details(abi: &Abi, receipt: &TransactionReceipt) -> Option<(u64, Address)> {
    let events = decode_receipt_logs(abi, &receipt.logs);
    let event = events.first(EVENT_OWNERSHIP_TRANSFERRED)?;
    let token_id = contract::uint_to_u64(event.uint(0)?).ok()?;
    let new_owner = event.address(2)?;
    Some((token_id, new_owner))
}
