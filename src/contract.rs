use super::feed::Record;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use ethers::abi::{Abi, Function, Token};
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use std::sync::Arc;

pub const EVENT_PHOTO_UPLOADED: &str = "PhotoUploaded";
pub const EVENT_OWNERSHIP_TRANSFERRED: &str = "OwnershipTransferred";

const FN_TOTAL_COUNT: &str = "getTotalPhotoCount";
const FN_GET_PHOTO: &str = "getPhoto";
const FN_UPLOAD: &str = "uploadPhoto";
const FN_TRANSFER: &str = "transferOwnership";

const HEX_PREFIX: &str = "0x";

/// Interface description of the deployed photo ledger contract.
pub const PHOTO_LEDGER_ABI_JSON: &str = r#"[
  {"type":"function","name":"getTotalPhotoCount","inputs":[],"outputs":[{"name":"count","type":"uint256"}],"stateMutability":"view","constant":true},
  {"type":"function","name":"getPhoto","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"id","type":"uint256"},{"name":"data","type":"bytes"},{"name":"ownerHistory","type":"address[]"},{"name":"fileName","type":"string"},{"name":"location","type":"string"},{"name":"caption","type":"string"},{"name":"timestamp","type":"uint256"}],"stateMutability":"view","constant":true},
  {"type":"function","name":"uploadPhoto","inputs":[{"name":"photo","type":"bytes"},{"name":"fileName","type":"string"},{"name":"location","type":"string"},{"name":"caption","type":"string"}],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"function","name":"transferOwnership","inputs":[{"name":"tokenId","type":"uint256"},{"name":"to","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
  {"type":"event","name":"PhotoUploaded","inputs":[{"name":"tokenId","type":"uint256","indexed":false},{"name":"owner","type":"address","indexed":false},{"name":"fileName","type":"string","indexed":false},{"name":"timestamp","type":"uint256","indexed":false}],"anonymous":false},
  {"type":"event","name":"OwnershipTransferred","inputs":[{"name":"tokenId","type":"uint256","indexed":false},{"name":"from","type":"address","indexed":false},{"name":"to","type":"address","indexed":false}],"anonymous":false}
]"#;

pub fn photo_ledger_abi() -> Abi {
    serde_json::from_str(PHOTO_LEDGER_ABI_JSON).expect("embedded ABI is valid JSON")
}

/// One state-changing call against the ledger: the target operation plus its
/// argument set. Built once from validated inputs and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    UploadPhoto {
        /// Photo bytes framed as a 0x-prefixed hex string, the form the
        /// contract wire format expects.
        photo_hex: String,
        file_name: String,
        location: String,
        caption: String,
    },
    TransferOwnership {
        token_id: u64,
        to: Address,
    },
}

impl LedgerCall {
    /// Contract method name, used in notification messages.
    pub fn operation(&self) -> &'static str {
        match self {
            LedgerCall::UploadPhoto { .. } => FN_UPLOAD,
            LedgerCall::TransferOwnership { .. } => FN_TRANSFER,
        }
    }
}

/// Frames raw bytes for the contract: 0x prefix followed by lowercase hex.
pub fn hex_payload(raw: &[u8]) -> String {
    format!("{}{}", HEX_PREFIX, hex::encode(raw))
}

pub fn decode_hex_payload(payload: &str) -> Result<Vec<u8>> {
    let stripped = payload
        .strip_prefix(HEX_PREFIX)
        .ok_or_else(|| anyhow!("photo payload must carry the {} prefix", HEX_PREFIX))?;
    hex::decode(stripped).map_err(|e| anyhow!("photo payload is not valid hex: {}", e))
}

/// ABI-encodes a call into the data field of a transaction. A malformed
/// payload is a validation failure, caught before anything is broadcast.
pub fn encode_call(abi: &Abi, call: &LedgerCall) -> Result<Vec<u8>> {
    match call {
        LedgerCall::UploadPhoto {
            photo_hex,
            file_name,
            location,
            caption,
        } => {
            let photo = decode_hex_payload(photo_hex)?;
            let function = abi.function(FN_UPLOAD)?;
            Ok(function.encode_input(&[
                Token::Bytes(photo),
                Token::String(file_name.clone()),
                Token::String(location.clone()),
                Token::String(caption.clone()),
            ])?)
        }
        LedgerCall::TransferOwnership { token_id, to } => {
            let function = abi.function(FN_TRANSFER)?;
            Ok(function.encode_input(&[Token::Uint(U256::from(*token_id)), Token::Address(*to)])?)
        }
    }
}

/// Read-only view of the ledger. Both calls are side-effect-free.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn total_count(&self) -> Result<u64>;
    async fn photo(&self, token_id: u64) -> Result<Record>;
}

/// `Ledger` over JSON-RPC `eth_call`.
pub struct EthersLedger<M> {
    client: Arc<M>,
    contract: Address,
    abi: Arc<Abi>,
}

impl<M> EthersLedger<M> {
    pub fn new(client: Arc<M>, contract: Address, abi: Arc<Abi>) -> Self {
        Self {
            client,
            contract,
            abi,
        }
    }
}

impl<M: Middleware> EthersLedger<M> {
    async fn call(&self, function: &Function, args: &[Token]) -> Result<Vec<Token>> {
        let data = function.encode_input(args)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.contract)
            .data(data)
            .into();
        let raw: Bytes = self
            .client
            .call(&tx, None)
            .await
            .map_err(|e| anyhow!("{} call failed: {}", function.name, e))?;
        Ok(function.decode_output(raw.as_ref())?)
    }
}

#[async_trait]
impl<M: Middleware + 'static> Ledger for EthersLedger<M> {
    async fn total_count(&self) -> Result<u64> {
        let function = self.abi.function(FN_TOTAL_COUNT)?;
        let mut tokens = self.call(function, &[]).await?.into_iter();
        uint_to_u64(next_uint(&mut tokens, "total count")?)
    }

    async fn photo(&self, token_id: u64) -> Result<Record> {
        let function = self.abi.function(FN_GET_PHOTO)?;
        let tokens = self
            .call(function, &[Token::Uint(U256::from(token_id))])
            .await?;
        record_from_tokens(tokens)
    }
}

/// Maps a `getPhoto` return tuple onto a `Record`. Shape errors here mean the
/// deployed contract does not match the embedded interface description.
fn record_from_tokens(tokens: Vec<Token>) -> Result<Record> {
    if tokens.len() != 7 {
        bail!("getPhoto returned {} values, expected 7", tokens.len());
    }
    let mut tokens = tokens.into_iter();
    let id = uint_to_u64(next_uint(&mut tokens, "id")?)?;
    let data = match tokens.next() {
        Some(Token::Bytes(bytes)) => Bytes::from(bytes),
        other => bail!("unexpected photo data in getPhoto output: {:?}", other),
    };
    let owner_history = match tokens.next() {
        Some(Token::Array(entries)) => entries
            .into_iter()
            .map(|entry| match entry {
                Token::Address(address) => Ok(address),
                other => Err(anyhow!("unexpected owner entry: {:?}", other)),
            })
            .collect::<Result<Vec<Address>>>()?,
        other => bail!("unexpected owner history in getPhoto output: {:?}", other),
    };
    let file_name = next_string(&mut tokens, "file name")?;
    let location = next_string(&mut tokens, "location")?;
    let caption = next_string(&mut tokens, "caption")?;
    let uploaded_at = next_uint(&mut tokens, "timestamp")?;
    Ok(Record {
        id,
        data,
        owner_history,
        file_name,
        location,
        caption,
        uploaded_at,
    })
}

fn next_uint(tokens: &mut impl Iterator<Item = Token>, what: &str) -> Result<U256> {
    match tokens.next() {
        Some(Token::Uint(value)) => Ok(value),
        other => Err(anyhow!("unexpected {} in contract output: {:?}", what, other)),
    }
}

fn next_string(tokens: &mut impl Iterator<Item = Token>, what: &str) -> Result<String> {
    match tokens.next() {
        Some(Token::String(value)) => Ok(value),
        other => Err(anyhow!("unexpected {} in contract output: {:?}", what, other)),
    }
}

pub(crate) fn uint_to_u64(value: U256) -> Result<u64> {
    if value.bits() > 64 {
        bail!("value does not fit in a token id: {}", value);
    }
    Ok(value.as_u64())
}
