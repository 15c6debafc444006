use anyhow::{anyhow, Context, Result};
use ethers::types::{Address, U256};
use std::time::Duration;

/// Which submission path this session uses. Picked once at session start;
/// nothing switches strategies mid-lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Relayed,
}

impl Strategy {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "direct" => Ok(Strategy::Direct),
            "relayed" => Ok(Strategy::Relayed),
            other => Err(anyhow!(
                "unknown strategy '{}', expected 'direct' or 'relayed'",
                other
            )),
        }
    }
}

/// Per-operation gas budgets, defaulting to the contract deployment values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasBudgets {
    pub upload: U256,
    pub transfer: U256,
}

impl Default for GasBudgets {
    fn default() -> Self {
        GasBudgets {
            upload: U256::from(200_000_000u64),
            transfer: U256::from(20_000_000u64),
        }
    }
}

/// Session configuration, resolved once at startup and threaded explicitly
/// into the session; nothing reads it as ambient global state.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub rpc_url: String,
    /// Relay endpoint for the relayed strategy. Falls back to the node URL.
    pub relay_url: String,
    /// Deployed ledger contract; also the fixed relay destination.
    pub contract: Address,
    pub strategy: Strategy,
    pub private_key: Option<String>,
    pub gas: GasBudgets,
    pub receipt_poll_ms: u64,
}

impl SessionConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = get("PHOTOGRAM_RPC_URL")
            .unwrap_or_else(|| "http://localhost:8545".to_string());
        let relay_url = get("PHOTOGRAM_RELAY_URL").unwrap_or_else(|| rpc_url.clone());
        let contract = get("PHOTOGRAM_CONTRACT")
            .context("PHOTOGRAM_CONTRACT is required")?
            .parse::<Address>()
            .map_err(|e| anyhow!("invalid contract address: {}", e))?;
        let strategy = match get("PHOTOGRAM_STRATEGY") {
            Some(value) => Strategy::parse(&value)?,
            None => Strategy::Direct,
        };

        let mut gas = GasBudgets::default();
        if let Some(value) = get("PHOTOGRAM_UPLOAD_GAS") {
            gas.upload = parse_gas(&value, "PHOTOGRAM_UPLOAD_GAS")?;
        }
        if let Some(value) = get("PHOTOGRAM_TRANSFER_GAS") {
            gas.transfer = parse_gas(&value, "PHOTOGRAM_TRANSFER_GAS")?;
        }

        let receipt_poll_ms = match get("PHOTOGRAM_RECEIPT_POLL_MS") {
            Some(value) => value
                .parse()
                .map_err(|e| anyhow!("invalid PHOTOGRAM_RECEIPT_POLL_MS: {}", e))?,
            None => 1_000,
        };

        Ok(SessionConfig {
            rpc_url,
            relay_url,
            contract,
            strategy,
            private_key: get("PHOTOGRAM_PRIVATE_KEY"),
            gas,
            receipt_poll_ms,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }
}

fn parse_gas(value: &str, key: &str) -> Result<U256> {
    U256::from_dec_str(value).map_err(|e| anyhow!("invalid {}: {:?}", key, e))
}
