use super::config::{SessionConfig, Strategy};
use super::contract::{self, EthersLedger, Ledger};
use super::feed::Feed;
use super::notify::Notifier;
use super::orchestrator::{Command, Orchestrator};
use super::submit::{DirectSubmitter, JsonRpcEndpoint, RelaySubmitter, Submitter};
use anyhow::{Context, Result};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Handles into a running session: user intents go in over `commands`,
/// feed snapshots come out over `feed`.
pub struct Session {
    pub commands: mpsc::Sender<Command>,
    pub feed: watch::Receiver<Feed>,
}

/// Wires up the session: one provider for reads, the submission strategy
/// fixed by the configuration, and the orchestrator spawned on top.
pub async fn start(config: SessionConfig, notifier: Arc<dyn Notifier>) -> Result<Session> {
    let abi = Arc::new(contract::photo_ledger_abi());
    let provider =
        Provider::<Http>::try_from(config.rpc_url.as_str()).context("invalid node url")?;
    let ledger: Arc<dyn Ledger> = Arc::new(EthersLedger::new(
        Arc::new(provider.clone()),
        config.contract,
        Arc::clone(&abi),
    ));

    let submitter: Arc<dyn Submitter> = match config.strategy {
        Strategy::Direct => {
            let key = config
                .private_key
                .as_deref()
                .context("PHOTOGRAM_PRIVATE_KEY is required for the direct strategy")?;
            let wallet: LocalWallet = key.parse().context("invalid private key")?;
            let chain_id = provider
                .get_chainid()
                .await
                .context("failed to query the chain id")?;
            let wallet = wallet.with_chain_id(chain_id.as_u64());
            info!("direct strategy, sender {:?}", Signer::address(&wallet));

            let client = SignerMiddleware::new(provider, wallet.clone());
            let endpoint = Arc::new(JsonRpcEndpoint::new(
                Arc::new(client),
                config.poll_interval(),
            ));
            Arc::new(DirectSubmitter::new(
                endpoint,
                Arc::new(wallet),
                config.contract,
            ))
        }
        Strategy::Relayed => {
            info!("relayed strategy via {}", config.relay_url);
            let relay = Provider::<Http>::try_from(config.relay_url.as_str())
                .context("invalid relay url")?;
            let endpoint = Arc::new(JsonRpcEndpoint::new(
                Arc::new(relay),
                config.poll_interval(),
            ));
            Arc::new(RelaySubmitter::new(endpoint, config.contract))
        }
    };

    let orchestrator = Orchestrator::new(config.gas, abi, submitter, ledger, notifier);
    let commands = orchestrator.command_sender();
    let feed = orchestrator.feed_watcher();
    tokio::spawn(orchestrator.run());

    Ok(Session { commands, feed })
}
