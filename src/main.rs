mod config;
mod contract;
mod events;
mod feed;
mod notify;
mod orchestrator;
mod session;
mod submit;
#[cfg(test)]
mod testutil;
mod wallet;

use crate::config::SessionConfig;
use crate::notify::LogNotifier;
use crate::orchestrator::{Command, TxOutcome};
use crate::session::Session;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use ethers::types::Address;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Parser)]
#[command(name = "photogram-client", about = "Client for the photo ledger contract")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Load the feed and print each record as a JSON line
    Feed,
    /// Upload a photo to the ledger
    Upload {
        file: PathBuf,
        /// File name recorded on-chain; defaults to the file's own name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        caption: String,
    },
    /// Transfer a photo to a new owner
    Transfer { token_id: u64, to: Address },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = SessionConfig::from_env()?;
    let session = session::start(config, Arc::new(LogNotifier)).await?;

    match cli.command {
        CliCommand::Feed => {
            let (done, result) = oneshot::channel();
            send(&session, Command::LoadFeed { done }).await?;
            let feed = result.await.map_err(|_| anyhow!("orchestrator stopped"))??;
            for record in feed.iter() {
                println!("{}", serde_json::to_string(record.as_ref())?);
            }
        }
        CliCommand::Upload {
            file,
            name,
            location,
            caption,
        } => {
            let file_name = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let (done, result) = oneshot::channel();
            send(
                &session,
                Command::UploadPhoto {
                    path: file,
                    file_name,
                    location,
                    caption,
                    done,
                },
            )
            .await?;
            finish(result).await?;
        }
        CliCommand::Transfer { token_id, to } => {
            let (done, result) = oneshot::channel();
            send(&session, Command::TransferOwnership { token_id, to, done }).await?;
            finish(result).await?;
        }
    }
    Ok(())
}

async fn send(session: &Session, command: Command) -> Result<()> {
    session
        .commands
        .send(command)
        .await
        .map_err(|_| anyhow!("orchestrator stopped"))
}

async fn finish(result: oneshot::Receiver<Result<TxOutcome>>) -> Result<()> {
    let outcome = result.await.map_err(|_| anyhow!("orchestrator stopped"))??;
    if !outcome.succeeded {
        return Err(anyhow!("transaction {:?} reverted on-chain", outcome.tx_hash));
    }
    info!(
        "confirmed: tx {:?} in block {}",
        outcome.tx_hash,
        outcome
            .block_number
            .map(|number| number.to_string())
            .unwrap_or_else(|| "<pending>".to_string())
    );
    Ok(())
}
