use alloy_primitives::{Address, Bytes};
use clap::{Parser, Subcommand};
use futures_util::stream::{self, Stream};
use log::{info, warn};
use safe_tx_core::{
    error::CoreError,
    native::FileStorage,
    simulation::build_simulation_request,
    ActivityView, ExecutingStore, IndexerEvent, PendingTxTracker, SafeInfo, SafeTransaction,
    Settings, SigningStore,
};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type AppError = CoreError;

#[derive(Parser, Debug)]
#[command(name = "safe_tx")]
#[command(about = "Inspect and drive tracked Safe transactions")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SAFE_TX_CONFIG_PATH", default_value = "config.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute (defaults to `pending`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List persisted pending transactions
    Pending,

    /// Drop transactions the indexer has settled
    Prune,

    /// Print the busy state of one transaction as JSON
    Status { tx_id: String },

    /// Apply indexer events read line by line from stdin
    Follow,

    /// Print the simulation request for a JSON transaction document
    Overrides { path: PathBuf },
}

/// Document read by the `overrides` command
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub safe: SafeInfo,
    pub execution_owner: Address,
    pub transaction: SafeTransaction,
    #[serde(default)]
    pub input: Bytes,
    #[serde(default)]
    pub gas: Option<u64>,
}

pub fn print_pending(tracker: &PendingTxTracker<FileStorage>) {
    let records = tracker.list();
    if records.is_empty() {
        println!("No pending transactions");
        return;
    }
    for (tx_id, record) in records {
        println!(
            "{}\t{:?}\tchain={}\tsafe={}\thash={}\tnonce={}{}",
            tx_id,
            record.status,
            record.chain_id,
            record.safe_address,
            record.tx_hash,
            record.wallet_nonce,
            record.error.map(|e| format!("\terror={}", e)).unwrap_or_default(),
        );
    }
}

pub async fn prune(tracker: &PendingTxTracker<FileStorage>) -> Result<(), AppError> {
    let settled = tracker.take_terminal().await?;
    println!("Removed {} settled transactions", settled.len());
    Ok(())
}

/// Busy state of a transaction as seen from this process. Only the
/// pending store is persisted, so signing and executing are always idle here.
pub fn print_status(tracker: &PendingTxTracker<FileStorage>, tx_id: &str) -> Result<(), AppError> {
    let view = ActivityView::new(
        SigningStore::new(),
        ExecutingStore::new(),
        tracker.store().clone(),
    );
    println!("{}", serde_json::to_string_pretty(&view.aggregate(tx_id))?);
    Ok(())
}

pub fn print_overrides(path: &std::path::Path, settings: &Settings) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(path)?;
    let doc: SimulationInput = serde_json::from_str(&raw)?;
    let request = build_simulation_request(
        &doc.safe,
        doc.execution_owner,
        &doc.transaction,
        doc.input,
        doc.gas.unwrap_or(settings.simulation_gas_limit),
    );
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

/// Parse one feed line:
/// `confirmed <tx_id>`, `success <tx_id>` or `failed <tx_id> [reason...]`
pub fn parse_event(line: &str) -> Option<IndexerEvent> {
    let mut parts = line.split_whitespace();
    let kind = parts.next()?;
    let tx_id = parts.next()?;
    match kind {
        "confirmed" => Some(IndexerEvent::confirmed(tx_id)),
        "success" => Some(IndexerEvent::indexed(tx_id, true, None)),
        "failed" => {
            let reason = parts.collect::<Vec<_>>().join(" ");
            let reason = if reason.is_empty() { None } else { Some(reason) };
            Some(IndexerEvent::indexed(tx_id, false, reason))
        }
        _ => None,
    }
}

fn stdin_events() -> impl Stream<Item = IndexerEvent> {
    let lines: Lines<BufReader<Stdin>> = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_event(&line) {
                    Some(event) => return Some((event, lines)),
                    None if line.trim().is_empty() => continue,
                    None => warn!("Ignoring unrecognized feed line: {}", line),
                },
                Ok(None) => return None,
                Err(e) => {
                    warn!("Failed to read indexer feed: {}", e);
                    return None;
                }
            }
        }
    })
}

/// Apply indexer events read from stdin until EOF
pub async fn follow_stdin(tracker: &PendingTxTracker<FileStorage>) {
    let applied = tracker.follow(Box::pin(stdin_events())).await;
    info!("Applied {} indexer transitions", applied);
    print_pending(tracker);
}
