//! Sudokoin standalone miner.
//!
//! Polls a node for a candidate block and its puzzle, solves the puzzle
//! locally, and submits the solution. The head may advance while a puzzle is
//! being solved; a rejected submission just means the next poll fetches a
//! fresh candidate.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use sudokoin_core::keys::PrivateKey;
use sudokoin_core::records::BlockRecord;
use sudokoin_puzzle::SudokuBoard;

#[derive(Parser, Debug)]
#[command(name = "sudokoin-miner", version, about = "Sudokoin standalone miner")]
struct Args {
    /// Node HTTP endpoint
    #[arg(long, default_value = "http://127.0.0.1:18733")]
    node: String,

    /// Hex private key receiving rewards; generated when omitted
    #[arg(long)]
    wallet_key: Option<String>,

    /// Seconds between polls
    #[arg(long, default_value_t = 2)]
    poll_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Deserialize)]
struct TemplateResponse {
    success: bool,
    block: Option<BlockRecord>,
    puzzle: Option<String>,
    msg: Option<String>,
}

#[derive(Deserialize)]
struct MineResponse {
    success: bool,
    block_hash: Option<String>,
    msg: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let wallet = match &args.wallet_key {
        Some(hex) => PrivateKey::from_hex(hex).map_err(|e| anyhow!("invalid --wallet-key: {e}"))?,
        None => {
            let key = PrivateKey::generate();
            info!(private_key = %key.to_hex(), "generated throwaway wallet");
            key
        }
    };
    let address = wallet.public_key_b64();
    info!(miner = %wallet.address(), node = %args.node, "mining started");

    let client = reqwest::Client::new();
    let mut blocks_found = 0u64;

    loop {
        match mine_once(&client, &args.node, &address).await {
            Ok(Some(block_hash)) => {
                blocks_found += 1;
                info!(%block_hash, blocks_found, "block accepted");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "mining round failed"),
        }
        tokio::time::sleep(Duration::from_secs(args.poll_secs)).await;
    }
}

/// Fetch a candidate, solve its puzzle, submit. `Ok(None)` means the round
/// produced no accepted block (stale candidate, lost race, node busy).
async fn mine_once(client: &reqwest::Client, node: &str, address: &str) -> Result<Option<String>> {
    let template: TemplateResponse = client
        .get(format!("{node}/chain/template"))
        .query(&[("address", address)])
        .send()
        .await?
        .json()
        .await
        .context("template response did not parse")?;

    if !template.success {
        return Err(anyhow!(
            "node refused template: {}",
            template.msg.unwrap_or_default()
        ));
    }
    let block = template.block.context("template missing block")?;
    let puzzle = template.puzzle.context("template missing puzzle")?;

    let board = SudokuBoard::decode(&puzzle).map_err(|e| anyhow!("bad puzzle: {e}"))?;
    let solution = board.solve().context("puzzle unsolvable")?;

    let response: MineResponse = client
        .post(format!("{node}/chain/mine"))
        .json(&json!({
            "block": block,
            "puzzle_solution": solution.encode(),
        }))
        .send()
        .await?
        .json()
        .await
        .context("mine response did not parse")?;

    if response.success {
        Ok(response.block_hash)
    } else {
        warn!(msg = response.msg.as_deref().unwrap_or(""), "submission rejected");
        Ok(None)
    }
}
