//! Sudokoin full node binary.
//!
//! Starts the in-memory chain core behind the HTTP API. A node launched with
//! `--genesis` becomes the network origin: it mines and appends its own
//! genesis block before serving.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use sudokoin_core::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_HTTP_PORT, DEFAULT_MINING_REWARD, DEFAULT_TXS_PER_BLOCK,
};
use sudokoin_core::keys::PrivateKey;
use sudokoin_node_lib::{NodeApi, NodeConfig, router};
use sudokoin_puzzle::HiddenSquares;

#[derive(Parser, Debug)]
#[command(name = "sudokoin-node", version, about = "Sudokoin full node with HTTP API")]
struct Args {
    /// HTTP bind address
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// HTTP port
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Launch as the network origin: mine and append the genesis block
    #[arg(long)]
    genesis: bool,

    /// Hex private key of the node wallet; generated when omitted
    #[arg(long)]
    wallet_key: Option<String>,

    /// Starting puzzle difficulty
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u64,

    /// Coinbase reward in grains
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    mining_reward: u64,

    /// Mempool transactions per candidate block
    #[arg(long, default_value_t = DEFAULT_TXS_PER_BLOCK)]
    txs_per_block: usize,

    /// Hide the difficulty-scaled share of puzzle squares instead of none
    #[arg(long)]
    hide_squares: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let wallet = match &args.wallet_key {
        Some(hex) => match PrivateKey::from_hex(hex) {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "invalid --wallet-key");
                process::exit(1);
            }
        },
        None => PrivateKey::generate(),
    };
    info!(address = %wallet.address(), "node wallet ready");

    let config = NodeConfig {
        mining_reward: args.mining_reward,
        txs_per_block: args.txs_per_block,
        difficulty: args.difficulty,
        hidden_squares: if args.hide_squares {
            HiddenSquares::Scaled
        } else {
            HiddenSquares::None
        },
        http_bind: args.bind,
        http_port: args.port,
    };
    let addr = config.bind_addr();
    let api = Arc::new(NodeApi::new(&config));

    if args.genesis {
        match api.bootstrap_genesis(&wallet.public_key_b64()) {
            Ok(hash) => info!(block = %hash, "genesis block mined"),
            Err(e) => {
                error!(error = %e, "genesis bootstrap failed");
                process::exit(1);
            }
        }
    }

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind HTTP listener");
            process::exit(1);
        }
    };
    info!(%addr, "HTTP API listening");

    if let Err(e) = axum::serve(listener, router(api)).await {
        error!(error = %e, "HTTP server terminated");
        process::exit(1);
    }
}
