//! Node configuration.

use sudokoin_core::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_HTTP_PORT, DEFAULT_MINING_REWARD, DEFAULT_TXS_PER_BLOCK,
};
use sudokoin_core::utxo::ChainConfig;
use sudokoin_puzzle::HiddenSquares;

/// Runtime configuration of a node.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Base coinbase reward in grains.
    pub mining_reward: u64,
    /// Mempool transactions per candidate block.
    pub txs_per_block: usize,
    /// Starting puzzle difficulty.
    pub difficulty: u64,
    /// Puzzle hidden-squares policy.
    pub hidden_squares: HiddenSquares,
    /// HTTP bind address.
    pub http_bind: String,
    /// HTTP port.
    pub http_port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            mining_reward: DEFAULT_MINING_REWARD,
            txs_per_block: DEFAULT_TXS_PER_BLOCK,
            difficulty: DEFAULT_DIFFICULTY,
            hidden_squares: HiddenSquares::default(),
            http_bind: "127.0.0.1".to_string(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl NodeConfig {
    /// The consensus parameters handed to the chain core.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            mining_reward: self.mining_reward,
            txs_per_block: self.txs_per_block,
            difficulty: self.difficulty,
            hidden_squares: self.hidden_squares,
        }
    }

    /// `host:port` the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_bind, self.http_port)
    }
}
