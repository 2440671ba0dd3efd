//! The node façade.
//!
//! Wraps the chain core in a single mutex and exposes the serialized entry
//! points the transport calls. No method panics across this boundary: every
//! fallible operation surfaces its error as a result variant or a `reason`
//! string in the response record.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use sudokoin_core::chain::{BlockOutcome, Chain};
use sudokoin_core::error::SudokoinError;
use sudokoin_core::keys::{PrivateKey, decode_pubkey_b64};
use sudokoin_core::records::{BlockRecord, TxRecord};
use sudokoin_core::types::{Block, Tx};
use sudokoin_core::utxo::UnspentOutput;
use sudokoin_puzzle::{PuzzleError, SudokuBoard};

use crate::config::NodeConfig;
use crate::wallet;

/// Outcome of offering a transaction.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AddTxResult {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of offering a block.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AddBlockResult {
    pub accepted: bool,
    pub reorg: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A candidate block paired with its encoded puzzle.
#[derive(Clone, Debug, Serialize)]
pub struct MiningJob {
    pub block: BlockRecord,
    pub puzzle: String,
}

/// Outcome of submitting a solved candidate.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SubmitResult {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Head summary, or the empty marker for a chain with no blocks.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NodeStatus {
    Empty {
        empty: bool,
    },
    Head {
        block_index: u64,
        block_hash: String,
        prev_hash: String,
        timestamp: u64,
    },
}

/// A freshly generated wallet.
#[derive(Clone, Debug, Serialize)]
pub struct WalletInfo {
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}

pub struct NodeApi {
    chain: Mutex<Chain>,
}

impl NodeApi {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            chain: Mutex::new(Chain::new(config.chain_config())),
        }
    }

    /// Wrap an existing chain (tests use this with a mock clock).
    pub fn from_chain(chain: Chain) -> Self {
        Self {
            chain: Mutex::new(chain),
        }
    }

    /// Offer a transaction received from a wallet or a peer.
    pub fn add_tx(&self, record: &TxRecord) -> AddTxResult {
        let tx = match Tx::from_record(record) {
            Ok(tx) => tx,
            Err(e) => {
                return AddTxResult {
                    accepted: false,
                    reason: Some(e.to_string()),
                };
            }
        };
        match self.chain.lock().add_tx(tx) {
            Ok(fee) => {
                info!(fee, "transaction admitted to mempool");
                AddTxResult {
                    accepted: true,
                    reason: None,
                }
            }
            Err(e) => AddTxResult {
                accepted: false,
                reason: Some(e.to_string()),
            },
        }
    }

    /// Offer a block received from a peer.
    pub fn add_block(&self, record: &BlockRecord) -> AddBlockResult {
        let block = match Block::from_record(record) {
            Ok(block) => block,
            Err(e) => {
                return AddBlockResult {
                    accepted: false,
                    reorg: false,
                    reason: Some(e.to_string()),
                };
            }
        };
        let index = block.index;
        match self.chain.lock().add_block(block) {
            Ok(BlockOutcome::Accepted) => {
                info!(index, "block appended");
                AddBlockResult {
                    accepted: true,
                    reorg: false,
                    reason: None,
                }
            }
            Ok(BlockOutcome::Reorged) => {
                info!(index, "block adopted via reorganization");
                AddBlockResult {
                    accepted: true,
                    reorg: true,
                    reason: None,
                }
            }
            Ok(BlockOutcome::Buffered) => AddBlockResult {
                accepted: false,
                reorg: false,
                reason: Some("buffered as fork candidate".to_string()),
            },
            Err(e) => {
                warn!(index, error = %e, "block rejected");
                AddBlockResult {
                    accepted: false,
                    reorg: false,
                    reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Assemble a candidate block and its puzzle for a miner paying itself
    /// to `winner` (a base64 public key).
    pub fn force_block(&self, winner: &str) -> Result<MiningJob, SudokoinError> {
        decode_pubkey_b64(winner)?;
        let chain = self.chain.lock();
        let block = chain.force_block(winner)?;
        let puzzle = chain.puzzle_for(&block);
        Ok(MiningJob {
            block: block.to_record(),
            puzzle,
        })
    }

    /// Attach a solution to a candidate block and offer it to the chain.
    pub fn submit_solution(&self, record: &BlockRecord, solution: &str) -> SubmitResult {
        let mut block = match Block::from_record(record) {
            Ok(block) => block,
            Err(e) => {
                return SubmitResult {
                    accepted: false,
                    block_hash: None,
                    reason: Some(e.to_string()),
                };
            }
        };
        block.set_solution(solution);
        let block_hash = block.hash().to_string();
        match self.chain.lock().add_block(block) {
            Ok(BlockOutcome::Accepted | BlockOutcome::Reorged) => SubmitResult {
                accepted: true,
                block_hash: Some(block_hash),
                reason: None,
            },
            Ok(BlockOutcome::Buffered) => SubmitResult {
                accepted: false,
                block_hash: Some(block_hash),
                reason: Some("buffered as fork candidate".to_string()),
            },
            Err(e) => SubmitResult {
                accepted: false,
                block_hash: None,
                reason: Some(e.to_string()),
            },
        }
    }

    /// Canonical blocks from `from_index`, topped up with any buffered fork
    /// candidates when fewer than `limit` canonical blocks remain.
    pub fn get_chain(&self, from_index: usize, limit: usize) -> Vec<BlockRecord> {
        let chain = self.chain.lock();
        let mut result: Vec<BlockRecord> = chain
            .blocks()
            .iter()
            .skip(from_index)
            .take(limit)
            .map(Block::to_record)
            .collect();
        if result.len() < limit {
            result.extend(chain.fork_blocks().map(Block::to_record));
        }
        result
    }

    pub fn get_head(&self) -> Option<BlockRecord> {
        self.chain.lock().head().map(Block::to_record)
    }

    pub fn get_user_balance(&self, address: &str) -> u64 {
        self.chain.lock().db().balance(address)
    }

    pub fn get_user_unspent(&self, address: &str) -> Vec<UnspentOutput> {
        self.chain.lock().db().unspent(address)
    }

    pub fn get_status(&self) -> NodeStatus {
        match self.chain.lock().head() {
            Some(head) => NodeStatus::Head {
                block_index: head.index,
                block_hash: head.hash().to_string(),
                prev_hash: head.prev_hash.to_string(),
                timestamp: head.timestamp,
            },
            None => NodeStatus::Empty { empty: true },
        }
    }

    /// Mine the genesis block for a node launched as the network origin.
    ///
    /// Builds the coinbase-only candidate, solves its own puzzle, and appends
    /// it through the normal acceptance path.
    pub fn bootstrap_genesis(&self, winner: &str) -> Result<String, SudokoinError> {
        decode_pubkey_b64(winner)?;
        let mut chain = self.chain.lock();
        let mut block = chain.create_first_block(winner);
        let puzzle = SudokuBoard::decode(&chain.puzzle_for(&block))
            .map_err(SudokoinError::Puzzle)?;
        let solution = puzzle.solve().ok_or(PuzzleError::Unsolvable)?;
        block.set_solution(solution.encode());
        let block_hash = block.hash().to_string();
        chain.add_block(block)?;
        info!(block = %block_hash, "genesis block appended");
        Ok(block_hash)
    }

    /// Build, sign, and submit a payment from a hex-encoded private key.
    pub fn create_payment(
        &self,
        private_key_hex: &str,
        to: &str,
        amount: u64,
        fee: u64,
    ) -> AddTxResult {
        let key = match PrivateKey::from_hex(private_key_hex) {
            Ok(key) => key,
            Err(e) => {
                return AddTxResult {
                    accepted: false,
                    reason: Some(e.to_string()),
                };
            }
        };
        let mut chain = self.chain.lock();
        let timestamp = chain.now();
        let tx = match wallet::build_payment(&chain, &key, to, amount, fee, timestamp) {
            Ok(tx) => tx,
            Err(e) => {
                return AddTxResult {
                    accepted: false,
                    reason: Some(e.to_string()),
                };
            }
        };
        match chain.add_tx(tx) {
            Ok(fee) => {
                info!(fee, "payment admitted to mempool");
                AddTxResult {
                    accepted: true,
                    reason: None,
                }
            }
            Err(e) => AddTxResult {
                accepted: false,
                reason: Some(e.to_string()),
            },
        }
    }

    /// Generate a fresh wallet. The key never touches node state.
    pub fn generate_wallet() -> WalletInfo {
        let key = PrivateKey::generate();
        WalletInfo {
            private_key: key.to_hex(),
            public_key: key.public_key_b64(),
            address: key.address(),
        }
    }
}
