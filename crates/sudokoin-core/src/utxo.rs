//! The in-memory UTXO index owned by the chain.
//!
//! Tracks every seen transaction (confirmed or pending) by hash, plus the
//! per-owner unspent sets the verifiers and balance queries read. The two
//! unspent maps are only ever mutated together through [`UtxoIndex::credit`]
//! and [`UtxoIndex::debit`], which keeps them consistent: an owner's set
//! entry always has a matching amount entry.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sudokoin_puzzle::HiddenSquares;

use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, DEFAULT_TXS_PER_BLOCK};
use crate::records::{OutputRecord, TxRecord};
use crate::types::{Hash256, Tx};

/// Consensus parameters carried by the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// Base coinbase reward in grains.
    pub mining_reward: u64,
    /// Mempool transactions per candidate block.
    pub txs_per_block: usize,
    /// Current puzzle difficulty; bumped per accepted block.
    pub difficulty: u64,
    /// Puzzle hidden-squares policy.
    pub hidden_squares: HiddenSquares,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            mining_reward: DEFAULT_MINING_REWARD,
            txs_per_block: DEFAULT_TXS_PER_BLOCK,
            difficulty: DEFAULT_DIFFICULTY,
            hidden_squares: HiddenSquares::default(),
        }
    }
}

/// One spendable output of an owner, as reported by balance queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnspentOutput {
    /// Transaction carrying the output.
    pub tx: Hash256,
    /// Index of the output within that transaction.
    pub output_index: u32,
    /// The output's own hash.
    pub out_hash: Hash256,
    /// Value in grains.
    pub amount: u64,
}

/// Owner address → unspent output index, plus the transaction lookup table.
pub struct UtxoIndex {
    /// Every transaction seen, confirmed or pending, in wire form.
    transactions: HashMap<Hash256, TxRecord>,
    /// Owner → set of `(tx_hash, output_hash)` pairs still spendable.
    unspent_by_owner: HashMap<String, HashSet<(Hash256, Hash256)>>,
    /// Owner → output hash → amount in grains.
    unspent_amounts: HashMap<String, HashMap<Hash256, u64>>,
    /// Index of the current head block; `None` before genesis.
    block_index: Option<u64>,
    config: ChainConfig,
}

impl UtxoIndex {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            transactions: HashMap::new(),
            unspent_by_owner: HashMap::new(),
            unspent_amounts: HashMap::new(),
            block_index: None,
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Monotonic difficulty increment, applied per accepted block.
    pub fn bump_difficulty(&mut self) {
        self.config.difficulty += 1;
    }

    pub fn block_index(&self) -> Option<u64> {
        self.block_index
    }

    pub fn set_block_index(&mut self, index: u64) {
        self.block_index = Some(index);
    }

    /// Step the head index back one block; index 0 retreats to pre-genesis.
    pub fn retreat_block_index(&mut self) {
        self.block_index = match self.block_index {
            Some(0) | None => None,
            Some(index) => Some(index - 1),
        };
    }

    /// Record a transaction in the lookup table (confirmed and mempool
    /// transactions share it).
    pub fn insert_tx(&mut self, tx: &Tx) {
        self.transactions.insert(tx.hash(), tx.to_record());
    }

    pub fn tx(&self, hash: &Hash256) -> Option<&TxRecord> {
        self.transactions.get(hash)
    }

    pub fn contains_tx(&self, hash: &Hash256) -> bool {
        self.transactions.contains_key(hash)
    }

    /// Look up an output of a recorded transaction.
    pub fn output(&self, tx_hash: &Hash256, index: u32) -> Option<&OutputRecord> {
        self.transactions
            .get(tx_hash)
            .and_then(|record| record.outputs.get(index as usize))
    }

    /// Whether `(tx_hash, out_hash)` is spendable by `owner`.
    pub fn is_unspent(&self, owner: &str, tx_hash: Hash256, out_hash: Hash256) -> bool {
        self.unspent_by_owner
            .get(owner)
            .is_some_and(|set| set.contains(&(tx_hash, out_hash)))
    }

    /// Make an output spendable by its owner.
    pub fn credit(&mut self, owner: &str, tx_hash: Hash256, out_hash: Hash256, amount: u64) {
        self.unspent_by_owner
            .entry(owner.to_string())
            .or_default()
            .insert((tx_hash, out_hash));
        self.unspent_amounts
            .entry(owner.to_string())
            .or_default()
            .insert(out_hash, amount);
    }

    /// Consume an owner's output, returning its amount if it was spendable.
    pub fn debit(&mut self, owner: &str, tx_hash: Hash256, out_hash: Hash256) -> Option<u64> {
        let present = self
            .unspent_by_owner
            .get_mut(owner)
            .is_some_and(|set| set.remove(&(tx_hash, out_hash)));
        if !present {
            return None;
        }
        self.unspent_amounts
            .get_mut(owner)
            .and_then(|amounts| amounts.remove(&out_hash))
    }

    /// Total spendable grains of one owner.
    pub fn balance(&self, owner: &str) -> u64 {
        self.unspent_amounts
            .get(owner)
            .map(|amounts| amounts.values().sum())
            .unwrap_or(0)
    }

    /// All spendable outputs of one owner, sorted for stable responses.
    pub fn unspent(&self, owner: &str) -> Vec<UnspentOutput> {
        let Some(set) = self.unspent_by_owner.get(owner) else {
            return Vec::new();
        };
        let amounts = self.unspent_amounts.get(owner);
        let mut result: Vec<UnspentOutput> = set
            .iter()
            .filter_map(|&(tx_hash, out_hash)| {
                let amount = amounts.and_then(|a| a.get(&out_hash)).copied()?;
                let record = self.transactions.get(&tx_hash)?;
                let output_index = record
                    .outputs
                    .iter()
                    .position(|out| out.hash == out_hash.to_string())?;
                Some(UnspentOutput {
                    tx: tx_hash,
                    output_index: output_index as u32,
                    out_hash,
                    amount,
                })
            })
            .collect();
        result.sort_by(|a, b| (a.tx, a.output_index).cmp(&(b.tx, b.output_index)));
        result
    }

    /// Sum of all spendable grains across every owner.
    pub fn total_unspent(&self) -> u64 {
        self.unspent_amounts
            .values()
            .flat_map(|amounts| amounts.values())
            .sum()
    }
}
