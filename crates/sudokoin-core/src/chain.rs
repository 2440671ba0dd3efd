//! The chain state machine: ordered blocks, head tracking, fork handling,
//! and the rollover/rollback propagation into the UTXO index and mempool.
//!
//! Fork handling is bounded to a two-block window: a sibling of the head is
//! buffered, a child of a buffered sibling triggers a one-block rollback and
//! adoption of the longer chain, and anything deeper is rejected. The
//! difficulty counter always equals the initial difficulty plus the chain
//! length, which is what lets the verifier reconstruct the difficulty any
//! in-window block was mined at.

use std::collections::HashMap;

use tracing::{info, warn};

use sudokoin_puzzle::SudokuGenerator;

use crate::block_validation::BlockVerifier;
use crate::error::{BlockError, ChainError, CodecError, MempoolError};
use crate::mempool::Mempool;
use crate::types::{Block, Hash256, OutputRef, Tx};
use crate::utxo::{ChainConfig, UtxoIndex};
use crate::validation::TxVerifier;

/// Hooks fired after state-changing chain events, e.g. for an analytics
/// sink or a gossip layer. Default implementations do nothing.
pub trait ChainObserver: Send {
    fn on_new_block(&mut self, block: &Block, db: &UtxoIndex) {
        let _ = (block, db);
    }
    fn on_prev_block(&mut self, block: &Block, db: &UtxoIndex) {
        let _ = (block, db);
    }
}

/// How an offered block was incorporated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Appended to the canonical chain.
    Accepted,
    /// Buffered as a fork candidate; the head is unchanged.
    Buffered,
    /// A buffered fork overtook the head: one rollback, two appends.
    Reorged,
}

pub struct Chain {
    blocks: Vec<Block>,
    /// Candidate tips competing with the head, keyed by block hash.
    fork_blocks: HashMap<Hash256, Block>,
    db: UtxoIndex,
    mempool: Mempool,
    observer: Option<Box<dyn ChainObserver>>,
    clock: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl Chain {
    /// Create a chain with the system clock.
    pub fn new(config: ChainConfig) -> Self {
        Self::with_clock(config, || {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        })
    }

    /// Create a chain with a custom clock for testing.
    pub fn with_clock(config: ChainConfig, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            blocks: Vec::new(),
            fork_blocks: HashMap::new(),
            db: UtxoIndex::new(config),
            mempool: Mempool::new(),
            observer: None,
            clock: Box::new(clock),
        }
    }

    /// Attach an observer receiving rollover/rollback notifications.
    pub fn set_observer(&mut self, observer: Box<dyn ChainObserver>) {
        self.observer = Some(observer);
    }

    pub fn head(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn fork_blocks(&self) -> impl Iterator<Item = &Block> {
        self.fork_blocks.values()
    }

    pub fn db(&self) -> &UtxoIndex {
        &self.db
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Current unix time per the chain's clock.
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Admit a transaction to the mempool.
    ///
    /// Rejects already-known hashes, verifies against the current index, and
    /// rejects inputs whose coordinates another pending transaction has
    /// already reserved. Returns the fee on success.
    pub fn add_tx(&mut self, tx: Tx) -> Result<u64, MempoolError> {
        let tx_hash = tx.hash();
        if self.db.contains_tx(&tx_hash) {
            return Err(MempoolError::Duplicate(tx_hash.to_string()));
        }
        let fee = TxVerifier::new(&self.db).verify(tx.inputs(), tx.outputs())?;
        let coords: Vec<OutputRef> = tx
            .inputs()
            .iter()
            .filter_map(|input| input.output_ref())
            .collect();
        self.mempool.insert(tx_hash, fee, &coords)?;
        self.db.insert_tx(&tx);
        Ok(fee)
    }

    /// Assemble a candidate block for a miner.
    ///
    /// Takes up to `txs_per_block` pending transactions (fee descending, hash
    /// ascending) and prepends a coinbase paying the base reward plus their
    /// fees to `winner` (a base64 public key). The candidate carries no
    /// puzzle solution; the miner derives the puzzle from the block seed.
    pub fn force_block(&self, winner: &str) -> Result<Block, CodecError> {
        let selected = self.mempool.select(self.db.config().txs_per_block);
        let fees: u64 = selected.iter().map(|(_, fee)| fee).sum();
        let timestamp = (self.clock)();

        let mut txs = Vec::with_capacity(selected.len() + 1);
        txs.push(Tx::coinbase(
            winner,
            self.db.config().mining_reward + fees,
            timestamp,
        ));
        for (hash, _) in &selected {
            let record = self.db.tx(hash).ok_or_else(|| {
                CodecError::MalformedRecord(format!("pending transaction {hash} has no record"))
            })?;
            txs.push(Tx::from_record(record)?);
        }

        let (index, prev_hash) = match self.head() {
            Some(head) => (head.index + 1, head.hash()),
            None => (0, Hash256::ZERO),
        };
        Ok(Block::new(txs, index, prev_hash, timestamp))
    }

    /// Coinbase-only candidate for a node launched as the network origin.
    pub fn create_first_block(&self, winner: &str) -> Block {
        let timestamp = (self.clock)();
        let coinbase = Tx::coinbase(winner, self.db.config().mining_reward, timestamp);
        Block::new(vec![coinbase], 0, Hash256::ZERO, timestamp)
    }

    /// The encoded puzzle a miner must solve for `block`.
    pub fn puzzle_for(&self, block: &Block) -> String {
        let config = self.db.config();
        SudokuGenerator::new(config.difficulty, block.seed())
            .with_hidden(config.hidden_squares)
            .generate_board()
            .encode()
    }

    /// Offer a fully-formed block (from the local miner or a peer).
    pub fn add_block(&mut self, block: Block) -> Result<BlockOutcome, ChainError> {
        let block_hash = block.hash();
        if self.head().is_some_and(|head| head.hash() == block_hash) {
            return Err(ChainError::DuplicateBlock);
        }

        match BlockVerifier::new(&self.db).verify(self.head(), &block) {
            Ok(()) => {
                self.commit(block);
                self.db.bump_difficulty();
                self.fork_blocks.clear();
                Ok(BlockOutcome::Accepted)
            }
            Err(BlockError::OutOfChain(kind)) => {
                let head_prev = self.head().map(|head| head.prev_hash);
                if head_prev == Some(block.prev_hash) {
                    warn!(block = %block_hash, %kind, "split brain: buffering sibling of head");
                    self.fork_blocks.insert(block_hash, block);
                    Ok(BlockOutcome::Buffered)
                } else if let Some(sibling) = self.fork_blocks.get(&block.prev_hash).cloned() {
                    info!(block = %block_hash, "buffered fork grew longer; adopting it");
                    self.rollback_block();
                    self.commit(sibling);
                    self.commit(block);
                    // Net chain growth of one block across the reorg.
                    self.db.bump_difficulty();
                    self.fork_blocks.clear();
                    Ok(BlockOutcome::Reorged)
                } else {
                    warn!(block = %block_hash, %kind, "fork beyond the two-block window");
                    Err(ChainError::DeepFork)
                }
            }
            Err(e) => Err(ChainError::Block(e)),
        }
    }

    /// Append a verified block and propagate its effects.
    fn commit(&mut self, block: Block) {
        self.rollover_block(&block);
        self.blocks.push(block);
    }

    /// Apply an accepted block to the UTXO index and reconcile the mempool.
    fn rollover_block(&mut self, block: &Block) {
        for tx in &block.txs {
            let coords: Vec<OutputRef> = tx
                .inputs()
                .iter()
                .filter_map(|input| input.output_ref())
                .collect();
            self.mempool.confirm(&tx.hash(), &coords);
        }

        self.db.set_block_index(block.index);
        for tx in &block.txs {
            self.db.insert_tx(tx);
            let tx_hash = tx.hash();
            for out in tx.outputs() {
                self.db.credit(&out.address, tx_hash, out.hash(), out.amount);
            }
            for input in tx.inputs() {
                let Some(coord) = input.output_ref() else {
                    continue;
                };
                match self.spent_output(&coord) {
                    Some((owner, out_hash, _)) => {
                        self.db.debit(&owner, coord.tx, out_hash);
                    }
                    None => warn!(%coord, "rollover: consumed output missing from index"),
                }
            }
        }

        if let Some(observer) = &mut self.observer {
            observer.on_new_block(block, &self.db);
        }
    }

    /// Undo the head block, restoring spent outputs and putting its
    /// transactions (except the coinbase, which cannot be re-mined) back
    /// into the mempool. Returns the removed block.
    pub fn rollback_block(&mut self) -> Option<Block> {
        let block = self.blocks.pop()?;
        self.db.retreat_block_index();

        // Reverse order unwinds intra-block spend chains correctly.
        for tx in block.txs.iter().rev() {
            let tx_hash = tx.hash();
            let mut removed: u64 = 0;
            for out in tx.outputs() {
                if let Some(amount) = self.db.debit(&out.address, tx_hash, out.hash()) {
                    removed += amount;
                } else {
                    warn!(%tx_hash, "rollback: created output missing from index");
                }
            }

            let mut restored: u64 = 0;
            let mut coords = Vec::new();
            for input in tx.inputs() {
                let Some(coord) = input.output_ref() else {
                    continue;
                };
                match self.spent_output(&coord) {
                    Some((owner, out_hash, amount)) => {
                        self.db.credit(&owner, coord.tx, out_hash, amount);
                        restored += amount;
                        coords.push(coord);
                    }
                    None => warn!(%coord, "rollback: spent output missing from index"),
                }
            }

            if !tx.is_coinbase() {
                let fee = restored.saturating_sub(removed);
                self.mempool.reinstate(tx_hash, fee, &coords);
            }
        }

        if let Some(observer) = &mut self.observer {
            observer.on_prev_block(&block, &self.db);
        }
        Some(block)
    }

    /// Owner, hash, and amount of the output at `coord`, if recorded.
    fn spent_output(&self, coord: &OutputRef) -> Option<(String, Hash256, u64)> {
        let out = self.db.output(&coord.tx, coord.index)?;
        let out_hash = out.hash().ok()?;
        Some((out.address.clone(), out_hash, out.amount))
    }
}
