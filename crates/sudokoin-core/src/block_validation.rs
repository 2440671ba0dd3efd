//! Block verification: puzzle, transactions, reward, linkage.
//!
//! Checks run in a fixed order; the first three failures
//! ([`BlockError::InvalidPuzzle`], per-transaction errors,
//! [`BlockError::BadReward`]) are terminal rejections, while a linkage
//! failure ([`BlockError::OutOfChain`]) is recoverable and routes the block
//! into the chain's fork handling.

use sudokoin_puzzle::{SudokuBoard, SudokuGenerator};

use crate::error::{BlockError, OutOfChainKind, TxError};
use crate::types::Block;
use crate::utxo::UtxoIndex;
use crate::validation::TxVerifier;

pub struct BlockVerifier<'a> {
    db: &'a UtxoIndex,
}

impl<'a> BlockVerifier<'a> {
    pub fn new(db: &'a UtxoIndex) -> Self {
        Self { db }
    }

    /// Puzzle difficulty a block at `index` was mined against.
    ///
    /// The config's difficulty is the one for the *next* block and advances
    /// by one per accepted block, so a block at height h was mined at
    /// `difficulty - (next_height - h)`. A fork sibling of the head (one
    /// height back) must be checked against the head's own difficulty or its
    /// valid solution would be misjudged against a larger board.
    fn difficulty_for(&self, head: Option<&Block>, index: u64) -> u64 {
        let next_index = head.map_or(0, |h| h.index + 1);
        let current = self.db.config().difficulty;
        if index <= next_index {
            current.saturating_sub(next_index - index).max(1)
        } else {
            current + (index - next_index)
        }
    }

    /// Verify `block` against the current index state and `head`.
    pub fn verify(&self, head: Option<&Block>, block: &Block) -> Result<(), BlockError> {
        let config = self.db.config();

        // Puzzle: regenerate the deterministic board for the block's seed and
        // check the submitted solution against it.
        let puzzle = SudokuGenerator::new(self.difficulty_for(head, block.index), block.seed())
            .with_hidden(config.hidden_squares)
            .generate_board();
        let solution = SudokuBoard::decode(&block.puzzle_solution)
            .map_err(|_| BlockError::InvalidPuzzle)?;
        if !puzzle.is_valid_solution(&solution) {
            return Err(BlockError::InvalidPuzzle);
        }

        let Some(coinbase) = block.coinbase() else {
            return Err(BlockError::NoCoinbase);
        };

        // Every non-coinbase transaction must verify; its fee accrues to the
        // block reward.
        let verifier = TxVerifier::new(self.db);
        let mut total_block_reward = config.mining_reward;
        for (index, tx) in block.txs.iter().enumerate().skip(1) {
            let fee = verifier
                .verify(tx.inputs(), tx.outputs())
                .map_err(|source| BlockError::Tx { index, source })?;
            total_block_reward =
                total_block_reward
                    .checked_add(fee)
                    .ok_or(BlockError::Tx {
                        index,
                        source: TxError::ValueOverflow,
                    })?;
        }

        let total_reward_out = coinbase.total_output().ok_or(BlockError::BadReward {
            got: u64::MAX,
            expected: total_block_reward,
        })?;
        if total_reward_out != total_block_reward {
            return Err(BlockError::BadReward {
                got: total_reward_out,
                expected: total_block_reward,
            });
        }

        if let Some(head) = head {
            if head.index >= block.index {
                return Err(BlockError::OutOfChain(OutOfChainKind::WrongIndex));
            }
            if head.hash() != block.prev_hash {
                return Err(BlockError::OutOfChain(OutOfChainKind::WrongPrev));
            }
            if head.timestamp > block.timestamp {
                return Err(BlockError::OutOfChain(OutOfChainKind::BlockFromPast));
            }
        }
        Ok(())
    }
}
