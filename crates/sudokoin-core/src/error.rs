//! Error types for the Sudokoin protocol.
use thiserror::Error;

use sudokoin_puzzle::PuzzleError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid hash: {0}")] InvalidHash(String),
    #[error("invalid base64: {0}")] InvalidBase64(String),
    #[error("malformed record: {0}")] MalformedRecord(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("point is not on the curve")] PointNotOnCurve,
    #[error("invalid public key encoding")] InvalidPublicKey,
    #[error("invalid signature encoding")] InvalidSignature,
    #[error("zero private scalar")] ZeroScalar,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("transaction output not found: {tx}:{index}")] OutputNotFound { tx: String, index: u32 },
    #[error("output already spent: {0}")] DoubleSpend(String),
    #[error("bad signature on input {index}")] BadSignature { index: usize },
    #[error("insufficient funds: in {total_in}, out {total_out}")] InsufficientFunds { total_in: u64, total_out: u64 },
    #[error("value overflow")] ValueOverflow,
    #[error("unsigned non-coinbase input {index}")] UnsignedInput { index: usize },
    #[error("malformed transaction: {0}")] Malformed(String),
}

/// Why a block does not extend the current head. Recoverable: the chain
/// routes these into fork resolution instead of rejecting outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfChainKind {
    WrongIndex,
    WrongPrev,
    BlockFromPast,
}

impl std::fmt::Display for OutOfChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            OutOfChainKind::WrongIndex => "block index does not advance the head",
            OutOfChainKind::WrongPrev => "block does not point at the head",
            OutOfChainKind::BlockFromPast => "block timestamp precedes the head",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid puzzle solution")] InvalidPuzzle,
    #[error("wrong reward sum: got {got}, expected {expected}")] BadReward { got: u64, expected: u64 },
    #[error("first transaction is not a coinbase")] NoCoinbase,
    #[error("transaction {index} invalid: {source}")] Tx { index: usize, source: TxError },
    #[error("block out of chain: {0}")] OutOfChain(OutOfChainKind),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already known: {0}")] Duplicate(String),
    #[error("input already reserved by a pending transaction: {0}")] ReservedUtxo(String),
    #[error(transparent)] Tx(#[from] TxError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("duplicate block")] DuplicateBlock,
    #[error("fork diverges deeper than two blocks")] DeepFork,
    #[error(transparent)] Block(#[from] BlockError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SudokoinError {
    #[error(transparent)] Codec(#[from] CodecError),
    #[error(transparent)] Key(#[from] KeyError),
    #[error(transparent)] Tx(#[from] TxError),
    #[error(transparent)] Block(#[from] BlockError),
    #[error(transparent)] Mempool(#[from] MempoolError),
    #[error(transparent)] Chain(#[from] ChainError),
    #[error(transparent)] Puzzle(#[from] PuzzleError),
}
