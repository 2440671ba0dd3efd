//! Core protocol types: inputs, outputs, transactions, blocks.
//!
//! All monetary values are grains (1 SDK = 10^7 grains) held in `u64`.
//! Hashes are 32-byte values internally; their 64-char lowercase hex form is
//! the wire and hash-preimage representation. The hash preimages defined here
//! are consensus-critical: every node must format them identically.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::COINBASE_MARKER;
use crate::error::{CodecError, TxError};
use crate::hashing::{dsha256, merkle_root, sha256_hex};
use crate::keys::PrivateKey;

/// A 32-byte protocol hash, rendered as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash. Used as the genesis block's `prev_hash`.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({self})")
    }
}

impl FromStr for Hash256 {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CodecError::InvalidHash(s.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidHash(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What a transaction input spends: a previous transaction's output, or the
/// coinbase marker minting the block reward.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrevTx {
    Coinbase,
    Tx(Hash256),
}

impl PrevTx {
    pub fn is_coinbase(&self) -> bool {
        matches!(self, PrevTx::Coinbase)
    }
}

impl fmt::Display for PrevTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrevTx::Coinbase => f.write_str(COINBASE_MARKER),
            PrevTx::Tx(hash) => write!(f, "{hash}"),
        }
    }
}

impl FromStr for PrevTx {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == COINBASE_MARKER {
            Ok(PrevTx::Coinbase)
        } else {
            Ok(PrevTx::Tx(s.parse()?))
        }
    }
}

/// Coordinates of a spendable output: `(transaction hash, output index)`.
///
/// The mempool reserves these to reject double-spends among pending
/// transactions before confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub tx: Hash256,
    pub index: u32,
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx, self.index)
    }
}

/// A transaction input, consuming one previous output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    /// The transaction whose output is spent, or the coinbase marker.
    pub prev_tx: PrevTx,
    /// Index of the consumed output within that transaction.
    pub output_index: u32,
    /// Base64 SEC1 public key of the spender.
    pub address: String,
    /// Kept for wire compatibility; always zero in practice.
    pub index: u32,
    /// Base64 of the raw 64-byte ECDSA signature. Empty until signed;
    /// coinbase inputs stay unsigned (their signature is never checked).
    pub signature: String,
}

impl Input {
    pub fn new(prev_tx: PrevTx, output_index: u32, address: impl Into<String>, index: u32) -> Self {
        Self {
            prev_tx,
            output_index,
            address: address.into(),
            index,
            signature: String::new(),
        }
    }

    /// The string an input signature covers.
    pub fn signing_preimage(&self) -> String {
        format!(
            "{}{}{}{}",
            self.prev_tx, self.output_index, self.address, self.index
        )
    }

    /// Sign the input in place with the spender's key.
    pub fn sign(&mut self, key: &PrivateKey) {
        let signature = key.sign(self.signing_preimage().as_bytes());
        self.signature = crate::keys::encode_signature(&signature);
    }

    /// The coordinates this input consumes; `None` for coinbase.
    pub fn output_ref(&self) -> Option<OutputRef> {
        match self.prev_tx {
            PrevTx::Coinbase => None,
            PrevTx::Tx(tx) => Some(OutputRef {
                tx,
                index: self.output_index,
            }),
        }
    }

    /// The input hash. Requires a signature unless the input is coinbase.
    pub fn hash(&self) -> Result<Hash256, TxError> {
        if self.signature.is_empty() && !self.prev_tx.is_coinbase() {
            return Err(TxError::UnsignedInput {
                index: self.index as usize,
            });
        }
        Ok(dsha256(&format!(
            "{}{}{}{}{}",
            self.prev_tx, self.output_index, self.address, self.signature, self.index
        )))
    }
}

/// A transaction output, creating one spendable coin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    /// Base64 SEC1 public key of the recipient.
    pub address: String,
    /// Value in grains.
    pub amount: u64,
    /// Kept for wire compatibility; always zero in practice.
    pub index: u32,
    /// Digest of the enclosing transaction's inputs and timestamp,
    /// back-filled by [`Tx::new`]. Makes otherwise-identical coinbase
    /// outputs hash differently across blocks.
    pub input_hash: String,
}

impl Output {
    pub fn new(address: impl Into<String>, amount: u64, index: u32) -> Self {
        Self {
            address: address.into(),
            amount,
            index,
            input_hash: String::new(),
        }
    }

    /// The output hash. Meaningful once `input_hash` has been back-filled.
    pub fn hash(&self) -> Hash256 {
        dsha256(&format!(
            "{}{}{}{}",
            self.amount, self.index, self.address, self.input_hash
        ))
    }
}

/// A transaction: ordered inputs and outputs plus a unix timestamp.
///
/// Construction finalizes the transaction: the outputs' `input_hash` is
/// back-filled and the transaction hash computed once. Mutating a `Tx`
/// afterwards is not possible through the public API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    timestamp: u64,
    hash: Hash256,
}

impl Tx {
    /// Finalize a transaction. All non-coinbase inputs must be signed.
    pub fn new(inputs: Vec<Input>, mut outputs: Vec<Output>, timestamp: u64) -> Result<Self, TxError> {
        let records: Vec<crate::records::InputRecord> = inputs
            .iter()
            .map(|input| input.to_record())
            .collect::<Result<_, _>>()?;
        let serialized =
            serde_json::to_string(&records).map_err(|e| TxError::Malformed(e.to_string()))?;
        let input_hash = sha256_hex(&format!("{serialized}{timestamp}"));
        for output in &mut outputs {
            output.input_hash = input_hash.clone();
        }

        let mut preimage = String::new();
        for input in &inputs {
            preimage.push_str(&input.hash()?.to_string());
        }
        for output in &outputs {
            preimage.push_str(&format!(
                "{}{}{}",
                output.amount, output.address, output.index
            ));
        }
        preimage.push_str(&timestamp.to_string());
        let hash = dsha256(&preimage);

        Ok(Self {
            inputs,
            outputs,
            timestamp,
            hash,
        })
    }

    /// Build a coinbase transaction minting `amount` grains to `address`.
    pub fn coinbase(address: &str, amount: u64, timestamp: u64) -> Self {
        let input = Input::new(PrevTx::Coinbase, 0, address, 0);
        let output = Output::new(address, amount, 0);
        Self::new(vec![input], vec![output], timestamp)
            .expect("coinbase inputs need no signature")
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    /// Whether the first input mints the block reward.
    pub fn is_coinbase(&self) -> bool {
        self.inputs
            .first()
            .is_some_and(|input| input.prev_tx.is_coinbase())
    }

    /// Sum of output values; `None` on overflow.
    pub fn total_output(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.amount))
    }
}

/// A block: linked, timestamped, puzzle-gated batch of transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub index: u64,
    pub prev_hash: Hash256,
    pub txs: Vec<Tx>,
    pub timestamp: u64,
    /// Base64 board encoding, or [`Block::UNSOLVED`] for a candidate.
    pub puzzle_solution: String,
    merkle_root: Hash256,
}

impl Block {
    /// `puzzle_solution` placeholder of a candidate block not yet mined.
    pub const UNSOLVED: &'static str = "0";

    /// Assemble a block; the merkle root over the transaction hashes is
    /// computed once here and cached.
    pub fn new(txs: Vec<Tx>, index: u64, prev_hash: Hash256, timestamp: u64) -> Self {
        let hashes: Vec<Hash256> = txs.iter().map(Tx::hash).collect();
        Self {
            index,
            prev_hash,
            txs,
            timestamp,
            puzzle_solution: Self::UNSOLVED.to_string(),
            merkle_root: merkle_root(&hashes),
        }
    }

    pub fn merkle_root(&self) -> Hash256 {
        self.merkle_root
    }

    /// Attach a puzzle solution (base64 board encoding).
    pub fn set_solution(&mut self, solution: impl Into<String>) {
        self.puzzle_solution = solution.into();
    }

    /// The block hash, covering the solution.
    pub fn hash(&self) -> Hash256 {
        dsha256(&format!(
            "{}{}{}{}{}",
            self.merkle_root, self.prev_hash, self.index, self.puzzle_solution, self.timestamp
        ))
    }

    /// The puzzle seed. Excludes the solution so miners can derive the
    /// puzzle before solving it.
    pub fn seed(&self) -> String {
        sha256_hex(&format!(
            "{}{}{}{}",
            self.merkle_root, self.prev_hash, self.index, self.timestamp
        ))
    }

    /// The coinbase transaction, if the block carries one first.
    pub fn coinbase(&self) -> Option<&Tx> {
        self.txs.first().filter(|tx| tx.is_coinbase())
    }

    /// Address credited by the coinbase, if any.
    pub fn winning_address(&self) -> Option<&str> {
        self.coinbase()
            .and_then(|tx| tx.outputs().first())
            .map(|out| out.address.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COIN;

    fn keypair() -> PrivateKey {
        PrivateKey::from_scalar_u64(7).unwrap()
    }

    fn signed_input(key: &PrivateKey) -> Input {
        let mut input = Input::new(PrevTx::Tx(dsha256("prev")), 0, key.public_key_b64(), 0);
        input.sign(key);
        input
    }

    // --- Hash256 ---

    #[test]
    fn hash256_display_is_lowercase_hex() {
        let h = Hash256([0xAB; 32]);
        let s = h.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.starts_with("abab"));
    }

    #[test]
    fn hash256_round_trips_through_str() {
        let h = dsha256("x");
        assert_eq!(h.to_string().parse::<Hash256>().unwrap(), h);
    }

    #[test]
    fn hash256_rejects_bad_hex() {
        assert!("zz".parse::<Hash256>().is_err());
        assert!("abcd".parse::<Hash256>().is_err()); // wrong length
    }

    #[test]
    fn zero_hash() {
        assert!(Hash256::ZERO.is_zero());
        assert!(!dsha256("x").is_zero());
    }

    // --- PrevTx ---

    #[test]
    fn prev_tx_coinbase_round_trip() {
        assert_eq!("COINBASE".parse::<PrevTx>().unwrap(), PrevTx::Coinbase);
        assert_eq!(PrevTx::Coinbase.to_string(), "COINBASE");
    }

    #[test]
    fn prev_tx_hash_round_trip() {
        let h = dsha256("tx");
        let parsed: PrevTx = h.to_string().parse().unwrap();
        assert_eq!(parsed, PrevTx::Tx(h));
    }

    // --- Input ---

    #[test]
    fn unsigned_regular_input_has_no_hash() {
        let input = Input::new(PrevTx::Tx(dsha256("prev")), 0, "addr", 0);
        assert!(input.hash().is_err());
    }

    #[test]
    fn unsigned_coinbase_input_hashes() {
        let input = Input::new(PrevTx::Coinbase, 0, "addr", 0);
        assert!(input.hash().is_ok());
    }

    #[test]
    fn signing_makes_hash_available() {
        let key = keypair();
        let input = signed_input(&key);
        assert!(!input.signature.is_empty());
        assert!(input.hash().is_ok());
    }

    #[test]
    fn output_ref_none_for_coinbase() {
        assert!(Input::new(PrevTx::Coinbase, 0, "a", 0).output_ref().is_none());
        let h = dsha256("prev");
        assert_eq!(
            Input::new(PrevTx::Tx(h), 3, "a", 0).output_ref(),
            Some(OutputRef { tx: h, index: 3 }),
        );
    }

    // --- Output ---

    #[test]
    fn output_hash_depends_on_input_hash() {
        let mut a = Output::new("addr", 5 * COIN, 0);
        let mut b = a.clone();
        a.input_hash = "one".into();
        b.input_hash = "two".into();
        assert_ne!(a.hash(), b.hash());
    }

    // --- Tx ---

    #[test]
    fn tx_backfills_output_input_hash() {
        let tx = Tx::coinbase("miner", 15 * COIN, 1_700_000_000);
        assert!(!tx.outputs()[0].input_hash.is_empty());
    }

    #[test]
    fn coinbase_outputs_differ_across_timestamps() {
        let a = Tx::coinbase("miner", 15 * COIN, 1_700_000_000);
        let b = Tx::coinbase("miner", 15 * COIN, 1_700_000_060);
        assert_ne!(a.outputs()[0].hash(), b.outputs()[0].hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn tx_hash_deterministic() {
        let key = keypair();
        let make = || {
            Tx::new(
                vec![signed_input(&key)],
                vec![Output::new("bob", COIN, 0)],
                1_700_000_000,
            )
            .unwrap()
        };
        assert_eq!(make().hash(), make().hash());
    }

    #[test]
    fn tx_requires_signed_inputs() {
        let input = Input::new(PrevTx::Tx(dsha256("prev")), 0, "addr", 0);
        let err = Tx::new(vec![input], vec![Output::new("bob", COIN, 0)], 0).unwrap_err();
        assert!(matches!(err, TxError::UnsignedInput { .. }));
    }

    #[test]
    fn coinbase_detection() {
        let key = keypair();
        assert!(Tx::coinbase("miner", COIN, 0).is_coinbase());
        let regular = Tx::new(
            vec![signed_input(&key)],
            vec![Output::new("bob", COIN, 0)],
            0,
        )
        .unwrap();
        assert!(!regular.is_coinbase());
    }

    #[test]
    fn total_output_overflow_is_none() {
        let tx = Tx::new(
            vec![Input::new(PrevTx::Coinbase, 0, "a", 0)],
            vec![Output::new("a", u64::MAX, 0), Output::new("a", 1, 1)],
            0,
        )
        .unwrap();
        assert_eq!(tx.total_output(), None);
    }

    // --- Block ---

    fn sample_block(timestamp: u64) -> Block {
        let coinbase = Tx::coinbase("miner", 15 * COIN, timestamp);
        Block::new(vec![coinbase], 0, Hash256::ZERO, timestamp)
    }

    #[test]
    fn single_tx_merkle_root_is_tx_hash() {
        let block = sample_block(1_700_000_000);
        assert_eq!(block.merkle_root(), block.txs[0].hash());
    }

    #[test]
    fn seed_independent_of_solution() {
        let mut block = sample_block(1_700_000_000);
        let seed = block.seed();
        block.set_solution("c29sdmVk");
        assert_eq!(block.seed(), seed);
    }

    #[test]
    fn hash_covers_solution() {
        let mut block = sample_block(1_700_000_000);
        let unsolved = block.hash();
        block.set_solution("c29sdmVk");
        assert_ne!(block.hash(), unsolved);
    }

    #[test]
    fn winning_address_from_coinbase() {
        let block = sample_block(1_700_000_000);
        assert_eq!(block.winning_address(), Some("miner"));
    }

    #[test]
    fn winning_address_none_without_coinbase() {
        let key = keypair();
        let tx = Tx::new(
            vec![signed_input(&key)],
            vec![Output::new("bob", COIN, 0)],
            0,
        )
        .unwrap();
        let block = Block::new(vec![tx], 0, Hash256::ZERO, 0);
        assert_eq!(block.winning_address(), None);
    }
}
