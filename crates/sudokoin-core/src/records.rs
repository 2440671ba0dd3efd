//! Wire records: the JSON shapes entities travel as between nodes.
//!
//! Records carry redundant `hash` fields for observability; ingestion always
//! recomputes them (and the block merkle root) from the underlying fields,
//! so a peer cannot smuggle in a mismatched digest.
//!
//! The serialized field order of [`InputRecord`] is consensus-critical: the
//! transaction `input_hash` digests the JSON text of the input list.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, TxError};
use crate::types::{Block, Hash256, Input, Output, PrevTx, Tx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub prev_tx_hash: String,
    pub output_index: u32,
    pub address: String,
    pub index: u32,
    #[serde(default)]
    pub hash: String,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub amount: u64,
    pub address: String,
    pub index: u32,
    #[serde(default)]
    pub input_hash: String,
    #[serde(default)]
    pub hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub inputs: Vec<InputRecord>,
    pub outputs: Vec<OutputRecord>,
    pub timestamp: u64,
    #[serde(default)]
    pub hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: u64,
    pub timestamp: u64,
    pub prev_hash: String,
    #[serde(default)]
    pub hash: String,
    pub txs: Vec<TxRecord>,
    pub puzzle_solution: String,
    #[serde(default)]
    pub merkle_root: String,
}

impl Input {
    /// Wire form of the input. Fails for an unsigned non-coinbase input,
    /// which has no hash yet.
    pub fn to_record(&self) -> Result<InputRecord, TxError> {
        Ok(InputRecord {
            prev_tx_hash: self.prev_tx.to_string(),
            output_index: self.output_index,
            address: self.address.clone(),
            index: self.index,
            hash: self.hash()?.to_string(),
            signature: self.signature.clone(),
        })
    }
}

impl InputRecord {
    pub fn to_input(&self) -> Result<Input, CodecError> {
        let prev_tx: PrevTx = self.prev_tx_hash.parse()?;
        let mut input = Input::new(prev_tx, self.output_index, self.address.clone(), self.index);
        input.signature = self.signature.clone();
        Ok(input)
    }
}

impl Output {
    pub fn to_record(&self) -> OutputRecord {
        OutputRecord {
            amount: self.amount,
            address: self.address.clone(),
            index: self.index,
            input_hash: self.input_hash.clone(),
            hash: self.hash().to_string(),
        }
    }
}

impl OutputRecord {
    pub fn to_output(&self) -> Output {
        let mut output = Output::new(self.address.clone(), self.amount, self.index);
        output.input_hash = self.input_hash.clone();
        output
    }

    /// Parsed output hash from the stored record.
    pub fn hash(&self) -> Result<Hash256, CodecError> {
        self.hash.parse()
    }
}

impl Tx {
    pub fn to_record(&self) -> TxRecord {
        TxRecord {
            inputs: self
                .inputs()
                .iter()
                .map(|input| input.to_record())
                .collect::<Result<_, _>>()
                .expect("inputs were signed at construction"),
            outputs: self.outputs().iter().map(Output::to_record).collect(),
            timestamp: self.timestamp(),
            hash: self.hash().to_string(),
        }
    }

    /// Rebuild a transaction from its wire form, recomputing every hash.
    pub fn from_record(record: &TxRecord) -> Result<Tx, CodecError> {
        let inputs: Vec<Input> = record
            .inputs
            .iter()
            .map(InputRecord::to_input)
            .collect::<Result<_, _>>()?;
        let outputs: Vec<Output> = record.outputs.iter().map(OutputRecord::to_output).collect();
        Tx::new(inputs, outputs, record.timestamp)
            .map_err(|e| CodecError::MalformedRecord(e.to_string()))
    }
}

impl Block {
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            index: self.index,
            timestamp: self.timestamp,
            prev_hash: self.prev_hash.to_string(),
            hash: self.hash().to_string(),
            txs: self.txs.iter().map(Tx::to_record).collect(),
            puzzle_solution: self.puzzle_solution.clone(),
            merkle_root: self.merkle_root().to_string(),
        }
    }

    /// Rebuild a block from its wire form. The merkle root is recomputed
    /// from the transactions; the record's own claim is ignored.
    pub fn from_record(record: &BlockRecord) -> Result<Block, CodecError> {
        let txs: Vec<Tx> = record
            .txs
            .iter()
            .map(Tx::from_record)
            .collect::<Result<_, _>>()?;
        let prev_hash: Hash256 = record.prev_hash.parse()?;
        let mut block = Block::new(txs, record.index, prev_hash, record.timestamp);
        block.set_solution(record.puzzle_solution.clone());
        Ok(block)
    }
}
