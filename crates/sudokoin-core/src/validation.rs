//! Transaction verification against a UTXO index snapshot.
//!
//! Stateless given the index: the verifier reads the transaction lookup
//! table and the unspent sets but never mutates them. The returned fee is
//! `total_in - total_out`; the caller decides what to do with it (mempool
//! admission, block reward accounting).

use crate::error::TxError;
use crate::keys::{self, decode_pubkey_b64, decode_signature};
use crate::types::{Hash256, Input, Output, PrevTx};
use crate::utxo::UtxoIndex;

pub struct TxVerifier<'a> {
    db: &'a UtxoIndex,
}

impl<'a> TxVerifier<'a> {
    pub fn new(db: &'a UtxoIndex) -> Self {
        Self { db }
    }

    /// Verify a transaction's inputs and outputs, returning the fee.
    ///
    /// The first input may be a coinbase marker, which credits the mining
    /// reward and skips the remaining checks. Every other input must resolve
    /// to a recorded output that is still unspent, owned by the input's
    /// public key, and covered by a valid signature over
    /// `prev_tx ‖ output_index ‖ address ‖ index`.
    pub fn verify(&self, inputs: &[Input], outputs: &[Output]) -> Result<u64, TxError> {
        let mut total_in: u64 = 0;

        for (i, input) in inputs.iter().enumerate() {
            if i == 0 && input.prev_tx.is_coinbase() {
                total_in = self.db.config().mining_reward;
                continue;
            }

            // A coinbase marker past position zero resolves to nothing.
            let PrevTx::Tx(prev_hash) = input.prev_tx else {
                return Err(TxError::OutputNotFound {
                    tx: input.prev_tx.to_string(),
                    index: input.output_index,
                });
            };

            let out = self.db.output(&prev_hash, input.output_index).ok_or(
                TxError::OutputNotFound {
                    tx: prev_hash.to_string(),
                    index: input.output_index,
                },
            )?;
            let out_hash: Hash256 = out
                .hash()
                .map_err(|e| TxError::Malformed(e.to_string()))?;

            if !self.db.is_unspent(&out.address, prev_hash, out_hash) {
                return Err(TxError::DoubleSpend(format!(
                    "{prev_hash}:{}",
                    input.output_index
                )));
            }

            // The signing key must be the output's owner; addresses are the
            // base64 public keys, so equality is the ownership check.
            if input.address != out.address {
                return Err(TxError::BadSignature { index: i });
            }
            let signature =
                decode_signature(&input.signature).map_err(|_| TxError::BadSignature { index: i })?;
            let pubkey =
                decode_pubkey_b64(&input.address).map_err(|_| TxError::BadSignature { index: i })?;
            if !keys::verify(input.signing_preimage().as_bytes(), &signature, &pubkey) {
                return Err(TxError::BadSignature { index: i });
            }

            total_in = total_in
                .checked_add(out.amount)
                .ok_or(TxError::ValueOverflow)?;
        }

        let mut total_out: u64 = 0;
        for output in outputs {
            total_out = total_out
                .checked_add(output.amount)
                .ok_or(TxError::ValueOverflow)?;
        }

        if total_in < total_out {
            return Err(TxError::InsufficientFunds {
                total_in,
                total_out,
            });
        }
        Ok(total_in - total_out)
    }
}
