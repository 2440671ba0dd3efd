//! Wallet spend builder: greedy UTXO gathering with change back to the
//! sender.
//!
//! Outputs already reserved by pending mempool transactions are skipped, so
//! two payments built back-to-back never race over the same coin.

use thiserror::Error;

use sudokoin_core::chain::Chain;
use sudokoin_core::error::TxError;
use sudokoin_core::keys::{PrivateKey, decode_pubkey_b64};
use sudokoin_core::types::{Input, Output, OutputRef, PrevTx, Tx};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient spendable funds: have {available}, need {needed}")]
    InsufficientFunds { available: u64, needed: u64 },
    #[error("recipient is not a valid public key")]
    BadRecipient,
    #[error(transparent)]
    Tx(#[from] TxError),
}

/// Build and sign a payment of `amount` grains (plus `fee`) from `key` to
/// the base64 public key `to`.
pub fn build_payment(
    chain: &Chain,
    key: &PrivateKey,
    to: &str,
    amount: u64,
    fee: u64,
    timestamp: u64,
) -> Result<Tx, WalletError> {
    decode_pubkey_b64(to).map_err(|_| WalletError::BadRecipient)?;
    let from = key.public_key_b64();
    let needed = amount
        .checked_add(fee)
        .ok_or(WalletError::Tx(TxError::ValueOverflow))?;

    let mut gathered: u64 = 0;
    let mut inputs = Vec::new();
    for entry in chain.db().unspent(&from) {
        if gathered >= needed {
            break;
        }
        let coord = OutputRef {
            tx: entry.tx,
            index: entry.output_index,
        };
        if chain.mempool().is_reserved(&coord) {
            continue;
        }
        let mut input = Input::new(PrevTx::Tx(entry.tx), entry.output_index, &from, 0);
        input.sign(key);
        inputs.push(input);
        gathered += entry.amount;
    }

    if gathered < needed {
        return Err(WalletError::InsufficientFunds {
            available: gathered,
            needed,
        });
    }

    let mut outputs = vec![Output::new(to, amount, 0)];
    let change = gathered - needed;
    if change > 0 {
        outputs.push(Output::new(&from, change, 1));
    }
    Ok(Tx::new(inputs, outputs, timestamp)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sudokoin_core::constants::COIN;
    use sudokoin_core::utxo::ChainConfig;

    fn alice() -> PrivateKey {
        PrivateKey::from_scalar_u64(1).unwrap()
    }

    fn bob() -> PrivateKey {
        PrivateKey::from_scalar_u64(2).unwrap()
    }

    /// Chain with `blocks` coinbase-only blocks mined to alice.
    fn funded_chain(blocks: usize) -> Chain {
        let mut chain = Chain::with_clock(ChainConfig::default(), {
            let t = std::sync::atomic::AtomicU64::new(1_700_000_000);
            move || t.fetch_add(10, std::sync::atomic::Ordering::Relaxed)
        });
        for _ in 0..blocks {
            let mut block = chain.force_block(&alice().public_key_b64()).unwrap();
            let solution = chain.puzzle_for(&block);
            block.set_solution(solution);
            chain.add_block(block).unwrap();
        }
        chain
    }

    #[test]
    fn payment_with_change() {
        let chain = funded_chain(1);
        let reward = chain.db().config().mining_reward;
        let tx = build_payment(&chain, &alice(), &bob().public_key_b64(), COIN, 2, 1_700_000_500)
            .unwrap();
        assert_eq!(tx.outputs().len(), 2);
        assert_eq!(tx.outputs()[0].amount, COIN);
        assert_eq!(tx.outputs()[0].address, bob().public_key_b64());
        assert_eq!(tx.outputs()[1].amount, reward - COIN - 2);
        assert_eq!(tx.outputs()[1].address, alice().public_key_b64());
    }

    #[test]
    fn exact_spend_has_no_change() {
        let chain = funded_chain(1);
        let reward = chain.db().config().mining_reward;
        let tx = build_payment(
            &chain,
            &alice(),
            &bob().public_key_b64(),
            reward - 1,
            1,
            1_700_000_500,
        )
        .unwrap();
        assert_eq!(tx.outputs().len(), 1);
    }

    #[test]
    fn gathers_multiple_outputs() {
        let chain = funded_chain(3);
        let reward = chain.db().config().mining_reward;
        let tx = build_payment(
            &chain,
            &alice(),
            &bob().public_key_b64(),
            2 * reward,
            0,
            1_700_000_500,
        )
        .unwrap();
        assert_eq!(tx.inputs().len(), 2);
    }

    #[test]
    fn insufficient_funds_reported() {
        let chain = funded_chain(1);
        let reward = chain.db().config().mining_reward;
        let err = build_payment(
            &chain,
            &alice(),
            &bob().public_key_b64(),
            reward + 1,
            0,
            1_700_000_500,
        )
        .unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                available: reward,
                needed: reward + 1,
            },
        );
    }

    #[test]
    fn bad_recipient_rejected() {
        let chain = funded_chain(1);
        let err =
            build_payment(&chain, &alice(), "not-a-key", COIN, 0, 1_700_000_500).unwrap_err();
        assert_eq!(err, WalletError::BadRecipient);
    }

    #[test]
    fn built_payment_is_admissible() {
        let mut chain = funded_chain(1);
        let tx = build_payment(&chain, &alice(), &bob().public_key_b64(), COIN, 5, 1_700_000_500)
            .unwrap();
        assert_eq!(chain.add_tx(tx), Ok(5));
    }
}
