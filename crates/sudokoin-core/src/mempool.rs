//! Pool of unconfirmed transactions awaiting inclusion in a block.
//!
//! The pool stores each pending transaction's fee and indexes the UTXO
//! coordinates its inputs consume, so a second pending transaction spending
//! the same output is rejected before either confirms. When a block
//! confirms a spend, any pool transaction claiming one of the same
//! coordinates is evicted — it can never confirm and would otherwise poison
//! future block candidates. Transaction bodies live in the shared
//! [`UtxoIndex`](crate::utxo::UtxoIndex) lookup table; the pool holds only
//! hashes and coordinates.
//!
//! Selection order is deterministic: fee descending, transaction hash
//! ascending on ties.

use std::collections::HashMap;

use crate::error::MempoolError;
use crate::types::{Hash256, OutputRef};

#[derive(Default)]
pub struct Mempool {
    /// Pending transaction hash → fee in grains.
    pending: HashMap<Hash256, u64>,
    /// Reserved coordinate → the pending transaction claiming it.
    by_coord: HashMap<OutputRef, Hash256>,
    /// Pending transaction hash → the coordinates it reserved.
    coords_by_tx: HashMap<Hash256, Vec<OutputRef>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tx_hash: &Hash256) -> bool {
        self.pending.contains_key(tx_hash)
    }

    pub fn fee(&self, tx_hash: &Hash256) -> Option<u64> {
        self.pending.get(tx_hash).copied()
    }

    pub fn is_reserved(&self, coord: &OutputRef) -> bool {
        self.by_coord.contains_key(coord)
    }

    /// Admit a verified transaction, reserving its input coordinates.
    ///
    /// Fails on a duplicate hash or when any coordinate is already claimed
    /// by another pending transaction (a mempool-level double spend).
    pub fn insert(
        &mut self,
        tx_hash: Hash256,
        fee: u64,
        coords: &[OutputRef],
    ) -> Result<(), MempoolError> {
        if self.pending.contains_key(&tx_hash) {
            return Err(MempoolError::Duplicate(tx_hash.to_string()));
        }
        for coord in coords {
            if self.by_coord.contains_key(coord) {
                return Err(MempoolError::ReservedUtxo(coord.to_string()));
            }
        }
        self.store(tx_hash, fee, coords);
        Ok(())
    }

    /// Reconcile the pool with a spend confirmed by a block: drop the
    /// transaction itself and evict any pool entry claiming one of the now
    /// consumed coordinates.
    pub fn confirm(&mut self, tx_hash: &Hash256, coords: &[OutputRef]) {
        self.remove_entry(tx_hash);
        for coord in coords {
            if let Some(conflicting) = self.by_coord.get(coord).copied() {
                self.remove_entry(&conflicting);
            }
        }
    }

    /// Put a rolled-back transaction back into the pool, restoring its
    /// reservations. No conflict check: the rollback re-establishes the
    /// pre-block ground truth.
    pub fn reinstate(&mut self, tx_hash: Hash256, fee: u64, coords: &[OutputRef]) {
        self.store(tx_hash, fee, coords);
    }

    /// Pick up to `limit` transactions: fee descending, hash ascending.
    pub fn select(&self, limit: usize) -> Vec<(Hash256, u64)> {
        let mut entries: Vec<(Hash256, u64)> =
            self.pending.iter().map(|(&hash, &fee)| (hash, fee)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn store(&mut self, tx_hash: Hash256, fee: u64, coords: &[OutputRef]) {
        for coord in coords {
            self.by_coord.insert(*coord, tx_hash);
        }
        self.coords_by_tx.insert(tx_hash, coords.to_vec());
        self.pending.insert(tx_hash, fee);
    }

    /// Drop one entry and its reservations from every index.
    fn remove_entry(&mut self, tx_hash: &Hash256) {
        self.pending.remove(tx_hash);
        if let Some(coords) = self.coords_by_tx.remove(tx_hash) {
            for coord in coords {
                if self.by_coord.get(&coord) == Some(tx_hash) {
                    self.by_coord.remove(&coord);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::dsha256;

    fn coord(tag: &str, index: u32) -> OutputRef {
        OutputRef {
            tx: dsha256(tag),
            index,
        }
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = Mempool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn insert_and_lookup() {
        let mut pool = Mempool::new();
        let hash = dsha256("tx");
        pool.insert(hash, 5, &[coord("prev", 0)]).unwrap();
        assert!(pool.contains(&hash));
        assert_eq!(pool.fee(&hash), Some(5));
        assert!(pool.is_reserved(&coord("prev", 0)));
        assert!(!pool.is_reserved(&coord("prev", 1)));
    }

    #[test]
    fn duplicate_rejected() {
        let mut pool = Mempool::new();
        let hash = dsha256("tx");
        pool.insert(hash, 5, &[]).unwrap();
        assert_eq!(
            pool.insert(hash, 5, &[]),
            Err(MempoolError::Duplicate(hash.to_string())),
        );
    }

    #[test]
    fn reserved_coordinate_rejected() {
        let mut pool = Mempool::new();
        pool.insert(dsha256("tx1"), 5, &[coord("prev", 0)]).unwrap();
        let err = pool
            .insert(dsha256("tx2"), 9, &[coord("other", 0), coord("prev", 0)])
            .unwrap_err();
        assert!(matches!(err, MempoolError::ReservedUtxo(_)));
        // The failed insert must not leave partial reservations behind.
        assert!(!pool.is_reserved(&coord("other", 0)));
    }

    #[test]
    fn confirm_releases_reservations() {
        let mut pool = Mempool::new();
        let hash = dsha256("tx");
        pool.insert(hash, 5, &[coord("prev", 0)]).unwrap();
        pool.confirm(&hash, &[coord("prev", 0)]);
        assert!(!pool.contains(&hash));
        assert!(!pool.is_reserved(&coord("prev", 0)));
    }

    #[test]
    fn confirm_evicts_conflicting_entry() {
        let mut pool = Mempool::new();
        let mine = dsha256("mine");
        pool.insert(mine, 5, &[coord("prev", 0), coord("prev", 1)])
            .unwrap();

        // A peer's block confirms a different spend of prev:0. Our pending
        // transaction can never confirm; both its reservations must go.
        pool.confirm(&dsha256("theirs"), &[coord("prev", 0)]);
        assert!(!pool.contains(&mine));
        assert!(!pool.is_reserved(&coord("prev", 0)));
        assert!(!pool.is_reserved(&coord("prev", 1)));
    }

    #[test]
    fn reinstate_restores_entry() {
        let mut pool = Mempool::new();
        let hash = dsha256("tx");
        pool.insert(hash, 5, &[coord("prev", 0)]).unwrap();
        pool.confirm(&hash, &[coord("prev", 0)]);
        pool.reinstate(hash, 5, &[coord("prev", 0)]);
        assert!(pool.contains(&hash));
        assert!(pool.is_reserved(&coord("prev", 0)));
    }

    #[test]
    fn select_orders_by_fee_then_hash() {
        let mut pool = Mempool::new();
        let mut hashes: Vec<Hash256> = (0..4).map(|i| dsha256(&format!("tx{i}"))).collect();
        pool.insert(hashes[0], 1, &[]).unwrap();
        pool.insert(hashes[1], 9, &[]).unwrap();
        pool.insert(hashes[2], 5, &[]).unwrap();
        pool.insert(hashes[3], 5, &[]).unwrap();

        let selected = pool.select(10);
        assert_eq!(selected[0], (hashes[1], 9));
        // Fee tie broken by ascending hash.
        hashes[2..4].sort();
        assert_eq!(selected[1].0, hashes[2]);
        assert_eq!(selected[2].0, hashes[3]);
        assert_eq!(selected[3], (hashes[0], 1));
    }

    #[test]
    fn select_respects_limit() {
        let mut pool = Mempool::new();
        for i in 0..5 {
            pool.insert(dsha256(&format!("tx{i}")), i, &[]).unwrap();
        }
        assert_eq!(pool.select(2).len(), 2);
        assert_eq!(pool.select(0).len(), 0);
    }
}
