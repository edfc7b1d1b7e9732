//! # Priority Mempool
//!
//! Thread-safe pool of pending transactions ordered for block inclusion.
//! Internally this is an indexed binary max-heap: the heap array holds the
//! transactions, and a side table maps each id to its current slot so that
//! fee bumps and removals of arbitrary entries run in O(log n) without a
//! linear scan. Every swap keeps the table in step with the array.
//!
//! ## Design
//!
//! - One `parking_lot::RwLock` guards the heap and the index together.
//!   All mutating operations take the write lock for their full duration,
//!   which makes them linearizable; [`Mempool::list`] and [`Mempool::get`]
//!   take the read lock.
//! - [`Mempool::select`] is the drain used by block production: it pops in
//!   priority order, permanently purges entries below the fee floor, and
//!   sets aside entries that would overflow the gas budget so they can
//!   compete again next round.
//! - No capacity bound. The pool grows with demand and is emptied by
//!   selection; eviction policy is a deliberate non-feature at this layer.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use tracing::debug;

use crate::transaction::{Transaction, TxId};

// ---------------------------------------------------------------------------
// Selection types
// ---------------------------------------------------------------------------

/// Limits applied to a single [`Mempool::select`] call.
#[derive(Debug, Clone, Copy)]
pub struct BlockConstraints {
    /// Maximum total gas across selected transactions. `0` disables the
    /// gas limit entirely.
    pub gas_limit: u64,
    /// Maximum number of transactions to select. `0` selects nothing.
    pub max_tx: usize,
    /// Fee floor. Entries below this are purged from the pool, not skipped.
    pub min_fee: u64,
}

/// The transactions drained by one selection, in priority order, together
/// with their summed gas.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    /// Selected transactions, highest priority first.
    pub transactions: Vec<Transaction>,
    /// Sum of `gas` over `transactions`.
    pub gas_used: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by mempool operations.
///
/// Both are deterministic classification errors; nothing in the mempool is
/// transient or retriable. The `Display` strings are part of the RPC wire
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MempoolError {
    /// A transaction with the same id is already present.
    TxExists,
    /// No transaction with the given id is present.
    TxNotFound,
}

impl fmt::Display for MempoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TxExists => write!(f, "mempool: tx already exists"),
            Self::TxNotFound => write!(f, "mempool: tx not found"),
        }
    }
}

impl std::error::Error for MempoolError {}

// ---------------------------------------------------------------------------
// Mempool
// ---------------------------------------------------------------------------

/// A concurrency-safe, priority-ordered transaction pool.
pub struct Mempool {
    inner: RwLock<PoolInner>,
}

/// The heap array plus the id → slot index. Only ever touched under the
/// outer lock; the two structures cover exactly the same set of ids after
/// every public operation.
#[derive(Default)]
struct PoolInner {
    heap: Vec<Transaction>,
    index: HashMap<TxId, usize>,
}

impl Mempool {
    /// Creates an empty mempool.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(PoolInner::default()),
        }
    }

    /// Inserts a new transaction.
    ///
    /// Fails with [`MempoolError::TxExists`] if the id is already present.
    pub fn add(&self, tx: Transaction) -> Result<(), MempoolError> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(&tx.id) {
            return Err(MempoolError::TxExists);
        }
        inner.push(tx);
        Ok(())
    }

    /// Replaces the stored transaction with the same id and re-sites it in
    /// the heap from its current slot (sift, not pop-and-repush).
    ///
    /// This is a full replacement: only `fee` and `timestamp` are supposed
    /// to differ, and callers are expected to carry the immutable fields
    /// over unchanged. Fails with [`MempoolError::TxNotFound`] if absent.
    pub fn update(&self, tx: Transaction) -> Result<(), MempoolError> {
        let mut inner = self.inner.write();
        let pos = *inner.index.get(&tx.id).ok_or(MempoolError::TxNotFound)?;
        inner.heap[pos] = tx;
        inner.fix(pos);
        Ok(())
    }

    /// Deletes the transaction with the given id.
    ///
    /// Fails with [`MempoolError::TxNotFound`] if absent.
    pub fn remove(&self, id: &str) -> Result<(), MempoolError> {
        let mut inner = self.inner.write();
        let pos = *inner.index.get(id).ok_or(MempoolError::TxNotFound)?;
        inner.remove_at(pos);
        Ok(())
    }

    /// Returns a clone of the transaction with the given id, if present.
    pub fn get(&self, id: &str) -> Option<Transaction> {
        let inner = self.inner.read();
        inner.index.get(id).map(|&pos| inner.heap[pos].clone())
    }

    /// Atomically drains the highest-priority transactions that satisfy
    /// the constraints and removes them from the pool.
    ///
    /// Entries whose fee is below `min_fee` are purged permanently: the
    /// operator has declared them uneconomical, so they must not linger.
    /// Entries that would push the block past `gas_limit` are merely
    /// skipped — kept in the pool to compete for a later block. The whole
    /// operation runs under one critical section.
    pub fn select(&self, constraints: &BlockConstraints) -> SelectionResult {
        let mut inner = self.inner.write();
        let mut result = SelectionResult::default();

        if constraints.max_tx == 0 || inner.heap.is_empty() {
            return result;
        }

        let mut skipped: Vec<Transaction> = Vec::new();

        while result.transactions.len() < constraints.max_tx {
            let Some(tx) = inner.pop_root() else { break };

            // Purge low-fee entries permanently.
            if tx.fee < constraints.min_fee {
                inner.index.remove(&tx.id);
                debug!(
                    id = %tx.id,
                    fee = tx.fee,
                    min_fee = constraints.min_fee,
                    "purged low-fee tx"
                );
                continue;
            }

            // Over the gas budget for this block: set aside, keep pooled.
            // The index slot is intentionally left in place; pushing the
            // entry back below rewrites it.
            if constraints.gas_limit > 0
                && result.gas_used + tx.gas > constraints.gas_limit
            {
                skipped.push(tx);
                continue;
            }

            inner.index.remove(&tx.id);
            result.gas_used += tx.gas;
            result.transactions.push(tx);
        }

        for tx in skipped {
            inner.push(tx);
        }

        result
    }

    /// Returns an unordered snapshot of all pending transactions.
    ///
    /// The snapshot is independent of further pool mutation and never
    /// observes a half-applied operation.
    pub fn list(&self) -> Vec<Transaction> {
        self.inner.read().heap.clone()
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.inner.read().heap.len()
    }

    /// `true` if no transactions are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.read().heap.is_empty()
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mempool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mempool").field("len", &self.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Heap internals
// ---------------------------------------------------------------------------

impl PoolInner {
    /// `true` if the entry at `i` outranks the entry at `j`.
    fn higher(&self, i: usize, j: usize) -> bool {
        self.heap[i].priority_cmp(&self.heap[j]) == Ordering::Greater
    }

    /// Swaps two heap slots and re-points their index entries.
    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        let id_i = self.heap[i].id.clone();
        let id_j = self.heap[j].id.clone();
        self.index.insert(id_i, i);
        self.index.insert(id_j, j);
    }

    /// Appends a transaction and restores the heap property upward.
    fn push(&mut self, tx: Transaction) {
        let pos = self.heap.len();
        self.index.insert(tx.id.clone(), pos);
        self.heap.push(tx);
        self.sift_up(pos);
    }

    /// Removes and returns the highest-priority entry.
    ///
    /// The entry's index slot is NOT cleared here — callers decide whether
    /// the entry is leaving the pool (remove the slot) or coming back
    /// (push rewrites it). All of that happens under the same lock.
    fn pop_root(&mut self) -> Option<Transaction> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let tx = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        tx
    }

    /// Removes the entry at an arbitrary slot, clearing its index entry
    /// and repairing the heap around the hole.
    fn remove_at(&mut self, pos: usize) -> Option<Transaction> {
        let last = self.heap.len().checked_sub(1)?;
        if pos > last {
            return None;
        }
        if pos != last {
            self.swap(pos, last);
        }
        let tx = self.heap.pop()?;
        self.index.remove(&tx.id);
        if pos < self.heap.len() {
            self.fix(pos);
        }
        Some(tx)
    }

    /// Restores the heap property at `pos` after an in-place priority
    /// change: the entry moves at most one direction, so sifting down and
    /// then up covers both cases.
    fn fix(&mut self, pos: usize) {
        self.sift_down(pos);
        self.sift_up(pos);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.higher(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut best = left;
            if right < len && self.higher(right, left) {
                best = right;
            }
            if !self.higher(best, pos) {
                break;
            }
            self.swap(pos, best);
            pos = best;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
impl Mempool {
    /// Asserts the max-heap property and the heap/index bijection.
    fn check_invariants(&self) {
        let inner = self.inner.read();

        for pos in 1..inner.heap.len() {
            let parent = (pos - 1) / 2;
            assert_ne!(
                inner.heap[pos].priority_cmp(&inner.heap[parent]),
                Ordering::Greater,
                "heap property violated at slot {pos}"
            );
        }

        assert_eq!(inner.index.len(), inner.heap.len());
        for (id, &pos) in &inner.index {
            assert_eq!(
                &inner.heap[pos].id, id,
                "index entry for {id} points at the wrong slot"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    /// Builds a transaction with a unique creation instant so ids never
    /// collide within a test.
    fn make_tx(sender: &str, fee: u64, gas: u64, seq: i64) -> Transaction {
        Transaction::new_unsigned(
            sender,
            "bob",
            "data",
            fee,
            gas,
            base_instant() + Duration::nanoseconds(seq),
        )
    }

    fn constraints(gas_limit: u64, max_tx: usize, min_fee: u64) -> BlockConstraints {
        BlockConstraints {
            gas_limit,
            max_tx,
            min_fee,
        }
    }

    // -- add / list ---------------------------------------------------------

    #[test]
    fn add_and_list() {
        let pool = Mempool::new();

        pool.add(make_tx("alice", 10, 100, 1)).unwrap();
        pool.add(make_tx("carol", 20, 200, 2)).unwrap();

        assert_eq!(pool.list().len(), 2);
        assert_eq!(pool.len(), 2);
        pool.check_invariants();
    }

    #[test]
    fn add_duplicate_fails() {
        let pool = Mempool::new();
        let tx = make_tx("alice", 10, 100, 1);

        pool.add(tx.clone()).unwrap();
        assert_eq!(pool.add(tx), Err(MempoolError::TxExists));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn get_returns_stored_tx() {
        let pool = Mempool::new();
        let tx = make_tx("alice", 10, 100, 1);
        let id = tx.id.clone();

        pool.add(tx.clone()).unwrap();
        assert_eq!(pool.get(&id), Some(tx));
        assert_eq!(pool.get("missing"), None);
    }

    // -- update -------------------------------------------------------------

    #[test]
    fn update_strict_not_found() {
        let pool = Mempool::new();
        let tx = make_tx("alice", 10, 100, 1);

        assert_eq!(pool.update(tx), Err(MempoolError::TxNotFound));
    }

    #[test]
    fn update_replaces_and_reprioritizes() {
        let pool = Mempool::new();
        let a = make_tx("alice", 10, 100, 1);
        let b = make_tx("carol", 20, 100, 2);
        let a_id = a.id.clone();

        pool.add(a.clone()).unwrap();
        pool.add(b).unwrap();

        // Fee bump: A jumps from the bottom to the top of the order.
        let bumped = Transaction::new_update(
            a.id,
            a.sender,
            a.recipient,
            a.payload,
            999,
            a.gas,
            a.created_at,
            base_instant() + Duration::seconds(1),
        );
        pool.update(bumped).unwrap();
        pool.check_invariants();

        let res = pool.select(&constraints(1_000_000, 1, 0));
        assert_eq!(res.transactions.len(), 1);
        assert_eq!(res.transactions[0].id, a_id);
        assert_eq!(res.transactions[0].fee, 999);
    }

    #[test]
    fn update_can_lower_priority() {
        let pool = Mempool::new();
        let a = make_tx("alice", 100, 10, 1);
        let b = make_tx("carol", 50, 10, 2);
        let b_id = b.id.clone();

        pool.add(a.clone()).unwrap();
        pool.add(b).unwrap();

        // Demote A below B; B should now win selection.
        let demoted = Transaction::new_update(
            a.id,
            a.sender,
            a.recipient,
            a.payload,
            1,
            a.gas,
            a.created_at,
            base_instant() + Duration::seconds(1),
        );
        pool.update(demoted).unwrap();
        pool.check_invariants();

        let res = pool.select(&constraints(1_000_000, 1, 0));
        assert_eq!(res.transactions[0].id, b_id);
    }

    #[test]
    fn update_with_identical_fields_keeps_outcome() {
        let pool = Mempool::new();
        let a = make_tx("alice", 10, 100, 1);

        pool.add(a.clone()).unwrap();
        let unchanged = Transaction::new_update(
            a.id.clone(),
            a.sender.clone(),
            a.recipient.clone(),
            a.payload.clone(),
            a.fee,
            a.gas,
            a.created_at,
            a.timestamp,
        );
        pool.update(unchanged).unwrap();
        pool.check_invariants();

        let res = pool.select(&constraints(1_000_000, 10, 0));
        assert_eq!(res.transactions.len(), 1);
        assert_eq!(res.transactions[0], a);
    }

    // -- remove -------------------------------------------------------------

    #[test]
    fn remove_strict_not_found() {
        let pool = Mempool::new();
        pool.add(make_tx("alice", 10, 100, 1)).unwrap();

        assert_eq!(pool.remove("does-not-exist"), Err(MempoolError::TxNotFound));
    }

    #[test]
    fn remove_success_leaves_pool_consistent() {
        let pool = Mempool::new();
        let tx = make_tx("alice", 10, 100, 1);
        let id = tx.id.clone();

        pool.add(tx).unwrap();
        pool.remove(&id).unwrap();

        assert!(pool.is_empty());
        assert_eq!(pool.get(&id), None);
        pool.check_invariants();
    }

    #[test]
    fn add_then_remove_is_a_noop_on_the_observable_set() {
        let pool = Mempool::new();
        let keep = make_tx("alice", 10, 100, 1);
        pool.add(keep.clone()).unwrap();

        let tx = make_tx("carol", 20, 100, 2);
        let id = tx.id.clone();
        pool.add(tx).unwrap();
        pool.remove(&id).unwrap();

        assert_eq!(pool.list(), vec![keep]);
        pool.check_invariants();
    }

    #[test]
    fn remove_interior_entry_repairs_heap() {
        let pool = Mempool::new();
        let mut ids = Vec::new();
        for i in 0..16 {
            let tx = make_tx("alice", (i * 7) % 13, 10, i as i64);
            ids.push(tx.id.clone());
            pool.add(tx).unwrap();
        }

        // Remove a handful of interior entries, checking shape each time.
        for id in ids.iter().step_by(3) {
            pool.remove(id).unwrap();
            pool.check_invariants();
        }
    }

    // -- select -------------------------------------------------------------

    #[test]
    fn select_orders_by_priority() {
        let pool = Mempool::new();
        pool.add(make_tx("alice", 1, 50, 1)).unwrap();
        pool.add(make_tx("bob", 10, 50, 2)).unwrap();
        pool.add(make_tx("carol", 100, 50, 3)).unwrap();

        let res = pool.select(&constraints(1_000_000, 3, 0));

        let fees: Vec<u64> = res.transactions.iter().map(|tx| tx.fee).collect();
        assert_eq!(fees, vec![100, 10, 1]);
        assert_eq!(res.gas_used, 150);
        assert!(pool.is_empty());
        pool.check_invariants();
    }

    #[test]
    fn select_breaks_fee_ties_by_arrival() {
        let pool = Mempool::new();
        let first = make_tx("alice", 10, 50, 1);
        let second = make_tx("carol", 10, 50, 1_000_000);
        let first_id = first.id.clone();

        pool.add(second).unwrap();
        pool.add(first).unwrap();

        let res = pool.select(&constraints(1_000_000, 2, 0));
        assert_eq!(res.transactions[0].id, first_id);
    }

    #[test]
    fn select_respects_max_tx() {
        let pool = Mempool::new();
        for i in 0..5 {
            pool.add(make_tx("alice", (i + 1) * 100, 10, i as i64)).unwrap();
        }

        let res = pool.select(&constraints(1_000_000, 3, 0));
        assert_eq!(res.transactions.len(), 3);
        assert_eq!(pool.len(), 2);
        pool.check_invariants();
    }

    #[test]
    fn select_zero_max_tx_returns_nothing() {
        let pool = Mempool::new();
        pool.add(make_tx("alice", 10, 10, 1)).unwrap();

        let res = pool.select(&constraints(1_000_000, 0, 0));
        assert!(res.transactions.is_empty());
        assert_eq!(res.gas_used, 0);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn select_empty_pool_returns_nothing() {
        let pool = Mempool::new();
        let res = pool.select(&constraints(1_000_000, 10, 0));
        assert!(res.transactions.is_empty());
        assert_eq!(res.gas_used, 0);
    }

    #[test]
    fn select_enforces_gas_limit() {
        let pool = Mempool::new();
        for i in 0..4 {
            pool.add(make_tx("alice", i, 60, i as i64)).unwrap();
        }

        // Only two 60-gas transactions fit under 120.
        let res = pool.select(&constraints(120, 10, 0));
        assert_eq!(res.transactions.len(), 2);
        assert_eq!(res.gas_used, 120);
        assert_eq!(pool.len(), 2);
        pool.check_invariants();
    }

    #[test]
    fn select_zero_gas_limit_means_unlimited() {
        let pool = Mempool::new();
        for i in 0..4 {
            pool.add(make_tx("alice", i, u64::MAX / 8, i as i64)).unwrap();
        }

        let res = pool.select(&constraints(0, 10, 0));
        assert_eq!(res.transactions.len(), 4);
        assert!(pool.is_empty());
    }

    #[test]
    fn select_purges_low_fee_permanently() {
        let pool = Mempool::new();
        pool.add(make_tx("alice", 1, 10, 1)).unwrap();
        pool.add(make_tx("bob", 100, 10, 2)).unwrap();

        let res = pool.select(&constraints(1_000_000, 10, 50));

        assert_eq!(res.transactions.len(), 1);
        assert_eq!(res.transactions[0].fee, 100);
        // The low-fee tx is gone for good, not waiting for the next round.
        assert!(pool.is_empty());
        pool.check_invariants();
    }

    #[test]
    fn select_skips_but_keeps_oversized_tx() {
        let pool = Mempool::new();
        let big = make_tx("carol", 100, 100, 1);
        let small = make_tx("alice", 1, 1, 2);
        let big_id = big.id.clone();

        pool.add(big).unwrap();
        pool.add(small).unwrap();

        let res = pool.select(&constraints(1, 10, 0));

        assert_eq!(res.transactions.len(), 1);
        assert_eq!(res.transactions[0].gas, 1);
        assert_eq!(res.gas_used, 1);

        // The big tx was skipped, not purged: still pending, still selectable.
        let remaining = pool.list();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, big_id);
        pool.check_invariants();

        let res = pool.select(&constraints(1_000, 10, 0));
        assert_eq!(res.transactions.len(), 1);
        assert_eq!(res.transactions[0].id, big_id);
    }

    #[test]
    fn selected_and_purged_ids_never_reappear() {
        let pool = Mempool::new();
        let mut ids = Vec::new();
        for i in 0..10 {
            let tx = make_tx("alice", i, 10, i as i64);
            ids.push(tx.id.clone());
            pool.add(tx).unwrap();
        }

        // Fees 0..=4 purged, 5..=9 selected.
        let res = pool.select(&constraints(1_000_000, 10, 5));
        assert_eq!(res.transactions.len(), 5);
        assert!(pool.is_empty());

        for id in &ids {
            assert_eq!(pool.get(id), None);
        }
    }

    #[test]
    fn gas_used_matches_sum_of_selected() {
        let pool = Mempool::new();
        for i in 0..8 {
            pool.add(make_tx("alice", i, 7 * (i + 1), i as i64)).unwrap();
        }

        let res = pool.select(&constraints(100, 10, 0));
        let sum: u64 = res.transactions.iter().map(|tx| tx.gas).sum();
        assert_eq!(res.gas_used, sum);
        assert!(res.gas_used <= 100);
    }

    // -- concurrency --------------------------------------------------------

    /// Hammers the pool from many threads at once. This does not assert a
    /// particular interleaving — only that every operation stays atomic and
    /// the heap/index pair is intact afterwards.
    #[test]
    fn concurrent_add_update_remove_select() {
        use std::sync::Arc;
        use std::thread;

        let pool = Arc::new(Mempool::new());
        let mut handles = Vec::new();

        for worker in 0..8i64 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for i in 0..50i64 {
                    let seq = worker * 1_000 + i;
                    let tx = make_tx(&format!("sender-{worker}"), (i as u64) + 1, 10, seq);
                    let id = tx.id.clone();
                    let _ = pool.add(tx.clone());

                    if i % 3 == 0 {
                        let bumped = Transaction::new_update(
                            id.clone(),
                            tx.sender.clone(),
                            tx.recipient.clone(),
                            tx.payload.clone(),
                            500,
                            tx.gas,
                            tx.created_at,
                            base_instant() + Duration::seconds(seq),
                        );
                        let _ = pool.update(bumped);
                    }
                    if i % 7 == 0 {
                        let _ = pool.remove(&id);
                    }
                }
            }));
        }

        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for _ in 0..25 {
                    let res = pool.select(&constraints(200, 5, 2));
                    let sum: u64 = res.transactions.iter().map(|tx| tx.gas).sum();
                    assert_eq!(res.gas_used, sum);
                    let _ = pool.list();
                    let _ = pool.len();
                }
            }));
        }

        for handle in handles {
            handle.join().expect("worker thread panicked");
        }

        pool.check_invariants();
    }
}
