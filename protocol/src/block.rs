//! # Block Structure & Content Hash
//!
//! A block is one tick's inclusion decision: a small header plus the
//! ordered transactions that were drained from the mempool. Blocks are
//! immutable once produced; the chain links them by content hash.
//!
//! ## Hash recipe
//!
//! The hash is the SHA-256 digest of three parts, in order:
//!
//! 1. The canonical ASCII header string
//!    `height=<H>|timestamp=<RFC3339, UTC, nanosecond precision>|txcount=<C>|gasused=<G>`
//!    with `<H>`, `<C>`, `<G>` in base 10.
//! 2. The raw 32 bytes of `prev_hash`.
//! 3. The UTF-8 bytes of every included transaction id, concatenated in
//!    block order with no separator.
//!
//! This is not a Merkle commitment — there are no inclusion proofs — but
//! any change to a header field, to the transaction set, or to the
//! transaction order changes the digest, because the id stream differs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transaction::Transaction;

/// A 32-byte block content hash.
pub type BlockHash = [u8; 32];

/// The `prev_hash` of the genesis-position block (height 0).
pub const ZERO_HASH: BlockHash = [0u8; 32];

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

/// Block metadata: chain position, linkage, and selection accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain, starting at 0.
    pub height: u64,
    /// Content hash of the previous block; all zeros at height 0.
    pub prev_hash: BlockHash,
    /// Production instant, captured by the runtime at tick time.
    pub timestamp: DateTime<Utc>,
    /// Number of included transactions.
    pub tx_count: usize,
    /// Sum of included transactions' gas, as accounted by the mempool.
    pub gas_used: u64,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A header plus the ordered transactions it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Included transactions, in priority order at selection time.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Computes the deterministic content hash of this block.
    pub fn hash(&self) -> BlockHash {
        let header = &self.header;
        let mut hasher = Sha256::new();

        hasher.update(format!(
            "height={}|timestamp={}|txcount={}|gasused={}",
            header.height,
            header.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            header.tx_count,
            header.gas_used,
        ));
        hasher.update(header.prev_hash);
        for tx in &self.transactions {
            hasher.update(tx.id.as_bytes());
        }

        hasher.finalize().into()
    }

    /// The block hash as a lowercase hex string.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    /// The previous block's hash as a lowercase hex string.
    pub fn prev_hash_hex(&self) -> String {
        hex::encode(self.header.prev_hash)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
