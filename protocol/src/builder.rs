//! # Block Assembler
//!
//! Turns one mempool selection into one block. The builder is stateless
//! and pure with respect to the chain: the caller supplies the previous
//! hash, the height, and the production instant, so it can be tested
//! without a clock and without any chain state.
//!
//! The builder also does no hashing — sealing the block into the chain is
//! the runtime's job. Keeping assembly and hashing apart keeps the hot
//! path (selection) in one place, inside the mempool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::block::{Block, BlockHash, BlockHeader};
use crate::config::{DEFAULT_GAS_LIMIT, DEFAULT_MAX_TX_PER_BLOCK, DEFAULT_MIN_FEE};
use crate::mempool::{BlockConstraints, Mempool};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Static selection limits applied to every block this builder assembles.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Maximum total gas per block. `0` disables the limit.
    pub gas_limit: u64,
    /// Maximum transactions per block.
    pub max_tx_per_block: usize,
    /// Fee floor; lower-fee entries are purged at selection time.
    pub min_fee: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            max_tx_per_block: DEFAULT_MAX_TX_PER_BLOCK,
            min_fee: DEFAULT_MIN_FEE,
        }
    }
}

// ---------------------------------------------------------------------------
// BlockBuilder
// ---------------------------------------------------------------------------

/// Assembles blocks from mempool selections under a static configuration.
///
/// Holds a shared handle to the mempool and nothing else; the composition
/// is one-way — the mempool knows nothing about its users.
pub struct BlockBuilder {
    mempool: Arc<Mempool>,
    cfg: BuilderConfig,
}

impl BlockBuilder {
    /// Creates a builder over the given mempool.
    pub fn new(mempool: Arc<Mempool>, cfg: BuilderConfig) -> Self {
        Self { mempool, cfg }
    }

    /// Drains a selection from the mempool and wraps it in a block.
    ///
    /// Returns `None` when the selection is empty — an empty tick produces
    /// no block. The header trusts the mempool's gas accounting; it is not
    /// recomputed here.
    pub fn build(
        &self,
        prev_hash: BlockHash,
        height: u64,
        now: DateTime<Utc>,
    ) -> Option<Block> {
        let selection = self.mempool.select(&BlockConstraints {
            gas_limit: self.cfg.gas_limit,
            max_tx: self.cfg.max_tx_per_block,
            min_fee: self.cfg.min_fee,
        });

        if selection.transactions.is_empty() {
            debug!(height, "no eligible transactions, skipping block");
            return None;
        }

        let header = BlockHeader {
            height,
            prev_hash,
            timestamp: now,
            tx_count: selection.transactions.len(),
            gas_used: selection.gas_used,
        };

        Some(Block {
            header,
            transactions: selection.transactions,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
