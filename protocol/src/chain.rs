//! # Chain Store
//!
//! Append-only, in-memory sequence of produced blocks. The production loop
//! is the only writer; RPC handlers read concurrently through snapshots.
//! Everything is lost at process exit — persistence is a non-feature.

use parking_lot::RwLock;

use crate::block::Block;

/// The ordered chain of produced blocks behind a reader-preferring lock.
#[derive(Default)]
pub struct Chain {
    blocks: RwLock<Vec<Block>>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block at the tail.
    pub fn append(&self, block: Block) {
        self.blocks.write().push(block);
    }

    /// Returns all blocks in chain order. The snapshot is independent of
    /// later appends.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    /// Returns the block at the given height, if produced yet.
    ///
    /// Heights are dense, so indexing would also work — but a linear scan
    /// keeps the lookup honest about tail races, where the requested height
    /// simply is not there yet.
    pub fn get(&self, height: u64) -> Option<Block> {
        self.blocks
            .read()
            .iter()
            .find(|block| block.header.height == height)
            .cloned()
    }

    /// Returns the most recently appended block, if any.
    pub fn tip(&self) -> Option<Block> {
        self.blocks.read().last().cloned()
    }

    /// Number of blocks appended so far.
    pub fn height(&self) -> u64 {
        self.blocks.read().len() as u64
    }
}
