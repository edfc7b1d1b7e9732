//! # Node Runtime
//!
//! Wires the mempool, block assembler, and chain store together and drives
//! the production loop. Each tick of the configured interval captures the
//! current instant, asks the assembler for a block, and — when there is
//! one — seals it with its content hash, appends it to the chain, and
//! advances the `(height, prev_hash)` cursor. Empty ticks produce nothing
//! and the cursor stays put.
//!
//! Ticks never overlap: a slow build delays the next tick and missed ticks
//! are skipped outright rather than queued.
//!
//! ## Shutdown
//!
//! The loop watches a `tokio::sync::watch` channel between ticks. When the
//! sender signals `true` (or drops), the loop exits cleanly after the
//! current tick. The HTTP server observes the same channel; the runtime
//! itself holds no transport concerns.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::block::ZERO_HASH;
use crate::builder::{BlockBuilder, BuilderConfig};
use crate::chain::Chain;
use crate::config::NodeConfig;
use crate::mempool::Mempool;

/// A fully wired node: mempool, assembler, chain, and configuration.
///
/// The mempool and chain are shared handles — RPC dispatch reads and
/// mutates them concurrently with the production loop. The loop cursor
/// lives on the loop's stack; nothing else reads it.
pub struct Node {
    mempool: Arc<Mempool>,
    builder: BlockBuilder,
    chain: Arc<Chain>,
    cfg: NodeConfig,
}

impl Node {
    /// Creates a node with an empty mempool and chain.
    pub fn new(cfg: NodeConfig) -> Self {
        let mempool = Arc::new(Mempool::new());
        let builder = BlockBuilder::new(
            Arc::clone(&mempool),
            BuilderConfig {
                gas_limit: cfg.gas_limit,
                max_tx_per_block: cfg.max_tx_per_block,
                min_fee: cfg.min_fee,
            },
        );

        Self {
            mempool,
            builder,
            chain: Arc::new(Chain::new()),
            cfg,
        }
    }

    /// Shared handle to the mempool.
    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    /// Shared handle to the chain store.
    pub fn chain(&self) -> &Arc<Chain> {
        &self.chain
    }

    /// The node's runtime configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.cfg
    }

    /// Runs the block production loop until shutdown is signalled.
    ///
    /// The cursor starts at `(0, all-zero prev hash)` and only advances
    /// when a block is actually produced, so the chain stays dense.
    pub async fn run_block_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut height: u64 = 0;
        let mut prev_hash = ZERO_HASH;

        let mut ticker = interval(self.cfg.block_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so production
        // starts one full interval after startup.
        ticker.tick().await;

        info!(
            interval_ms = self.cfg.block_interval.as_millis() as u64,
            "block production loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    match self.builder.build(prev_hash, height, now) {
                        Some(block) => {
                            let hash = block.hash();
                            info!(
                                height,
                                txs = block.header.tx_count,
                                gas_used = block.header.gas_used,
                                hash = %hex::encode(hash),
                                "block produced"
                            );
                            self.chain.append(block);
                            prev_hash = hash;
                            height += 1;
                        }
                        None => debug!(height, "empty tick, no block produced"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("block production loop shutting down");
                        return;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use std::time::Duration;

    fn fast_node() -> Arc<Node> {
        Arc::new(Node::new(NodeConfig {
            block_interval: Duration::from_millis(20),
            ..NodeConfig::default()
        }))
    }

    fn spawn_loop(
        node: &Arc<Node>,
    ) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let node = Arc::clone(node);
            async move { node.run_block_loop(rx).await }
        });
        (tx, handle)
    }

    #[tokio::test]
    async fn produces_a_linked_chain_from_pending_txs() {
        let node = fast_node();
        for i in 0..5i64 {
            let tx = Transaction::new_unsigned(
                format!("sender-{i}"),
                "bob",
                "data",
                (i as u64) + 1,
                10,
                Utc::now(),
            );
            node.mempool().add(tx).unwrap();
        }

        let (shutdown, handle) = spawn_loop(&node);
        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown.send(true).unwrap();
        handle.await.unwrap();

        let blocks = node.chain().snapshot();
        assert!(!blocks.is_empty(), "expected at least one block");

        assert_eq!(blocks[0].header.height, 0);
        assert_eq!(blocks[0].header.prev_hash, ZERO_HASH);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].header.height, pair[0].header.height + 1);
            assert_eq!(pair[1].header.prev_hash, pair[0].hash());
        }

        // Everything that was pending got drained into the chain.
        let total_txs: usize = blocks.iter().map(|b| b.transactions.len()).sum();
        assert_eq!(total_txs, 5);
        assert!(node.mempool().is_empty());
    }

    #[tokio::test]
    async fn empty_mempool_produces_no_blocks() {
        let node = fast_node();

        let (shutdown, handle) = spawn_loop(&node);
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.send(true).unwrap();
        handle.await.unwrap();

        assert!(node.chain().snapshot().is_empty());
    }

    #[tokio::test]
    async fn blocks_contain_at_least_one_tx() {
        let node = fast_node();
        node.mempool()
            .add(Transaction::new_unsigned(
                "alice", "bob", "data", 5, 10, Utc::now(),
            ))
            .unwrap();

        let (shutdown, handle) = spawn_loop(&node);
        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.send(true).unwrap();
        handle.await.unwrap();

        // One tx was pending, so exactly one block exists and later empty
        // ticks appended nothing.
        let blocks = node.chain().snapshot();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].header.tx_count, 1);
        assert!(blocks.iter().all(|b| !b.transactions.is_empty()));
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let node = fast_node();
        let (shutdown, handle) = spawn_loop(&node);

        shutdown.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit promptly on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_also_stops_the_loop() {
        let node = fast_node();
        let (shutdown, handle) = spawn_loop(&node);

        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit when the lifetime token is dropped")
            .unwrap();
    }
}
