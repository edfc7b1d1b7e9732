//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `GET /metrics`. All
//! metrics live in a dedicated [`prometheus::Registry`] so nothing
//! collides with other consumers of the default global registry.
//!
//! The gauges are refreshed by a sampler task ([`run_sampler`]) rather
//! than by instrumenting the hot paths — the mempool and chain already
//! expose cheap size accessors, and a one-second sampling cadence is
//! plenty for operational dashboards.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tokio::sync::watch;
use tracing::debug;

use forge_protocol::node::Node;

/// Shared handle to the node's metrics.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Holds all Prometheus metric handles for the node.
pub struct NodeMetrics {
    /// Registry owning every metric below.
    registry: Registry,
    /// Height of the chain (number of produced blocks).
    pub chain_height: IntGauge,
    /// Current number of pending transactions in the mempool.
    pub mempool_size: IntGauge,
    /// Total number of blocks produced since startup.
    pub blocks_produced_total: IntCounter,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("forge".into()), None)
            .expect("failed to create prometheus registry");

        let chain_height = IntGauge::new(
            "chain_height",
            "Number of blocks in the in-memory chain",
        )
        .expect("metric creation");
        registry
            .register(Box::new(chain_height.clone()))
            .expect("metric registration");

        let mempool_size = IntGauge::new(
            "mempool_size",
            "Current number of pending transactions in the mempool",
        )
        .expect("metric creation");
        registry
            .register(Box::new(mempool_size.clone()))
            .expect("metric registration");

        let blocks_produced_total = IntCounter::new(
            "blocks_produced_total",
            "Total number of blocks produced since startup",
        )
        .expect("metric creation");
        registry
            .register(Box::new(blocks_produced_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            chain_height,
            mempool_size,
            blocks_produced_total,
        }
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buf) {
            debug!(error = %err, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically refreshes the gauges from the node's live state until
/// shutdown is signalled.
pub async fn run_sampler(
    node: Arc<Node>,
    metrics: SharedMetrics,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut last_height = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let height = node.chain().height();
                metrics.chain_height.set(height as i64);
                metrics.mempool_size.set(node.mempool().len() as i64);
                if height > last_height {
                    metrics.blocks_produced_total.inc_by(height - last_height);
                    last_height = height;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_and_render() {
        let metrics = NodeMetrics::new();
        metrics.chain_height.set(3);
        metrics.mempool_size.set(7);
        metrics.blocks_produced_total.inc_by(3);

        let text = metrics.render();
        assert!(text.contains("forge_chain_height 3"));
        assert!(text.contains("forge_mempool_size 7"));
        assert!(text.contains("forge_blocks_produced_total 3"));
    }
}
