//! # Runtime Configuration
//!
//! Every tunable the node exposes lives here, with its default. The
//! defaults describe a local development node: loopback listener, two
//! second cadence, a roomy gas budget, and no fee floor.

use std::time::Duration;

/// Default control-plane bind address.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default block production cadence.
pub const DEFAULT_BLOCK_INTERVAL: Duration = Duration::from_secs(2);

/// Default maximum total gas per block.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Default maximum transactions per block.
pub const DEFAULT_MAX_TX_PER_BLOCK: usize = 1_000;

/// Default fee floor. Zero admits everything.
pub const DEFAULT_MIN_FEE: u64 = 0;

/// Process-level runtime settings for a node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the RPC server binds to.
    pub listen_addr: String,
    /// Interval between production ticks.
    pub block_interval: Duration,
    /// Maximum total gas per block; `0` disables the limit.
    pub gas_limit: u64,
    /// Maximum transactions per block.
    pub max_tx_per_block: usize,
    /// Fee floor applied at selection time.
    pub min_fee: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            block_interval: DEFAULT_BLOCK_INTERVAL,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_tx_per_block: DEFAULT_MAX_TX_PER_BLOCK,
            min_fee: DEFAULT_MIN_FEE,
        }
    }
}
