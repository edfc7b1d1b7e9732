//! # CLI Interface
//!
//! Command-line argument structure for `forge-node`, built with `clap`
//! derive. Three subcommands: `start` runs the node, `tx` and `block`
//! speak the RPC protocol to a running node. Every configurable value on
//! `start` has an environment-variable fallback for container deployments.

use clap::{Parser, Subcommand};

/// Forge node.
///
/// A single-node priority mempool with a deterministic block producer.
/// Pending transactions are ordered by fee and drained into hash-linked
/// blocks on a fixed cadence.
#[derive(Parser, Debug)]
#[command(
    name = "forge-node",
    about = "Forge priority-mempool node",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node: RPC server plus the block production loop.
    Start(StartArgs),
    /// Transaction (mempool) operations against a running node.
    ///
    /// The mempool holds transactions that have NOT yet been included in a
    /// block; `tx list` shows them in priority order — the order the next
    /// block would drain them.
    Tx(TxArgs),
    /// Block (chain) queries against a running node.
    ///
    /// Blocks are the finalized output of the producer. Once a transaction
    /// is in a block it is no longer pending.
    Block(BlockArgs),
}

/// Arguments for the `start` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct StartArgs {
    /// Address the RPC server binds to.
    #[arg(long, env = "FORGE_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen: String,

    /// Block production interval in milliseconds.
    #[arg(long, env = "FORGE_BLOCK_INTERVAL_MS", default_value_t = 2_000)]
    pub block_interval_ms: u64,

    /// Maximum total gas per block. 0 disables the limit.
    #[arg(long, env = "FORGE_GAS_LIMIT", default_value_t = 1_000_000)]
    pub gas_limit: u64,

    /// Maximum number of transactions per block.
    #[arg(long, env = "FORGE_MAX_TX_PER_BLOCK", default_value_t = 1_000)]
    pub max_tx_per_block: usize,

    /// Minimum fee. Cheaper transactions are purged at selection time.
    #[arg(long, env = "FORGE_MIN_FEE", default_value_t = 0)]
    pub min_fee: u64,

    /// Log output format: pretty or json.
    #[arg(long, env = "FORGE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `tx` subcommand family.
#[derive(Parser, Debug, Clone)]
pub struct TxArgs {
    /// Address of the running node.
    #[arg(long, env = "FORGE_NODE_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: String,

    #[command(subcommand)]
    pub command: TxCommands,
}

/// Mempool operations.
#[derive(Subcommand, Debug, Clone)]
pub enum TxCommands {
    /// Add a new transaction to the mempool.
    Add {
        /// Sender address.
        #[arg(long)]
        sender: String,
        /// Recipient address.
        #[arg(long)]
        recipient: String,
        /// Opaque payload.
        #[arg(long, default_value = "")]
        payload: String,
        /// Transaction fee.
        #[arg(long, default_value_t = 0)]
        fee: u64,
        /// Gas cost.
        #[arg(long, default_value_t = 0)]
        gas: u64,
    },
    /// Bump the fee of a pending transaction.
    Update {
        /// Transaction id.
        #[arg(long)]
        id: String,
        /// New fee.
        #[arg(long)]
        fee: u64,
    },
    /// Remove a pending transaction.
    Remove {
        /// Transaction id.
        #[arg(long)]
        id: String,
    },
    /// List pending transactions in priority order.
    List,
}

/// Arguments for the `block` subcommand family.
#[derive(Parser, Debug, Clone)]
pub struct BlockArgs {
    /// Address of the running node.
    #[arg(long, env = "FORGE_NODE_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: String,

    #[command(subcommand)]
    pub command: BlockCommands,
}

/// Chain queries.
#[derive(Subcommand, Debug, Clone)]
pub enum BlockCommands {
    /// List all produced blocks in chain order.
    List,
    /// Get a specific block by height.
    Get {
        /// Block height.
        #[arg(long)]
        height: u64,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
