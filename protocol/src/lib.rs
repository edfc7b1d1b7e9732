// Copyright (c) 2026 Forge Labs. MIT License.
// See LICENSE for details.

//! # Forge Protocol — Core Library
//!
//! A single-node priority mempool plus deterministic block producer.
//! Pending transactions arrive over a small JSON-RPC control plane, wait in
//! a fee-ordered indexed heap, and are drained on a fixed cadence into an
//! append-only, hash-linked, in-memory chain. There is no consensus, no
//! gossip, no signatures, and no persistence — this crate is the execution
//! side of a node, kept small enough to reason about end to end.
//!
//! ## Architecture
//!
//! - **transaction** — The transaction model and its immutable-field id.
//! - **mempool** — Indexed max-heap with O(log n) fee bumps and removals.
//! - **builder** — Stateless assembler from mempool selection to block.
//! - **block** — Block structure and the deterministic content hash.
//! - **chain** — Append-only in-memory block store.
//! - **node** — Runtime wiring and the tick-driven production loop.
//! - **rpc** — Control-plane envelope, DTOs, and method dispatch.
//! - **config** — Runtime settings and their defaults.
//!
//! Clock reads are injected: every operation that needs an instant takes it
//! as a parameter at the top of its call chain, so tests run on fixed time.

pub mod block;
pub mod builder;
pub mod chain;
pub mod config;
pub mod mempool;
pub mod node;
pub mod rpc;
pub mod transaction;

pub use block::{Block, BlockHash, BlockHeader, ZERO_HASH};
pub use builder::{BlockBuilder, BuilderConfig};
pub use chain::Chain;
pub use config::NodeConfig;
pub use mempool::{BlockConstraints, Mempool, MempoolError, SelectionResult};
pub use node::Node;
pub use transaction::{derive_id, Transaction, TxId};
