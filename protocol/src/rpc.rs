//! # RPC Boundary
//!
//! Transport-agnostic types and dispatch for the control plane. The HTTP
//! server itself lives in the node binary (axum); this module owns the
//! `{method, params}` / `{result, error}` envelope, the per-method DTOs,
//! and the mapping from domain errors to wire status.
//!
//! ## Method Index
//!
//! | Method       | Params                                     | Result                  |
//! |--------------|--------------------------------------------|-------------------------|
//! | `tx.add`     | `{sender, recipient, payload, fee, gas}`   | `{txID}`                |
//! | `tx.update`  | `{id, fee}`                                | `{ok: true}`            |
//! | `tx.remove`  | `{id}`                                     | `{ok: true}`            |
//! | `tx.list`    | `{}`                                       | `{transactions: [...]}` |
//! | `block.list` | `{}`                                       | `{blocks: [...]}`       |
//! | `block.get`  | `{height}`                                 | `{block: {...}}`        |
//!
//! ## Status rules
//!
//! Validation failures (missing fields, bad params, duplicate add, unknown
//! method) answer 400 with `error` set. Domain lookups that miss (`tx.update`
//! / `tx.remove` on an absent id, `block.get` on an unproduced height)
//! answer 200 with `error` set and `result` null — callers read `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::Block;
use crate::mempool::MempoolError;
use crate::node::Node;
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The request envelope carried by every `POST /rpc` body.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Method name, e.g. `"tx.add"`.
    pub method: String,
    /// Method-specific parameters; parsed per method.
    #[serde(default)]
    pub params: Value,
}

/// The response envelope. Exactly one of `result` / `error` is set except
/// for domain misses, where `error` is set and `result` stays null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    /// A successful response carrying `result`.
    pub fn result(value: Value) -> Self {
        Self {
            result: Some(value),
            error: None,
        }
    }

    /// A failed response carrying `error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }
}

/// A dispatch outcome: HTTP status plus the response envelope. Kept as a
/// bare `u16` so this crate stays transport-agnostic.
#[derive(Debug, Clone)]
pub struct RpcReply {
    pub status: u16,
    pub body: RpcResponse,
}

impl RpcReply {
    fn ok(result: Value) -> Self {
        Self {
            status: 200,
            body: RpcResponse::result(result),
        }
    }

    /// 200 with `error` populated — the caller inspects the envelope.
    fn domain_error(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: RpcResponse::error(message),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: RpcResponse::error(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Method param / result DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AddTxParams {
    #[serde(default)]
    sender: String,
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    payload: String,
    #[serde(default)]
    fee: u64,
    #[serde(default)]
    gas: u64,
}

#[derive(Debug, Deserialize)]
struct UpdateTxParams {
    #[serde(default)]
    id: String,
    #[serde(default)]
    fee: u64,
}

#[derive(Debug, Deserialize)]
struct RemoveTxParams {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct BlockGetParams {
    #[serde(default)]
    height: u64,
}

#[derive(Debug, Serialize)]
struct AddTxResult {
    #[serde(rename = "txID")]
    tx_id: String,
}

#[derive(Debug, Serialize)]
struct OkResult {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct ListTxResult {
    transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
struct ListBlocksResult {
    blocks: Vec<BlockDto>,
}

#[derive(Debug, Serialize)]
struct GetBlockResult {
    block: BlockDto,
}

/// Wire representation of a block: header fields flattened, hashes hex.
#[derive(Debug, Serialize)]
pub struct BlockDto {
    pub height: u64,
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "txCount")]
    pub tx_count: usize,
    #[serde(rename = "gasUsed")]
    pub gas_used: u64,
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

impl From<&Block> for BlockDto {
    fn from(block: &Block) -> Self {
        Self {
            height: block.header.height,
            prev_hash: block.prev_hash_hex(),
            timestamp: block.header.timestamp,
            tx_count: block.header.tx_count,
            gas_used: block.header.gas_used,
            hash: block.hash_hex(),
            transactions: block.transactions.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Routes one decoded request to its handler.
///
/// `now` is the instant used for transaction construction; the transport
/// passes the wall clock, tests pass fixed instants.
pub fn dispatch(node: &Node, req: RpcRequest, now: DateTime<Utc>) -> RpcReply {
    match req.method.as_str() {
        "tx.add" => tx_add(node, req.params, now),
        "tx.update" => tx_update(node, req.params, now),
        "tx.remove" => tx_remove(node, req.params),
        "tx.list" => tx_list(node),
        "block.list" => block_list(node),
        "block.get" => block_get(node, req.params),
        other => RpcReply::bad_request(format!("unknown method {other:?}")),
    }
}

fn tx_add(node: &Node, params: Value, now: DateTime<Utc>) -> RpcReply {
    let Ok(p) = serde_json::from_value::<AddTxParams>(params) else {
        return RpcReply::bad_request("invalid params for tx.add");
    };
    if p.sender.is_empty() || p.recipient.is_empty() {
        return RpcReply::bad_request("sender and recipient are required");
    }

    let tx = Transaction::new_unsigned(p.sender, p.recipient, p.payload, p.fee, p.gas, now);
    let tx_id = tx.id.clone();

    match node.mempool().add(tx) {
        Ok(()) => RpcReply::ok(to_value(&AddTxResult { tx_id })),
        Err(err) => RpcReply::bad_request(err.to_string()),
    }
}

fn tx_update(node: &Node, params: Value, now: DateTime<Utc>) -> RpcReply {
    let Ok(p) = serde_json::from_value::<UpdateTxParams>(params) else {
        return RpcReply::bad_request("invalid params for tx.update");
    };
    if p.id.is_empty() {
        return RpcReply::bad_request("id is required");
    }

    // Rebuild the replacement from the stored transaction so the immutable
    // fields cannot drift; only the fee and the scheduling timestamp move.
    let Some(existing) = node.mempool().get(&p.id) else {
        return RpcReply::domain_error(MempoolError::TxNotFound.to_string());
    };

    let updated = Transaction::new_update(
        existing.id,
        existing.sender,
        existing.recipient,
        existing.payload,
        p.fee,
        existing.gas,
        existing.created_at,
        now,
    );

    match node.mempool().update(updated) {
        Ok(()) => RpcReply::ok(to_value(&OkResult { ok: true })),
        Err(err) => RpcReply::domain_error(err.to_string()),
    }
}

fn tx_remove(node: &Node, params: Value) -> RpcReply {
    let Ok(p) = serde_json::from_value::<RemoveTxParams>(params) else {
        return RpcReply::bad_request("invalid params for tx.remove");
    };
    if p.id.is_empty() {
        return RpcReply::bad_request("id is required");
    }

    match node.mempool().remove(&p.id) {
        Ok(()) => RpcReply::ok(to_value(&OkResult { ok: true })),
        Err(err) => RpcReply::domain_error(err.to_string()),
    }
}

fn tx_list(node: &Node) -> RpcReply {
    let mut transactions = node.mempool().list();
    // Present in priority order: the order the next blocks would drain.
    transactions.sort_by(|a, b| b.priority_cmp(a));
    RpcReply::ok(to_value(&ListTxResult { transactions }))
}

fn block_list(node: &Node) -> RpcReply {
    let blocks: Vec<BlockDto> = node
        .chain()
        .snapshot()
        .iter()
        .map(BlockDto::from)
        .collect();
    RpcReply::ok(to_value(&ListBlocksResult { blocks }))
}

fn block_get(node: &Node, params: Value) -> RpcReply {
    let Ok(p) = serde_json::from_value::<BlockGetParams>(params) else {
        return RpcReply::bad_request("invalid params for block.get");
    };

    match node.chain().get(p.height) {
        Some(block) => RpcReply::ok(to_value(&GetBlockResult {
            block: BlockDto::from(&block),
        })),
        None => RpcReply::domain_error("block not found"),
    }
}

/// Serializes a result DTO. These DTOs cannot fail to serialize; the null
/// fallback keeps the path panic-free regardless.
fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
