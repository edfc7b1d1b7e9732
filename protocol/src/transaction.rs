//! # Transaction Model
//!
//! A transaction's identity is derived from its immutable fields only:
//! sender, recipient, payload, and the creation instant. The mutable
//! attributes — `fee` and the scheduling `timestamp` — can change over a
//! transaction's mempool lifetime (fee bumps), so they must never feed the
//! id. `gas` is also excluded: updates are not allowed to change it, but
//! keeping it out of the digest means the rule is structural rather than
//! a matter of caller discipline.
//!
//! ## Identity
//!
//! ```text
//! id = hex( SHA-256( sender | recipient | payload | created_at_nanos ) )
//! ```
//!
//! Fields are joined with a literal `|` and the creation instant is the
//! base-10 nanoseconds-since-epoch integer. Two transactions with identical
//! immutable fields created within the same nanosecond therefore collide;
//! the mempool rejects the second as a duplicate.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest identifying a transaction.
pub type TxId = String;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A pending transaction, as held in the mempool and included in blocks.
///
/// `id`, `sender`, `recipient`, `payload`, and `created_at` are immutable
/// after construction. `fee` and `timestamp` change through the update
/// workflow; `gas` is carried along unchanged.
///
/// The wire field names (`ID`, `Sender`, ...) are part of the RPC contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    /// Deterministic identity; see [`derive_id`].
    #[serde(rename = "ID")]
    pub id: TxId,
    /// Originating address. Opaque to the node.
    pub sender: String,
    /// Destination address. Opaque to the node.
    pub recipient: String,
    /// Priority scalar. Higher fee wins block inclusion.
    pub fee: u64,
    /// Resource cost counted against a block's gas limit.
    pub gas: u64,
    /// Opaque application data.
    pub payload: String,
    /// Creation instant. Immutable; participates in the id.
    pub created_at: DateTime<Utc>,
    /// Scheduling instant, refreshed on update. Breaks fee ties in the
    /// priority order; never part of the id.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Constructs a transaction for the add workflow.
    ///
    /// The supplied `now` becomes both `created_at` (permanently) and the
    /// initial scheduling `timestamp`. Callers at the boundary pass
    /// `Utc::now()`; tests inject fixed instants.
    pub fn new_unsigned(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: impl Into<String>,
        fee: u64,
        gas: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let sender = sender.into();
        let recipient = recipient.into();
        let payload = payload.into();
        let id = derive_id(&sender, &recipient, &payload, now);

        Self {
            id,
            sender,
            recipient,
            fee,
            gas,
            payload,
            created_at: now,
            timestamp: now,
        }
    }

    /// Constructs a replacement transaction for the update workflow.
    ///
    /// `id` and `created_at` are preserved from the stored transaction and
    /// the scheduling `timestamp` is refreshed to `now`. Callers are
    /// expected to pass the stored immutable fields through unchanged; this
    /// layer does not re-derive or verify the id.
    #[allow(clippy::too_many_arguments)]
    pub fn new_update(
        id: TxId,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: impl Into<String>,
        fee: u64,
        gas: u64,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender: sender.into(),
            recipient: recipient.into(),
            fee,
            gas,
            payload: payload.into(),
            created_at,
            timestamp: now,
        }
    }

    /// Compares two transactions by mempool priority.
    ///
    /// `Greater` means `self` should be included first: higher fee wins,
    /// then the earlier scheduling timestamp, then the lexicographically
    /// smaller id. This is a strict total order — no two distinct
    /// transactions compare equal, because ids are unique.
    pub fn priority_cmp(&self, other: &Transaction) -> Ordering {
        self.fee
            .cmp(&other.fee)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.id.cmp(&self.id))
    }
}

// ---------------------------------------------------------------------------
// Identity derivation
// ---------------------------------------------------------------------------

/// Derives the deterministic transaction id from the immutable fields.
///
/// Pure and referentially transparent: identical inputs yield identical
/// output on any platform, and any single-byte change — including a
/// one-nanosecond difference in `created_at` — changes the digest.
pub fn derive_id(
    sender: &str,
    recipient: &str,
    payload: &str,
    created_at: DateTime<Utc>,
) -> TxId {
    let raw = format!(
        "{sender}|{recipient}|{payload}|{}",
        unix_nanos(created_at)
    );
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Renders an instant as nanoseconds since the UNIX epoch.
fn unix_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .expect("instant outside the nanosecond-representable range")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
