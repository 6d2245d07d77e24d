//! The append-only operation log entries a note produces and consumes.
//!
//! Ops are the fine-grained alternative to full-state snapshots: a local
//! edit records one, the transport ships it with at-least-once semantics,
//! and [`crate::CRDTNote::apply_op`] folds it in on the other side.

use quill_core::{UniqueId, Value};
use serde::{Deserialize, Serialize};

/// One replicated edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NoteOp {
    /// A character inserted after `origin`.
    Insert {
        id: UniqueId,
        origin: UniqueId,
        ch: char,
    },
    /// A character tombstoned.
    Delete { id: UniqueId },
    /// A metadata key written.
    SetMeta {
        key: String,
        value: Value,
        id: UniqueId,
    },
}

impl NoteOp {
    /// The id that timestamps this op; the receiver's clock observes it.
    pub fn id(&self) -> &UniqueId {
        match self {
            NoteOp::Insert { id, .. } => id,
            NoteOp::Delete { id } => id,
            NoteOp::SetMeta { id, .. } => id,
        }
    }
}
