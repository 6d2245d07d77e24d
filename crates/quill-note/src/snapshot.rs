//! Portable full-state snapshot of a note.
//!
//! The wire form carries the replica identity, both clock counters, the
//! metadata map as `(key, value, id)` records, and the body as
//! `(id, origin, value, tombstone)` node records. All integers are exact;
//! ids are the structured triple, never a lossy numeric encoding.

use crate::error::Result;
use crate::note::NoteId;
use quill_core::{Clock, SiteId, UniqueId, Value};
use quill_text::TextNode;
use serde::{Deserialize, Serialize};

/// One metadata entry in the wire form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub key: String,
    pub value: Value,
    pub id: UniqueId,
}

/// Full state of one note replica, ready for transport or persistence.
///
/// The metadata and body sections are written in convergent order
/// (key-sorted and linearized respectively), so converged replicas produce
/// identical sections; only `site_id` and `clock` are replica-local.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteSnapshot {
    pub note_id: NoteId,
    pub site_id: SiteId,
    pub clock: Clock,
    pub metadata: Vec<MetaRecord>,
    pub body: Vec<TextNode>,
}

impl NoteSnapshot {
    /// Encode to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON. On failure nothing is applied anywhere; the error
    /// carries the decoder's diagnostic.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// True when two snapshots describe the same converged note content,
    /// ignoring the replica-local site id and clock.
    pub fn same_content(&self, other: &NoteSnapshot) -> bool {
        self.note_id == other.note_id
            && self.metadata == other.metadata
            && self.body == other.body
    }
}
