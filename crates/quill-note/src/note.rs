//! The replicated note: LWW metadata plus RGA body, one instance per replica.
//!
//! Every local edit mints an id from the note's clock, mutates local state,
//! and records a [`NoteOp`] for the transport. Merging folds in another
//! replica's full state and advances the clock past everything it carried,
//! so ids minted afterwards can never collide with or precede merged ones.

use crate::error::{NoteError, Result};
use crate::op::NoteOp;
use crate::snapshot::{MetaRecord, NoteSnapshot};
use quill_core::{Clock, LWWMap, Lattice, SiteId, UniqueId, Value};
use quill_text::RgaText;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Metadata key holding the note title.
pub const TITLE_KEY: &str = "title";
/// Metadata key holding the soft-delete flag. The CRDT state itself is
/// never discarded; deletion of a note is just another replicated write.
pub const DELETED_KEY: &str = "deleted";

const TAG_PREFIX: &str = "tag:";

/// Identity of a note, shared by all of its replicas.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        NoteId(id.into())
    }

    /// Generate a fresh note id.
    pub fn generate() -> Self {
        NoteId(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One replica's state for one note.
#[derive(Clone, Debug)]
pub struct CRDTNote {
    note_id: NoteId,
    site_id: SiteId,
    clock: Clock,
    metadata: LWWMap<String, Value>,
    body: RgaText,
    /// Ops recorded by local edits, drained by the transport.
    pending_ops: Vec<NoteOp>,
}

impl CRDTNote {
    /// Open a replica of an existing note.
    pub fn new(note_id: NoteId, site_id: SiteId) -> Self {
        CRDTNote {
            note_id,
            site_id,
            clock: Clock::new(),
            metadata: LWWMap::new(),
            body: RgaText::new(),
            pending_ops: Vec::new(),
        }
    }

    /// Create a brand new note on this replica.
    pub fn create(site_id: SiteId) -> Self {
        Self::new(NoteId::generate(), site_id)
    }

    pub fn note_id(&self) -> &NoteId {
        &self.note_id
    }

    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn metadata(&self) -> &LWWMap<String, Value> {
        &self.metadata
    }

    pub fn body(&self) -> &RgaText {
        &self.body
    }

    fn mint(&mut self) -> UniqueId {
        UniqueId::mint(&mut self.clock, &self.site_id)
    }

    // ------------------------------------------------------------------
    // Metadata edits
    // ------------------------------------------------------------------

    /// Write a metadata key with a freshly minted id.
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let id = self.mint();
        self.metadata.set(key.clone(), value.clone(), id.clone());
        self.pending_ops.push(NoteOp::SetMeta { key, value, id });
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(&key.to_string())
    }

    pub fn set_title(&mut self, title: &str) {
        self.set_meta(TITLE_KEY, title);
    }

    pub fn title(&self) -> Option<&str> {
        self.meta(TITLE_KEY).and_then(Value::as_str)
    }

    pub fn set_tag(&mut self, name: &str, value: &str) {
        self.set_meta(format!("{}{}", TAG_PREFIX, name), value);
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.meta(&format!("{}{}", TAG_PREFIX, name))
            .and_then(Value::as_str)
    }

    /// Iterate over `(name, value)` for all string-valued tags.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().filter_map(|(key, reg)| {
            let name = key.strip_prefix(TAG_PREFIX)?;
            Some((name, reg.get()?.as_str()?))
        })
    }

    /// Soft-delete: a replicated metadata flag, not a destruction of state.
    pub fn mark_deleted(&mut self) {
        self.set_meta(DELETED_KEY, true);
    }

    pub fn is_deleted(&self) -> bool {
        self.meta(DELETED_KEY).and_then(Value::as_bool).unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Body edits
    // ------------------------------------------------------------------

    /// Insert one character after the node `after` (or the root sentinel),
    /// returning the new character's id.
    pub fn insert_text(&mut self, after: &UniqueId, ch: char) -> Result<UniqueId> {
        let id = self.mint();
        self.body.insert(after, ch, id.clone())?;
        self.pending_ops.push(NoteOp::Insert {
            id: id.clone(),
            origin: after.clone(),
            ch,
        });
        Ok(id)
    }

    /// Tombstone the character with `id`. Unknown ids are a benign no-op.
    pub fn delete_text(&mut self, id: &UniqueId) -> bool {
        if self.body.delete(id) {
            self.pending_ops.push(NoteOp::Delete { id: id.clone() });
            true
        } else {
            false
        }
    }

    /// Insert a string at a visible cursor position. Positions past the end
    /// append.
    pub fn insert_at(&mut self, index: usize, text: &str) -> Result<()> {
        let mut origin = match index.min(self.body.len()) {
            0 => UniqueId::root(),
            i => self
                .body
                .id_at(i - 1)
                .cloned()
                .unwrap_or_else(UniqueId::root),
        };
        for ch in text.chars() {
            origin = self.insert_text(&origin, ch)?;
        }
        Ok(())
    }

    /// Delete up to `len` visible characters starting at `start`, returning
    /// how many were tombstoned.
    pub fn delete_range(&mut self, start: usize, len: usize) -> usize {
        let ids: Vec<UniqueId> = (start..start + len)
            .map_while(|i| self.body.id_at(i).cloned())
            .collect();
        let mut deleted = 0;
        for id in ids {
            if self.delete_text(&id) {
                deleted += 1;
            }
        }
        deleted
    }

    /// The visible body text.
    pub fn text(&self) -> String {
        self.body.to_string()
    }

    // ------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------

    /// Drain the ops recorded by local edits since the last drain.
    pub fn take_ops(&mut self) -> Vec<NoteOp> {
        std::mem::take(&mut self.pending_ops)
    }

    /// Apply one remote op. Duplicates are no-ops; an insert whose anchor
    /// has not arrived yet fails with the recoverable
    /// [`quill_text::TextError::UnknownOrigin`] and should be re-delivered.
    pub fn apply_op(&mut self, op: &NoteOp) -> Result<()> {
        self.clock.observe(op.id().time);
        match op {
            NoteOp::Insert { id, origin, ch } => {
                self.body.insert(origin, *ch, id.clone())?;
            }
            NoteOp::Delete { id } => {
                self.body.delete(id);
            }
            NoteOp::SetMeta { key, value, id } => {
                self.metadata
                    .merge_entry(key.clone(), value.clone(), id.clone());
            }
        }
        Ok(())
    }

    /// The highest logical time present anywhere in this replica's state.
    pub fn max_time(&self) -> u64 {
        let meta_max = self
            .metadata
            .iter()
            .map(|(_, reg)| reg.id().time)
            .max()
            .unwrap_or(0);
        self.clock.time().max(self.body.max_time()).max(meta_max)
    }

    /// Fold another replica's full state into this one.
    ///
    /// The other replica's site id may differ; its note id must not. The
    /// body merges first (it is the only fallible part, and it validates
    /// before mutating), then the metadata, then the clock observes the
    /// highest time seen so future local ids dominate everything merged.
    pub fn merge(&mut self, other: &CRDTNote) -> Result<()> {
        if self.note_id != other.note_id {
            return Err(NoteError::NoteMismatch {
                ours: self.note_id.to_string(),
                theirs: other.note_id.to_string(),
            });
        }
        self.body.merge(&other.body)?;
        self.metadata.join_assign(&other.metadata);
        self.clock.observe(other.max_time());
        Ok(())
    }

    /// Portable full-state form for transport or persistence. Metadata and
    /// body sections are emitted in convergent order, so two replicas that
    /// have merged each other serialize those sections identically.
    pub fn snapshot(&self) -> NoteSnapshot {
        NoteSnapshot {
            note_id: self.note_id.clone(),
            site_id: self.site_id.clone(),
            clock: self.clock.clone(),
            metadata: self
                .metadata
                .iter()
                .filter_map(|(key, reg)| {
                    Some(MetaRecord {
                        key: key.clone(),
                        value: reg.get()?.clone(),
                        id: reg.id().clone(),
                    })
                })
                .collect(),
            body: self.body.iter_nodes().cloned().collect(),
        }
    }

    /// Rebuild a replica from a snapshot. A malformed snapshot (dangling
    /// origin, divergent duplicate id) is reported and nothing is returned.
    pub fn from_snapshot(snap: &NoteSnapshot) -> Result<Self> {
        let mut note = CRDTNote::new(snap.note_id.clone(), snap.site_id.clone());
        note.clock = snap.clock.clone();
        for rec in &snap.metadata {
            note.metadata
                .merge_entry(rec.key.clone(), rec.value.clone(), rec.id.clone());
        }
        // Ascending id order is always a valid integration order.
        let mut records = snap.body.clone();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        for node in records {
            note.body.insert_node(node)?;
        }
        Ok(note)
    }

    /// Merge a received snapshot. Decode/validation failures leave local
    /// state untouched.
    pub fn merge_snapshot(&mut self, snap: &NoteSnapshot) -> Result<()> {
        let other = CRDTNote::from_snapshot(snap)?;
        self.merge(&other)
    }
}
