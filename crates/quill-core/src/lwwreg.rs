//! Last-Write-Wins (LWW) Register CRDT
//!
//! The register retains whichever value carries the greater [`UniqueId`].
//! Because the id order is total, every replica resolves a concurrent pair
//! of writes the same way; the clock guarantees a local write always
//! outranks everything the replica has already seen.

use crate::id::UniqueId;
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};

/// A Last-Write-Wins register.
///
/// An empty register carries the root id, which is below every minted id,
/// so any real write wins against it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LWWRegister<V: Clone + PartialEq> {
    value: Option<V>,
    id: UniqueId,
}

impl<V: Clone + PartialEq> LWWRegister<V> {
    /// Create an empty register.
    pub fn new() -> Self {
        LWWRegister {
            value: None,
            id: UniqueId::root(),
        }
    }

    /// Restore a register from its stored parts.
    pub fn from_parts(value: V, id: UniqueId) -> Self {
        LWWRegister {
            value: Some(value),
            id,
        }
    }

    /// Replace the stored pair unconditionally. The caller must mint `id`
    /// from the local clock, which makes it newer than any prior state.
    pub fn write(&mut self, value: V, id: UniqueId) {
        self.value = Some(value);
        self.id = id;
    }

    /// The current value, if any write has ever been applied.
    pub fn get(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// The id of the winning write.
    pub fn id(&self) -> &UniqueId {
        &self.id
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

impl<V: Clone + PartialEq> Default for LWWRegister<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> Lattice for LWWRegister<V> {
    fn bottom() -> Self {
        Self::new()
    }

    /// Keep whichever side carries the greater id. Exactly equal ids must
    /// carry equal state; anything else means the uniqueness guarantee was
    /// broken upstream (a fabricated or duplicated id).
    fn join(&self, other: &Self) -> Self {
        if other.id > self.id {
            other.clone()
        } else {
            debug_assert!(
                self.id != other.id || self.value == other.value,
                "divergent payloads for register id {}",
                self.id
            );
            self.clone()
        }
    }
}
