//! LWW-Map CRDT - a map where every key is an independent LWW register.
//!
//! Used for note metadata (title, tags, flags). Keys are never removed;
//! each key's register resolves its own conflicts, and merging a key that
//! only one side knows about keeps the present value (the absent side
//! behaves as the bottom register, whose root id loses to any real write).

use crate::id::UniqueId;
use crate::lattice::Lattice;
use crate::lwwreg::LWWRegister;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Map of keys to LWW registers. No ordering over keys is guaranteed; the
/// BTreeMap is an implementation detail that keeps serialization stable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LWWMap<K: Ord + Clone, V: Clone + PartialEq> {
    entries: BTreeMap<K, LWWRegister<V>>,
}

impl<K: Ord + Clone, V: Clone + PartialEq> LWWMap<K, V> {
    /// Create an empty map.
    pub fn new() -> Self {
        LWWMap {
            entries: BTreeMap::new(),
        }
    }

    /// Write `value` under `key`. The caller must mint `id` from the local
    /// clock before calling.
    pub fn set(&mut self, key: K, value: V, id: UniqueId) {
        self.entries
            .entry(key)
            .or_insert_with(LWWRegister::new)
            .write(value, id);
    }

    /// The current value at `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).and_then(|reg| reg.get())
    }

    /// The full register at `key`, if present.
    pub fn register(&self, key: &K) -> Option<&LWWRegister<V>> {
        self.entries.get(key)
    }

    /// Fold one incoming `(value, id)` pair into the register at `key`,
    /// using LWW resolution rather than an unconditional write. This is the
    /// entry point for remote operations and snapshot records.
    ///
    /// An incoming id equal to the present one but carrying a different
    /// value means the mint-uniqueness guarantee was broken upstream. The
    /// register join debug-asserts that case; release builds keep the
    /// present value. Callers that accept untrusted state and need the
    /// collision surfaced must validate ids before folding, as the text
    /// merge does.
    pub fn merge_entry(&mut self, key: K, value: V, id: UniqueId) {
        let incoming = LWWRegister::from_parts(value, id);
        self.entries
            .entry(key)
            .or_insert_with(LWWRegister::new)
            .join_assign(&incoming);
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over keys and their registers.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &LWWRegister<V>)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> Default for LWWMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> Lattice for LWWMap<K, V> {
    fn bottom() -> Self {
        Self::new()
    }

    /// Join every key present in either map; keys known to only one side
    /// keep that side's register.
    fn join(&self, other: &Self) -> Self {
        let mut entries = self.entries.clone();
        for (key, reg) in &other.entries {
            entries
                .entry(key.clone())
                .and_modify(|mine| mine.join_assign(reg))
                .or_insert_with(|| reg.clone());
        }
        LWWMap { entries }
    }
}
