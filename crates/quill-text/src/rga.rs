//! RGA text - collaborative text CRDT based on the Replicated Growable Array.
//!
//! The structure is an append-only set of character nodes plus an
//! incrementally maintained origin→children index. Each node remembers the
//! id of the node it was inserted after (its origin); linearizing is a
//! depth-first walk from the root sentinel visiting each node's children in
//! descending id order. Deletion leaves a tombstone so concurrent inserts
//! anchored at the deleted character still resolve to the same position on
//! every replica.

use crate::error::{Result, TextError};
use quill_core::UniqueId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single character node. `id` and `origin` never change after creation;
/// `tombstone` only ever transitions false → true.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextNode {
    pub id: UniqueId,
    pub origin: UniqueId,
    pub ch: char,
    pub tombstone: bool,
}

impl TextNode {
    pub fn new(id: UniqueId, origin: UniqueId, ch: char) -> Self {
        TextNode {
            id,
            origin,
            ch,
            tombstone: false,
        }
    }
}

/// Replicated Growable Array over characters.
#[derive(Clone, Debug)]
pub struct RgaText {
    /// All nodes ever created, indexed by id. Append-only: tombstoned nodes
    /// stay to anchor concurrent inserts.
    nodes: HashMap<UniqueId, TextNode>,
    /// Origin id → child ids, kept sorted descending. Maintained on insert
    /// so reads never re-derive it.
    children: HashMap<UniqueId, Vec<UniqueId>>,
}

impl RgaText {
    /// Create an empty text.
    pub fn new() -> Self {
        let mut children = HashMap::new();
        children.insert(UniqueId::root(), Vec::new());
        RgaText {
            nodes: HashMap::new(),
            children,
        }
    }

    /// Insert `ch` with identifier `id`, anchored after `origin`.
    ///
    /// `origin` must be the root id or a known node id; a tombstoned anchor
    /// is legal (that is exactly how concurrent inserts near a deletion
    /// converge). Re-applying an insert the structure already holds is an
    /// idempotent no-op; the same id with a different payload is an error.
    pub fn insert(&mut self, origin: &UniqueId, ch: char, id: UniqueId) -> Result<()> {
        self.insert_node(TextNode::new(id, origin.clone(), ch))
    }

    /// Insert a full node record, as found in snapshots and merges. Carries
    /// the tombstone flag through, so a deleted node round-trips deleted.
    pub fn insert_node(&mut self, node: TextNode) -> Result<()> {
        if let Some(existing) = self.nodes.get_mut(&node.id) {
            if existing.origin != node.origin || existing.ch != node.ch {
                return Err(TextError::DuplicateId(node.id));
            }
            if node.tombstone {
                existing.tombstone = true;
            }
            return Ok(());
        }
        if !node.origin.is_root() && !self.nodes.contains_key(&node.origin) {
            return Err(TextError::UnknownOrigin {
                id: node.id,
                origin: node.origin,
            });
        }
        self.integrate(node);
        Ok(())
    }

    /// Mark the node with `id` deleted. Unknown ids are a benign no-op
    /// (returns `false`): over an at-least-once transport the delete may
    /// arrive before its insert, and a later re-delivery applies normally.
    pub fn delete(&mut self, id: &UniqueId) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.tombstone = true;
                true
            }
            None => false,
        }
    }

    /// Fold another replica's full state into this one.
    ///
    /// Node sets are unioned by id and tombstones combined by logical OR
    /// (deletion is sticky). Any shared id with a divergent payload aborts
    /// before any local mutation, leaving this replica unchanged.
    pub fn merge(&mut self, other: &RgaText) -> Result<()> {
        for (id, theirs) in &other.nodes {
            if let Some(mine) = self.nodes.get(id) {
                if mine.origin != theirs.origin || mine.ch != theirs.ch {
                    return Err(TextError::DuplicateId(id.clone()));
                }
            }
        }

        // Ascending id order is a valid integration order: an origin is
        // always minted strictly before its children. For already-known ids
        // insert_node just ORs the tombstone flag.
        let mut incoming: Vec<&TextNode> = other.nodes.values().collect();
        incoming.sort_by(|a, b| a.id.cmp(&b.id));

        for theirs in incoming {
            self.insert_node(theirs.clone())?;
        }
        Ok(())
    }

    /// Look up a node by id.
    pub fn get(&self, id: &UniqueId) -> Option<&TextNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &UniqueId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of visible (non-tombstoned) characters.
    pub fn len(&self) -> usize {
        self.nodes.values().filter(|n| !n.tombstone).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total node count including tombstones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Highest logical time among all node ids; zero when empty. The note
    /// clock observes this on merge.
    pub fn max_time(&self) -> u64 {
        self.nodes.keys().map(|id| id.time).max().unwrap_or(0)
    }

    /// Iterate over visible characters in document order.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.iter_nodes().filter(|n| !n.tombstone).map(|n| n.ch)
    }

    /// The id of the visible character at `index`.
    pub fn id_at(&self, index: usize) -> Option<&UniqueId> {
        self.visible_ids().nth(index)
    }

    /// The visible position of the node with `id`, or `None` if the node is
    /// unknown or tombstoned.
    pub fn position_of(&self, id: &UniqueId) -> Option<usize> {
        self.visible_ids().position(|i| i == id)
    }

    /// Iterate over all nodes (tombstones included) in document order. This
    /// order is convergent, so it doubles as the canonical snapshot order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &TextNode> + '_ {
        NodeIter {
            text: self,
            stack: vec![UniqueId::root()],
        }
    }

    fn visible_ids(&self) -> impl Iterator<Item = &UniqueId> + '_ {
        self.iter_nodes().filter(|n| !n.tombstone).map(|n| &n.id)
    }

    /// Add a new node to the set and to its origin's child list, keeping
    /// siblings sorted descending by id.
    fn integrate(&mut self, node: TextNode) {
        let id = node.id.clone();
        let origin = node.origin.clone();
        self.nodes.insert(id.clone(), node);

        let siblings = self.children.entry(origin).or_default();
        let pos = siblings
            .iter()
            .position(|c| c < &id)
            .unwrap_or(siblings.len());
        siblings.insert(pos, id.clone());

        self.children.entry(id).or_default();
    }
}

/// Depth-first traversal in document order. Origins are always minted
/// before their children, so the origin graph is acyclic and a plain stack
/// suffices.
struct NodeIter<'a> {
    text: &'a RgaText,
    stack: Vec<UniqueId>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a TextNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(kids) = self.text.children.get(&id) {
                // Reversed push so the highest-id sibling pops first.
                for child in kids.iter().rev() {
                    self.stack.push(child.clone());
                }
            }
            if !id.is_root() {
                return self.text.nodes.get(&id);
            }
        }
        None
    }
}

impl Default for RgaText {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RgaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.chars() {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

/// Semantic equality: same node set, same payloads, same tombstones.
impl PartialEq for RgaText {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Eq for RgaText {}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Clock, SiteId};

    struct Site {
        clock: Clock,
        site: SiteId,
    }

    impl Site {
        fn new(name: &str) -> Self {
            Site {
                clock: Clock::new(),
                site: SiteId::new(name),
            }
        }

        fn mint(&mut self) -> UniqueId {
            UniqueId::mint(&mut self.clock, &self.site)
        }

        /// Append `text` to `rga`, chaining each character after the last.
        fn type_text(&mut self, rga: &mut RgaText, after: &UniqueId, text: &str) -> UniqueId {
            let mut origin = after.clone();
            for ch in text.chars() {
                let id = self.mint();
                rga.insert(&origin, ch, id.clone()).unwrap();
                origin = id;
            }
            origin
        }
    }

    #[test]
    fn test_sequential_insert() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "Hello");

        assert_eq!(rga.to_string(), "Hello");
        assert_eq!(rga.len(), 5);
    }

    #[test]
    fn test_insert_in_middle() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "Helo");

        let anchor = rga.id_at(1).unwrap().clone(); // after 'e'
        let id = site.mint();
        rga.insert(&anchor, 'l', id).unwrap();
        assert_eq!(rga.to_string(), "Hello");
    }

    #[test]
    fn test_unknown_origin_is_recoverable_error() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();

        let ghost = UniqueId::new(99, SiteId::new("ghost"), 1);
        let id = site.mint();
        let err = rga.insert(&ghost, 'x', id.clone()).unwrap_err();
        assert!(matches!(err, TextError::UnknownOrigin { .. }));

        // State unchanged; the same insert succeeds once the anchor exists.
        assert_eq!(rga.node_count(), 0);
        rga.insert(&UniqueId::root(), 'g', ghost.clone()).unwrap();
        rga.insert(&ghost, 'x', id).unwrap();
        assert_eq!(rga.to_string(), "gx");
    }

    #[test]
    fn test_reinsert_same_payload_is_idempotent() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        let id = site.mint();

        rga.insert(&UniqueId::root(), 'a', id.clone()).unwrap();
        rga.insert(&UniqueId::root(), 'a', id).unwrap();
        assert_eq!(rga.to_string(), "a");
        assert_eq!(rga.node_count(), 1);
    }

    #[test]
    fn test_reinsert_divergent_payload_is_fatal() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        let id = site.mint();

        rga.insert(&UniqueId::root(), 'a', id.clone()).unwrap();
        let err = rga.insert(&UniqueId::root(), 'b', id.clone()).unwrap_err();
        assert_eq!(err, TextError::DuplicateId(id));
    }

    #[test]
    fn test_delete_leaves_tombstone() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "abc");

        let b = rga.id_at(1).unwrap().clone();
        assert!(rga.delete(&b));
        assert_eq!(rga.to_string(), "ac");
        assert_eq!(rga.len(), 2);
        // The node stays in the set as a causal anchor.
        assert_eq!(rga.node_count(), 3);
        assert!(rga.get(&b).unwrap().tombstone);
    }

    #[test]
    fn test_delete_unknown_id_is_noop() {
        let mut rga = RgaText::new();
        let ghost = UniqueId::new(5, SiteId::new("x"), 1);
        assert!(!rga.delete(&ghost));
        assert_eq!(rga.node_count(), 0);
    }

    #[test]
    fn test_insert_after_tombstoned_anchor() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "ab");

        let a = rga.id_at(0).unwrap().clone();
        rga.delete(&a);

        let id = site.mint();
        rga.insert(&a, 'x', id).unwrap();
        // 'x' lands where 'a' used to be.
        assert_eq!(rga.to_string(), "xb");
    }

    #[test]
    fn test_concurrent_siblings_order_descending() {
        // Two sites insert at the head from the same empty start.
        let mut a = Site::new("a");
        let mut b = Site::new("b");
        let mut rga_a = RgaText::new();
        let mut rga_b = RgaText::new();

        a.type_text(&mut rga_a, &UniqueId::root(), "Hi");
        b.type_text(&mut rga_b, &UniqueId::root(), "Yo");

        rga_a.merge(&rga_b).unwrap();
        rga_b.merge(&rga_a).unwrap();

        assert_eq!(rga_a.to_string(), rga_b.to_string());
        // Site "b" minted the greater head id, so its run sorts first.
        assert_eq!(rga_a.to_string(), "YoHi");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "note");

        let copy = rga.clone();
        rga.merge(&copy).unwrap();
        rga.merge(&copy).unwrap();
        assert_eq!(rga, copy);
    }

    #[test]
    fn test_merge_tombstone_wins_over_stale_live_node() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "hi");

        let stale = rga.clone(); // pre-delete snapshot
        let h = rga.id_at(0).unwrap().clone();
        rga.delete(&h);

        rga.merge(&stale).unwrap();
        assert_eq!(rga.to_string(), "i");
        assert!(rga.get(&h).unwrap().tombstone);
    }

    #[test]
    fn test_merge_divergent_payload_leaves_state_unchanged() {
        let id = UniqueId::new(1, SiteId::new("a"), 1);

        let mut rga1 = RgaText::new();
        rga1.insert(&UniqueId::root(), 'x', id.clone()).unwrap();

        let mut rga2 = RgaText::new();
        rga2.insert(&UniqueId::root(), 'y', id.clone()).unwrap();

        let before = rga1.clone();
        assert_eq!(rga1.merge(&rga2).unwrap_err(), TextError::DuplicateId(id));
        assert_eq!(rga1, before);
    }

    #[test]
    fn test_node_records_json_roundtrip() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "abc");
        let b = rga.id_at(1).unwrap().clone();
        rga.delete(&b);

        // Node records in document order are the state's wire form.
        let records: Vec<TextNode> = rga.iter_nodes().cloned().collect();
        let json = serde_json::to_string(&records).unwrap();
        let mut decoded: Vec<TextNode> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, records);

        // Rebuilding from the records reproduces the state, tombstone
        // included. Ascending id order is always a valid integration order.
        decoded.sort_by(|a, b| a.id.cmp(&b.id));
        let mut restored = RgaText::new();
        for node in decoded {
            restored.insert_node(node).unwrap();
        }
        assert_eq!(restored, rga);
        assert_eq!(restored.to_string(), "ac");
        assert!(restored.get(&b).unwrap().tombstone);
    }

    #[test]
    fn test_position_and_id_roundtrip() {
        let mut site = Site::new("a");
        let mut rga = RgaText::new();
        site.type_text(&mut rga, &UniqueId::root(), "Hello");

        let id = rga.id_at(2).unwrap().clone();
        assert_eq!(rga.position_of(&id), Some(2));

        rga.delete(&id);
        assert_eq!(rga.position_of(&id), None);
    }
}
