//! Interning tables
//!
//! Nodes are interned by index (1-based, monotonic) and strings by value
//! (0-based, insertion order). Each table keeps a queue of entries not yet
//! sent to the main thread; `consume` drains it.

use std::collections::HashMap;

use crate::node::Node;
use crate::protocol::Phase;
use crate::{DomError, DomResult, NodeIndex};

/// Node arena keyed by wire index
#[derive(Debug, Default)]
pub struct NodeStorage {
    nodes: HashMap<NodeIndex, Node>,
    count: u32,
    pending: Vec<NodeIndex>,
}

impl NodeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next index.
    ///
    /// Nodes created before hydration are already mirrored on the main
    /// thread, so only later nodes are queued for transfer.
    pub(crate) fn allocate(&mut self, phase: Phase) -> NodeIndex {
        self.count += 1;
        let index = NodeIndex(self.count);
        if phase > Phase::Initializing {
            self.pending.push(index);
        }
        index
    }

    /// Use an index chosen by the main thread. Only valid while initializing.
    pub(crate) fn allocate_override(&mut self, phase: Phase, index: u32) -> DomResult<NodeIndex> {
        if phase != Phase::Initializing {
            return Err(DomError::IndexOverride { index, count: self.count });
        }
        let index = NodeIndex(index);
        if index.0 == 0 || self.nodes.contains_key(&index) {
            tracing::warn!("Rejected hydration index {} (counter at {})", index.0, self.count);
            return Err(DomError::IndexCollision(index.0));
        }
        self.count = self.count.max(index.0);
        Ok(index)
    }

    pub(crate) fn insert(&mut self, node: Node) {
        self.nodes.insert(node.index, node);
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(&index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(&index)
    }

    pub fn contains(&self, index: NodeIndex) -> bool {
        self.nodes.contains_key(&index)
    }

    /// Highest index handed out so far
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drain the nodes created since the last flush, in creation order
    pub fn consume(&mut self) -> Vec<NodeIndex> {
        std::mem::take(&mut self.pending)
    }
}

/// String interner shared with the main thread
#[derive(Debug, Default)]
pub struct StringStorage {
    indices: HashMap<String, u32>,
    strings: Vec<String>,
    pending: Vec<String>,
}

impl StringStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its index.
    /// If the string is already interned, returns the existing index.
    pub fn store(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.indices.get(value) {
            return index;
        }

        let index = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.indices.insert(value.to_string(), index);
        self.pending.push(value.to_string());
        index
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Index of an already interned string
    pub fn index_of(&self, value: &str) -> Option<u32> {
        self.indices.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Drain the strings interned since the last flush
    pub fn consume(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut strings = StringStorage::new();
        let id1 = strings.store("hello");
        let id2 = strings.store("hello");
        assert_eq!(id1, id2);
        assert_eq!(strings.consume(), vec!["hello".to_string()]);
        assert!(strings.consume().is_empty());
    }

    #[test]
    fn test_string_indices_follow_insertion_order() {
        let mut strings = StringStorage::new();
        assert_eq!(strings.store("div"), 0);
        assert_eq!(strings.store("span"), 1);
        assert_eq!(strings.get(1), Some("span"));
        assert_eq!(strings.get(7), None);
    }

    #[test]
    fn test_allocate_is_one_based() {
        let mut nodes = NodeStorage::new();
        assert_eq!(nodes.allocate(Phase::Initializing), NodeIndex(1));
        assert_eq!(nodes.allocate(Phase::Initializing), NodeIndex(2));
        // Pre-hydration nodes are never queued
        assert!(nodes.consume().is_empty());
        assert!(nodes.get(NodeIndex(0)).is_none());
    }

    #[test]
    fn test_allocate_queues_after_hydration() {
        let mut nodes = NodeStorage::new();
        nodes.allocate(Phase::Initializing);
        let index = nodes.allocate(Phase::Hydrating);
        assert_eq!(nodes.consume(), vec![index]);
    }

    #[test]
    fn test_override_advances_counter() {
        let mut nodes = NodeStorage::new();
        assert_eq!(nodes.allocate_override(Phase::Initializing, 10).unwrap(), NodeIndex(10));
        assert_eq!(nodes.allocate(Phase::Initializing), NodeIndex(11));
        // A lower override leaves the counter alone
        nodes.allocate_override(Phase::Initializing, 4).unwrap();
        assert_eq!(nodes.count(), 11);
    }

    #[test]
    fn test_override_rejected_after_initializing() {
        let mut nodes = NodeStorage::new();
        let err = nodes.allocate_override(Phase::Hydrating, 3).unwrap_err();
        assert_eq!(err, DomError::IndexOverride { index: 3, count: 0 });
    }
}
