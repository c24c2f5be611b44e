//! DOM Node Operations
//!
//! Tree mutation (insertBefore, appendChild, removeChild, replaceChild),
//! navigation, text content, character data and cloning. Every structural
//! change is mirrored as a `CHILD_LIST` mutation.

use crate::document::Document;
use crate::html::{self, ElementClass};
use crate::node::{NodeData, NodeType};
use crate::observer::{MutationRecord, MutationType};
use crate::protocol::TransferMutation;
use crate::{DomError, DomResult, NodeIndex};

/// Node operations trait
///
/// Invalid references are tolerated rather than reported: inserting before
/// a node that is not a child, or replacing into a foreign parent, leaves
/// the tree untouched. Only unknown indices are errors.
pub trait NodeOperations {
    /// Insert `child` before `reference`, or append when `reference` is
    /// `None`. Returns `None` when nothing was inserted, and for fragments.
    fn insert_before(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
        reference: Option<NodeIndex>,
    ) -> DomResult<Option<NodeIndex>>;

    /// Append `child` as the last child of `parent`
    fn append_child(&mut self, parent: NodeIndex, child: NodeIndex) -> DomResult<NodeIndex>;

    /// Remove `child`, returning `None` if it is not a child of `parent`
    fn remove_child(&mut self, parent: NodeIndex, child: NodeIndex) -> DomResult<Option<NodeIndex>>;

    /// Replace `old_child` with `new_child`, returning `old_child`
    fn replace_child(
        &mut self,
        parent: NodeIndex,
        new_child: NodeIndex,
        old_child: NodeIndex,
    ) -> DomResult<NodeIndex>;

    /// Detach `node` from its parent, if any
    fn remove(&mut self, node: NodeIndex) -> DomResult<()>;

    /// Clone a node, with its subtree when `deep`
    fn clone_node(&mut self, node: NodeIndex, deep: bool) -> DomResult<NodeIndex>;
}

impl NodeOperations for Document {
    fn insert_before(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
        reference: Option<NodeIndex>,
    ) -> DomResult<Option<NodeIndex>> {
        if child == parent {
            return Ok(Some(child));
        }
        let child_type = self.try_node(child)?.node_type;
        self.try_node(parent)?;

        if child_type == NodeType::DocumentFragment {
            for node in self.try_node(child)?.children.clone() {
                self.insert_before(parent, node, reference)?;
            }
            return Ok(None);
        }

        let Some(reference) = reference else {
            return self.append_child(parent, child).map(Some);
        };
        if reference == child {
            return Ok(Some(child));
        }
        if !self.try_node(parent)?.children.contains(&reference) || self.contains(child, parent) {
            return Ok(None);
        }

        self.remove(child)?;
        // Removal may have shifted the reference
        let parent_node = self.node_mut(parent)?;
        let position = parent_node
            .children
            .iter()
            .position(|&node| node == reference)
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(position, child);
        self.inserted_node(parent, child)?;

        self.mutate(
            MutationRecord {
                added_nodes: vec![child],
                next_sibling: Some(reference),
                ..MutationRecord::new(MutationType::ChildList, parent)
            },
            TransferMutation::ChildList {
                target: parent,
                next_sibling: Some(reference),
                previous_sibling: None,
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(Some(child))
    }

    fn append_child(&mut self, parent: NodeIndex, child: NodeIndex) -> DomResult<NodeIndex> {
        let child_type = self.try_node(child)?.node_type;
        self.try_node(parent)?;

        if child_type == NodeType::DocumentFragment {
            for node in self.try_node(child)?.children.clone() {
                self.append_child(parent, node)?;
            }
            return Ok(child);
        }
        if self.contains(child, parent) {
            tracing::debug!("Ignoring append of {} into its own subtree {}", child, parent);
            return Ok(child);
        }

        self.remove(child)?;
        let parent_node = self.node_mut(parent)?;
        parent_node.children.push(child);
        let previous_sibling = parent_node.children.iter().rev().nth(1).copied();
        self.inserted_node(parent, child)?;

        self.mutate(
            MutationRecord {
                added_nodes: vec![child],
                previous_sibling,
                ..MutationRecord::new(MutationType::ChildList, parent)
            },
            TransferMutation::ChildList {
                target: parent,
                next_sibling: None,
                previous_sibling,
                added: vec![child],
                removed: Vec::new(),
            },
        );
        Ok(child)
    }

    fn remove_child(
        &mut self,
        parent: NodeIndex,
        child: NodeIndex,
    ) -> DomResult<Option<NodeIndex>> {
        let parent_node = self.node_mut(parent)?;
        let Some(position) = parent_node.children.iter().position(|&node| node == child) else {
            return Ok(None);
        };
        parent_node.children.remove(position);
        self.removed_node(parent, child)?;

        self.mutate(
            MutationRecord {
                removed_nodes: vec![child],
                ..MutationRecord::new(MutationType::ChildList, parent)
            },
            TransferMutation::ChildList {
                target: parent,
                next_sibling: None,
                previous_sibling: None,
                added: Vec::new(),
                removed: vec![child],
            },
        );
        Ok(Some(child))
    }

    fn replace_child(
        &mut self,
        parent: NodeIndex,
        new_child: NodeIndex,
        old_child: NodeIndex,
    ) -> DomResult<NodeIndex> {
        self.try_node(new_child)?;
        if new_child == old_child
            || self.try_node(old_child)?.parent != Some(parent)
            || self.contains(new_child, parent)
        {
            return Ok(old_child);
        }

        self.remove(new_child)?;
        let parent_node = self.node_mut(parent)?;
        let Some(position) = parent_node.children.iter().position(|&node| node == old_child) else {
            return Ok(old_child);
        };
        parent_node.children[position] = new_child;
        let next_sibling = parent_node.children.get(position + 1).copied();
        self.removed_node(parent, old_child)?;
        self.inserted_node(parent, new_child)?;

        self.mutate(
            MutationRecord {
                added_nodes: vec![new_child],
                removed_nodes: vec![old_child],
                next_sibling,
                ..MutationRecord::new(MutationType::ChildList, parent)
            },
            TransferMutation::ChildList {
                target: parent,
                next_sibling,
                previous_sibling: None,
                added: vec![new_child],
                removed: vec![old_child],
            },
        );
        Ok(old_child)
    }

    fn remove(&mut self, node: NodeIndex) -> DomResult<()> {
        if let Some(parent) = self.try_node(node)?.parent {
            self.remove_child(parent, node)?;
        }
        Ok(())
    }

    fn clone_node(&mut self, node: NodeIndex, deep: bool) -> DomResult<NodeIndex> {
        let (clone, children) = {
            let source = self.try_node(node)?;
            let children = if deep { source.children.clone() } else { Vec::new() };
            match &source.data {
                NodeData::Element(element) => {
                    let namespace_uri = element.namespace_uri.clone();
                    let local_name = element.local_name.clone();
                    let attributes: Vec<(String, String)> = element
                        .attributes
                        .iter()
                        .map(|attr| (attr.name.clone(), attr.value.clone()))
                        .collect();
                    let clone = self.create_element_ns(&namespace_uri, &local_name);
                    for (name, value) in attributes {
                        crate::attributes::ElementAttributes::set_attribute(
                            self, clone, &name, &value,
                        )?;
                    }
                    (clone, children)
                }
                NodeData::Text(data) => {
                    let data = data.clone();
                    return Ok(self.create_text_node(&data));
                }
                NodeData::Comment(data) => {
                    let data = data.clone();
                    return Ok(self.create_comment(&data));
                }
                NodeData::Fragment => (self.create_document_fragment(), children),
            }
        };
        for child in children {
            let child_clone = self.clone_node(child, deep)?;
            self.append_child(clone, child_clone)?;
        }
        Ok(clone)
    }
}

impl Document {
    /// Re-parent `child` under `parent`, then run class-specific hooks.
    fn inserted_node(&mut self, parent: NodeIndex, child: NodeIndex) -> DomResult<()> {
        let (connected, scoping_root) = {
            let parent_node = self.try_node(parent)?;
            (parent_node.is_connected, parent_node.scoping_root)
        };
        self.node_mut(child)?.parent = Some(parent);
        self.propagate(child, connected, scoping_root);

        if self.element_class(parent) == Some(ElementClass::Select) {
            html::forms::select_child_inserted(self, parent, child)?;
        }
        Ok(())
    }

    fn removed_node(&mut self, parent: NodeIndex, child: NodeIndex) -> DomResult<()> {
        self.node_mut(child)?.parent = None;
        self.propagate(child, false, child);

        if self.element_class(parent) == Some(ElementClass::Select) {
            html::forms::select_child_removed(self, parent, child)?;
        }
        Ok(())
    }

    /// Set connectedness and scoping root on a whole subtree
    pub(crate) fn propagate(&mut self, root: NodeIndex, connected: bool, scoping_root: NodeIndex) {
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            if let Some(node) = self.runtime.nodes.get_mut(index) {
                node.is_connected = connected;
                node.scoping_root = scoping_root;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    pub fn parent_node(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn next_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        let siblings = &self.node(self.parent_node(node)?)?.children;
        let position = siblings.iter().position(|&n| n == node)?;
        siblings.get(position + 1).copied()
    }

    pub fn previous_sibling(&self, node: NodeIndex) -> Option<NodeIndex> {
        let siblings = &self.node(self.parent_node(node)?)?.children;
        let position = siblings.iter().position(|&n| n == node)?;
        position.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }

    /// Element children, in order
    pub fn children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.node(node)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|&child| {
                        self.node(child).is_some_and(|c| c.node_type == NodeType::Element)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn child_element_count(&self, node: NodeIndex) -> usize {
        self.children(node).len()
    }

    pub fn first_element_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.children(node).first().copied()
    }

    pub fn last_element_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.children(node).last().copied()
    }

    /// Whether `other` is `node` or one of its descendants
    pub fn contains(&self, node: NodeIndex, other: NodeIndex) -> bool {
        let mut current = Some(other);
        while let Some(index) = current {
            if index == node {
                return true;
            }
            current = self.parent_node(index);
        }
        false
    }

    /// Upper-cased tag name for elements, `#text` etc. otherwise
    pub fn tag_name(&self, node: NodeIndex) -> Option<&str> {
        self.node(node).map(|n| n.node_name())
    }

    // ========================================================================
    // TEXT
    // ========================================================================

    /// Concatenated data of all text and comment descendants
    pub fn text_content(&self, node: NodeIndex) -> String {
        let mut text = String::new();
        self.collect_text(node, &mut text);
        text
    }

    fn collect_text(&self, node: NodeIndex, out: &mut String) {
        let Some(entry) = self.node(node) else {
            return;
        };
        match &entry.data {
            NodeData::Text(data) | NodeData::Comment(data) => out.push_str(data),
            _ => {
                for &child in &entry.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Replace all children with a single text node, or set the data of a
    /// text or comment node
    pub fn set_text_content(&mut self, node: NodeIndex, text: &str) -> DomResult<()> {
        if self.try_node(node)?.character_data().is_some() {
            return self.set_data(node, text);
        }
        for child in self.try_node(node)?.children.clone() {
            self.remove(child)?;
        }
        let text_node = self.create_text_node(text);
        self.append_child(node, text_node)?;
        Ok(())
    }

    /// Text or comment data
    pub fn data(&self, node: NodeIndex) -> Option<&str> {
        self.node(node).and_then(|n| n.character_data())
    }

    pub fn set_data(&mut self, node: NodeIndex, value: &str) -> DomResult<()> {
        let old_value = match &mut self.node_mut(node)?.data {
            NodeData::Text(data) | NodeData::Comment(data) => {
                std::mem::replace(data, value.to_string())
            }
            _ => return Err(DomError::NotCharacterData(node.get())),
        };
        let value_index = self.runtime.store_string(value);
        self.mutate(
            MutationRecord {
                value: Some(value.to_string()),
                old_value: Some(old_value),
                ..MutationRecord::new(MutationType::CharacterData, node)
            },
            TransferMutation::CharacterData { target: node, value: value_index },
        );
        Ok(())
    }

    /// Split a text node at `offset` characters.
    ///
    /// The remainder becomes a new text node, inserted after `node` when it
    /// has a parent.
    pub fn split_text(&mut self, node: NodeIndex, offset: usize) -> DomResult<NodeIndex> {
        let data = match &self.try_node(node)?.data {
            NodeData::Text(data) => data.clone(),
            _ => return Err(DomError::NotCharacterData(node.get())),
        };
        let split_at = data.char_indices().nth(offset).map_or(data.len(), |(i, _)| i);
        let (head, tail) = data.split_at(split_at);

        let remainder = self.create_text_node(tail);
        self.set_data(node, head)?;
        if let Some(parent) = self.parent_node(node) {
            let next = self.next_sibling(node);
            self.insert_before(parent, remainder, next)?;
        }
        Ok(remainder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TransferMessage;
    use std::sync::mpsc;

    fn document() -> Document {
        let (tx, _rx) = mpsc::channel::<TransferMessage>();
        Document::new(tx)
    }

    #[test]
    fn test_append_child() {
        let mut doc = document();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(div, span).unwrap();

        assert_eq!(doc.parent_node(span), Some(div));
        assert_eq!(doc.node(div).unwrap().child_nodes(), &[span]);
    }

    #[test]
    fn test_append_twice_moves_to_end() {
        let mut doc = document();
        let div = doc.create_element("div");
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(div, a).unwrap();
        doc.append_child(div, b).unwrap();
        doc.append_child(div, a).unwrap();
        assert_eq!(doc.node(div).unwrap().child_nodes(), &[b, a]);
    }

    #[test]
    fn test_insert_before_foreign_reference() {
        let mut doc = document();
        let div = doc.create_element("div");
        let child = doc.create_element("p");
        let stranger = doc.create_element("i");
        assert_eq!(doc.insert_before(div, child, Some(stranger)).unwrap(), None);
        assert!(doc.node(div).unwrap().child_nodes().is_empty());
        assert_eq!(doc.parent_node(child), None);
    }

    #[test]
    fn test_insert_before_position() {
        let mut doc = document();
        let ul = doc.create_element("ul");
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        doc.append_child(ul, second).unwrap();
        doc.insert_before(ul, first, Some(second)).unwrap();
        assert_eq!(doc.node(ul).unwrap().child_nodes(), &[first, second]);
        assert_eq!(doc.next_sibling(first), Some(second));
        assert_eq!(doc.previous_sibling(second), Some(first));
    }

    #[test]
    fn test_fragment_is_emptied() {
        let mut doc = document();
        let div = doc.create_element("div");
        let fragment = doc.create_document_fragment();
        let a = doc.create_text_node("a");
        let b = doc.create_text_node("b");
        doc.append_child(fragment, a).unwrap();
        doc.append_child(fragment, b).unwrap();

        doc.append_child(div, fragment).unwrap();
        assert_eq!(doc.node(div).unwrap().child_nodes(), &[a, b]);
        assert!(doc.node(fragment).unwrap().child_nodes().is_empty());
    }

    #[test]
    fn test_remove_child_resets_scoping_root() {
        let mut doc = document();
        let body = doc.body();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(div, span).unwrap();
        doc.append_child(body, div).unwrap();
        assert!(doc.node(span).unwrap().is_connected());
        assert_eq!(doc.node(span).unwrap().scoping_root(), doc.document_element());

        assert_eq!(doc.remove_child(body, div).unwrap(), Some(div));
        assert!(!doc.node(span).unwrap().is_connected());
        assert_eq!(doc.node(span).unwrap().scoping_root(), div);
        assert_eq!(doc.remove_child(body, div).unwrap(), None);
    }

    #[test]
    fn test_replace_child_rejects_cycle() {
        let mut doc = document();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        let leaf = doc.create_element("span");
        doc.append_child(outer, inner).unwrap();
        doc.append_child(inner, leaf).unwrap();

        assert_eq!(doc.replace_child(inner, outer, leaf).unwrap(), leaf);
        assert_eq!(doc.parent_node(leaf), Some(inner));
    }

    #[test]
    fn test_replace_child() {
        let mut doc = document();
        let div = doc.create_element("div");
        let old = doc.create_element("b");
        let new = doc.create_element("i");
        doc.append_child(div, old).unwrap();
        assert_eq!(doc.replace_child(div, new, old).unwrap(), old);
        assert_eq!(doc.node(div).unwrap().child_nodes(), &[new]);
        assert_eq!(doc.parent_node(old), None);
    }

    #[test]
    fn test_text_content_includes_comments() {
        let mut doc = document();
        let div = doc.create_element("div");
        let text = doc.create_text_node("a");
        let comment = doc.create_comment("b");
        doc.append_child(div, text).unwrap();
        doc.append_child(div, comment).unwrap();
        assert_eq!(doc.text_content(div), "ab");

        doc.set_text_content(div, "c").unwrap();
        assert_eq!(doc.node(div).unwrap().child_nodes().len(), 1);
        assert_eq!(doc.text_content(div), "c");
    }

    #[test]
    fn test_split_text() {
        let mut doc = document();
        let p = doc.create_element("p");
        let text = doc.create_text_node("héllo");
        doc.append_child(p, text).unwrap();

        let tail = doc.split_text(text, 2).unwrap();
        assert_eq!(doc.data(text), Some("hé"));
        assert_eq!(doc.data(tail), Some("llo"));
        assert_eq!(doc.node(p).unwrap().child_nodes(), &[text, tail]);
    }

    #[test]
    fn test_clone_deep() {
        let mut doc = document();
        let div = doc.create_element("div");
        crate::attributes::ElementAttributes::set_attribute(&mut doc, div, "id", "x").unwrap();
        let text = doc.create_text_node("t");
        doc.append_child(div, text).unwrap();

        let shallow = doc.clone_node(div, false).unwrap();
        assert!(doc.node(shallow).unwrap().child_nodes().is_empty());
        assert_eq!(doc.element(shallow).unwrap().id(), "x");

        let deep = doc.clone_node(div, true).unwrap();
        assert_eq!(doc.text_content(deep), "t");
        assert_ne!(doc.node(deep).unwrap().child_nodes()[0], text);
    }

    #[test]
    fn test_unknown_index_is_an_error() {
        let mut doc = document();
        let div = doc.create_element("div");
        let err = doc.append_child(div, NodeIndex(999)).unwrap_err();
        assert_eq!(err, DomError::UnknownNode(999));
    }
}
