//! Markup
//!
//! `innerHTML`/`outerHTML`. Parsing feeds [`wdom_html::parse`] through a
//! [`wdom_html::TreeSink`] over the document, so parsed nodes get indices and
//! creation formats like any other node.

use crate::attributes::{attribute_value, ElementAttributes};
use crate::document::Document;
use crate::node::{ElementKind, NodeData};
use crate::observer::{MutationRecord, MutationType};
use crate::protocol::TransferMutation;
use crate::tree::NodeOperations;
use crate::{DomResult, NodeIndex};

impl wdom_html::TreeSink for Document {
    type Handle = NodeIndex;

    fn create_element(&mut self, namespace: &str, local_name: &str) -> NodeIndex {
        self.create_element_ns(namespace, local_name)
    }

    fn create_text(&mut self, data: &str) -> NodeIndex {
        self.create_text_node(data)
    }

    fn create_comment(&mut self, data: &str) -> NodeIndex {
        Document::create_comment(self, data)
    }

    fn set_attribute(&mut self, element: NodeIndex, name: &str, value: &str) {
        if let Err(err) = ElementAttributes::set_attribute(self, element, name, value) {
            tracing::warn!("Dropping parsed attribute {}: {}", name, err);
        }
    }

    fn append_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        if let Err(err) = NodeOperations::append_child(self, parent, child) {
            tracing::warn!("Dropping parsed node {}: {}", child, err);
        }
    }

    fn tag_name(&self, element: NodeIndex) -> String {
        self.node(element).map(|node| node.node_name().to_string()).unwrap_or_default()
    }

    fn first_child(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.node(node).and_then(|n| n.first_child())
    }

    fn release(&mut self, node: NodeIndex) {
        let Some(entry) = self.runtime.nodes.get_mut(node) else {
            return;
        };
        entry.parent = None;
        for child in entry.children.clone() {
            if let Some(child) = self.runtime.nodes.get_mut(child) {
                child.parent = None;
            }
        }
    }
}

impl Document {
    /// Serialized children: text verbatim, comments, and element markup
    pub fn inner_html(&self, node: NodeIndex) -> String {
        let mut out = String::new();
        if let Some(entry) = self.node(node) {
            for &child in entry.child_nodes() {
                self.serialize_node(child, &mut out);
            }
        }
        out
    }

    /// Replace every child with the nodes parsed from `html`.
    ///
    /// The old children are detached in one child-list mutation. Parse
    /// errors leave the element untouched.
    pub fn set_inner_html(&mut self, node: NodeIndex, html: &str) -> DomResult<()> {
        let (namespace_uri, local_name) = {
            let element = self.try_element(node)?;
            (element.namespace_uri.clone(), element.local_name.clone())
        };
        let wrapper = wdom_html::parse(self, html, &namespace_uri, &local_name)?;

        let removed = std::mem::take(&mut self.node_mut(node)?.children);
        for &child in &removed {
            if let Some(entry) = self.runtime.nodes.get_mut(child) {
                entry.parent = None;
            }
            self.propagate(child, false, child);
        }
        if !removed.is_empty() {
            self.mutate(
                MutationRecord {
                    removed_nodes: removed.clone(),
                    ..MutationRecord::new(MutationType::ChildList, node)
                },
                TransferMutation::ChildList {
                    target: node,
                    next_sibling: None,
                    previous_sibling: None,
                    added: Vec::new(),
                    removed,
                },
            );
        }

        let parsed = std::mem::take(&mut self.node_mut(wrapper)?.children);
        for child in parsed {
            self.append_child(node, child)?;
        }
        Ok(())
    }

    /// Serialized element including its own tags
    pub fn outer_html(&self, node: NodeIndex) -> String {
        let mut out = String::new();
        self.serialize_node(node, &mut out);
        out
    }

    fn serialize_node(&self, node: NodeIndex, out: &mut String) {
        let Some(entry) = self.node(node) else {
            return;
        };
        match &entry.data {
            NodeData::Text(data) => out.push_str(data),
            NodeData::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
            NodeData::Fragment => {
                for &child in entry.child_nodes() {
                    self.serialize_node(child, out);
                }
            }
            NodeData::Element(element) => {
                let tag = element.local_name();
                out.push('<');
                out.push_str(tag);
                for attr in element.attributes() {
                    let value = attribute_value(element, &attr.namespace_uri, &attr.name)
                        .unwrap_or_default();
                    out.push_str(&format!(" {}=\"{}\"", attr.name, value));
                }
                out.push('>');

                let contents = self.inner_html(node);
                if contents.is_empty() && element.kind() == ElementKind::Void {
                    return;
                }
                out.push_str(&contents);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}
