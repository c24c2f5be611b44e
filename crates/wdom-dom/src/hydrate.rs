//! Hydration
//!
//! Rebuilds the tree the main thread already rendered, reusing its node
//! indices, before any transfer happens.

use serde::{Deserialize, Serialize};

use crate::attributes::ElementAttributes;
use crate::document::Document;
use crate::node::NodeType;
use crate::tree::NodeOperations;
use crate::{DomResult, NodeIndex, HTML_NAMESPACE};

/// Skeleton of one main-thread node.
///
/// Keys are the numeric property names the main thread serializes with;
/// every name and text is an index into the accompanying string list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrateableNode {
    #[serde(rename = "0")]
    pub node_type: NodeType,
    /// Local name for elements, node name otherwise
    #[serde(rename = "1")]
    pub node_name: u32,
    /// `[namespace, name, value]`
    #[serde(rename = "2", default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<[u32; 3]>,
    #[serde(rename = "4", default, skip_serializing_if = "Vec::is_empty")]
    pub child_nodes: Vec<HydrateableNode>,
    #[serde(rename = "5", default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<u32>,
    #[serde(rename = "6", default, skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<u32>,
    #[serde(rename = "7")]
    pub index: u32,
    #[serde(rename = "11", default, skip_serializing_if = "Option::is_none")]
    pub transferred: Option<u8>,
}

fn string_at(strings: &[String], index: u32) -> &str {
    strings.get(index as usize).map_or_else(
        || {
            tracing::trace!("Skeleton refers to missing string {}", index);
            ""
        },
        String::as_str,
    )
}

impl Document {
    /// Create the node described by `skeleton` under its main-thread index
    pub fn hydrate_node(
        &mut self,
        strings: &[String],
        skeleton: &HydrateableNode,
    ) -> DomResult<NodeIndex> {
        let phase = self.phase();
        let index = self.runtime.nodes.allocate_override(phase, skeleton.index)?;
        match skeleton.node_type {
            NodeType::Text | NodeType::Comment => {
                let data = skeleton.text_content.map_or("", |i| string_at(strings, i));
                Ok(self.insert_character_data(index, skeleton.node_type, data))
            }
            _ => {
                let namespace_uri = skeleton
                    .namespace_uri
                    .map(|i| string_at(strings, i))
                    .filter(|ns| !ns.is_empty())
                    .unwrap_or(HTML_NAMESPACE);
                let local_name = string_at(strings, skeleton.node_name);
                let node = self.insert_element(index, namespace_uri, local_name);

                for &[namespace, name, value] in &skeleton.attributes {
                    let namespace = match string_at(strings, namespace) {
                        "null" => HTML_NAMESPACE,
                        namespace => namespace,
                    };
                    self.set_attribute_ns(
                        node,
                        namespace,
                        string_at(strings, name),
                        string_at(strings, value),
                    )?;
                }
                for child in &skeleton.child_nodes {
                    let child = self.hydrate_node(strings, child)?;
                    self.append_child(node, child)?;
                }
                Ok(node)
            }
        }
    }

    /// Hydrate the main thread's body into this document's `<body>`.
    ///
    /// `keys` are the style property names the main thread knows about.
    pub fn initialize(
        &mut self,
        strings: &[String],
        skeleton: &HydrateableNode,
        keys: &[String],
    ) -> DomResult<()> {
        self.append_style_keys(keys);
        for string in strings {
            self.runtime.store_string(string);
        }
        let body = self.body();
        for child in &skeleton.child_nodes {
            let node = self.hydrate_node(strings, child)?;
            self.append_child(body, node)?;
        }
        tracing::debug!(
            "Hydrated {} nodes from {} strings",
            self.runtime.nodes().len(),
            strings.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Phase, TransferMessage};
    use crate::DomError;
    use std::sync::mpsc;

    fn document() -> (Document, mpsc::Receiver<TransferMessage>) {
        let (tx, rx) = mpsc::channel::<TransferMessage>();
        (Document::new(tx), rx)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_skeleton_from_numeric_keys() {
        let json = r#"{"0":1,"1":0,"2":[[1,2,3]],"4":[{"0":3,"1":4,"5":5,"7":12}],"7":11}"#;
        let skeleton: HydrateableNode = serde_json::from_str(json).unwrap();
        assert_eq!(skeleton.node_type, NodeType::Element);
        assert_eq!(skeleton.attributes, vec![[1, 2, 3]]);
        assert_eq!(skeleton.child_nodes[0].text_content, Some(5));
        assert_eq!(skeleton.child_nodes[0].index, 12);
        assert_eq!(skeleton.namespace_uri, None);
    }

    #[test]
    fn test_initialize_uses_main_thread_indices() {
        let (mut doc, rx) = document();
        let strings = strings(&["body", "div", "null", "id", "root", "hello"]);
        let skeleton = HydrateableNode {
            node_type: NodeType::Element,
            node_name: 0,
            attributes: Vec::new(),
            child_nodes: vec![HydrateableNode {
                node_type: NodeType::Element,
                node_name: 1,
                attributes: vec![[2, 3, 4]],
                child_nodes: vec![HydrateableNode {
                    node_type: NodeType::Text,
                    node_name: 0,
                    attributes: Vec::new(),
                    child_nodes: Vec::new(),
                    text_content: Some(5),
                    namespace_uri: None,
                    index: 7,
                    transferred: None,
                }],
                text_content: None,
                namespace_uri: None,
                index: 6,
                transferred: None,
            }],
            text_content: None,
            namespace_uri: None,
            index: 2,
            transferred: None,
        };

        doc.initialize(&strings, &skeleton, &[]).unwrap();
        let div = NodeIndex::new(6);
        assert_eq!(doc.parent_node(div), Some(doc.body()));
        assert_eq!(doc.get_attribute(div, "id").as_deref(), Some("root"));
        assert_eq!(doc.text_content(div), "hello");
        assert_eq!(doc.get_element_by_id("root"), Some(div));

        // Hydration itself is never transferred
        assert_eq!(doc.drain_pending_mutations(), 0);
        assert!(rx.try_recv().is_err());

        // New nodes continue after the highest hydrated index
        assert_eq!(doc.create_element("p"), NodeIndex::new(8));
    }

    #[test]
    fn test_hydrate_after_observe_is_rejected() {
        let (mut doc, _rx) = document();
        doc.observe();
        assert_eq!(doc.phase(), Phase::Hydrating);
        let skeleton = HydrateableNode {
            node_type: NodeType::Comment,
            node_name: 0,
            attributes: Vec::new(),
            child_nodes: Vec::new(),
            text_content: None,
            namespace_uri: None,
            index: 40,
            transferred: None,
        };
        assert!(matches!(
            doc.hydrate_node(&[], &skeleton),
            Err(DomError::IndexOverride { index: 40, .. })
        ));
    }

    #[test]
    fn test_hydrate_rejects_live_index() {
        let (mut doc, _rx) = document();
        let skeleton = HydrateableNode {
            node_type: NodeType::Text,
            node_name: 0,
            attributes: Vec::new(),
            child_nodes: Vec::new(),
            text_content: None,
            namespace_uri: None,
            index: doc.body().get(),
            transferred: None,
        };
        assert_eq!(doc.hydrate_node(&[], &skeleton), Err(DomError::IndexCollision(2)));
    }
}
