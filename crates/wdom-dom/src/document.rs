//! Document - worker-side document root
//!
//! The document is itself an element (index 1, `#document`) owning the node
//! arena through its [`WorkerRuntime`]. A `<body>` is appended at
//! construction, before hydration, so it never appears in a transfer.

use std::collections::HashMap;

use crate::html::ElementClass;
use crate::node::{ElementData, Node, NodeData, NodeType};
use crate::observer::ObserverRegistry;
use crate::protocol::{MessagePort, Phase, TransferMutation};
use crate::rect::ClientRect;
use crate::runtime::{Microtask, RuntimeOptions, WorkerRuntime};
use crate::selector::match_child_element;
use crate::tree::NodeOperations;
use crate::{DomError, DomResult, NodeIndex, HTML_NAMESPACE};

const DOCUMENT_NAME: &str = "#document";

/// Worker-side document
pub struct Document {
    pub(crate) runtime: WorkerRuntime,
    document_element: NodeIndex,
    body: NodeIndex,
    pub(crate) observers: ObserverRegistry,
    pub(crate) pending_rects: HashMap<NodeIndex, Vec<smol::channel::Sender<ClientRect>>>,
    inner_width: f64,
    inner_height: f64,
    style_keys: Vec<String>,
}

impl Document {
    /// Create a document posting its transfers to `port`
    pub fn new(port: impl MessagePort + 'static) -> Self {
        Self::with_options(port, RuntimeOptions::default())
    }

    pub fn with_options(port: impl MessagePort + 'static, options: RuntimeOptions) -> Self {
        let mut runtime = WorkerRuntime::new(port, options);
        let index = runtime.nodes.allocate(Phase::Initializing);
        let format = [
            index.get(),
            u16::from(NodeType::Document) as u32,
            runtime.store_string(DOCUMENT_NAME),
            0,
            runtime.store_string(HTML_NAMESPACE),
        ];
        let data = ElementData::new(DOCUMENT_NAME, HTML_NAMESPACE, ElementClass::Generic);
        let mut node = Node::new(
            index,
            NodeType::Document,
            DOCUMENT_NAME.to_string(),
            format,
            NodeData::Element(Box::new(data)),
        );
        node.is_connected = true;
        runtime.nodes.insert(node);

        let mut document = Self {
            runtime,
            document_element: index,
            body: index,
            observers: ObserverRegistry::default(),
            pending_rects: HashMap::new(),
            inner_width: 0.0,
            inner_height: 0.0,
            style_keys: Vec::new(),
        };
        let body = document.create_element("body");
        // Both nodes were just allocated, so the append cannot fail
        if document.append_child(index, body).is_ok() {
            document.body = body;
        }
        tracing::debug!("Document created (document {}, body {})", index, body);
        document
    }

    /// The document node itself
    #[inline]
    pub fn document_element(&self) -> NodeIndex {
        self.document_element
    }

    #[inline]
    pub fn body(&self) -> NodeIndex {
        self.body
    }

    pub fn runtime(&self) -> &WorkerRuntime {
        &self.runtime
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.runtime.phase()
    }

    pub fn inner_width(&self) -> f64 {
        self.inner_width
    }

    pub fn inner_height(&self) -> f64 {
        self.inner_height
    }

    /// Viewport size as last reported by the main thread
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.inner_width = width;
        self.inner_height = height;
    }

    /// Camel-cased style properties announced by the main thread
    pub fn style_keys(&self) -> &[String] {
        &self.style_keys
    }

    pub(crate) fn append_style_keys(&mut self, keys: &[String]) {
        for key in keys {
            if key.parse::<f64>().is_err() && !self.style_keys.contains(key) {
                self.style_keys.push(key.clone());
            }
        }
    }

    /// The main thread is now mirroring this document.
    ///
    /// Moves the runtime out of `Initializing`; inbound messages are
    /// accepted from here on.
    pub fn observe(&mut self) {
        if self.runtime.phase() == Phase::Initializing {
            self.runtime.set_phase(Phase::Hydrating);
            tracing::debug!("Document observed, inbound bridges active");
        }
    }

    /// Run deferred work until none is left.
    ///
    /// Equivalent to the end of a microtask checkpoint: pending mutations
    /// are posted as one message and observers receive their records.
    /// Returns the number of messages posted.
    pub fn drain_pending_mutations(&mut self) -> usize {
        let before = self.runtime.messages_posted();
        while let Some(task) = self.runtime.next_microtask() {
            match task {
                Microtask::Transfer => {
                    self.runtime.flush();
                }
                Microtask::DeliverObservers => self.deliver_observers(),
            }
        }
        self.runtime.messages_posted() - before
    }

    /// Tell the main thread async work started on behalf of `target`
    pub fn begin_long_task(&mut self, target: NodeIndex) {
        self.runtime.transfer(TransferMutation::LongTaskStart { target });
    }

    pub fn end_long_task(&mut self, target: NodeIndex) {
        self.runtime.transfer(TransferMutation::LongTaskEnd { target });
    }

    // ========================================================================
    // NODE ACCESS
    // ========================================================================

    #[inline]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.runtime.nodes.get(index)
    }

    pub(crate) fn try_node(&self, index: NodeIndex) -> DomResult<&Node> {
        self.runtime.nodes.get(index).ok_or(DomError::UnknownNode(index.get()))
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> DomResult<&mut Node> {
        self.runtime.nodes.get_mut(index).ok_or(DomError::UnknownNode(index.get()))
    }

    #[inline]
    pub fn element(&self, index: NodeIndex) -> Option<&ElementData> {
        self.node(index).and_then(Node::as_element)
    }

    pub(crate) fn try_element(&self, index: NodeIndex) -> DomResult<&ElementData> {
        self.try_node(index)?.as_element().ok_or(DomError::NotAnElement(index.get()))
    }

    pub(crate) fn element_mut(&mut self, index: NodeIndex) -> DomResult<&mut ElementData> {
        self.node_mut(index)?.as_element_mut().ok_or(DomError::NotAnElement(index.get()))
    }

    /// Element class, `None` for non-elements and unknown indices
    pub fn element_class(&self, index: NodeIndex) -> Option<ElementClass> {
        self.element(index).map(ElementData::class)
    }

    // ========================================================================
    // NODE CREATION
    // ========================================================================

    /// Create an HTML element; the name is lower-cased
    pub fn create_element(&mut self, name: &str) -> NodeIndex {
        self.create_element_ns(HTML_NAMESPACE, &name.to_lowercase())
    }

    pub fn create_element_ns(&mut self, namespace_uri: &str, local_name: &str) -> NodeIndex {
        let index = self.runtime.nodes.allocate(self.runtime.phase());
        self.insert_element(index, namespace_uri, local_name)
    }

    pub(crate) fn insert_element(
        &mut self,
        index: NodeIndex,
        namespace_uri: &str,
        local_name: &str,
    ) -> NodeIndex {
        let class = ElementClass::for_name(namespace_uri, local_name);
        let format = [
            index.get(),
            u16::from(NodeType::Element) as u32,
            self.runtime.store_string(local_name),
            0,
            self.runtime.store_string(namespace_uri),
        ];
        let data = ElementData::new(local_name, namespace_uri, class);
        self.runtime.nodes.insert(Node::new(
            index,
            NodeType::Element,
            local_name.to_uppercase(),
            format,
            NodeData::Element(Box::new(data)),
        ));
        index
    }

    pub fn create_text_node(&mut self, data: &str) -> NodeIndex {
        let index = self.runtime.nodes.allocate(self.runtime.phase());
        self.insert_character_data(index, NodeType::Text, data)
    }

    pub fn create_comment(&mut self, data: &str) -> NodeIndex {
        let index = self.runtime.nodes.allocate(self.runtime.phase());
        self.insert_character_data(index, NodeType::Comment, data)
    }

    pub(crate) fn insert_character_data(
        &mut self,
        index: NodeIndex,
        node_type: NodeType,
        data: &str,
    ) -> NodeIndex {
        let (name, node_data) = match node_type {
            NodeType::Comment => ("#comment", NodeData::Comment(data.to_string())),
            _ => ("#text", NodeData::Text(data.to_string())),
        };
        let format = [
            index.get(),
            u16::from(node_type) as u32,
            self.runtime.store_string(name),
            self.runtime.store_string(data),
            0,
        ];
        self.runtime
            .nodes
            .insert(Node::new(index, node_type, name.to_string(), format, node_data));
        index
    }

    pub fn create_document_fragment(&mut self) -> NodeIndex {
        const NAME: &str = "#document-fragment";
        let index = self.runtime.nodes.allocate(self.runtime.phase());
        let format = [
            index.get(),
            u16::from(NodeType::DocumentFragment) as u32,
            self.runtime.store_string(NAME),
            0,
            0,
        ];
        self.runtime.nodes.insert(Node::new(
            index,
            NodeType::DocumentFragment,
            NAME.to_string(),
            format,
            NodeData::Fragment,
        ));
        index
    }

    /// First element under `<body>` whose `id` matches
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeIndex> {
        match_child_element(self, self.body, |element| element.id() == id)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("runtime", &self.runtime)
            .field("document_element", &self.document_element)
            .field("body", &self.body)
            .finish_non_exhaustive()
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
    fn test_bootstrap_indices() {
        let doc = document();
        assert_eq!(doc.document_element(), NodeIndex(1));
        assert_eq!(doc.body(), NodeIndex(2));
        let root = doc.node(doc.document_element()).unwrap();
        assert_eq!(root.node_name(), "#document");
        assert_eq!(root.node_type(), NodeType::Document);
        assert_eq!(root.child_nodes(), &[NodeIndex(2)]);
        assert!(doc.node(doc.body()).unwrap().is_connected());
    }

    #[test]
    fn test_bootstrap_strings_not_pending_for_nodes() {
        let mut doc = document();
        doc.observe();
        assert_eq!(doc.phase(), Phase::Hydrating);
        // Pre-hydration nodes never join a transfer
        assert!(doc.runtime.nodes.consume().is_empty());
    }

    #[test]
    fn test_creation_formats() {
        let mut doc = document();
        let div = doc.create_element("DIV");
        let format = doc.node(div).unwrap().creation_format();
        assert_eq!(format[1], 1);
        assert_eq!(doc.runtime().strings().get(format[2]), Some("div"));
        assert_eq!(doc.runtime().strings().get(format[4]), Some(HTML_NAMESPACE));

        let text = doc.create_text_node("hello");
        let format = doc.node(text).unwrap().creation_format();
        assert_eq!(format[1], 3);
        assert_eq!(doc.runtime().strings().get(format[2]), Some("#text"));
        assert_eq!(doc.runtime().strings().get(format[3]), Some("hello"));
        assert_eq!(format[4], 0);
    }

    #[test]
    fn test_element_classes() {
        let mut doc = document();
        let input = doc.create_element("input");
        assert_eq!(doc.element_class(input), Some(ElementClass::Input));
        let svg = doc.create_element_ns(crate::SVG_NAMESPACE, "input");
        assert_eq!(doc.element_class(svg), Some(ElementClass::Generic));
    }

    #[test]
    fn test_append_style_keys_skips_numeric() {
        let mut doc = document();
        doc.append_style_keys(&[
            "0".to_string(),
            "backgroundColor".to_string(),
            "backgroundColor".to_string(),
        ]);
        assert_eq!(doc.style_keys(), &["backgroundColor".to_string()]);
    }
}
