//! DOM Node
//!
//! Nodes live in the document's arena and refer to each other by
//! [`NodeIndex`]. Parent and scoping-root links are plain indices, so the
//! arena is the only owner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attributes::Attr;
use crate::event::EventListener;
use crate::html::ElementClass;
use crate::reflect::PropertyValue;
use crate::style::CssStyleDeclaration;
use crate::token_list::DomTokenList;
use crate::NodeIndex;

/// DOM node type constants, as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    DocumentFragment = 11,
}

impl From<NodeType> for u16 {
    fn from(value: NodeType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for NodeType {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Element),
            3 => Ok(Self::Text),
            8 => Ok(Self::Comment),
            9 => Ok(Self::Document),
            11 => Ok(Self::DocumentFragment),
            other => Err(format!("unsupported node type {other}")),
        }
    }
}

/// Whether an element may have content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementKind {
    #[default]
    Normal,
    /// Never serializes a closing tag
    Void,
}

impl ElementKind {
    pub fn for_tag(tag_name: &str) -> Self {
        match tag_name {
            "AREA" | "BASE" | "BR" | "COL" | "EMBED" | "HR" | "IMG" | "INPUT" | "LINK" | "META"
            | "PARAM" | "SOURCE" | "TRACK" | "WBR" => Self::Void,
            _ => Self::Normal,
        }
    }
}

/// DOM Node - arena entry
pub struct Node {
    pub(crate) index: NodeIndex,
    pub(crate) node_type: NodeType,
    pub(crate) node_name: String,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) is_connected: bool,
    pub(crate) scoping_root: NodeIndex,
    /// Listeners keyed by lower-cased event type, created on first use
    pub(crate) listeners: Option<HashMap<String, Vec<EventListener>>>,
    /// `[index, nodeType, name, data, namespace]`, sent once when the node
    /// is first transferred
    pub(crate) creation_format: [u32; 5],
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(
        index: NodeIndex,
        node_type: NodeType,
        node_name: String,
        creation_format: [u32; 5],
        data: NodeData,
    ) -> Self {
        Self {
            index,
            node_type,
            node_name,
            parent: None,
            children: Vec::new(),
            is_connected: false,
            scoping_root: index,
            listeners: None,
            creation_format,
            data,
        }
    }

    #[inline]
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Upper-cased tag name for elements, `#text` etc. otherwise
    #[inline]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    #[inline]
    pub fn parent_node(&self) -> Option<NodeIndex> {
        self.parent
    }

    #[inline]
    pub fn child_nodes(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn first_child(&self) -> Option<NodeIndex> {
        self.children.first().copied()
    }

    pub fn last_child(&self) -> Option<NodeIndex> {
        self.children.last().copied()
    }

    pub fn has_child_nodes(&self) -> bool {
        !self.children.is_empty()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Root of the subtree this node currently belongs to
    #[inline]
    pub fn scoping_root(&self) -> NodeIndex {
        self.scoping_root
    }

    pub fn creation_format(&self) -> [u32; 5] {
        self.creation_format
    }

    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Text or comment data
    pub fn character_data(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(data) | NodeData::Comment(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .as_ref()
            .and_then(|map| map.get(event_type))
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index)
            .field("node_name", &self.node_name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("is_connected", &self.is_connected)
            .finish_non_exhaustive()
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Element, and the document itself
    Element(Box<ElementData>),
    Text(String),
    Comment(String),
    Fragment,
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    pub(crate) local_name: String,
    pub(crate) namespace_uri: String,
    pub(crate) kind: ElementKind,
    pub(crate) class: ElementClass,
    pub(crate) attributes: Vec<Attr>,
    pub(crate) token_lists: Vec<DomTokenList>,
    pub(crate) style: CssStyleDeclaration,
    pub(crate) state: ElementState,
    /// Properties assigned by script that no element class handles
    pub(crate) expando: HashMap<String, PropertyValue>,
}

impl ElementData {
    pub(crate) fn new(local_name: &str, namespace_uri: &str, class: ElementClass) -> Self {
        let token_lists = std::iter::once("class")
            .chain(class.token_list_attributes().iter().copied())
            .map(DomTokenList::new)
            .collect();

        Self {
            local_name: local_name.to_string(),
            namespace_uri: namespace_uri.to_string(),
            kind: ElementKind::for_tag(&local_name.to_uppercase()),
            class,
            attributes: Vec::new(),
            token_lists,
            style: CssStyleDeclaration::default(),
            state: ElementState::for_class(class),
            expando: HashMap::new(),
        }
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    #[inline]
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn class(&self) -> ElementClass {
        self.class
    }

    pub fn attributes(&self) -> &[Attr] {
        &self.attributes
    }

    pub fn find_attribute(&self, namespace_uri: &str, name: &str) -> Option<&Attr> {
        self.attributes
            .iter()
            .find(|attr| attr.namespace_uri == namespace_uri && attr.name == name)
    }

    /// Token list backing the attribute `name` (`class`, `rel`, ...)
    pub fn token_list(&self, name: &str) -> Option<&DomTokenList> {
        self.token_lists.iter().find(|list| list.attribute_name() == name)
    }

    pub(crate) fn token_list_mut(&mut self, name: &str) -> Option<&mut DomTokenList> {
        self.token_lists.iter_mut().find(|list| list.attribute_name() == name)
    }

    pub fn class_list(&self) -> &DomTokenList {
        // Every element is created with a `class` list in slot 0
        &self.token_lists[0]
    }

    pub fn style(&self) -> &CssStyleDeclaration {
        &self.style
    }

    /// `id` attribute, empty when absent
    pub fn id(&self) -> &str {
        self.find_attribute(crate::HTML_NAMESPACE, "id")
            .map_or("", |attr| attr.value.as_str())
    }

    /// Store `value` under `(namespace_uri, name)`, returning the previous
    /// value or `""`.
    pub(crate) fn store_attribute(
        &mut self,
        namespace_uri: &str,
        name: &str,
        value: &str,
    ) -> String {
        match self
            .attributes
            .iter_mut()
            .find(|attr| attr.namespace_uri == namespace_uri && attr.name == name)
        {
            Some(attr) => std::mem::replace(&mut attr.value, value.to_string()),
            None => {
                self.attributes.push(Attr::new(namespace_uri, name, value));
                String::new()
            }
        }
    }
}

/// Private per-class state that is not reflected to an attribute
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ElementState {
    Plain,
    Input { value: String, checked: bool },
    Option { selected: bool },
    /// `-1` until assigned
    Select { size: i32 },
    Progress { indeterminate: bool, value: f64 },
}

impl ElementState {
    fn for_class(class: ElementClass) -> Self {
        match class {
            ElementClass::Input => Self::Input { value: String::new(), checked: false },
            ElementClass::Option => Self::Option { selected: false },
            ElementClass::Select => Self::Select { size: -1 },
            ElementClass::Progress => Self::Progress { indeterminate: true, value: 0.0 },
            _ => Self::Plain,
        }
    }
}
