//! wdom DOM - worker-side Document Object Model
//!
//! An arena-backed DOM shim. Every tree, attribute and listener change is
//! recorded as a compact numeric tuple and flushed to the main thread in
//! batches, where a real DOM replays it.

mod attributes;
mod bridge;
mod document;
mod event;
mod hydrate;
mod markup;
mod node;
mod observer;
mod protocol;
mod rect;
mod reflect;
mod runtime;
mod selector;
mod storage;
mod style;
mod token_list;
mod tree;

pub mod html;

pub use attributes::{Attr, ElementAttributes};
pub use bridge::{InboundMessage, SyncValue, TransferrableEvent, TransferrableTouch};
pub use document::Document;
pub use event::{Event, EventListener, EventTarget, Touch};
pub use html::ElementClass;
pub use hydrate::HydrateableNode;
pub use node::{ElementData, ElementKind, Node, NodeData, NodeType};
pub use observer::{
    MutationObserverInit, MutationRecord, MutationType, ObserverCallback, ObserverId,
};
pub use protocol::{
    split_mutations, MessagePort, MessageType, MutationKind, Phase, TransferMessage,
    TransferMutation, WireProperty,
};
pub use rect::ClientRect;
pub use reflect::PropertyValue;
pub use runtime::{RuntimeOptions, WorkerRuntime};
pub use selector::ParentNode;
pub use storage::{NodeStorage, StringStorage};
pub use style::{hyphenate_key, CssStyleDeclaration, StyleMut};
pub use token_list::{DomTokenList, TokenListMut};
pub use tree::NodeOperations;

pub use wdom_html::{ParseError, HTML_NAMESPACE, SVG_NAMESPACE};

use serde::{Deserialize, Serialize};

/// Node identity: the index shared with the main thread.
///
/// Indices start at 1 and are never reused. `0` is reserved as the wire
/// sentinel for "no node".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIndex(pub(crate) u32);

impl NodeIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("No node with index {0}")]
    UnknownNode(u32),

    #[error("Node {0} is not an element")]
    NotAnElement(u32),

    #[error("Node {index} is not an {expected}")]
    UnexpectedClass { index: u32, expected: &'static str },

    #[error("Node {0} is not a text or comment node")]
    NotCharacterData(u32),

    #[error("Node {index} has no token list for `{attribute}`")]
    NoTokenList { index: u32, attribute: String },

    #[error("Index override {index} requested outside initialization (counter at {count})")]
    IndexOverride { index: u32, count: u32 },

    #[error("Index override {0} collides with a live node")]
    IndexCollision(u32),

    #[error("Malformed inbound message: {0}")]
    MalformedMessage(String),
}
