//! Mutation transfer protocol
//!
//! Wire constants, the per-mutation numeric tuples and the batched message
//! posted to the main thread.

use serde::{Deserialize, Serialize};

use crate::NodeIndex;

/// Lifecycle of the worker document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum Phase {
    /// Before hydration: index overrides allowed, nothing is transferred
    Initializing = 0,
    /// Main thread is observing; inbound bridges installed
    Hydrating = 1,
    /// At least one batch has been sent
    Mutating = 2,
}

impl From<Phase> for u8 {
    fn from(value: Phase) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Initializing),
            1 => Ok(Self::Hydrating),
            2 => Ok(Self::Mutating),
            other => Err(format!("unknown phase {other}")),
        }
    }
}

/// `type` field of messages crossing the worker boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum MessageType {
    Event = 1,
    Hydrate = 2,
    Mutate = 3,
    Sync = 4,
    Resize = 5,
    GetBoundingClientRect = 6,
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Event),
            2 => Ok(Self::Hydrate),
            3 => Ok(Self::Mutate),
            4 => Ok(Self::Sync),
            5 => Ok(Self::Resize),
            6 => Ok(Self::GetBoundingClientRect),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

/// First slot of every mutation tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MutationKind {
    Attributes = 0,
    CharacterData = 1,
    ChildList = 2,
    Properties = 3,
    EventSubscription = 4,
    GetBoundingClientRect = 5,
    LongTaskStart = 6,
    LongTaskEnd = 7,
}

impl MutationKind {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::Attributes,
            1 => Self::CharacterData,
            2 => Self::ChildList,
            3 => Self::Properties,
            4 => Self::EventSubscription,
            5 => Self::GetBoundingClientRect,
            6 => Self::LongTaskStart,
            7 => Self::LongTaskEnd,
            _ => return None,
        })
    }
}

/// One queued mutation. String operands are interned when the mutation is
/// recorded, so encoding only copies integers.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferMutation {
    /// `[0, target, name, namespace, value + 1 | 0]`
    Attributes { target: NodeIndex, name: u32, namespace: u32, value: Option<u32> },
    /// `[1, target, value]`
    CharacterData { target: NodeIndex, value: u32 },
    /// `[2, target, next, prev, added.len, removed.len, ...added, ...removed]`
    ChildList {
        target: NodeIndex,
        next_sibling: Option<NodeIndex>,
        previous_sibling: Option<NodeIndex>,
        added: Vec<NodeIndex>,
        removed: Vec<NodeIndex>,
    },
    /// `[3, target, name, 1, 0|1]` for booleans, `[3, target, name, 0, value]` for strings
    Properties { target: NodeIndex, name: u32, value: WireProperty },
    /// `[4, target, isRemoval, isAddition, type, handlerIndex]`
    EventSubscription { target: NodeIndex, removal: bool, event_type: u32, handler_index: u32 },
    /// `[5, target]`
    GetBoundingClientRect { target: NodeIndex },
    /// `[6, target]`
    LongTaskStart { target: NodeIndex },
    /// `[7, target]`
    LongTaskEnd { target: NodeIndex },
}

/// Property payload of a `PROPERTIES` tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireProperty {
    Bool(bool),
    /// Interned string index
    Str(u32),
}

impl TransferMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Attributes { .. } => MutationKind::Attributes,
            Self::CharacterData { .. } => MutationKind::CharacterData,
            Self::ChildList { .. } => MutationKind::ChildList,
            Self::Properties { .. } => MutationKind::Properties,
            Self::EventSubscription { .. } => MutationKind::EventSubscription,
            Self::GetBoundingClientRect { .. } => MutationKind::GetBoundingClientRect,
            Self::LongTaskStart { .. } => MutationKind::LongTaskStart,
            Self::LongTaskEnd { .. } => MutationKind::LongTaskEnd,
        }
    }

    /// Append the wire tuple to `out`
    pub fn encode(&self, out: &mut Vec<u16>) {
        out.push(self.kind() as u16);
        match self {
            Self::Attributes { target, name, namespace, value } => {
                out.extend([
                    wire(target.0),
                    wire(*name),
                    wire(*namespace),
                    value.map_or(0, |v| wire(v + 1)),
                ]);
            }
            Self::CharacterData { target, value } => {
                out.extend([wire(target.0), wire(*value)]);
            }
            Self::ChildList { target, next_sibling, previous_sibling, added, removed } => {
                out.extend([
                    wire(target.0),
                    next_sibling.map_or(0, |n| wire(n.0)),
                    previous_sibling.map_or(0, |n| wire(n.0)),
                    wire(added.len() as u32),
                    wire(removed.len() as u32),
                ]);
                out.extend(added.iter().chain(removed).map(|n| wire(n.0)));
            }
            Self::Properties { target, name, value } => {
                let (is_bool, payload) = match value {
                    WireProperty::Bool(flag) => (1, u16::from(*flag)),
                    WireProperty::Str(index) => (0, wire(*index)),
                };
                out.extend([wire(target.0), wire(*name), is_bool, payload]);
            }
            Self::EventSubscription { target, removal, event_type, handler_index } => {
                out.extend([
                    wire(target.0),
                    u16::from(*removal),
                    u16::from(!*removal),
                    wire(*event_type),
                    wire(*handler_index),
                ]);
            }
            Self::GetBoundingClientRect { target }
            | Self::LongTaskStart { target }
            | Self::LongTaskEnd { target } => out.push(wire(target.0)),
        }
    }
}

/// Narrow to the 16-bit wire width, wrapping like a `Uint16Array` store.
fn wire(value: u32) -> u16 {
    if value > u32::from(u16::MAX) {
        tracing::warn!("Value {} exceeds the 16-bit wire width and will wrap", value);
    }
    value as u16
}

/// One batched transfer, posted at most once per flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    pub phase: Phase,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Concatenated 5-slot creation formats of new nodes
    pub nodes: Vec<u16>,
    /// Strings interned since the previous batch, in index order
    pub strings: Vec<String>,
    /// Concatenated mutation tuples, in the order they happened
    pub mutations: Vec<u16>,
}

impl TransferMessage {
    /// Creation formats, one `[index, nodeType, name, data, namespace]` per node
    pub fn node_formats(&self) -> impl Iterator<Item = &[u16]> {
        self.nodes.chunks_exact(5)
    }

    /// Mutation tuples, split at their kind-dependent boundaries
    pub fn mutation_tuples(&self) -> Vec<&[u16]> {
        split_mutations(&self.mutations)
    }
}

/// Split a concatenated mutation buffer into individual tuples.
///
/// Stops at the first unknown kind or truncated tuple.
pub fn split_mutations(buffer: &[u16]) -> Vec<&[u16]> {
    let mut tuples = Vec::new();
    let mut rest = buffer;
    while let Some(&first) = rest.first() {
        let len = match MutationKind::from_u16(first) {
            Some(MutationKind::Attributes | MutationKind::Properties) => 5,
            Some(MutationKind::CharacterData) => 3,
            Some(MutationKind::EventSubscription) => 6,
            Some(
                MutationKind::GetBoundingClientRect
                | MutationKind::LongTaskStart
                | MutationKind::LongTaskEnd,
            ) => 2,
            Some(MutationKind::ChildList) if rest.len() >= 6 => {
                6 + rest[4] as usize + rest[5] as usize
            }
            _ => break,
        };
        if rest.len() < len {
            break;
        }
        let (tuple, tail) = rest.split_at(len);
        tuples.push(tuple);
        rest = tail;
    }
    tuples
}

/// Outbound side of the worker channel
pub trait MessagePort {
    fn post_message(&mut self, message: TransferMessage);
}

impl MessagePort for std::sync::mpsc::Sender<TransferMessage> {
    fn post_message(&mut self, message: TransferMessage) {
        if self.send(message).is_err() {
            tracing::debug!("Main thread receiver dropped, discarding transfer");
        }
    }
}

impl MessagePort for smol::channel::Sender<TransferMessage> {
    fn post_message(&mut self, message: TransferMessage) {
        if let Err(err) = self.try_send(message) {
            tracing::debug!("Discarding transfer: {}", err);
        }
    }
}
