//! Inbound bridges
//!
//! Messages the main thread posts back: events to dispatch into the tree,
//! property syncs from user input, viewport resizes and bounding rect
//! answers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::document::Document;
use crate::event::{Event, EventTarget, Touch};
use crate::protocol::{MessageType, Phase};
use crate::reflect::PropertyValue;
use crate::{DomError, DomResult, NodeIndex};

/// Message received from the main thread.
///
/// On the wire every message is an object keyed by its numeric `type`:
///
/// | type | shape |
/// |---|---|
/// | 1 `EVENT` | `{"type":1,"event":{..}}` |
/// | 4 `SYNC` | `{"type":4,"target":[idx],"value":".."}` |
/// | 4 `SYNC` | `{"type":4,"sync":{"index":idx,"value":".."}}` |
/// | 5 `RESIZE` | `{"type":5,"sync":[width,height]}` |
/// | 6 `GET_BOUNDING_CLIENT_RECT` | `{"type":6,"target":[idx],"data":[..6]}` |
///
/// The rect answer carries `top, right, bottom, left, width, height`.
///
/// The minified numeric keys (`12` type, `13` target, `21` value, `38`
/// data, `39` event, `40` sync) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub enum InboundMessage {
    Event(TransferrableEvent),
    Sync(SyncValue),
    /// `[innerWidth, innerHeight]`
    Resize([f64; 2]),
    /// `data` is `[top, right, bottom, left, width, height]`
    BoundingClientRect { target: NodeIndex, data: [f64; 6] },
}

impl InboundMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Event(_) => MessageType::Event,
            Self::Sync(_) => MessageType::Sync,
            Self::Resize(_) => MessageType::Resize,
            Self::BoundingClientRect { .. } => MessageType::GetBoundingClientRect,
        }
    }
}

/// Node indices travel as `[index]`; a bare number is accepted too
#[derive(Deserialize)]
#[serde(untagged)]
enum WireIndex {
    Wrapped([u32; 1]),
    Bare(u32),
}

fn deserialize_wire_index<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u32>, D::Error> {
    Ok(Option::<WireIndex>::deserialize(deserializer)?.map(|index| match index {
        WireIndex::Wrapped([index]) | WireIndex::Bare(index) => index,
    }))
}

fn serialize_wire_index<S: Serializer>(
    index: &Option<u32>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    index.map(|index| [index]).serialize(serializer)
}

/// Payload under the `sync` key: a viewport for RESIZE, a value for SYNC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WireSync {
    Viewport([f64; 2]),
    Value(SyncValue),
}

/// Envelope shared by every inbound message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireMessage {
    #[serde(rename = "type", alias = "12")]
    message_type: u8,
    #[serde(
        alias = "13",
        deserialize_with = "deserialize_wire_index",
        serialize_with = "serialize_wire_index",
        skip_serializing_if = "Option::is_none"
    )]
    target: Option<u32>,
    #[serde(alias = "21", skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(alias = "38", skip_serializing_if = "Option::is_none")]
    data: Option<Vec<f64>>,
    #[serde(alias = "39", skip_serializing_if = "Option::is_none")]
    event: Option<TransferrableEvent>,
    #[serde(alias = "40", skip_serializing_if = "Option::is_none")]
    sync: Option<WireSync>,
}

fn malformed(message: &str) -> DomError {
    DomError::MalformedMessage(message.to_string())
}

impl TryFrom<WireMessage> for InboundMessage {
    type Error = DomError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let message_type =
            MessageType::try_from(wire.message_type).map_err(DomError::MalformedMessage)?;
        match message_type {
            MessageType::Event => {
                wire.event.map(Self::Event).ok_or_else(|| malformed("EVENT without event"))
            }
            MessageType::Sync => match (wire.sync, wire.target, wire.value) {
                (Some(WireSync::Value(sync)), _, _) => Ok(Self::Sync(sync)),
                (_, Some(index), Some(value)) => Ok(Self::Sync(SyncValue { index, value })),
                _ => Err(malformed("SYNC without target and value")),
            },
            MessageType::Resize => match wire.sync {
                Some(WireSync::Viewport(size)) => Ok(Self::Resize(size)),
                _ => Err(malformed("RESIZE without [width, height]")),
            },
            MessageType::GetBoundingClientRect => {
                let target = wire.target.ok_or_else(|| malformed("rect answer without target"))?;
                let data = wire
                    .data
                    .as_deref()
                    .and_then(|data| <[f64; 6]>::try_from(data).ok())
                    .ok_or_else(|| malformed("rect answer needs six values"))?;
                Ok(Self::BoundingClientRect {
                    target: NodeIndex::new(target),
                    data,
                })
            }
            MessageType::Hydrate | MessageType::Mutate => {
                Err(DomError::MalformedMessage(format!("{message_type:?} is outbound only")))
            }
        }
    }
}

impl From<InboundMessage> for WireMessage {
    fn from(message: InboundMessage) -> Self {
        let message_type = u8::from(message.message_type());
        match message {
            InboundMessage::Event(event) => Self {
                message_type,
                event: Some(event),
                ..Default::default()
            },
            InboundMessage::Sync(SyncValue { index, value }) => Self {
                message_type,
                target: Some(index),
                value: Some(value),
                ..Default::default()
            },
            InboundMessage::Resize(size) => Self {
                message_type,
                sync: Some(WireSync::Viewport(size)),
                ..Default::default()
            },
            InboundMessage::BoundingClientRect { target, data } => Self {
                message_type,
                target: Some(target.get()),
                data: Some(data.to_vec()),
                ..Default::default()
            },
        }
    }
}

/// Event as serialized by the main thread
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferrableEvent {
    /// Node the event is dispatched on
    #[serde(alias = "7")]
    pub index: u32,
    #[serde(rename = "type", alias = "12")]
    pub event_type: String,
    #[serde(alias = "25")]
    pub bubbles: bool,
    #[serde(alias = "26")]
    pub cancelable: bool,
    #[serde(alias = "27")]
    pub cancel_bubble: bool,
    #[serde(alias = "29")]
    pub default_prevented: bool,
    #[serde(alias = "30")]
    pub event_phase: u16,
    #[serde(alias = "31")]
    pub is_trusted: bool,
    #[serde(alias = "32")]
    pub return_value: bool,
    #[serde(alias = "33")]
    pub time_stamp: f64,
    #[serde(alias = "34")]
    pub scoped: bool,
    #[serde(alias = "35")]
    pub key_code: Option<u32>,
    #[serde(alias = "60")]
    pub page_x: Option<f64>,
    #[serde(alias = "61")]
    pub page_y: Option<f64>,
    #[serde(alias = "65")]
    pub offset_x: Option<f64>,
    #[serde(alias = "66")]
    pub offset_y: Option<f64>,
    /// `[index]`, where `0` is the document
    #[serde(
        alias = "13",
        deserialize_with = "deserialize_wire_index",
        serialize_with = "serialize_wire_index"
    )]
    pub target: Option<u32>,
    #[serde(alias = "62")]
    pub touches: Option<Vec<TransferrableTouch>>,
    #[serde(alias = "63")]
    pub changed_touches: Option<Vec<TransferrableTouch>>,
}

/// `[identifier, screenX, screenY, clientX, clientY, pageX, pageY, target]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferrableTouch(pub [f64; 8]);

impl TransferrableTouch {
    pub fn identifier(&self) -> f64 {
        self.0[0]
    }

    pub fn screen(&self) -> (f64, f64) {
        (self.0[1], self.0[2])
    }

    pub fn client(&self) -> (f64, f64) {
        (self.0[3], self.0[4])
    }

    pub fn page(&self) -> (f64, f64) {
        (self.0[5], self.0[6])
    }

    /// Target index, `0` for the document
    pub fn target(&self) -> u32 {
        self.0[7] as u32
    }
}

/// New `value` of a node, changed by the user on the main thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncValue {
    #[serde(alias = "7")]
    pub index: u32,
    #[serde(alias = "21")]
    pub value: String,
}

impl Document {
    /// Apply one inbound message.
    ///
    /// Nothing is applied before [`Document::observe`]. Messages naming a
    /// node that no longer exists are dropped; the node may have been
    /// removed while the message was in flight.
    pub fn handle_message(&mut self, message: InboundMessage) -> DomResult<()> {
        if self.phase() == Phase::Initializing {
            tracing::trace!("Ignoring {:?} message before observe", message.message_type());
            return Ok(());
        }
        match message {
            InboundMessage::Event(event) => self.dispatch_transferred_event(event),
            InboundMessage::Sync(sync) => self.apply_sync(sync),
            InboundMessage::Resize([width, height]) => {
                self.set_viewport(width, height);
                Ok(())
            }
            InboundMessage::BoundingClientRect { target, data } => {
                self.resolve_bounding_client_rect(target, data);
                Ok(())
            }
        }
    }

    /// `0` names the document, anything else must be live
    fn resolve_wire_node(&self, index: u32) -> Option<NodeIndex> {
        if index == 0 {
            return Some(self.document_element());
        }
        let node = NodeIndex::new(index);
        self.node(node).map(|_| node)
    }

    fn touches_from_transfer(
        &self,
        touches: Option<Vec<TransferrableTouch>>,
    ) -> Option<Vec<Touch>> {
        touches.map(|touches| {
            touches
                .into_iter()
                .map(|touch| {
                    let (screen_x, screen_y) = touch.screen();
                    let (client_x, client_y) = touch.client();
                    let (page_x, page_y) = touch.page();
                    Touch {
                        identifier: touch.identifier(),
                        screen_x,
                        screen_y,
                        client_x,
                        client_y,
                        page_x,
                        page_y,
                        target: self.resolve_wire_node(touch.target()),
                    }
                })
                .collect()
        })
    }

    fn dispatch_transferred_event(&mut self, transferred: TransferrableEvent) -> DomResult<()> {
        let node = NodeIndex::new(transferred.index);
        if self.node(node).is_none() {
            tracing::trace!(
                "Dropping {} event for unknown node {}",
                transferred.event_type,
                transferred.index
            );
            return Ok(());
        }

        let mut event =
            Event::new(transferred.event_type, transferred.bubbles, transferred.cancelable);
        event.cancel_bubble = transferred.cancel_bubble;
        event.default_prevented = transferred.default_prevented;
        event.event_phase = transferred.event_phase;
        event.is_trusted = transferred.is_trusted;
        event.return_value = transferred.return_value;
        event.time_stamp = transferred.time_stamp;
        event.scoped = transferred.scoped;
        event.key_code = transferred.key_code;
        event.page_x = transferred.page_x;
        event.page_y = transferred.page_y;
        event.offset_x = transferred.offset_x;
        event.offset_y = transferred.offset_y;
        event.target = transferred.target.and_then(|index| self.resolve_wire_node(index));
        event.touches = self.touches_from_transfer(transferred.touches);
        event.changed_touches = self.touches_from_transfer(transferred.changed_touches);

        self.dispatch_event(node, &mut event)?;
        Ok(())
    }

    /// Write the synced value without transferring it back
    fn apply_sync(&mut self, sync: SyncValue) -> DomResult<()> {
        let node = NodeIndex::new(sync.index);
        if self.node(node).is_none() {
            tracing::trace!("Dropping sync for unknown node {}", sync.index);
            return Ok(());
        }
        self.runtime.set_allow_transfer(false);
        let result = self.set_property(node, "value", PropertyValue::Str(sync.value));
        self.runtime.set_allow_transfer(true);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventListener;
    use crate::protocol::TransferMessage;
    use crate::tree::NodeOperations;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;

    fn observed() -> (Document, mpsc::Receiver<TransferMessage>) {
        let (tx, rx) = mpsc::channel::<TransferMessage>();
        let mut doc = Document::new(tx);
        doc.observe();
        (doc, rx)
    }

    fn click(index: u32) -> TransferrableEvent {
        TransferrableEvent {
            index,
            event_type: "click".to_string(),
            bubbles: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_event_message_from_json() {
        let json = r#"{"type":1,"event":{
            "index":5,"type":"click","bubbles":true,"target":[0],
            "touches":[[1,0,0,2,3,0,0,5]]
        }}"#;
        let message: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.message_type(), MessageType::Event);
        let InboundMessage::Event(event) = message else {
            panic!("expected an event");
        };
        assert_eq!(event.target, Some(0));
        let touch = event.touches.unwrap()[0];
        assert_eq!(touch.client(), (2.0, 3.0));
        assert_eq!(touch.target(), 5);
    }

    #[test]
    fn test_minified_keys_decode() {
        let json = r#"{"12":1,"39":{"7":4,"12":"keydown","25":true,"35":13,"13":[4]}}"#;
        let InboundMessage::Event(event) = serde_json::from_str(json).unwrap() else {
            panic!("expected an event");
        };
        assert_eq!(event.index, 4);
        assert_eq!(event.event_type, "keydown");
        assert!(event.bubbles);
        assert_eq!(event.key_code, Some(13));
        assert_eq!(event.target, Some(4));

        let sync: InboundMessage =
            serde_json::from_str(r#"{"12":4,"40":{"7":9,"21":"typed"}}"#).unwrap();
        assert_eq!(
            sync,
            InboundMessage::Sync(SyncValue {
                index: 9,
                value: "typed".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_messages_are_rejected() {
        for json in [
            r#"{"type":9}"#,
            r#"{"type":3}"#,
            r#"{"type":1}"#,
            r#"{"type":4,"target":[3]}"#,
            r#"{"type":5,"sync":{"index":1,"value":"x"}}"#,
            r#"{"type":6,"target":[3],"data":[1,2,3]}"#,
            r#"{"Sync":{"index":3,"value":"x"}}"#,
        ] {
            assert!(serde_json::from_str::<InboundMessage>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_messages_serialize_with_numeric_type() {
        let message = InboundMessage::BoundingClientRect {
            target: NodeIndex::new(3),
            data: [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], 6);
        assert_eq!(json["target"], serde_json::json!([3]));
        assert_eq!(serde_json::from_value::<InboundMessage>(json).unwrap(), message);

        let json = serde_json::to_value(InboundMessage::Resize([640.0, 480.0])).unwrap();
        assert_eq!(json, serde_json::json!({"type": 5, "sync": [640.0, 480.0]}));
    }

    #[test]
    fn test_event_bubbles_to_document() {
        let (mut doc, _rx) = observed();
        let div = doc.create_element("div");
        let body = doc.body();
        doc.append_child(body, div).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let listener = EventListener::new(move |_, event| {
            log.borrow_mut().push((event.current_target, event.target));
        });
        let root = doc.document_element();
        doc.add_event_listener(root, "click", listener).unwrap();

        let mut event = click(div.get());
        event.target = Some(0);
        doc.handle_message(InboundMessage::Event(event)).unwrap();
        assert_eq!(*seen.borrow(), vec![(Some(root), Some(root))]);
    }

    #[test]
    fn test_touch_targets_resolve() {
        let (mut doc, _rx) = observed();
        let div = doc.create_element("div");
        let touches = Rc::new(RefCell::new(None));
        let out = touches.clone();
        doc.add_event_listener(
            div,
            "touchstart",
            EventListener::new(move |_, event| *out.borrow_mut() = event.touches.clone()),
        )
        .unwrap();

        let mut event = click(div.get());
        event.event_type = "touchstart".to_string();
        event.touches = Some(vec![
            TransferrableTouch([0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, div.get() as f64]),
            TransferrableTouch([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ]);
        doc.handle_message(InboundMessage::Event(event)).unwrap();

        let touches = touches.borrow().clone().unwrap();
        assert_eq!(touches[0].target, Some(div));
        assert_eq!(touches[0].page_y, 6.0);
        assert_eq!(touches[1].target, Some(doc.document_element()));
    }

    #[test]
    fn test_event_for_unknown_node_is_dropped() {
        let (mut doc, _rx) = observed();
        assert!(doc.handle_message(InboundMessage::Event(click(999))).is_ok());
    }

    #[test]
    fn test_sync_does_not_echo() {
        let (mut doc, rx) = observed();
        let input = doc.create_element("input");
        let body = doc.body();
        doc.append_child(body, input).unwrap();
        assert_eq!(doc.drain_pending_mutations(), 1);
        rx.try_recv().unwrap();

        doc.handle_message(InboundMessage::Sync(SyncValue {
            index: input.get(),
            value: "typed".to_string(),
        }))
        .unwrap();
        assert_eq!(doc.input_value(input).unwrap(), "typed");
        assert!(doc.runtime().pending_mutations().is_empty());
        assert_eq!(doc.drain_pending_mutations(), 0);
        assert!(doc.runtime().allow_transfer());
    }

    #[test]
    fn test_sync_on_plain_element_is_kept() {
        let (mut doc, _rx) = observed();
        let area = doc.create_element("textarea");
        doc.handle_message(InboundMessage::Sync(SyncValue {
            index: area.get(),
            value: "notes".to_string(),
        }))
        .unwrap();
        assert_eq!(doc.property(area, "value").unwrap(), PropertyValue::from("notes"));
    }

    #[test]
    fn test_resize_and_initializing_guard() {
        let (tx, _rx) = mpsc::channel::<TransferMessage>();
        let mut doc = Document::new(tx);
        doc.handle_message(InboundMessage::Resize([800.0, 600.0])).unwrap();
        assert_eq!(doc.inner_width(), 0.0);

        doc.observe();
        doc.handle_message(InboundMessage::Resize([800.0, 600.0])).unwrap();
        assert_eq!(doc.inner_width(), 800.0);
        assert_eq!(doc.inner_height(), 600.0);
    }
}
