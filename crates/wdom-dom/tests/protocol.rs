//! Transfer protocol tests for wdom-dom
//!
//! Batching, wire tuples and the inbound bridges, checked against the
//! messages a main thread would receive.

use std::sync::mpsc;

use wdom_dom::{
    Document, ElementAttributes, EventListener, EventTarget, InboundMessage, MessageType,
    MutationKind, NodeIndex, NodeOperations, Phase, SyncValue, TransferMessage,
};

fn observed() -> (Document, mpsc::Receiver<TransferMessage>) {
    let (tx, rx) = mpsc::channel::<TransferMessage>();
    let mut doc = Document::new(tx);
    doc.observe();
    (doc, rx)
}

fn string_index(doc: &Document, value: &str) -> u16 {
    doc.runtime().strings().index_of(value).unwrap() as u16
}

// ============================================================================
// BATCHING
// ============================================================================

#[test]
fn test_three_appends_post_one_message() {
    let (mut doc, rx) = observed();
    let body = doc.body();
    let divs: Vec<NodeIndex> = (0..3).map(|_| doc.create_element("div")).collect();
    for &div in &divs {
        doc.append_child(body, div).unwrap();
    }

    assert_eq!(doc.drain_pending_mutations(), 1);
    let message = rx.try_recv().unwrap();
    assert!(rx.try_recv().is_err());

    assert_eq!(message.message_type, MessageType::Hydrate);
    assert_eq!(message.phase, Phase::Hydrating);
    assert_eq!(message.node_formats().count(), 3);
    let tuples = message.mutation_tuples();
    assert_eq!(tuples.len(), 3);
    for (tuple, div) in tuples.iter().zip(&divs) {
        assert_eq!(tuple[0], MutationKind::ChildList as u16);
        assert_eq!(tuple[1], body.get() as u16);
        assert_eq!(&tuple[4..], &[1, 0, div.get() as u16]);
    }
    assert!(message.strings.iter().any(|s| s == "div"));
}

#[test]
fn test_later_batches_are_mutate_messages() {
    let (mut doc, rx) = observed();
    let body = doc.body();
    let div = doc.create_element("div");
    doc.append_child(body, div).unwrap();
    doc.drain_pending_mutations();
    rx.try_recv().unwrap();
    assert_eq!(doc.phase(), Phase::Mutating);

    doc.set_attribute(div, "id", "x").unwrap();
    assert_eq!(doc.drain_pending_mutations(), 1);
    let message = rx.try_recv().unwrap();
    assert_eq!(message.message_type, MessageType::Mutate);
    assert_eq!(message.phase, Phase::Mutating);
    assert!(message.nodes.is_empty());
}

#[test]
fn test_nothing_transferred_before_observe() {
    let (tx, rx) = mpsc::channel::<TransferMessage>();
    let mut doc = Document::new(tx);
    let body = doc.body();
    let div = doc.create_element("div");
    doc.append_child(body, div).unwrap();
    doc.set_attribute(div, "id", "x").unwrap();

    assert_eq!(doc.drain_pending_mutations(), 0);
    assert!(rx.try_recv().is_err());
    assert_eq!(doc.phase(), Phase::Initializing);
}

#[test]
fn test_drain_with_nothing_pending() {
    let (mut doc, rx) = observed();
    assert_eq!(doc.drain_pending_mutations(), 0);
    assert!(rx.try_recv().is_err());
}

// ============================================================================
// WIRE TUPLES
// ============================================================================

#[test]
fn test_attribute_tuples_offset_values() {
    let (mut doc, rx) = observed();
    let div = doc.create_element("div");
    doc.set_attribute(div, "title", "hello").unwrap();
    doc.remove_attribute(div, "title").unwrap();
    doc.drain_pending_mutations();
    let message = rx.try_recv().unwrap();

    let name = string_index(&doc, "title");
    let value = string_index(&doc, "hello");
    let tuples = message.mutation_tuples();
    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[0][0], MutationKind::Attributes as u16);
    assert_eq!(tuples[0][2], name);
    assert_eq!(tuples[0][4], value + 1);
    assert_eq!(tuples[1][4], 0);
}

#[test]
fn test_character_data_tuple() {
    let (mut doc, rx) = observed();
    let text = doc.create_text_node("a");
    doc.set_data(text, "b").unwrap();
    doc.drain_pending_mutations();
    let message = rx.try_recv().unwrap();

    let value = string_index(&doc, "b");
    assert_eq!(message.mutation_tuples(), vec![&[1, text.get() as u16, value][..]]);
    let format = message.node_formats().next().unwrap();
    assert_eq!(format[0], text.get() as u16);
    assert_eq!(format[1], 3);
}

#[test]
fn test_event_subscription_tuple() {
    let (mut doc, rx) = observed();
    let button = doc.create_element("button");
    let listener = EventListener::new(|_, _| {});
    doc.add_event_listener(button, "Click", listener.clone()).unwrap();
    assert!(doc.remove_event_listener(button, "click", &listener).unwrap());
    doc.drain_pending_mutations();
    let message = rx.try_recv().unwrap();

    let click = string_index(&doc, "click");
    let tuples = message.mutation_tuples();
    assert_eq!(tuples[0], &[4, button.get() as u16, 0, 1, click, 0]);
    assert_eq!(tuples[1], &[4, button.get() as u16, 1, 0, click, 0]);
}

#[test]
fn test_input_value_is_a_property_tuple() {
    let (mut doc, rx) = observed();
    let input = doc.create_element("input");
    doc.set_input_value(input, "abc").unwrap();
    doc.set_input_checked(input, true).unwrap();
    doc.set_input_checked(input, true).unwrap();
    doc.drain_pending_mutations();
    let message = rx.try_recv().unwrap();

    let value = string_index(&doc, "value");
    let abc = string_index(&doc, "abc");
    let checked = string_index(&doc, "checked");
    let tuples = message.mutation_tuples();
    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[0], &[3, input.get() as u16, value, 0, abc]);
    assert_eq!(tuples[1], &[3, input.get() as u16, checked, 1, 1]);
}

#[test]
fn test_interned_strings_sent_once() {
    let (mut doc, rx) = observed();
    let a = doc.create_element("section");
    let b = doc.create_element("section");
    doc.set_attribute(a, "data-x", "1").unwrap();
    doc.set_attribute(b, "data-x", "1").unwrap();
    doc.drain_pending_mutations();
    let first = rx.try_recv().unwrap();
    assert_eq!(first.strings.iter().filter(|s| *s == "section").count(), 1);
    assert_eq!(first.strings.iter().filter(|s| *s == "data-x").count(), 1);

    doc.set_attribute(a, "data-x", "2").unwrap();
    doc.drain_pending_mutations();
    let second = rx.try_recv().unwrap();
    assert_eq!(second.strings, vec!["2".to_string()]);
}

#[test]
fn test_transfer_message_json_shape() {
    let (mut doc, rx) = observed();
    let body = doc.body();
    let p = doc.create_element("p");
    doc.append_child(body, p).unwrap();
    doc.drain_pending_mutations();
    let message = rx.try_recv().unwrap();

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["type"], 2);
    assert_eq!(json["phase"], 1);
    assert!(json["mutations"].is_array());
    let back: TransferMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, message);
}

// ============================================================================
// INBOUND
// ============================================================================

#[test]
fn test_sync_value_not_echoed() {
    let (mut doc, rx) = observed();
    let body = doc.body();
    let input = doc.create_element("input");
    doc.append_child(body, input).unwrap();
    doc.drain_pending_mutations();
    rx.try_recv().unwrap();

    let json = format!(r#"{{"type":4,"target":[{}],"value":"typed"}}"#, input.get());
    let message: InboundMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(message.message_type(), MessageType::Sync);
    doc.handle_message(message).unwrap();

    assert_eq!(doc.input_value(input).unwrap(), "typed");
    assert_eq!(doc.drain_pending_mutations(), 0);

    // Later local writes transfer again
    doc.set_input_value(input, "local").unwrap();
    assert_eq!(doc.drain_pending_mutations(), 1);
}

#[test]
fn test_sync_for_removed_node_is_dropped() {
    let (mut doc, _rx) = observed();
    let result = doc.handle_message(InboundMessage::Sync(SyncValue {
        index: 4242,
        value: "x".to_string(),
    }));
    assert!(result.is_ok());
    assert!(doc.runtime().allow_transfer());
}

#[test]
fn test_bounding_rect_round_trip() {
    let (mut doc, rx) = observed();
    let body = doc.body();
    let div = doc.create_element("div");
    doc.append_child(body, div).unwrap();

    let pending = doc.get_bounding_client_rect_async(div).unwrap();
    doc.drain_pending_mutations();
    let message = rx.try_recv().unwrap();
    assert!(message.mutation_tuples().contains(&&[5, div.get() as u16][..]));

    doc.handle_message(InboundMessage::BoundingClientRect {
        target: div,
        data: [5.0, 25.0, 15.0, 5.0, 20.0, 10.0],
    })
    .unwrap();
    let rect = smol::block_on(pending);
    assert_eq!(rect.width, 20.0);
    assert_eq!(rect.x, 5.0);
}

#[test]
fn test_numeric_type_messages_drive_every_bridge() {
    let (mut doc, rx) = observed();
    let body = doc.body();
    let input = doc.create_element("input");
    doc.append_child(body, input).unwrap();
    let clicks = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = clicks.clone();
    let listener = EventListener::new(move |_, _| counter.set(counter.get() + 1));
    doc.add_event_listener(input, "click", listener).unwrap();
    let pending = doc.get_bounding_client_rect_async(input).unwrap();
    doc.drain_pending_mutations();
    rx.try_recv().unwrap();

    let index = input.get();
    let event = format!(r#"{{"index":{index},"type":"click","bubbles":true,"target":[{index}]}}"#);
    let inbound = [
        format!(r#"{{"type":1,"event":{event}}}"#),
        format!(r#"{{"type":4,"target":[{index}],"value":"synced"}}"#),
        r#"{"type":5,"sync":[640,480]}"#.to_string(),
        format!(r#"{{"type":6,"target":[{index}],"data":[1,2,3,4,5,6]}}"#),
    ];
    let kinds: Vec<MessageType> = inbound
        .iter()
        .map(|json| {
            let message: InboundMessage = serde_json::from_str(json).unwrap();
            let kind = message.message_type();
            doc.handle_message(message).unwrap();
            kind
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            MessageType::Event,
            MessageType::Sync,
            MessageType::Resize,
            MessageType::GetBoundingClientRect,
        ]
    );

    assert_eq!(clicks.get(), 1);
    assert_eq!(doc.input_value(input).unwrap(), "synced");
    assert_eq!((doc.inner_width(), doc.inner_height()), (640.0, 480.0));
    let rect = smol::block_on(pending);
    assert_eq!((rect.top, rect.left, rect.height), (1.0, 4.0, 6.0));
    assert_eq!(doc.drain_pending_mutations(), 0);
}
