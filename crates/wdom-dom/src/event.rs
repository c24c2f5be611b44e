//! DOM Events
//!
//! Listener registration, dispatch with bubbling, and the
//! `EVENT_SUBSCRIPTION` notifications the main thread uses to attach its
//! proxy listeners.

use std::collections::HashMap;
use std::rc::Rc;

use crate::document::Document;
use crate::protocol::TransferMutation;
use crate::{DomError, DomResult, NodeIndex};

/// DOM event
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub event_type: String,
    pub bubbles: bool,
    pub cancelable: bool,
    pub cancel_bubble: bool,
    pub default_prevented: bool,
    pub event_phase: u16,
    pub is_trusted: bool,
    pub return_value: bool,
    pub time_stamp: f64,
    pub scoped: bool,
    pub key_code: Option<u32>,
    pub page_x: Option<f64>,
    pub page_y: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub target: Option<NodeIndex>,
    pub current_target: Option<NodeIndex>,
    pub touches: Option<Vec<Touch>>,
    pub changed_touches: Option<Vec<Touch>>,
    stop: bool,
    end: bool,
}

impl Event {
    pub fn new(event_type: impl Into<String>, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles,
            cancelable,
            ..Default::default()
        }
    }

    pub fn stop_propagation(&mut self) {
        self.stop = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.stop = true;
        self.end = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stop
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.end
    }
}

/// One entry of `touches` / `changedTouches`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub identifier: f64,
    pub screen_x: f64,
    pub screen_y: f64,
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
    pub target: Option<NodeIndex>,
}

type Handler = dyn Fn(&mut Document, &mut Event) -> bool;

/// Event handler. Identity is the allocation, so a clone of a listener
/// removes the original.
#[derive(Clone)]
pub struct EventListener(Rc<Handler>);

impl EventListener {
    /// Handler that never asks to stop dispatch
    pub fn new(handler: impl Fn(&mut Document, &mut Event) + 'static) -> Self {
        Self(Rc::new(move |document: &mut Document, event: &mut Event| {
            handler(document, event);
            true
        }))
    }

    /// Handler whose `false` return stops the remaining handlers of a
    /// cancelable event
    pub fn with_return(handler: impl Fn(&mut Document, &mut Event) -> bool + 'static) -> Self {
        Self(Rc::new(handler))
    }

    fn call(&self, document: &mut Document, event: &mut Event) -> bool {
        (self.0)(document, event)
    }
}

impl PartialEq for EventListener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EventListener").field(&Rc::as_ptr(&self.0)).finish()
    }
}

/// Event target capability
pub trait EventTarget {
    /// Register `listener` for `event_type` (case-insensitive)
    fn add_event_listener(
        &mut self,
        node: NodeIndex,
        event_type: &str,
        listener: EventListener,
    ) -> DomResult<()>;

    /// Unregister `listener`, returning whether it was registered
    fn remove_event_listener(
        &mut self,
        node: NodeIndex,
        event_type: &str,
        listener: &EventListener,
    ) -> DomResult<bool>;

    /// Dispatch `event` at `node`, returning `!defaultPrevented`
    fn dispatch_event(&mut self, node: NodeIndex, event: &mut Event) -> DomResult<bool>;
}

impl EventTarget for Document {
    fn add_event_listener(
        &mut self,
        node: NodeIndex,
        event_type: &str,
        listener: EventListener,
    ) -> DomResult<()> {
        let lower_type = event_type.to_lowercase();
        let stored_type = self.runtime.store_string(&lower_type);

        let entry = self.node_mut(node)?;
        let map = entry.listeners.get_or_insert_with(HashMap::new);
        // The first registration for a type reports 0, later ones the new length
        let handler_index = match map.get_mut(&lower_type) {
            Some(handlers) => {
                handlers.push(listener);
                handlers.len()
            }
            None => {
                map.insert(lower_type, vec![listener]);
                0
            }
        };

        self.runtime.transfer(TransferMutation::EventSubscription {
            target: node,
            removal: false,
            event_type: stored_type,
            handler_index: handler_index as u32,
        });
        Ok(())
    }

    fn remove_event_listener(
        &mut self,
        node: NodeIndex,
        event_type: &str,
        listener: &EventListener,
    ) -> DomResult<bool> {
        let lower_type = event_type.to_lowercase();
        let entry = self.node_mut(node)?;
        let Some(handlers) = entry
            .listeners
            .as_mut()
            .and_then(|map| map.get_mut(&lower_type))
        else {
            return Ok(false);
        };
        let Some(position) = handlers.iter().position(|handler| handler == listener) else {
            return Ok(false);
        };
        handlers.remove(position);

        let stored_type = self.runtime.store_string(&lower_type);
        self.runtime.transfer(TransferMutation::EventSubscription {
            target: node,
            removal: true,
            event_type: stored_type,
            handler_index: position as u32,
        });
        Ok(true)
    }

    fn dispatch_event(&mut self, node: NodeIndex, event: &mut Event) -> DomResult<bool> {
        if !self.runtime.nodes.contains(node) {
            return Err(DomError::UnknownNode(node.get()));
        }
        let lower_type = event.event_type.to_lowercase();
        if event.target.is_none() {
            event.target = Some(node);
        }

        let mut current = Some(node);
        while let Some(target) = current {
            event.current_target = Some(target);
            let handlers: Vec<EventListener> = self
                .node(target)
                .and_then(|entry| entry.listeners.as_ref())
                .and_then(|map| map.get(&lower_type))
                .cloned()
                .unwrap_or_default();

            for handler in handlers.iter().rev() {
                let keep_going = handler.call(self, event);
                if (!keep_going || event.end) && event.cancelable {
                    break;
                }
            }

            if !event.bubbles || (event.cancelable && event.stop) {
                break;
            }
            current = self.node(target).and_then(|entry| entry.parent);
        }

        Ok(!event.default_prevented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_immediate_sets_both_flags() {
        let mut event = Event::new("click", true, true);
        event.stop_immediate_propagation();
        assert!(event.is_propagation_stopped());
        assert!(event.is_immediate_propagation_stopped());
    }

    #[test]
    fn test_listener_identity() {
        let a = EventListener::new(|_, _| {});
        let b = EventListener::new(|_, _| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
