//! DOM Observers
//!
//! MutationObserver with single-target semantics. Records are queued per
//! observer and delivered together at the next microtask checkpoint.

use std::rc::Rc;

use crate::document::Document;
use crate::protocol::TransferMutation;
use crate::runtime::Microtask;
use crate::NodeIndex;

/// Handle to an observer owned by a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Called with the records queued since the previous delivery
pub type ObserverCallback = Rc<dyn Fn(&mut Document, Vec<MutationRecord>)>;

/// Mutation observer options
///
/// Stored with the observer; matching is by target ancestry only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeIndex,
    pub added_nodes: Vec<NodeIndex>,
    pub removed_nodes: Vec<NodeIndex>,
    pub previous_sibling: Option<NodeIndex>,
    pub next_sibling: Option<NodeIndex>,
    pub attribute_name: Option<String>,
    pub attribute_namespace: Option<String>,
    pub value: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn new(mutation_type: MutationType, target: NodeIndex) -> Self {
        Self {
            mutation_type,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            attribute_namespace: None,
            value: None,
            old_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

struct MutationObserver {
    callback: ObserverCallback,
    target: Option<NodeIndex>,
    options: MutationObserverInit,
    records: Vec<MutationRecord>,
}

/// Observers owned by one document
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Vec<MutationObserver>,
    /// Observers with a target, in the order they started observing
    connected: Vec<ObserverId>,
    delivery_scheduled: bool,
}

impl ObserverRegistry {
    fn get_mut(&mut self, id: ObserverId) -> Option<&mut MutationObserver> {
        self.observers.get_mut(id.0 as usize)
    }

    fn disconnect(&mut self, id: ObserverId) {
        if let Some(observer) = self.get_mut(id) {
            observer.target = None;
        }
        self.connected.retain(|&connected| connected != id);
    }
}

impl Document {
    pub fn create_mutation_observer(
        &mut self,
        callback: impl Fn(&mut Document, Vec<MutationRecord>) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.observers.observers.len() as u32);
        self.observers.observers.push(MutationObserver {
            callback: Rc::new(callback),
            target: None,
            options: MutationObserverInit::default(),
            records: Vec::new(),
        });
        id
    }

    /// Start observing `target` and its subtree, replacing any previous
    /// target of this observer
    pub fn observe_mutations(
        &mut self,
        id: ObserverId,
        target: NodeIndex,
        options: MutationObserverInit,
    ) {
        self.observers.disconnect(id);
        if let Some(observer) = self.observers.get_mut(id) {
            observer.target = Some(target);
            observer.options = options;
            self.observers.connected.push(id);
        }
    }

    pub fn disconnect_observer(&mut self, id: ObserverId) {
        self.observers.disconnect(id);
    }

    /// Drain the records queued for `id`
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .get_mut(id)
            .map(|observer| std::mem::take(&mut observer.records))
            .unwrap_or_default()
    }

    pub fn observer_options(&self, id: ObserverId) -> Option<&MutationObserverInit> {
        self.observers.observers.get(id.0 as usize).map(|observer| &observer.options)
    }

    /// Record a mutation: queue its wire form for transfer and hand the
    /// record to every observer whose target is the mutated node or one of
    /// its ancestors.
    pub(crate) fn mutate(&mut self, record: MutationRecord, mutation: TransferMutation) {
        self.runtime.transfer(mutation);

        let mut matched = Vec::new();
        for &id in &self.observers.connected {
            let Some(observed) = self.observers.observers[id.0 as usize].target else {
                continue;
            };
            let mut current = Some(record.target);
            while let Some(index) = current {
                if index == observed {
                    matched.push(id);
                    break;
                }
                current = self.parent_node(index);
            }
        }

        for id in matched {
            if let Some(observer) = self.observers.get_mut(id) {
                observer.records.push(record.clone());
            }
            if !self.observers.delivery_scheduled {
                self.observers.delivery_scheduled = true;
                self.runtime.schedule(Microtask::DeliverObservers);
            }
        }
    }

    pub(crate) fn deliver_observers(&mut self) {
        self.observers.delivery_scheduled = false;
        for id in self.observers.connected.clone() {
            let Some(observer) = self.observers.get_mut(id) else {
                continue;
            };
            if observer.records.is_empty() {
                continue;
            }
            let records = std::mem::take(&mut observer.records);
            let callback = Rc::clone(&observer.callback);
            callback(self, records);
        }
    }
}
