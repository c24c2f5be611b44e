//! Worker runtime context
//!
//! Owns the lifecycle phase, both interning tables, the pending mutation
//! queue and the outbound port. One runtime per [`Document`](crate::Document),
//! so independent documents never share state.

use std::collections::VecDeque;
use std::time::Duration;

use crate::protocol::{MessagePort, MessageType, Phase, TransferMessage, TransferMutation};
use crate::storage::{NodeStorage, StringStorage};

/// Tunables for a runtime
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOptions {
    /// How long `get_bounding_client_rect` waits for the main thread
    pub bounding_rect_timeout: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            bounding_rect_timeout: Duration::from_millis(500),
        }
    }
}

/// Work deferred to the end of the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Microtask {
    /// Flush pending mutations to the port
    Transfer,
    /// Hand queued records to their observers
    DeliverObservers,
}

/// Per-document protocol state
pub struct WorkerRuntime {
    phase: Phase,
    pub(crate) nodes: NodeStorage,
    pub(crate) strings: StringStorage,
    allow_transfer: bool,
    pending_mutations: Vec<TransferMutation>,
    transfer_scheduled: bool,
    microtasks: VecDeque<Microtask>,
    port: Box<dyn MessagePort>,
    options: RuntimeOptions,
    posted: usize,
}

impl WorkerRuntime {
    pub fn new(port: impl MessagePort + 'static, options: RuntimeOptions) -> Self {
        Self {
            phase: Phase::Initializing,
            nodes: NodeStorage::new(),
            strings: StringStorage::new(),
            allow_transfer: true,
            pending_mutations: Vec::new(),
            transfer_scheduled: false,
            microtasks: VecDeque::new(),
            port: Box::new(port),
            options,
            posted: 0,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!("Runtime phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
    }

    #[inline]
    pub fn allow_transfer(&self) -> bool {
        self.allow_transfer
    }

    pub(crate) fn set_allow_transfer(&mut self, allow: bool) {
        self.allow_transfer = allow;
    }

    pub fn nodes(&self) -> &NodeStorage {
        &self.nodes
    }

    pub fn strings(&self) -> &StringStorage {
        &self.strings
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Total number of messages posted to the port
    pub fn messages_posted(&self) -> usize {
        self.posted
    }

    /// Mutations queued for the next flush
    pub fn pending_mutations(&self) -> &[TransferMutation] {
        &self.pending_mutations
    }

    #[inline]
    pub(crate) fn store_string(&mut self, value: &str) -> u32 {
        self.strings.store(value)
    }

    /// Queue a mutation for the next flush.
    ///
    /// Dropped while initializing and while an inbound sync is being
    /// applied. The first mutation of a batch schedules the flush.
    pub(crate) fn transfer(&mut self, mutation: TransferMutation) {
        if self.phase == Phase::Initializing || !self.allow_transfer {
            return;
        }
        self.pending_mutations.push(mutation);
        if !self.transfer_scheduled {
            self.transfer_scheduled = true;
            self.schedule(Microtask::Transfer);
        }
    }

    pub(crate) fn schedule(&mut self, task: Microtask) {
        self.microtasks.push_back(task);
    }

    pub(crate) fn next_microtask(&mut self) -> Option<Microtask> {
        self.microtasks.pop_front()
    }

    /// Post everything queued since the last flush as one message.
    ///
    /// Returns `false` when nothing was scheduled.
    pub(crate) fn flush(&mut self) -> bool {
        if !self.transfer_scheduled {
            return false;
        }
        self.transfer_scheduled = false;

        let mut nodes = Vec::new();
        for index in self.nodes.consume() {
            if let Some(node) = self.nodes.get(index) {
                nodes.extend(node.creation_format.iter().map(|&value| value as u16));
            }
        }

        let mut mutations = Vec::new();
        for mutation in self.pending_mutations.drain(..) {
            mutation.encode(&mut mutations);
        }

        let message_type = if self.phase == Phase::Mutating {
            MessageType::Mutate
        } else {
            MessageType::Hydrate
        };
        let message = TransferMessage {
            phase: self.phase,
            message_type,
            nodes,
            strings: self.strings.consume(),
            mutations,
        };

        tracing::trace!(
            "Posting {:?}: {} node words, {} strings, {} mutation words",
            message_type,
            message.nodes.len(),
            message.strings.len(),
            message.mutations.len()
        );
        self.port.post_message(message);
        self.posted += 1;
        self.set_phase(Phase::Mutating);
        true
    }
}

impl std::fmt::Debug for WorkerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRuntime")
            .field("phase", &self.phase)
            .field("nodes", &self.nodes.len())
            .field("strings", &self.strings.len())
            .field("allow_transfer", &self.allow_transfer)
            .field("pending_mutations", &self.pending_mutations.len())
            .finish_non_exhaustive()
    }
}
