//! Worker thread
//!
//! A [`WorkerThread`] owns one document and its global scope. Every inbound
//! message is one turn: the message is applied, then pending mutations are
//! flushed as a single transfer. [`WorkerThread::spawn`] runs that loop on
//! its own OS thread behind a pair of channels.

use std::thread::{self, JoinHandle};

use smol::channel::{Receiver, Sender};
use wdom_dom::{Document, HydrateableNode, InboundMessage, MessagePort, TransferMessage};

use crate::config::WorkerConfig;
use crate::global::GlobalScope;
use crate::{WorkerError, WorkerResult};

/// Worker-side state: the document and what scripts see as `self`
pub struct WorkerThread {
    document: Document,
    global: GlobalScope,
}

impl WorkerThread {
    /// Build a worker posting its transfers to `port`
    pub fn new(config: &WorkerConfig, port: impl MessagePort + 'static) -> WorkerResult<Self> {
        config.validate()?;
        let mut document = Document::with_options(port, config.runtime_options());
        document.set_viewport(f64::from(config.inner_width), f64::from(config.inner_height));
        let global = GlobalScope::new(config)?;
        tracing::debug!("Worker created at {}", global.location);
        Ok(Self { document, global })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn global(&self) -> &GlobalScope {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut GlobalScope {
        &mut self.global
    }

    /// Mirror the main thread's rendered body, then start transferring
    pub fn hydrate(
        &mut self,
        strings: &[String],
        skeleton: &HydrateableNode,
        keys: &[String],
    ) -> WorkerResult<()> {
        self.document.initialize(strings, skeleton, keys)?;
        self.document.observe();
        Ok(())
    }

    /// Apply one inbound message without ending the turn
    pub fn handle_message(&mut self, message: InboundMessage) -> WorkerResult<()> {
        let resize = matches!(message, InboundMessage::Resize(_));
        self.document.handle_message(message)?;
        if resize {
            self.global.sync_viewport(&self.document);
        }
        Ok(())
    }

    /// Apply `message` and flush, returning the number of messages posted
    pub fn turn(&mut self, message: InboundMessage) -> WorkerResult<usize> {
        self.handle_message(message)?;
        Ok(self.document.drain_pending_mutations())
    }

    /// Process inbound messages until the sender side closes
    pub async fn run(&mut self, inbound: Receiver<InboundMessage>) -> WorkerResult<()> {
        while let Ok(message) = inbound.recv().await {
            self.turn(message)?;
        }
        tracing::debug!("Inbound channel closed, worker stopping");
        Ok(())
    }

    /// Start a worker on a dedicated thread.
    ///
    /// `setup` runs on that thread before the first message is processed;
    /// its mutations form the first transfer.
    pub fn spawn<F>(config: WorkerConfig, setup: F) -> WorkerResult<WorkerHandle>
    where
        F: FnOnce(&mut WorkerThread) -> WorkerResult<()> + Send + 'static,
    {
        config.validate()?;
        let (inbound_tx, inbound_rx) = smol::channel::unbounded::<InboundMessage>();
        let (outbound_tx, outbound_rx) = smol::channel::unbounded::<TransferMessage>();

        let join = thread::Builder::new().name("wdom-worker".to_string()).spawn(move || {
            let mut worker = WorkerThread::new(&config, outbound_tx)?;
            setup(&mut worker)?;
            worker.document.drain_pending_mutations();
            smol::block_on(worker.run(inbound_rx))
        })?;

        Ok(WorkerHandle {
            inbound: inbound_tx,
            outbound: outbound_rx,
            join,
        })
    }
}

impl std::fmt::Debug for WorkerThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThread")
            .field("document", &self.document)
            .field("location", &self.global.location.as_str())
            .finish_non_exhaustive()
    }
}

/// Main-thread side of a spawned worker
#[derive(Debug)]
pub struct WorkerHandle {
    inbound: Sender<InboundMessage>,
    outbound: Receiver<TransferMessage>,
    join: JoinHandle<WorkerResult<()>>,
}

impl WorkerHandle {
    pub fn post_message(&self, message: InboundMessage) -> WorkerResult<()> {
        self.inbound.try_send(message).map_err(|_| WorkerError::Disconnected)
    }

    /// Next transfer from the worker
    pub async fn recv(&self) -> WorkerResult<TransferMessage> {
        self.outbound.recv().await.map_err(|_| WorkerError::Disconnected)
    }

    pub fn try_recv(&self) -> Option<TransferMessage> {
        self.outbound.try_recv().ok()
    }

    /// Close the inbound channel and wait for the worker to finish
    pub fn terminate(self) -> WorkerResult<()> {
        self.inbound.close();
        self.join.join().map_err(|_| WorkerError::Disconnected)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_resize_updates_global() {
        let (tx, _rx) = mpsc::channel::<TransferMessage>();
        let config = WorkerConfig {
            inner_width: 100,
            inner_height: 50,
            ..Default::default()
        };
        let mut worker = WorkerThread::new(&config, tx).unwrap();
        assert_eq!(worker.document().inner_width(), 100.0);

        worker.document_mut().observe();
        assert_eq!(worker.turn(InboundMessage::Resize([300.0, 200.0])).unwrap(), 0);
        assert_eq!(worker.global().inner_width, 300.0);
        assert_eq!(worker.global().inner_height, 200.0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let (tx, _rx) = mpsc::channel::<TransferMessage>();
        let config = WorkerConfig {
            location: "::".to_string(),
            ..Default::default()
        };
        assert!(matches!(WorkerThread::new(&config, tx), Err(WorkerError::Location(_))));
    }
}
