//! wdom Worker - global scope and bootstrap
//!
//! Wires a [`wdom_dom::Document`] into a worker: the sanitized global scope
//! scripts see, the long-task wrapper for async work, and a thread that
//! hydrates the document and pumps inbound messages.

mod config;
mod global;
mod long_task;
mod thread;

pub use config::WorkerConfig;
pub use global::{GlobalScope, LocalStorage, Navigator, PrototypeLevel, WHITELISTED_GLOBALS};
pub use long_task::{execute, wrap};
pub use thread::{WorkerHandle, WorkerThread};

use wdom_dom::DomError;

/// Result type for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Worker errors
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Invalid location: {0}")]
    Location(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker thread stopped")]
    Disconnected,
}
