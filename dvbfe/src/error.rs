//! Error types for frontend management.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Errors surfaced to callers of the adapter API.
///
/// Hardware failures inside the worker loop are never reported through this
/// type; they are logged and superseded by the next command or poll.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// The frontend device node could not be opened.
    #[error("Failed to open frontend {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The kernel reported a frontend type this crate cannot drive.
    #[error("Unsupported frontend type: {0}")]
    UnsupportedType(u32),

    /// Growing the command queue failed.
    #[error("Failed to allocate tune command: {0}")]
    QueueAlloc(#[from] TryReserveError),

    /// `start` was called on an adapter whose worker is already running.
    #[error("Frontend worker already started for {0}")]
    AlreadyStarted(String),

    /// The worker thread could not be spawned.
    #[error("Failed to spawn frontend worker for {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FrontendError>;
