//! Dispatcher error types

use contracts::StreamError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Invalid binding configuration; fails only the offending `bind` call
    #[error("invalid binding: {message}")]
    InvalidBinding { message: String },

    /// Explicit name requested but already taken
    #[error("output name already taken: {name}")]
    NameTaken { name: String },

    /// Bind attempted after the dispatch loop started
    #[error("engine is running, registration is closed")]
    RegistrationClosed,

    /// Producer half for a stream requested twice (queues are SPSC)
    #[error("producer for stream '{stream}' already taken")]
    SenderTaken { stream: String },

    /// Stream not registered with any binding
    #[error("unknown stream: {stream}")]
    UnknownStream { stream: String },

    /// Error bubbled up from the contract layer
    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl DispatchError {
    /// Create an invalid-binding error
    pub fn invalid_binding(message: impl Into<String>) -> Self {
        Self::InvalidBinding {
            message: message.into(),
        }
    }
}
