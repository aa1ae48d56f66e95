//! Layered error definitions
//!
//! Categorized by source: registration / queue / sync / sink / io

use thiserror::Error;

/// Unified error type shared across the engine crates.
#[derive(Debug, Error)]
pub enum StreamError {
    // ===== Registration Errors =====
    /// Invalid binding configuration
    #[error("registration error for '{name}': {message}")]
    Registration { name: String, message: String },

    /// Explicit name requested but already taken
    #[error("output name already taken: {name}")]
    NameTaken { name: String },

    // ===== Queue Errors =====
    /// Producer half for a stream requested twice (queues are SPSC)
    #[error("producer for stream '{stream}' already taken")]
    SenderTaken { stream: String },

    /// Stream not registered with any binding
    #[error("unknown stream: {stream}")]
    UnknownStream { stream: String },

    // ===== Sink Errors =====
    /// Sink failed to handle a bundle
    #[error("sink '{sink_name}' delivery error: {message}")]
    SinkDeliver { sink_name: String, message: String },

    /// Visualizer collaborator failed to draw
    #[error("renderer error in '{sink_name}': {message}")]
    Render { sink_name: String, message: String },

    /// Record collaborator failed to append/flush/close
    #[error("recorder error in '{sink_name}': {message}")]
    Record { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Create a registration error
    pub fn registration(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registration {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a sink delivery error
    pub fn sink_deliver(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkDeliver {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create a renderer error
    pub fn render(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create a recorder error
    pub fn record(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Record {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
