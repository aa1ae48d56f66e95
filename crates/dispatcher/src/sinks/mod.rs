//! Sink implementations
//!
//! The sink set is closed: callback, visualize, record. A `SinkSpec` is
//! resolved into its concrete sink once, at registration time.

mod callback;
mod record;
mod visualize;

use std::path::PathBuf;

use contracts::{BundleHandler, BundleWriter, FrameRenderer, OutputSink, VisualConfig};

pub use self::callback::CallbackSink;
pub use self::record::{DiskWriter, RecordSink};
pub use self::visualize::VisualizeSink;

/// Declarative sink choice handed to `DispatchEngine::bind`.
pub enum SinkSpec {
    /// Invoke a user callback with each bundle
    Callback(BundleHandler),

    /// Draw each bundle via a renderer collaborator, then optionally invoke
    /// a user callback
    Visualize {
        renderer: Box<dyn FrameRenderer>,
        config: VisualConfig,
        callback: Option<BundleHandler>,
    },

    /// Append each bundle to a persistent stream writer
    Record {
        writer: Box<dyn BundleWriter>,
        path: PathBuf,
    },
}

impl SinkSpec {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SinkSpec::Callback(_) => "callback",
            SinkSpec::Visualize { .. } => "visualize",
            SinkSpec::Record { .. } => "record",
        }
    }

    /// Resolve the spec into its sink under the binding's final name.
    pub(crate) fn into_sink(self, name: &str) -> Box<dyn OutputSink> {
        match self {
            SinkSpec::Callback(handler) => Box::new(CallbackSink::new(name, handler)),
            SinkSpec::Visualize {
                renderer,
                config,
                callback,
            } => Box::new(VisualizeSink::new(name, renderer, config, callback)),
            SinkSpec::Record { writer, path } => Box::new(RecordSink::new(name, writer, path)),
        }
    }
}

impl std::fmt::Debug for SinkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSpec").field("kind", &self.kind()).finish()
    }
}
