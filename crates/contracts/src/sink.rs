//! OutputSink trait - dispatch output interface
//!
//! Defines the abstract interface for sinks and their collaborators.
//! All sink work is synchronous: the dispatch loop invokes sinks on its own
//! thread, which is a hard requirement for visualizers (window toolkits only
//! tolerate one thread).

use crate::{Bundle, StreamError, VisualConfig};

/// What the dispatch loop should do after a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    /// Keep polling
    Continue,
    /// A sink requested shutdown (e.g. visualizer window closed)
    Stop,
}

/// Bundle consumer interface.
///
/// Exactly three implementations exist (callback / visualize / record); the
/// set is closed and resolved once at registration time.
pub trait OutputSink: Send {
    /// Sink name (used for logging/metrics); equals the resolved binding name.
    fn name(&self) -> &str;

    /// Handle one completed bundle.
    ///
    /// # Errors
    /// Delivery errors are caught at the dispatch boundary and must not
    /// poison the sink: the binding keeps being serviced on later ticks.
    fn deliver(&mut self, bundle: &Bundle) -> Result<SinkFlow, StreamError>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), StreamError>;

    /// Close the sink. Called exactly once during teardown.
    fn close(&mut self) -> Result<(), StreamError>;
}

/// User callback invoked with a completed bundle.
pub type BundleHandler = Box<dyn FnMut(&Bundle) -> Result<SinkFlow, StreamError> + Send>;

/// Result of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFlow {
    /// Keep rendering
    Continue,
    /// User asked to quit (key press, window close)
    Quit,
}

/// Drawing collaborator of a visualize sink.
///
/// Overlays bundle annotations onto the primary frame and presents it.
/// Must only be called from the dispatch thread.
pub trait FrameRenderer: Send {
    /// Draw one bundle.
    fn render(&mut self, bundle: &Bundle, config: &VisualConfig)
        -> Result<RenderFlow, StreamError>;

    /// Tear down windows/resources.
    fn close(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

/// Persistent-stream collaborator of a record sink.
///
/// Append-only; encoding and container internals live behind this trait.
pub trait BundleWriter: Send {
    /// Append one bundle's payloads.
    fn append(&mut self, bundle: &Bundle) -> Result<(), StreamError>;

    /// Flush buffered data to stable storage.
    fn flush(&mut self) -> Result<(), StreamError>;

    /// Finalize the output. Must be called before the process reports
    /// fully stopped.
    fn close(&mut self) -> Result<(), StreamError>;
}
