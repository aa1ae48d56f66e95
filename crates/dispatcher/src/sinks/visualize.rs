//! VisualizeSink - draws bundles via a renderer collaborator.

use contracts::{
    Bundle, BundleHandler, FrameRenderer, OutputSink, RenderFlow, SinkFlow, StreamError,
    VisualConfig,
};
use tracing::{debug, instrument};

/// Sink that renders each bundle and may forward it to a user callback
/// afterwards.
///
/// Runs strictly on the dispatch loop thread: window toolkits reject calls
/// from any other thread, which is why sink invocation is synchronous.
pub struct VisualizeSink {
    name: String,
    renderer: Box<dyn FrameRenderer>,
    config: VisualConfig,
    callback: Option<BundleHandler>,
}

impl VisualizeSink {
    /// Create a new VisualizeSink.
    pub fn new(
        name: impl Into<String>,
        renderer: Box<dyn FrameRenderer>,
        config: VisualConfig,
        callback: Option<BundleHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            renderer,
            config,
            callback,
        }
    }
}

impl OutputSink for VisualizeSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "visualize_sink_deliver",
        skip(self, bundle),
        fields(sink = %self.name, sequence = bundle.sequence)
    )]
    fn deliver(&mut self, bundle: &Bundle) -> Result<SinkFlow, StreamError> {
        if self.renderer.render(bundle, &self.config)? == RenderFlow::Quit {
            debug!(sink = %self.name, "renderer requested quit");
            return Ok(SinkFlow::Stop);
        }

        match self.callback.as_mut() {
            Some(callback) => callback(bundle),
            None => Ok(SinkFlow::Continue),
        }
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        debug!(sink = %self.name, "VisualizeSink closed");
        self.renderer.close()
    }
}
