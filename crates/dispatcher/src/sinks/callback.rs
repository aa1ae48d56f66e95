//! CallbackSink - hands bundles to a user function.

use contracts::{Bundle, BundleHandler, OutputSink, SinkFlow, StreamError};
use tracing::{debug, instrument};

/// Sink that invokes a user-supplied handler with each assembled bundle.
///
/// The engine owns no side effects beyond the invocation; handler errors are
/// surfaced to the dispatch boundary and reported there.
pub struct CallbackSink {
    name: String,
    handler: BundleHandler,
}

impl CallbackSink {
    /// Create a new CallbackSink with the given resolved name.
    pub fn new(name: impl Into<String>, handler: BundleHandler) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl OutputSink for CallbackSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "callback_sink_deliver",
        skip(self, bundle),
        fields(sink = %self.name, sequence = bundle.sequence)
    )]
    fn deliver(&mut self, bundle: &Bundle) -> Result<SinkFlow, StreamError> {
        (self.handler)(bundle)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        // Nothing buffered for a callback sink
        Ok(())
    }

    fn close(&mut self) -> Result<(), StreamError> {
        debug!(sink = %self.name, "CallbackSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{Packet, PayloadKind};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn handler_sees_every_bundle() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let mut sink = CallbackSink::new(
            "cb",
            Box::new(move |_bundle| {
                seen_in_handler.fetch_add(1, Ordering::Relaxed);
                Ok(SinkFlow::Continue)
            }),
        );

        for seq in 0..3 {
            let bundle = Bundle::single(Packet::new(
                "color",
                seq,
                PayloadKind::Frame,
                Bytes::new(),
                0.0,
            ));
            assert_eq!(sink.deliver(&bundle).unwrap(), SinkFlow::Continue);
        }
        assert_eq!(seen.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn handler_error_propagates() {
        let mut sink = CallbackSink::new(
            "cb",
            Box::new(|_bundle| Err(StreamError::sink_deliver("cb", "boom"))),
        );
        let bundle = Bundle::single(Packet::new("color", 0, PayloadKind::Frame, Bytes::new(), 0.0));
        assert!(sink.deliver(&bundle).is_err());
    }
}
