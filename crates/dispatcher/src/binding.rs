//! OutputBinding - one resolved output: sources, sink, synchronizer, meter.

use contracts::{BindingStats, Bundle, OutputSink, Packet, SinkFlow, StreamDescriptor, SyncConfig};
use stream_sync::SequenceSynchronizer;
use tracing::error;

use crate::fps::FpsMeter;

/// Ties a set of source streams to one sink.
///
/// Multi-stream bindings own a `SequenceSynchronizer`; single-stream
/// bindings forward each packet as its own one-element bundle. Created at
/// registration time, lives until engine teardown.
pub struct OutputBinding {
    name: String,
    sources: Vec<StreamDescriptor>,
    sink: Box<dyn OutputSink>,
    synchronizer: Option<SequenceSynchronizer>,
    fps: FpsMeter,
    dispatched: u64,
    sink_failures: u64,
}

impl OutputBinding {
    /// Assemble a binding; a synchronizer exists iff more than one source
    /// stream participates.
    pub(crate) fn new(
        name: String,
        sources: Vec<StreamDescriptor>,
        sink: Box<dyn OutputSink>,
        sync_config: &SyncConfig,
    ) -> Self {
        let synchronizer = (sources.len() > 1).then(|| {
            SequenceSynchronizer::new(
                sources.iter().map(|s| s.name.clone()).collect(),
                sync_config,
            )
        });

        Self {
            name,
            sources,
            sink,
            synchronizer,
            fps: FpsMeter::default(),
            dispatched: 0,
            sink_failures: 0,
        }
    }

    /// Resolved unique binding name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source streams feeding this binding.
    pub fn sources(&self) -> &[StreamDescriptor] {
        &self.sources
    }

    /// Feed one packet; returns every bundle that became ready.
    pub(crate) fn ingest(&mut self, packet: Packet) -> Vec<Bundle> {
        match self.synchronizer.as_mut() {
            Some(sync) => sync.push(packet),
            None => vec![Bundle::single(packet)],
        }
    }

    /// Deliver one bundle to the sink, catching failures at this boundary.
    ///
    /// A sink error is reported with the binding name and swallowed so the
    /// binding (and every other binding) keeps being serviced.
    pub(crate) fn dispatch(&mut self, bundle: &Bundle) -> SinkFlow {
        match self.sink.deliver(bundle) {
            Ok(flow) => {
                self.dispatched += 1;
                self.fps.tick();
                metrics::counter!(
                    "vision_router_bundles_dispatched_total",
                    "binding" => self.name.clone()
                )
                .increment(1);
                flow
            }
            Err(e) => {
                self.sink_failures += 1;
                metrics::counter!(
                    "vision_router_sink_failures_total",
                    "binding" => self.name.clone()
                )
                .increment(1);
                error!(
                    binding = %self.name,
                    sequence = bundle.sequence,
                    error = %e,
                    "sink delivery failed"
                );
                SinkFlow::Continue
            }
        }
    }

    /// Flush and close the sink; errors are reported, not rethrown, so one
    /// failing sink never blocks teardown of the others.
    pub(crate) fn close(&mut self) {
        if let Err(e) = self.sink.flush() {
            error!(binding = %self.name, error = %e, "sink flush failed on teardown");
        }
        if let Err(e) = self.sink.close() {
            error!(binding = %self.name, error = %e, "sink close failed on teardown");
        }
        self.fps.reset();
    }

    /// Diagnostics snapshot for this binding.
    pub fn stats(&self) -> BindingStats {
        BindingStats {
            name: self.name.clone(),
            dispatched: self.dispatched,
            sink_failures: self.sink_failures,
            fps: self.fps.fps(),
            sync: self.synchronizer.as_ref().map(|s| s.stats()),
        }
    }
}
