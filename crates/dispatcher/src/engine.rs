//! DispatchEngine - registration, poll loop, teardown.
//!
//! Single-threaded by contract: producers only touch the sender halves of
//! the stream queues; everything else (synchronizers, bindings, sinks) is
//! confined to the thread driving `dispatch_once`.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    BindingStats, BundleHandler, BundleWriter, DispatchConfig, FrameRenderer, SinkFlow,
    StreamDescriptor, StreamName, VisualConfig,
};
use stream_sync::{packet_queue, PacketReceiver, PacketSender};
use tracing::{debug, info, instrument, trace};

use crate::binding::OutputBinding;
use crate::error::DispatchError;
use crate::naming::resolve_name;
use crate::sinks::SinkSpec;

/// How a binding wants its name chosen.
#[derive(Debug, Clone, Default)]
pub enum NameRequest {
    /// Derive from the source stream names, resolve collisions
    #[default]
    Auto,
    /// Use this name, resolve collisions by numbering
    Prefer(String),
    /// Use exactly this name; registration fails if taken
    Exact(String),
}

/// One registration: source streams, sink choice, name policy.
pub struct BindRequest {
    /// Source streams to join (one = pass-through, no synchronizer)
    pub sources: Vec<StreamDescriptor>,

    /// Sink resolved at registration time
    pub sink: SinkSpec,

    /// Name policy
    pub name: NameRequest,
}

impl BindRequest {
    /// Bind a user callback to the given sources.
    pub fn callback(sources: Vec<StreamDescriptor>, handler: BundleHandler) -> Self {
        Self {
            sources,
            sink: SinkSpec::Callback(handler),
            name: NameRequest::Auto,
        }
    }

    /// Bind a visualizer (and optional post-draw callback) to the sources.
    pub fn visualize(
        sources: Vec<StreamDescriptor>,
        renderer: Box<dyn FrameRenderer>,
        config: VisualConfig,
        callback: Option<BundleHandler>,
    ) -> Self {
        Self {
            sources,
            sink: SinkSpec::Visualize {
                renderer,
                config,
                callback,
            },
            name: NameRequest::Auto,
        }
    }

    /// Bind a persistent recorder to the sources.
    pub fn record(
        sources: Vec<StreamDescriptor>,
        writer: Box<dyn BundleWriter>,
        path: PathBuf,
    ) -> Self {
        Self {
            sources,
            sink: SinkSpec::Record { writer, path },
            name: NameRequest::Auto,
        }
    }

    /// Request a name, still resolving collisions.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = NameRequest::Prefer(name.into());
        self
    }

    /// Request exactly this name; `bind` fails if it is taken.
    pub fn named_exact(mut self, name: impl Into<String>) -> Self {
        self.name = NameRequest::Exact(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Registering,
    Running,
    Stopped,
}

struct StreamEntry {
    name: StreamName,
    receiver: PacketReceiver,
    /// Producer half, handed out exactly once
    sender: Option<PacketSender>,
    /// Indices of bindings fed by this stream
    targets: Vec<usize>,
}

/// Externally-settable stop request for a running engine.
///
/// Cheap to clone; safe to trigger from any thread (signal handlers,
/// watchdogs). The engine notices on its next tick.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Ask the dispatch loop to stop after its current tick.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The output-dispatch engine.
///
/// Lifecycle: register bindings (`bind`), hand producer halves to the device
/// (`sender`), then drive `dispatch_once` from one thread until it returns
/// `false`, and finish with `stop`. The binding set is frozen once the loop
/// starts.
pub struct DispatchEngine {
    config: DispatchConfig,
    state: EngineState,
    bindings: Vec<OutputBinding>,
    streams: Vec<StreamEntry>,
    stream_index: HashMap<StreamName, usize>,
    stop_flag: Arc<AtomicBool>,
}

impl DispatchEngine {
    /// Create an empty engine in the registration phase.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            state: EngineState::Registering,
            bindings: Vec::new(),
            streams: Vec::new(),
            stream_index: HashMap::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Register one output binding; returns the resolved unique name.
    ///
    /// Queues are allocated per source stream on first sight; a stream
    /// already bound elsewhere reuses its queue and fans packets out to
    /// every interested binding.
    ///
    /// # Errors
    /// Fails only this call: an invalid request (no sources, duplicate
    /// source stream, taken exact name) leaves existing bindings untouched.
    #[instrument(name = "engine_bind", skip(self, request), fields(kind = request.sink.kind()))]
    pub fn bind(&mut self, request: BindRequest) -> Result<String, DispatchError> {
        if self.state != EngineState::Registering {
            return Err(DispatchError::RegistrationClosed);
        }
        if request.sources.is_empty() {
            return Err(DispatchError::invalid_binding("no source streams"));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for source in &request.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(DispatchError::invalid_binding(format!(
                    "stream '{}' listed twice",
                    source.name
                )));
            }
        }

        let taken: HashSet<String> = self.bindings.iter().map(|b| b.name().to_string()).collect();
        let name = match &request.name {
            NameRequest::Exact(name) => {
                if taken.contains(name) {
                    return Err(DispatchError::NameTaken { name: name.clone() });
                }
                name.clone()
            }
            NameRequest::Prefer(name) => resolve_name(name, &taken),
            NameRequest::Auto => {
                let joined = request
                    .sources
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(";");
                resolve_name(&joined, &taken)
            }
        };

        let binding_idx = self.bindings.len();
        for source in &request.sources {
            match self.stream_index.get(source.name.as_str()) {
                Some(&idx) => self.streams[idx].targets.push(binding_idx),
                None => {
                    let (sender, receiver) =
                        packet_queue(source.name.clone(), &self.config.queue);
                    self.stream_index
                        .insert(source.name.clone(), self.streams.len());
                    self.streams.push(StreamEntry {
                        name: source.name.clone(),
                        receiver,
                        sender: Some(sender),
                        targets: vec![binding_idx],
                    });
                }
            }
        }

        let sink = request.sink.into_sink(&name);
        self.bindings.push(OutputBinding::new(
            name.clone(),
            request.sources,
            sink,
            &self.config.sync,
        ));

        info!(
            binding = %name,
            sources = self.bindings[binding_idx].sources().len(),
            "output binding registered"
        );
        Ok(name)
    }

    /// Hand out the producer half for a stream. Queues are SPSC, so this
    /// succeeds exactly once per stream.
    pub fn sender(&mut self, stream: &str) -> Result<PacketSender, DispatchError> {
        let idx = *self
            .stream_index
            .get(stream)
            .ok_or_else(|| DispatchError::UnknownStream {
                stream: stream.to_string(),
            })?;
        self.streams[idx]
            .sender
            .take()
            .ok_or_else(|| DispatchError::SenderTaken {
                stream: stream.to_string(),
            })
    }

    /// Handle for requesting a stop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_flag))
    }

    /// Freeze registration and enter the running state.
    pub fn start(&mut self) {
        if self.state == EngineState::Registering {
            self.state = EngineState::Running;
            info!(
                bindings = self.bindings.len(),
                streams = self.streams.len(),
                "dispatch engine started"
            );
        }
    }

    /// One cooperative poll tick.
    ///
    /// Attempts one non-blocking pop per stream queue, routes popped packets
    /// through each target binding's synchronizer (or pass-through), and
    /// invokes sinks synchronously for every completed bundle. Returns
    /// `false` once the caller should stop polling (external stop request or
    /// a sink returning [`SinkFlow::Stop`]).
    pub fn dispatch_once(&mut self) -> bool {
        match self.state {
            EngineState::Stopped => return false,
            EngineState::Registering => self.start(),
            EngineState::Running => {}
        }

        let tick_start = Instant::now();
        let mut stop = self.stop_flag.load(Ordering::Relaxed);

        for stream_idx in 0..self.streams.len() {
            let Some(packet) = self.streams[stream_idx].receiver.try_pop() else {
                continue;
            };
            trace!(
                stream = %self.streams[stream_idx].name,
                sequence = packet.sequence,
                "packet popped"
            );

            let targets = self.streams[stream_idx].targets.clone();
            for &binding_idx in &targets {
                // Payloads are refcounted; the clone is a pointer bump.
                let bundles = self.bindings[binding_idx].ingest(packet.clone());
                for bundle in &bundles {
                    if self.bindings[binding_idx].dispatch(bundle) == SinkFlow::Stop {
                        stop = true;
                    }
                }
            }
        }

        metrics::histogram!("vision_router_tick_duration_us")
            .record(tick_start.elapsed().as_micros() as f64);

        if stop {
            self.stop_flag.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Drive `dispatch_once` with the configured tick interval until a stop
    /// is requested, then tear down.
    pub fn run(&mut self) {
        let interval = Duration::from_micros(self.config.tick_interval_us);
        while self.dispatch_once() {
            std::thread::sleep(interval);
        }
        self.stop();
    }

    /// Tear down: drain all queues without dispatching, then flush and close
    /// every sink. Record sinks always get their flush/close opportunity;
    /// close failures are reported, never rethrown. Idempotent.
    #[instrument(name = "engine_stop", skip(self))]
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.state = EngineState::Stopped;
        self.stop_flag.store(true, Ordering::Relaxed);

        for entry in &mut self.streams {
            let mut drained = 0usize;
            while entry.receiver.try_pop().is_some() {
                drained += 1;
            }
            if drained > 0 {
                debug!(stream = %entry.name, drained, "queue drained on stop");
            }
        }

        for binding in &mut self.bindings {
            binding.close();
        }

        info!(bindings = self.bindings.len(), "dispatch engine stopped");
    }

    /// Whether the loop may still be driven.
    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Diagnostics snapshot across all bindings.
    pub fn binding_stats(&self) -> Vec<BindingStats> {
        self.bindings.iter().map(|b| b.stats()).collect()
    }

    /// Engine configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{Bundle, Packet, PayloadKind, StreamError, SyncConfig};
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex;

    fn desc(id: u32, name: &str) -> StreamDescriptor {
        StreamDescriptor::named(id, name)
    }

    fn make_packet(stream: &str, sequence: u64) -> Packet {
        Packet::new(
            stream,
            sequence,
            PayloadKind::Frame,
            Bytes::from_static(b"payload"),
            sequence as f64 * 0.033,
        )
    }

    fn counting_handler(counter: Arc<AtomicU64>) -> BundleHandler {
        Box::new(move |_bundle: &Bundle| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(SinkFlow::Continue)
        })
    }

    #[test]
    fn bind_rejects_empty_sources() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let err = engine
            .bind(BindRequest::callback(
                vec![],
                counting_handler(Arc::new(AtomicU64::new(0))),
            ))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidBinding { .. }));
    }

    #[test]
    fn bind_rejects_duplicate_source_stream() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let err = engine
            .bind(BindRequest::callback(
                vec![desc(0, "color"), desc(1, "color")],
                counting_handler(Arc::new(AtomicU64::new(0))),
            ))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidBinding { .. }));
    }

    #[test]
    fn name_collisions_resolve_by_numbering() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let counter = Arc::new(AtomicU64::new(0));

        let names: Vec<String> = (0..3)
            .map(|_| {
                engine
                    .bind(
                        BindRequest::callback(
                            vec![desc(0, "color")],
                            counting_handler(Arc::clone(&counter)),
                        )
                        .named("depth"),
                    )
                    .unwrap()
            })
            .collect();

        assert_eq!(names, vec!["depth", "depth 2", "depth 3"]);
    }

    #[test]
    fn exact_name_conflict_fails_only_that_bind() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let counter = Arc::new(AtomicU64::new(0));

        engine
            .bind(
                BindRequest::callback(
                    vec![desc(0, "color")],
                    counting_handler(Arc::clone(&counter)),
                )
                .named_exact("preview"),
            )
            .unwrap();
        let err = engine
            .bind(
                BindRequest::callback(
                    vec![desc(0, "color")],
                    counting_handler(Arc::clone(&counter)),
                )
                .named_exact("preview"),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::NameTaken { .. }));
        assert_eq!(engine.binding_stats().len(), 1);
    }

    #[test]
    fn bind_after_start_is_rejected() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::new(AtomicU64::new(0))),
            ))
            .unwrap();
        engine.start();

        let err = engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::new(AtomicU64::new(0))),
            ))
            .unwrap_err();
        assert!(matches!(err, DispatchError::RegistrationClosed));
    }

    #[test]
    fn sender_is_handed_out_once() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::new(AtomicU64::new(0))),
            ))
            .unwrap();

        assert!(engine.sender("color").is_ok());
        assert!(matches!(
            engine.sender("color").unwrap_err(),
            DispatchError::SenderTaken { .. }
        ));
        assert!(matches!(
            engine.sender("depth").unwrap_err(),
            DispatchError::UnknownStream { .. }
        ));
    }

    #[test]
    fn single_stream_passthrough() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let counter = Arc::new(AtomicU64::new(0));
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::clone(&counter)),
            ))
            .unwrap();
        let mut tx = engine.sender("color").unwrap();

        for seq in 0..3 {
            tx.push(make_packet("color", seq));
        }
        // One pop per queue per tick.
        for _ in 0..3 {
            assert!(engine.dispatch_once());
        }
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn two_stream_join_skips_incomplete_sequence() {
        // color delivers 0,1,2; nn delivers only 1,2.
        // With a horizon of 1 the stalled group 0 is evicted and exactly
        // bundles 1 and 2 come out, in order.
        let config = DispatchConfig {
            sync: SyncConfig {
                eviction_horizon: 1,
            },
            ..Default::default()
        };
        let mut engine = DispatchEngine::new(config);
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let emitted_in_cb = Arc::clone(&emitted);

        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color"), desc(1, "nn")],
                Box::new(move |bundle| {
                    assert_eq!(bundle.len(), 2);
                    emitted_in_cb.lock().unwrap().push(bundle.sequence);
                    Ok(SinkFlow::Continue)
                }),
            ))
            .unwrap();
        let mut color_tx = engine.sender("color").unwrap();
        let mut nn_tx = engine.sender("nn").unwrap();

        for seq in 0..3 {
            color_tx.push(make_packet("color", seq));
        }
        for seq in 1..3 {
            nn_tx.push(make_packet("nn", seq));
        }
        for _ in 0..5 {
            engine.dispatch_once();
        }

        assert_eq!(*emitted.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn shared_stream_fans_out_to_every_binding() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));

        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::clone(&first)),
            ))
            .unwrap();
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::clone(&second)),
            ))
            .unwrap();

        let mut tx = engine.sender("color").unwrap();
        tx.push(make_packet("color", 0));
        engine.dispatch_once();

        assert_eq!(first.load(Ordering::Relaxed), 1);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn failing_sink_does_not_starve_others() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let healthy = Arc::new(AtomicU64::new(0));

        engine
            .bind(
                BindRequest::callback(
                    vec![desc(0, "color")],
                    Box::new(|_b| Err(StreamError::sink_deliver("bad", "always fails"))),
                )
                .named("bad"),
            )
            .unwrap();
        engine
            .bind(
                BindRequest::callback(
                    vec![desc(0, "color")],
                    counting_handler(Arc::clone(&healthy)),
                )
                .named("good"),
            )
            .unwrap();

        let mut tx = engine.sender("color").unwrap();
        for seq in 0..4 {
            tx.push(make_packet("color", seq));
            assert!(engine.dispatch_once());
        }

        assert_eq!(healthy.load(Ordering::Relaxed), 4);
        let stats = engine.binding_stats();
        let bad = stats.iter().find(|s| s.name == "bad").unwrap();
        assert_eq!(bad.sink_failures, 4);
        assert_eq!(bad.dispatched, 0);
    }

    #[test]
    fn sink_stop_ends_the_loop() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                Box::new(|_b| Ok(SinkFlow::Stop)),
            ))
            .unwrap();
        let mut tx = engine.sender("color").unwrap();

        tx.push(make_packet("color", 0));
        assert!(!engine.dispatch_once());
        assert!(!engine.dispatch_once());
    }

    #[test]
    fn stop_handle_is_noticed_on_next_tick() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::new(AtomicU64::new(0))),
            ))
            .unwrap();

        let handle = engine.stop_handle();
        assert!(engine.dispatch_once());
        handle.request_stop();
        assert!(!engine.dispatch_once());
    }

    #[test]
    fn stop_drains_without_dispatching() {
        let mut engine = DispatchEngine::new(DispatchConfig::default());
        let counter = Arc::new(AtomicU64::new(0));
        engine
            .bind(BindRequest::callback(
                vec![desc(0, "color")],
                counting_handler(Arc::clone(&counter)),
            ))
            .unwrap();
        let mut tx = engine.sender("color").unwrap();

        for seq in 0..5 {
            tx.push(make_packet("color", seq));
        }
        engine.stop();
        // Buffered packets were discarded, not flushed to the callback.
        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert!(!engine.dispatch_once());
        // stop is idempotent
        engine.stop();
    }
}
