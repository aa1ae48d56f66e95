//! Pipeline orchestrator - wires the mock device into the dispatch engine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{DeviceSource, DispatchConfig, QueueConfig, SinkFlow, SyncConfig};
use dispatcher::{BindRequest, DiskWriter, DispatchEngine};
use ingestion::{MockDevice, MockStreamConfig};
use observability::{record_packet_received, record_run_duration, RunSummaryAggregator};
use tracing::{info, trace, warn};

use crate::cli::Cli;

use super::RunStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Color stream rate (Hz)
    pub color_fps: f64,

    /// Detection stream rate (Hz)
    pub nn_fps: f64,

    /// Detection drop pattern (None = lossless)
    pub nn_drop_every: Option<u64>,

    /// Stop after this many bundles (None = unlimited)
    pub max_bundles: Option<u64>,

    /// Stop after this wall-clock duration (None = no limit)
    pub duration: Option<Duration>,

    /// Engine configuration (queues, synchronizer, tick interval)
    pub dispatch: DispatchConfig,

    /// Record bundles under this directory (None = no recording)
    pub record_dir: Option<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl From<&Cli> for PipelineConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            color_fps: cli.color_fps,
            nn_fps: cli.nn_fps,
            nn_drop_every: (cli.nn_drop_every > 0).then_some(cli.nn_drop_every),
            max_bundles: (cli.max_bundles > 0).then_some(cli.max_bundles),
            duration: (cli.duration > 0).then(|| Duration::from_secs(cli.duration)),
            dispatch: DispatchConfig {
                tick_interval_us: cli.tick_us,
                queue: QueueConfig {
                    capacity: cli.queue_capacity,
                },
                sync: SyncConfig {
                    eviction_horizon: cli.eviction_horizon,
                },
            },
            record_dir: cli.record_dir.clone(),
            metrics_port: (cli.metrics_port > 0).then_some(cli.metrics_port),
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Simulated device: a color camera plus a detection stream that may
        // skip sequences, which is what exercises the synchronizer.
        let mut nn = MockStreamConfig::detections("nn", self.config.nn_fps);
        if let Some(n) = self.config.nn_drop_every {
            nn = nn.with_drop_every(n);
        }
        let mut device = MockDevice::new(vec![
            MockStreamConfig::camera("color", self.config.color_fps),
            nn,
        ]);
        let sources = device.streams();
        let active_streams = sources.len();

        // Engine and bindings
        let mut engine = DispatchEngine::new(self.config.dispatch.clone());

        let dispatched = Arc::new(AtomicU64::new(0));
        let dispatched_in_cb = Arc::clone(&dispatched);
        let preview = engine
            .bind(
                BindRequest::callback(
                    sources.clone(),
                    Box::new(move |bundle| {
                        trace!(sequence = bundle.sequence, "bundle delivered");
                        dispatched_in_cb.fetch_add(1, Ordering::Relaxed);
                        Ok(SinkFlow::Continue)
                    }),
                )
                .named("preview"),
            )
            .context("Failed to register preview binding")?;
        info!(binding = %preview, "Preview binding registered");

        // Single-stream pass-through on the camera, so raw frame delivery is
        // observable even while the join stalls.
        let frames = Arc::new(AtomicU64::new(0));
        let frames_in_cb = Arc::clone(&frames);
        engine
            .bind(
                BindRequest::callback(
                    vec![sources[0].clone()],
                    Box::new(move |_bundle| {
                        frames_in_cb.fetch_add(1, Ordering::Relaxed);
                        Ok(SinkFlow::Continue)
                    }),
                )
                .named("color"),
            )
            .context("Failed to register color binding")?;

        if let Some(record_dir) = &self.config.record_dir {
            let writer = DiskWriter::create(record_dir).with_context(|| {
                format!("Failed to create record session under {}", record_dir.display())
            })?;
            let session = writer.session_dir().to_path_buf();
            let name = engine
                .bind(
                    BindRequest::record(sources.clone(), Box::new(writer), session.clone())
                        .named("record"),
                )
                .context("Failed to register record binding")?;
            info!(binding = %name, session = %session.display(), "Recording enabled");
        }

        // Hand each stream's producer half to the device.
        for source in &sources {
            let mut sender = engine
                .sender(&source.name)
                .context("Failed to take stream sender")?;
            let stream_label = source.name.to_string();
            device
                .attach(
                    &source.name,
                    Box::new(move |packet| {
                        record_packet_received(&stream_label, packet.kind.as_str());
                        if !sender.push(packet) {
                            trace!(stream = %stream_label, "queue full, packet dropped");
                        }
                    }),
                )
                .context("Failed to attach device callback")?;
        }

        device.start().context("Failed to start mock device")?;
        engine.start();
        info!(
            max_bundles = ?self.config.max_bundles,
            duration = ?self.config.duration,
            "Pipeline running"
        );

        // Dispatch loop
        let deadline = self.config.duration.map(|d| start_time + d);
        let tick = Duration::from_micros(self.config.dispatch.tick_interval_us);
        loop {
            if !engine.dispatch_once() {
                info!("Engine requested stop");
                break;
            }
            if let Some(max) = self.config.max_bundles {
                if dispatched.load(Ordering::Relaxed) >= max {
                    info!(bundles = max, "Reached max bundles limit");
                    break;
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!("Run duration elapsed");
                break;
            }
            std::thread::sleep(tick);
        }

        // Shutdown: stop producers first so queues stop filling, then let
        // the engine drain and close sinks.
        info!("Shutting down pipeline...");
        device.stop();
        engine.stop();

        let bindings = engine.binding_stats();
        let mut aggregator = RunSummaryAggregator::new();
        for stats in &bindings {
            aggregator.update(stats);
        }

        let duration = start_time.elapsed();
        record_run_duration(duration.as_secs_f64());
        if aggregator.total_sink_failures > 0 {
            warn!(
                failures = aggregator.total_sink_failures,
                "Run finished with sink failures"
            );
        }
        info!(
            duration_secs = duration.as_secs_f64(),
            bundles = aggregator.total_dispatched,
            "Pipeline shutdown complete"
        );

        Ok(RunStats {
            duration,
            active_streams,
            bindings,
            aggregator,
        })
    }
}
