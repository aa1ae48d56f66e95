//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Vision Router - multi-stream synchronization and output dispatch
#[derive(Parser, Debug)]
#[command(
    name = "vision-router",
    author,
    version,
    about = "Multi-stream synchronization and output dispatch engine",
    long_about = "Routes packet streams from a (simulated) vision device through \n\
                  per-stream bounded queues and a sequence-number synchronizer, \n\
                  dispatching completed bundles to callback and record sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, env = "VISION_ROUTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        env = "VISION_ROUTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Color stream production rate (Hz)
    #[arg(long, default_value = "30.0")]
    pub color_fps: f64,

    /// Detection stream production rate (Hz)
    #[arg(long, default_value = "30.0")]
    pub nn_fps: f64,

    /// Skip every Nth detection sequence, simulating inference drops
    /// (0 = no drops)
    #[arg(long, default_value = "0")]
    pub nn_drop_every: u64,

    /// Stop after this many synchronized bundles (0 = unlimited)
    #[arg(long, default_value = "0", env = "VISION_ROUTER_MAX_BUNDLES")]
    pub max_bundles: u64,

    /// Run duration in seconds (0 = until max-bundles or Ctrl-C)
    #[arg(long, default_value = "0", env = "VISION_ROUTER_DURATION")]
    pub duration: u64,

    /// Per-stream queue capacity
    #[arg(long, default_value = "10", env = "VISION_ROUTER_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Synchronizer eviction horizon (sequence counts)
    #[arg(long, default_value = "30", env = "VISION_ROUTER_EVICTION_HORIZON")]
    pub eviction_horizon: u64,

    /// Dispatch loop tick interval in microseconds
    #[arg(long, default_value = "500", env = "VISION_ROUTER_TICK_US")]
    pub tick_us: u64,

    /// Record synchronized bundles under this directory
    #[arg(long, env = "VISION_ROUTER_RECORD_DIR")]
    pub record_dir: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "VISION_ROUTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
