//! Engine configuration contracts shared across crates.

use serde::{Deserialize, Serialize};

/// Per-stream bounded queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Fixed capacity per stream queue
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// Sequence synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Count-based eviction horizon: an incomplete group is discarded once
    /// more than this many newer sequence numbers have been observed.
    pub eviction_horizon: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            eviction_horizon: 30,
        }
    }
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Sleep between poll ticks, microseconds
    pub tick_interval_us: u64,

    /// Queue configuration applied to every stream
    #[serde(default)]
    pub queue: QueueConfig,

    /// Synchronizer configuration applied to every multi-stream binding
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_interval_us: 500,
            queue: QueueConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// Per-binding visualization options, forwarded to the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConfig {
    /// Overlay the binding's measured FPS
    pub show_fps: bool,

    /// Display scale factor
    pub scale: f64,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            show_fps: true,
            scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DispatchConfig::default();
        assert_eq!(cfg.queue.capacity, 10);
        assert_eq!(cfg.sync.eviction_horizon, 30);
        assert_eq!(cfg.tick_interval_us, 500);
    }

    #[test]
    fn partial_deserialization_uses_defaults() {
        let cfg: DispatchConfig = serde_json::from_str(r#"{"tick_interval_us": 1000}"#).unwrap();
        assert_eq!(cfg.tick_interval_us, 1000);
        assert_eq!(cfg.queue.capacity, 10);
    }
}
