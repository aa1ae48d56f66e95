//! Bundle - synchronizer output
//!
//! A completed cross-stream join, or a single-stream pass-through.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Packet, StreamName};

/// A completed set of packets handed to a sink.
///
/// For a multi-stream binding this holds exactly one packet per required
/// stream, all sharing `sequence`. For a single-stream binding it holds the
/// one forwarded packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Shared sequence number of every contained packet
    pub sequence: u64,

    /// Packets keyed by stream name
    pub packets: HashMap<StreamName, Packet>,
}

impl Bundle {
    /// Wrap a single packet as its own one-element bundle.
    pub fn single(packet: Packet) -> Self {
        let sequence = packet.sequence;
        let mut packets = HashMap::with_capacity(1);
        packets.insert(packet.stream.clone(), packet);
        Self { sequence, packets }
    }

    /// Packet for a given stream, if present.
    pub fn get(&self, stream: &str) -> Option<&Packet> {
        self.packets.get(stream)
    }

    /// First drawable frame payload, if any. Visualizers overlay the other
    /// packets onto this one.
    pub fn primary_frame(&self) -> Option<&Packet> {
        self.packets.values().find(|p| p.is_frame())
    }

    /// Number of packets in the bundle.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// True for a bundle with no packets (never produced by the engine).
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Latest capture timestamp across the contained packets.
    pub fn timestamp(&self) -> f64 {
        self.packets
            .values()
            .map(|p| p.timestamp)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Synchronizer diagnostics counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Bundles emitted
    pub emitted: u64,

    /// Incomplete groups evicted past the horizon (never emitted)
    pub evicted: u64,

    /// Packets discarded because their group was already emitted
    pub late_discarded: u64,

    /// Duplicate (sequence, stream) packets replaced, last write wins
    pub replaced: u64,

    /// Packets discarded because their stream is not in the required set
    pub foreign_discarded: u64,

    /// Incomplete groups currently held
    pub pending_groups: usize,

    /// Completed groups withheld for ascending emission
    pub ready_groups: usize,

    /// Highest sequence number observed on any stream
    pub high_water: Option<u64>,
}

/// Per-binding diagnostics snapshot, taken by the engine on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingStats {
    /// Resolved unique binding name
    pub name: String,

    /// Bundles successfully delivered to the sink
    pub dispatched: u64,

    /// Sink delivery failures (the binding kept running)
    pub sink_failures: u64,

    /// Rolling dispatch rate over the meter window
    pub fps: f64,

    /// Synchronizer counters (multi-stream bindings only)
    pub sync: Option<SyncStats>,
}
