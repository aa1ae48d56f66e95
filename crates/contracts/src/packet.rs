//! Packet - one unit of data from a device stream.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::StreamName;

/// One sequence-numbered unit of data from a single stream.
///
/// Created on the producer thread when new device data arrives; ownership
/// moves into the per-stream queue, then to the synchronizer or sink.
/// The payload stays opaque to the whole engine: queue and synchronizer only
/// look at `stream` and `sequence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Name of the producing stream
    pub stream: StreamName,

    /// Per-stream capture counter, non-decreasing, gaps allowed.
    /// Equal sequence numbers across streams mean "captured at the same
    /// instant" and drive the cross-stream join.
    pub sequence: u64,

    /// Shape of the payload (frame, detection set, depth map, ...)
    pub kind: PayloadKind,

    /// Opaque payload handle (zero-copy)
    pub payload: Bytes,

    /// Capture timestamp on the device monotonic clock (seconds)
    pub timestamp: f64,
}

impl Packet {
    /// Create a packet; convenience for producers and tests.
    pub fn new(
        stream: impl Into<StreamName>,
        sequence: u64,
        kind: PayloadKind,
        payload: Bytes,
        timestamp: f64,
    ) -> Self {
        Self {
            stream: stream.into(),
            sequence,
            kind,
            payload,
            timestamp,
        }
    }

    /// Whether the payload is drawable (raw or encoded frame).
    pub fn is_frame(&self) -> bool {
        matches!(self.kind, PayloadKind::Frame | PayloadKind::EncodedFrame)
    }
}

/// Shape of a packet payload.
///
/// A closed set: the engine never inspects payload bytes, but sinks and
/// visualizers pick behavior by kind (e.g. a recorder picks the container
/// track, a visualizer picks the overlay source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Raw decoded frame
    Frame,
    /// Encoded bitstream frame (MJPEG/H26x)
    EncodedFrame,
    /// Neural-network detection set
    Detections,
    /// Depth/disparity map
    Depth,
    /// IMU sample batch
    Imu,
    /// Anything else (fallback)
    Raw,
}

impl PayloadKind {
    /// Stable lowercase label, matching the serde representation. Used for
    /// metric labels and file naming.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::EncodedFrame => "encoded_frame",
            Self::Detections => "detections",
            Self::Depth => "depth",
            Self::Imu => "imu",
            Self::Raw => "raw",
        }
    }
}
