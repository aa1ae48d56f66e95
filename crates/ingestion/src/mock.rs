//! Mock 设备源
//!
//! 用于无硬件环境的测试与演示。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    DeviceSource, Packet, PacketCallback, PayloadKind, StreamDescriptor, StreamError, StreamName,
};
use tracing::{debug, trace, warn};

/// Configuration for one simulated stream.
#[derive(Debug, Clone)]
pub struct MockStreamConfig {
    /// Stream name carried by every packet
    pub name: StreamName,

    /// Origin tag for the descriptor
    pub id: u32,

    /// Payload kind stamped on each packet
    pub kind: PayloadKind,

    /// Production rate (Hz)
    pub fps: f64,

    /// Payload size per packet
    pub payload_bytes: usize,

    /// Skip every sequence divisible by this, leaving gaps. `None` = no gaps.
    pub drop_every: Option<u64>,

    /// Stop after this many sequence numbers. `None` = run until `stop`.
    pub max_packets: Option<u64>,
}

impl MockStreamConfig {
    /// Raw-frame camera stream.
    pub fn camera(name: &str, fps: f64) -> Self {
        Self {
            name: name.into(),
            id: 0,
            kind: PayloadKind::Frame,
            fps,
            payload_bytes: 300 * 300 * 3,
            drop_every: None,
            max_packets: None,
        }
    }

    /// Neural-network detection stream.
    pub fn detections(name: &str, fps: f64) -> Self {
        Self {
            name: name.into(),
            id: 1,
            kind: PayloadKind::Detections,
            fps,
            payload_bytes: 256,
            drop_every: None,
            max_packets: None,
        }
    }

    /// Depth-map stream.
    pub fn depth(name: &str, fps: f64) -> Self {
        Self {
            name: name.into(),
            id: 2,
            kind: PayloadKind::Depth,
            fps,
            payload_bytes: 300 * 300 * 2,
            drop_every: None,
            max_packets: None,
        }
    }

    /// IMU sample stream.
    pub fn imu(name: &str, fps: f64) -> Self {
        Self {
            name: name.into(),
            id: 3,
            kind: PayloadKind::Imu,
            fps,
            payload_bytes: 64,
            drop_every: None,
            max_packets: None,
        }
    }

    /// Skip every sequence divisible by `n` (sequence 0 included), so the
    /// stream shows the gap pattern of a lossy producer.
    pub fn with_drop_every(mut self, n: u64) -> Self {
        self.drop_every = Some(n.max(1));
        self
    }

    /// Cap the number of sequence numbers this stream walks through.
    pub fn with_max_packets(mut self, n: u64) -> Self {
        self.max_packets = Some(n);
        self
    }

    /// Override the origin tag.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }
}

/// A stand-in device producing simulated packet streams.
///
/// Each stream runs on its own producer thread, mirroring how a real device
/// driver delivers packets from per-stream reader threads. Sequence numbers
/// advance even across dropped packets, so downstream sees realistic gaps.
pub struct MockDevice {
    configs: Vec<MockStreamConfig>,
    callbacks: HashMap<StreamName, PacketCallback>,
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl MockDevice {
    /// Create a device producing the given streams.
    pub fn new(configs: Vec<MockStreamConfig>) -> Self {
        Self {
            configs,
            callbacks: HashMap::new(),
            running: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    fn spawn_producer(
        config: MockStreamConfig,
        mut callback: PacketCallback,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name(format!("mock-{}", config.name))
            .spawn(move || {
                let interval = Duration::from_secs_f64(1.0 / config.fps.max(0.001));
                let start = Instant::now();
                let payload = Bytes::from(vec![0u8; config.payload_bytes]);
                let mut sequence: u64 = 0;

                debug!(
                    stream = %config.name,
                    fps = config.fps,
                    kind = ?config.kind,
                    "mock producer started"
                );

                while running.load(Ordering::Relaxed) {
                    if config.max_packets.is_some_and(|max| sequence >= max) {
                        break;
                    }

                    let dropped = config.drop_every.is_some_and(|n| sequence % n == 0);
                    if dropped {
                        trace!(stream = %config.name, sequence, "mock packet dropped");
                    } else {
                        let packet = Packet::new(
                            config.name.clone(),
                            sequence,
                            config.kind,
                            payload.clone(),
                            start.elapsed().as_secs_f64(),
                        );
                        metrics::counter!(
                            "vision_router_packets_produced_total",
                            "stream" => config.name.to_string()
                        )
                        .increment(1);
                        callback(packet);
                    }

                    sequence += 1;
                    std::thread::sleep(interval);
                }

                debug!(stream = %config.name, sequence, "mock producer stopped");
            })
            .unwrap_or_else(|e| panic!("failed to spawn mock producer thread: {e}"))
    }
}

impl DeviceSource for MockDevice {
    fn streams(&self) -> Vec<StreamDescriptor> {
        self.configs
            .iter()
            .map(|c| StreamDescriptor::named(c.id, c.name.clone()))
            .collect()
    }

    fn attach(&mut self, stream: &str, callback: PacketCallback) -> Result<(), StreamError> {
        if !self.configs.iter().any(|c| c.name == stream) {
            return Err(StreamError::UnknownStream {
                stream: stream.to_string(),
            });
        }
        if self.callbacks.contains_key(stream) {
            return Err(StreamError::registration(
                stream,
                "callback already attached",
            ));
        }
        self.callbacks.insert(stream.into(), callback);
        Ok(())
    }

    fn start(&mut self) -> Result<(), StreamError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(StreamError::registration("mock_device", "already started"));
        }

        for config in &self.configs {
            match self.callbacks.remove(config.name.as_str()) {
                Some(callback) => {
                    self.handles.push(Self::spawn_producer(
                        config.clone(),
                        callback,
                        Arc::clone(&self.running),
                    ));
                }
                // Unattached outputs are legal; the device just never
                // produces for them.
                None => warn!(stream = %config.name, "stream has no callback, not producing"),
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn wait_for<F: Fn() -> bool>(cond: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn streams_lists_every_configured_output() {
        let device = MockDevice::new(vec![
            MockStreamConfig::camera("color", 30.0),
            MockStreamConfig::detections("nn", 30.0),
        ]);
        let names: Vec<_> = device.streams().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["color", "nn"]);
    }

    #[test]
    fn attach_unknown_stream_fails() {
        let mut device = MockDevice::new(vec![MockStreamConfig::camera("color", 30.0)]);
        assert!(device.attach("depth", Box::new(|_| {})).is_err());
    }

    #[test]
    fn attach_twice_fails() {
        let mut device = MockDevice::new(vec![MockStreamConfig::camera("color", 30.0)]);
        device.attach("color", Box::new(|_| {})).unwrap();
        assert!(device.attach("color", Box::new(|_| {})).is_err());
    }

    #[test]
    fn drop_pattern_leaves_sequence_gaps() {
        let mut device = MockDevice::new(vec![MockStreamConfig::detections("nn", 2000.0)
            .with_drop_every(3)
            .with_max_packets(9)]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_cb = Arc::clone(&seen);

        device
            .attach(
                "nn",
                Box::new(move |packet| seen_in_cb.lock().unwrap().push(packet.sequence)),
            )
            .unwrap();
        device.start().unwrap();

        // Sequences 0, 3 and 6 are dropped out of 0..9.
        wait_for(|| seen.lock().unwrap().len() == 6);
        device.stop();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn stop_joins_producers() {
        let mut device = MockDevice::new(vec![MockStreamConfig::camera("color", 1000.0)]);
        let count = Arc::new(AtomicBool::new(false));
        let count_in_cb = Arc::clone(&count);

        device
            .attach(
                "color",
                Box::new(move |_| count_in_cb.store(true, Ordering::Relaxed)),
            )
            .unwrap();
        device.start().unwrap();
        wait_for(|| count.load(Ordering::Relaxed));
        device.stop();
        // stop is idempotent
        device.stop();
    }
}
