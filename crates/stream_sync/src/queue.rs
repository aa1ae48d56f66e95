//! Bounded per-stream packet queue.
//!
//! One queue per device stream, split into a producer half owned by the
//! device callback thread and a consumer half owned by the dispatch loop.
//! Built on a lock-free SPSC ring so neither side can block the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Packet, QueueConfig, StreamName};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::trace;

const POP_PARK: Duration = Duration::from_millis(1);

/// Create the two halves of a bounded stream queue.
pub fn packet_queue(stream: StreamName, config: &QueueConfig) -> (PacketSender, PacketReceiver) {
    let rb = HeapRb::new(config.capacity.max(1));
    let (prod, cons) = rb.split();
    let overflow = Arc::new(AtomicU64::new(0));

    let sender = PacketSender {
        stream: stream.clone(),
        prod,
        overflow: Arc::clone(&overflow),
    };
    let receiver = PacketReceiver {
        stream,
        cons,
        overflow,
    };
    (sender, receiver)
}

/// Producer half of a stream queue. Owned by one device callback thread.
pub struct PacketSender {
    stream: StreamName,
    prod: HeapProd<Packet>,
    overflow: Arc<AtomicU64>,
}

impl PacketSender {
    /// Push a packet without blocking.
    ///
    /// If the queue is at capacity the NEW packet is discarded and `false`
    /// is returned, preserving the already-buffered in-order data. Drops are
    /// silent apart from diagnostics.
    pub fn push(&mut self, packet: Packet) -> bool {
        match self.prod.try_push(packet) {
            Ok(()) => true,
            Err(packet) => {
                self.overflow.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(
                    "vision_router_queue_overflow_total",
                    "stream" => self.stream.to_string()
                )
                .increment(1);
                trace!(
                    stream = %self.stream,
                    sequence = packet.sequence,
                    "queue full, packet dropped"
                );
                false
            }
        }
    }

    /// Stream this sender feeds.
    pub fn stream(&self) -> &StreamName {
        &self.stream
    }

    /// Packets dropped on overflow so far.
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PacketSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketSender")
            .field("stream", &self.stream)
            .field("overflow", &self.overflow_count())
            .finish()
    }
}

/// Consumer half of a stream queue. Owned by the dispatch loop thread.
pub struct PacketReceiver {
    stream: StreamName,
    cons: HeapCons<Packet>,
    overflow: Arc<AtomicU64>,
}

impl PacketReceiver {
    /// Pop the oldest buffered packet, never blocking. This is the
    /// steady-state poll primitive of the dispatch tick.
    pub fn try_pop(&mut self) -> Option<Packet> {
        self.cons.try_pop()
    }

    /// Pop with a bounded wait, parking in 1 ms steps.
    ///
    /// Off the steady-state path: useful for tests and drain helpers, never
    /// called from the dispatch tick.
    pub fn pop_timeout(&mut self, timeout: Duration) -> Option<Packet> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(packet) = self.cons.try_pop() {
                return Some(packet);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(POP_PARK);
        }
    }

    /// Stream this receiver drains.
    pub fn stream(&self) -> &StreamName {
        &self.stream
    }

    /// Buffered packet count.
    pub fn len(&self) -> usize {
        self.cons.occupied_len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.cons.is_empty()
    }

    /// Fixed queue capacity.
    pub fn capacity(&self) -> usize {
        self.cons.capacity().get()
    }

    /// Packets the producer dropped on overflow so far.
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PacketReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketReceiver")
            .field("stream", &self.stream)
            .field("len", &self.len())
            .finish()
    }
}
