//! DeviceSource trait - packet delivery from the device side.

use crate::{Packet, StreamDescriptor, StreamError};

/// Callback invoked from a device-driven producer thread for every packet.
///
/// Must never block: stalling a driver callback thread risks stalling
/// hardware delivery. Implementations push into a bounded queue and drop on
/// overflow.
pub type PacketCallback = Box<dyn FnMut(Packet) + Send>;

/// A live device (or stand-in) producing packet streams.
///
/// The engine only requires that each stream delivers packets with
/// non-decreasing sequence numbers and a stable name.
pub trait DeviceSource {
    /// Streams this source produces.
    fn streams(&self) -> Vec<StreamDescriptor>;

    /// Register the delivery callback for one stream. Must be called before
    /// `start`; one callback per stream.
    fn attach(&mut self, stream: &str, callback: PacketCallback) -> Result<(), StreamError>;

    /// Begin producing packets on device-driven threads.
    fn start(&mut self) -> Result<(), StreamError>;

    /// Stop producing and join producer threads.
    fn stop(&mut self);
}
