//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - `Packet::timestamp` is the device monotonic clock (seconds, f64)
//! - `Packet::sequence` is the per-stream capture counter and the join key:
//!   packets captured at the same instant carry the same sequence number
//!   across streams

mod bundle;
mod config;
mod error;
mod packet;
mod sink;
mod source;
mod stream;
mod stream_name;

pub use bundle::*;
pub use config::*;
pub use error::*;
pub use packet::*;
pub use sink::*;
pub use source::{DeviceSource, PacketCallback};
pub use stream::*;
pub use stream_name::StreamName;
