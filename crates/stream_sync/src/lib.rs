//! # Stream Sync
//!
//! 多流序号同步引擎。
//!
//! 负责：
//! - 每流有界 SPSC 队列（生产者永不阻塞）
//! - 按序号的跨流 join，严格升序发射
//! - 不完整分组的视界淘汰
//!
//! ## 使用示例
//!
//! ```ignore
//! use stream_sync::{packet_queue, SequenceSynchronizer};
//!
//! let (mut tx, mut rx) = packet_queue("color".into(), &QueueConfig::default());
//! tx.push(packet); // producer thread
//!
//! let mut sync = SequenceSynchronizer::new(
//!     vec!["color".into(), "nn".into()],
//!     &SyncConfig::default(),
//! );
//! for bundle in sync.push(rx.try_pop().unwrap()) {
//!     // Handle completed bundle
//! }
//! ```

mod queue;
mod synchronizer;

pub use queue::{packet_queue, PacketReceiver, PacketSender};
pub use synchronizer::SequenceSynchronizer;

// Re-export contracts types
pub use contracts::{Bundle, Packet, QueueConfig, SyncConfig, SyncStats};
