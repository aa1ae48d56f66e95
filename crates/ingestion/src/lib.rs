//! # Ingestion
//!
//! 设备侧数据接入。
//!
//! 负责：
//! - 定义设备到引擎的投递边界（见 `contracts::DeviceSource`）
//! - 提供无硬件环境下的 Mock 设备（每流独立生产者线程）
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::{MockDevice, MockStreamConfig};
//! use contracts::DeviceSource;
//!
//! let mut device = MockDevice::new(vec![
//!     MockStreamConfig::camera("color", 30.0),
//!     MockStreamConfig::detections("nn", 30.0).with_drop_every(10),
//! ]);
//!
//! device.attach("color", Box::new(move |packet| { /* push into queue */ }))?;
//! device.start()?;
//! // ...
//! device.stop();
//! ```

mod mock;

pub use contracts::{DeviceSource, PacketCallback};
pub use mock::{MockDevice, MockStreamConfig};
