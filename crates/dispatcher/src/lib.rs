//! # Dispatcher
//!
//! 输出绑定与分发循环。
//!
//! 负责：
//! - 注册 OutputBinding（源流集合 + sink + 唯一名字）
//! - 单线程轮询所有流队列，驱动同步
//! - 在分发线程上同步调用 sinks，隔离单个 sink 故障

pub mod binding;
pub mod engine;
pub mod error;
pub mod fps;
pub mod naming;
pub mod sinks;

pub use binding::OutputBinding;
pub use contracts::{BindingStats, Bundle, OutputSink, SinkFlow};
pub use engine::{BindRequest, DispatchEngine, NameRequest, StopHandle};
pub use error::DispatchError;
pub use fps::FpsMeter;
pub use naming::resolve_name;
pub use sinks::{CallbackSink, DiskWriter, RecordSink, SinkSpec, VisualizeSink};
