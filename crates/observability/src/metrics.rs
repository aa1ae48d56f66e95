//! 引擎运行指标与摘要统计
//!
//! 队列溢出、组淘汰、分发计数等计数器由各 crate 在现场用 `metrics!` 宏
//! 直接上报；本模块提供入口侧的辅助函数，以及运行结束后基于
//! `BindingStats` 的内存聚合摘要。

use contracts::BindingStats;
use metrics::{counter, gauge, histogram};
use std::collections::BTreeMap;

/// Record one packet arriving from the device, labelled by stream and
/// payload kind. Called on the producer thread.
pub fn record_packet_received(stream: &str, kind: &str) {
    counter!(
        "vision_router_packets_received_total",
        "stream" => stream.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record total wall-clock run duration at shutdown.
pub fn record_run_duration(seconds: f64) {
    gauge!("vision_router_run_duration_seconds").set(seconds);
    histogram!("vision_router_run_duration_seconds_hist").record(seconds);
}

/// 运行摘要聚合器
///
/// 在内存中聚合每个 binding 的快照，运行结束时输出一份摘要。
#[derive(Debug, Clone, Default)]
pub struct RunSummaryAggregator {
    /// 已分发 bundle 总数
    pub total_dispatched: u64,

    /// sink 投递失败总数
    pub total_sink_failures: u64,

    /// 淘汰的不完整组总数
    pub total_evicted: u64,

    /// 迟到被丢弃的包总数
    pub total_late_discarded: u64,

    /// 重复替换的包总数
    pub total_replaced: u64,

    /// FPS 统计
    pub fps_stats: RunningStats,

    /// 各 binding 的分发计数
    pub per_binding_dispatched: BTreeMap<String, u64>,
}

impl RunSummaryAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 并入一个 binding 的快照
    pub fn update(&mut self, stats: &BindingStats) {
        self.total_dispatched += stats.dispatched;
        self.total_sink_failures += stats.sink_failures;
        if stats.fps > 0.0 {
            self.fps_stats.push(stats.fps);
        }
        if let Some(sync) = &stats.sync {
            self.total_evicted += sync.evicted;
            self.total_late_discarded += sync.late_discarded;
            self.total_replaced += sync.replaced;
        }
        self.per_binding_dispatched
            .insert(stats.name.clone(), stats.dispatched);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_dispatched: self.total_dispatched,
            total_sink_failures: self.total_sink_failures,
            total_evicted: self.total_evicted,
            total_late_discarded: self.total_late_discarded,
            total_replaced: self.total_replaced,
            failure_rate: if self.total_dispatched + self.total_sink_failures > 0 {
                self.total_sink_failures as f64
                    / (self.total_dispatched + self.total_sink_failures) as f64
                    * 100.0
            } else {
                0.0
            },
            fps: StatsSummary::from(&self.fps_stats),
            per_binding_dispatched: self.per_binding_dispatched.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 运行摘要
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_dispatched: u64,
    pub total_sink_failures: u64,
    pub total_evicted: u64,
    pub total_late_discarded: u64,
    pub total_replaced: u64,
    pub failure_rate: f64,
    pub fps: StatsSummary,
    pub per_binding_dispatched: BTreeMap<String, u64>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Run Summary ===")?;
        writeln!(f, "Bundles dispatched: {}", self.total_dispatched)?;
        writeln!(
            f,
            "Sink failures: {} ({:.2}%)",
            self.total_sink_failures, self.failure_rate
        )?;
        writeln!(f, "Groups evicted: {}", self.total_evicted)?;
        writeln!(f, "Late packets discarded: {}", self.total_late_discarded)?;
        writeln!(f, "Duplicate packets replaced: {}", self.total_replaced)?;
        writeln!(f, "Binding FPS: {}", self.fps)?;

        if !self.per_binding_dispatched.is_empty() {
            writeln!(f, "Per-binding dispatch counts:")?;
            for (binding, count) in &self.per_binding_dispatched {
                writeln!(f, "  {}: {}", binding, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
