//! Run statistics and the end-of-run summary.

use std::time::Duration;

use contracts::BindingStats;
use observability::RunSummaryAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Total wall-clock duration of the run
    pub duration: Duration,

    /// Number of streams the device produced
    pub active_streams: usize,

    /// Final per-binding snapshots
    pub bindings: Vec<BindingStats>,

    /// Aggregated counters across bindings
    pub aggregator: RunSummaryAggregator,
}

impl RunStats {
    /// Overall dispatch throughput (bundles per second).
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.aggregator.total_dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Dispatch Run Summary                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!(
            "   ├─ Bundles dispatched: {}",
            self.aggregator.total_dispatched
        );
        println!("   ├─ Throughput: {:.2} bundles/s", self.throughput());
        println!("   └─ Active streams: {}", self.active_streams);

        let summary = self.aggregator.summary();

        println!("\nSynchronizer");
        println!("   ├─ Groups evicted: {}", summary.total_evicted);
        println!(
            "   ├─ Late packets discarded: {}",
            summary.total_late_discarded
        );
        println!(
            "   ├─ Duplicate packets replaced: {}",
            summary.total_replaced
        );
        println!(
            "   └─ Sink failures: {} ({:.2}%)",
            summary.total_sink_failures, summary.failure_rate
        );

        if !self.bindings.is_empty() {
            println!("\nBindings");
            let last = self.bindings.len() - 1;
            for (i, binding) in self.bindings.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} bundles @ {:.1} fps",
                    branch, binding.name, binding.dispatched, binding.fps
                );
            }
        }

        println!();
    }
}
