//! Sequence-number synchronizer.
//!
//! Joins packets from a fixed set of required streams into bundles keyed by
//! a shared sequence number. Emission is strictly ascending: a group that
//! completes ahead of a stalled lower sequence number is withheld until the
//! gap either completes or is evicted past the horizon.

use std::collections::{BTreeMap, HashMap};

use contracts::{Bundle, Packet, StreamName, SyncConfig, SyncStats};
use tracing::{debug, instrument, trace};

/// Joins packets from N streams sharing a sequence number.
///
/// Confined to the dispatch loop thread; no internal locking.
#[derive(Debug)]
pub struct SequenceSynchronizer {
    /// Required stream names; a group is complete once it holds one packet
    /// for every name.
    required: Vec<StreamName>,

    /// Incomplete groups keyed by sequence number
    pending: BTreeMap<u64, HashMap<StreamName, Packet>>,

    /// Completed groups withheld for ascending emission
    ready: BTreeMap<u64, Bundle>,

    /// Highest sequence number observed on any required stream
    high_water: Option<u64>,

    /// Sequence number of the last emitted bundle
    emitted_mark: Option<u64>,

    /// Eviction horizon (count of newer sequence numbers)
    horizon: u64,

    stats: SyncStats,
}

impl SequenceSynchronizer {
    /// Create a synchronizer over a fixed set of required stream names.
    pub fn new(required: Vec<StreamName>, config: &SyncConfig) -> Self {
        Self {
            required,
            pending: BTreeMap::new(),
            ready: BTreeMap::new(),
            high_water: None,
            emitted_mark: None,
            horizon: config.eviction_horizon,
            stats: SyncStats::default(),
        }
    }

    /// Push one packet; returns every bundle that became emittable.
    ///
    /// Returned bundles are in ascending sequence order and each sequence
    /// number is emitted at most once, ever.
    #[instrument(
        level = "trace",
        name = "synchronizer_push",
        skip(self, packet),
        fields(stream = %packet.stream, sequence = packet.sequence)
    )]
    pub fn push(&mut self, packet: Packet) -> Vec<Bundle> {
        let mut emitted = Vec::new();

        if !self.required.contains(&packet.stream) {
            self.stats.foreign_discarded += 1;
            trace!(stream = %packet.stream, "packet for stream outside the join, discarded");
            return emitted;
        }

        // A packet for an already-emitted sequence would re-open the group
        // and risk a second emission; discard it instead.
        if self.emitted_mark.is_some_and(|mark| packet.sequence <= mark) {
            self.stats.late_discarded += 1;
            trace!(sequence = packet.sequence, "late packet for emitted group, discarded");
            return emitted;
        }

        let sequence = packet.sequence;
        let group = self.pending.entry(sequence).or_default();
        // Last write wins on a duplicate (sequence, stream).
        if group.insert(packet.stream.clone(), packet).is_some() {
            self.stats.replaced += 1;
        }

        if group.len() == self.required.len() {
            if let Some(packets) = self.pending.remove(&sequence) {
                self.ready.insert(sequence, Bundle { sequence, packets });
            }
        }

        self.high_water = Some(self.high_water.map_or(sequence, |h| h.max(sequence)));
        self.evict_stale();
        self.drain_ready(&mut emitted);
        emitted
    }

    /// Drop incomplete groups that fell more than `horizon` behind the
    /// highest observed sequence number. Evicted groups are never emitted.
    fn evict_stale(&mut self) {
        let Some(high) = self.high_water else { return };
        if high <= self.horizon {
            return;
        }
        let cutoff = high - self.horizon;

        while let Some((&sequence, _)) = self.pending.first_key_value() {
            if sequence >= cutoff {
                break;
            }
            self.pending.remove(&sequence);
            self.stats.evicted += 1;
            metrics::counter!("vision_router_sync_groups_evicted_total").increment(1);
            debug!(sequence, high_water = high, "incomplete group evicted");
        }
    }

    /// Release ready bundles in ascending order; a smaller pending sequence
    /// blocks emission until it completes or is evicted.
    fn drain_ready(&mut self, out: &mut Vec<Bundle>) {
        loop {
            let Some((&sequence, _)) = self.ready.first_key_value() else {
                break;
            };
            if self
                .pending
                .first_key_value()
                .is_some_and(|(&p, _)| p < sequence)
            {
                break;
            }
            if let Some(bundle) = self.ready.remove(&sequence) {
                self.emitted_mark = Some(sequence);
                self.stats.emitted += 1;
                trace!(sequence, "bundle emitted");
                out.push(bundle);
            }
        }
    }

    /// Required stream names of the join.
    pub fn required(&self) -> &[StreamName] {
        &self.required
    }

    /// Diagnostics snapshot.
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            pending_groups: self.pending.len(),
            ready_groups: self.ready.len(),
            high_water: self.high_water,
            ..self.stats
        }
    }
}
