// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::IngestOutcome;

#[derive(Default)]
struct IngestCountersInner {
    not_results: AtomicU64,
    accepted: AtomicU64,
    duplicates: AtomicU64,
    future_days: AtomicU64,
    invariant_violations: AtomicU64,
    rollover_sweeps: AtomicU64,
    rollover_resets: AtomicU64,
}

/// Diagnostic counters; nothing reads them for correctness.
#[derive(Clone, Default)]
pub struct IngestCounters {
    inner: Arc<IngestCountersInner>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestCountersSnapshot {
    pub not_results: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub future_days: u64,
    pub invariant_violations: u64,
    pub rollover_sweeps: u64,
    pub rollover_resets: u64,
}

impl IngestCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, outcome: IngestOutcome) {
        let counter = match outcome {
            IngestOutcome::NotAResult => &self.inner.not_results,
            IngestOutcome::Accepted => &self.inner.accepted,
            IngestOutcome::DuplicateDay => &self.inner.duplicates,
            IngestOutcome::FutureDay => &self.inner.future_days,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invariant_violation(&self) {
        self.inner
            .invariant_violations
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollover(&self, resets: usize) {
        self.inner.rollover_sweeps.fetch_add(1, Ordering::Relaxed);
        if resets > 0 {
            self.inner
                .rollover_resets
                .fetch_add(resets as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> IngestCountersSnapshot {
        let inner = &self.inner;
        IngestCountersSnapshot {
            not_results: inner.not_results.load(Ordering::Relaxed),
            accepted: inner.accepted.load(Ordering::Relaxed),
            duplicates: inner.duplicates.load(Ordering::Relaxed),
            future_days: inner.future_days.load(Ordering::Relaxed),
            invariant_violations: inner.invariant_violations.load(Ordering::Relaxed),
            rollover_sweeps: inner.rollover_sweeps.load(Ordering::Relaxed),
            rollover_resets: inner.rollover_resets.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_land_in_their_own_counter() {
        let counters = IngestCounters::new();
        counters.record_outcome(IngestOutcome::Accepted);
        counters.record_outcome(IngestOutcome::Accepted);
        counters.record_outcome(IngestOutcome::DuplicateDay);
        counters.record_outcome(IngestOutcome::NotAResult);
        counters.record_rollover(0);
        counters.record_rollover(3);

        let snapshot = counters.clone().snapshot();
        assert_eq!(snapshot.accepted, 2);
        assert_eq!(snapshot.duplicates, 1);
        assert_eq!(snapshot.not_results, 1);
        assert_eq!(snapshot.future_days, 0);
        assert_eq!(snapshot.rollover_sweeps, 2);
        assert_eq!(snapshot.rollover_resets, 3);
    }
}
