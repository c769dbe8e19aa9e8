use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::ports::ValidationFinding;

/// Result of collecting one instrument.
#[derive(Debug, Clone, Default)]
pub struct CollectionOutcome {
    pub instrument_id: String,
    pub succeeded: bool,
    pub records_saved: usize,
    pub skipped: bool,
    pub newly_registered: bool,
    pub error: Option<String>,
    pub validation: Vec<ValidationFinding>,
}

impl CollectionOutcome {
    pub(crate) fn failure(instrument_id: &str, reason: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub(crate) fn already_current(instrument_id: &str, newly_registered: bool) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            succeeded: true,
            skipped: true,
            newly_registered,
            ..Self::default()
        }
    }
}

/// Aggregated result of one batch invocation. Built fresh per call and
/// returned by value; cross-call totals live in [`CollectionTotals`].
#[derive(Debug, Clone, Default)]
pub struct CollectionStatus {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub registered: usize,
    pub total_collected: usize,
    pub total_errors: usize,
    pub elapsed: Duration,
    pub validation_results: HashMap<String, Vec<ValidationFinding>>,
}

impl CollectionStatus {
    /// Folds one instrument's outcome in. An instrument lands in exactly
    /// one of the succeeded/failed/skipped lists.
    pub(crate) fn absorb(&mut self, outcome: CollectionOutcome) {
        if outcome.skipped {
            self.skipped.push(outcome.instrument_id.clone());
        } else if outcome.succeeded {
            self.succeeded.push(outcome.instrument_id.clone());
        } else {
            self.failed.push(outcome.instrument_id.clone());
        }

        if outcome.error.is_some() {
            self.total_errors += 1;
        }

        if outcome.newly_registered {
            self.registered += 1;
        }

        self.total_collected += outcome.records_saved;

        if !outcome.validation.is_empty() {
            self.validation_results
                .insert(outcome.instrument_id, outcome.validation);
        }
    }
}

/// Cumulative counters since process start, folded from each returned
/// status rather than mutated mid-collection.
#[derive(Debug, Default)]
pub struct CollectionTotals {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    registered: AtomicUsize,
    records_collected: AtomicUsize,
}

impl CollectionTotals {
    pub fn fold(&self, status: &CollectionStatus) {
        self.succeeded
            .fetch_add(status.succeeded.len(), Ordering::Relaxed);
        self.failed.fetch_add(status.failed.len(), Ordering::Relaxed);
        self.skipped
            .fetch_add(status.skipped.len(), Ordering::Relaxed);
        self.registered
            .fetch_add(status.registered, Ordering::Relaxed);
        self.records_collected
            .fetch_add(status.total_collected, Ordering::Relaxed);
    }

    pub fn fold_outcome(&self, outcome: &CollectionOutcome) {
        if outcome.skipped {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        } else if outcome.succeeded {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        if outcome.newly_registered {
            self.registered.fetch_add(1, Ordering::Relaxed);
        }

        self.records_collected
            .fetch_add(outcome.records_saved, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TotalsSnapshot {
        TotalsSnapshot {
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            registered: self.registered.load(Ordering::Relaxed),
            records_collected: self.records_collected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalsSnapshot {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub registered: usize,
    pub records_collected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_land_in_exactly_one_list() {
        let mut status = CollectionStatus::default();

        status.absorb(CollectionOutcome {
            instrument_id: "000001".to_string(),
            succeeded: true,
            records_saved: 120,
            ..CollectionOutcome::default()
        });
        status.absorb(CollectionOutcome::already_current("000002", false));
        status.absorb(CollectionOutcome::failure("000003", "registration failed"));

        assert_eq!(status.succeeded, vec!["000001"]);
        assert_eq!(status.skipped, vec!["000002"]);
        assert_eq!(status.failed, vec!["000003"]);
        assert_eq!(status.total_collected, 120);
        assert_eq!(status.total_errors, 1);
    }

    #[test]
    fn test_totals_accumulate_across_statuses() {
        let totals = CollectionTotals::default();

        let mut first = CollectionStatus::default();
        first.absorb(CollectionOutcome {
            instrument_id: "000001".to_string(),
            succeeded: true,
            records_saved: 10,
            newly_registered: true,
            ..CollectionOutcome::default()
        });
        totals.fold(&first);

        let mut second = CollectionStatus::default();
        second.absorb(CollectionOutcome::failure("000002", "boom"));
        totals.fold(&second);

        let snapshot = totals.snapshot();
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.registered, 1);
        assert_eq!(snapshot.records_collected, 10);
    }
}
