//! Per-source execution statistics.

use std::collections::BTreeMap;

use serde::Serialize;

/// Cumulative success/failure counters for one source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceCounters {
    pub success: u64,
    pub failure: u64,
}

impl SourceCounters {
    pub const fn attempts(self) -> u64 {
        self.success + self.failure
    }
}

/// Tracker for per-source outcomes over the lifetime of a router instance.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    counters: BTreeMap<String, SourceCounters>,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one attempt outcome, creating a zeroed entry on first sight.
    pub fn record(&mut self, source: &str, succeeded: bool) {
        let entry = self.counters.entry(source.to_owned()).or_default();
        if succeeded {
            entry.success += 1;
        } else {
            entry.failure += 1;
        }
    }

    /// Owned copy of the current counters; mutating it never affects the
    /// tracker.
    pub fn snapshot(&self) -> BTreeMap<String, SourceCounters> {
        self.counters.clone()
    }
}
