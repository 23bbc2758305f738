//! Result collection
//!
//! The collector is the only shared mutable state between scenarios. It is
//! append-only: results arrive in completion order, are never mutated after
//! acceptance, and the summary is derived on demand.

use std::sync::Mutex;

use taskprobe_common::{RunSummary, ScenarioResult};

#[derive(Default)]
pub struct ResultCollector {
    results: Mutex<Vec<ScenarioResult>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result. Single-writer-at-a-time; the lock is held only
    /// for the push.
    pub fn record(&self, result: ScenarioResult) {
        self.results
            .lock()
            .expect("result collector lock poisoned")
            .push(result);
    }

    pub fn summary(&self) -> RunSummary {
        let results = self
            .results
            .lock()
            .expect("result collector lock poisoned");
        let mut summary = RunSummary::default();
        for r in results.iter() {
            summary.record(r.outcome);
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.results
            .lock()
            .expect("result collector lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the collector, yielding results in insertion order
    pub fn into_results(self) -> Vec<ScenarioResult> {
        self.results
            .into_inner()
            .expect("result collector lock poisoned")
    }
}
