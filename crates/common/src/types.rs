//! Result and report types shared by both runners

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final outcome of a scenario.
///
/// `Fail` means an assertion did not hold (a logic defect in the SUT or in
/// the scenario). `Error` means the environment broke before the assertions
/// could be trusted (browser crash, connection refused, deadline exceeded).
/// `Inconclusive` marks scenarios whose expected behavior was never
/// verified; they are reported distinctly and do not fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    Error,
    Inconclusive,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail => write!(f, "fail"),
            Outcome::Error => write!(f, "error"),
            Outcome::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running a single scenario.
///
/// Exactly one of these is produced per scenario, on every path, and it is
/// never mutated after the collector accepts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub kind: crate::scenario::ScenarioKind,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub steps: Vec<StepResult>,
}

impl ScenarioResult {
    /// Shorthand for a result that never got to execute any steps.
    pub fn errored(name: &str, kind: crate::scenario::ScenarioKind, reason: String) -> Self {
        Self {
            name: name.to_string(),
            kind,
            outcome: Outcome::Error,
            reason: Some(reason),
            duration_ms: 0,
            steps: Vec::new(),
        }
    }
}

/// Aggregate counts over a run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub inconclusive: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail => self.failed += 1,
            Outcome::Error => self.errored += 1,
            Outcome::Inconclusive => self.inconclusive += 1,
        }
    }

    /// A run succeeds iff nothing failed or errored. Inconclusive scenarios
    /// are listed but do not flip the exit code.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// The machine-readable report for an entire run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
    pub summary: RunSummary,
    pub results: Vec<ScenarioResult>,
}

impl RunReport {
    pub fn new(results: Vec<ScenarioResult>, started_at: chrono::DateTime<chrono::Utc>, duration_ms: u64) -> Self {
        let mut summary = RunSummary::default();
        for r in &results {
            summary.record(r.outcome);
        }
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at,
            duration_ms,
            summary,
            results,
        }
    }
}
