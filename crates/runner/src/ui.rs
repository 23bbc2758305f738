//! UI scenario runner
//!
//! Drives one headless browser session per scenario and converts the
//! observed step records into a `ScenarioResult`. Step failures where the
//! page did not meet the step's contract (locator timeouts, false
//! assertions) become outcome `fail`; browser and network faults at any
//! point (spawn failure, crash, connection refused mid-scenario) become
//! outcome `error` so environment problems never masquerade as SUT defects.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use taskprobe_common::{HarnessConfig, Outcome, Scenario, ScenarioResult, StepResult};

use crate::browser::{BrowserSession, FaultKind, StepRecord};
use crate::ScenarioRunner;

pub struct UiRunner {
    config: HarnessConfig,
}

impl UiRunner {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ScenarioRunner for UiRunner {
    async fn run(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();

        if scenario.inconclusive {
            return inconclusive_result(scenario);
        }

        let steps = scenario.ui_steps();
        let session = BrowserSession::new(&self.config);
        let deadline = scenario
            .deadline_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or_else(|| self.config.scenario_deadline());

        debug!(scenario = %scenario.name, steps = steps.len(), "starting browser session");

        // The session process is kill_on_drop, so a deadline abort releases
        // the browser along with the future. Completed step records survive
        // the abort because the session pushes them as they arrive.
        let mut records = Vec::new();
        let session_run = session.run_steps(&steps, scenario.viewport, &mut records);
        let timed = tokio::time::timeout(deadline, session_run).await;

        let (outcome, reason) = match timed {
            Err(_) => {
                warn!(scenario = %scenario.name, "scenario deadline exceeded, session aborted");
                let reason = match steps.get(records.len()) {
                    Some(hung) => format!(
                        "timeout: scenario exceeded deadline of {}ms during step {} ({})",
                        deadline.as_millis(),
                        records.len() + 1,
                        hung.label()
                    ),
                    None => format!(
                        "timeout: scenario exceeded deadline of {}ms",
                        deadline.as_millis()
                    ),
                };
                (Outcome::Error, Some(reason))
            }
            Ok(Err(e)) => (Outcome::Error, Some(e.to_string())),
            Ok(Ok(fatal)) => classify_records(&records, fatal),
        };

        let step_results: Vec<StepResult> = records
            .iter()
            .map(|r| StepResult {
                name: r.name.clone(),
                success: r.ok,
                duration_ms: r.ms,
                error: r.error.clone(),
            })
            .collect();

        ScenarioResult {
            name: scenario.name.clone(),
            kind: scenario.kind,
            outcome,
            reason,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: step_results,
        }
    }
}

/// Map the session's step records onto a scenario outcome.
///
/// A failing record the script classified as an environment fault (network
/// error, crashed target) is an `error`; everything else the page failed to
/// deliver is a `fail`.
fn classify_records(records: &[StepRecord], fatal: Option<String>) -> (Outcome, Option<String>) {
    if let Some(fatal) = fatal {
        return (Outcome::Error, Some(fatal));
    }
    let Some(failed) = records.iter().find(|r| !r.ok) else {
        return (Outcome::Pass, None);
    };
    let detail = failed.error.as_deref().unwrap_or("step failed");
    match failed.kind {
        FaultKind::Env => (
            Outcome::Error,
            Some(format!(
                "step {} ({}) environment fault: {}",
                failed.step + 1,
                failed.name,
                detail
            )),
        ),
        FaultKind::Assert if failed.timeout => (
            Outcome::Fail,
            Some(format!(
                "timeout at step {} ({}): {}",
                failed.step + 1,
                failed.name,
                detail
            )),
        ),
        FaultKind::Assert => (
            Outcome::Fail,
            Some(format!(
                "step {} ({}) failed: {}",
                failed.step + 1,
                failed.name,
                detail
            )),
        ),
    }
}

pub(crate) fn inconclusive_result(scenario: &Scenario) -> ScenarioResult {
    ScenarioResult {
        name: scenario.name.clone(),
        kind: scenario.kind,
        outcome: Outcome::Inconclusive,
        reason: Some("expected behavior unverified, scenario not executed".to_string()),
        duration_ms: 0,
        steps: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskprobe_common::scenario::ScenarioKind;

    fn record(line: &str) -> StepRecord {
        serde_json::from_str(line).unwrap()
    }

    #[tokio::test]
    async fn inconclusive_scenario_is_not_executed() {
        let yaml = r#"
name: notifications-realtime
kind: ui
inconclusive: true
steps: []
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        let runner = UiRunner::new(HarnessConfig::default());
        let result = runner.run(&scenario).await;
        assert_eq!(result.outcome, Outcome::Inconclusive);
        assert_eq!(result.kind, ScenarioKind::Ui);
        assert!(result.steps.is_empty());
    }

    #[test]
    fn connection_refused_during_navigation_is_an_error() {
        let records = vec![record(
            r#"{"step":0,"name":"navigate:/","ok":false,"ms":9,"kind":"env","error":"page.goto: net::ERR_CONNECTION_REFUSED at http://127.0.0.1:1/"}"#,
        )];
        let (outcome, reason) = classify_records(&records, None);
        assert_eq!(outcome, Outcome::Error);
        assert!(reason.unwrap().contains("environment fault"));
    }

    #[test]
    fn locator_timeout_is_a_failure() {
        let records = vec![
            record(r#"{"step":0,"name":"navigate:/","ok":true,"ms":120}"#),
            record(
                r#"{"step":1,"name":"wait:.board","ok":false,"ms":5003,"timeout":true,"kind":"assert","error":"Timeout 5000ms exceeded."}"#,
            ),
        ];
        let (outcome, reason) = classify_records(&records, None);
        assert_eq!(outcome, Outcome::Fail);
        assert!(reason.unwrap().starts_with("timeout at step 2"));
    }

    #[test]
    fn fatal_takes_precedence_over_step_records() {
        let records = vec![record(r#"{"step":0,"name":"navigate:/","ok":true,"ms":80}"#)];
        let (outcome, reason) =
            classify_records(&records, Some("browser crashed mid-session".to_string()));
        assert_eq!(outcome, Outcome::Error);
        assert_eq!(reason.as_deref(), Some("browser crashed mid-session"));
    }

    #[test]
    fn all_ok_records_pass() {
        let records = vec![
            record(r#"{"step":0,"name":"navigate:/","ok":true,"ms":80}"#),
            record(r#"{"step":1,"name":"assert:form","ok":true,"ms":15}"#),
        ];
        let (outcome, reason) = classify_records(&records, None);
        assert_eq!(outcome, Outcome::Pass);
        assert!(reason.is_none());
    }
}
