//! Parallel scenario scheduling
//!
//! Scenarios run concurrently under a `JoinSet`, bounded by a semaphore.
//! Steps inside one scenario stay strictly sequential; the only shared
//! state between scenarios is the result collector. A panicking scenario
//! is caught and recorded as an `error` result, so one bad scenario can
//! never take down the run.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use taskprobe_common::{
    HarnessConfig, Outcome, Result, RunReport, Scenario, ScenarioKind, ScenarioResult,
};

use crate::collector::ResultCollector;
use crate::http::ApiRunner;
use crate::ui::UiRunner;
use crate::ScenarioRunner;

/// Run every scenario and aggregate the results into a report
pub async fn run_scenarios(config: &HarnessConfig, scenarios: Vec<Scenario>) -> Result<RunReport> {
    let started_at = chrono::Utc::now();
    let start = Instant::now();

    let collector = Arc::new(ResultCollector::new());
    let semaphore = Arc::new(Semaphore::new(config.jobs.max(1)));
    let ui_runner = Arc::new(UiRunner::new(config.clone()));
    let api_runner = Arc::new(ApiRunner::new(config.clone())?);

    info!(
        "running {} scenario(s), {} at a time",
        scenarios.len(),
        config.jobs.max(1)
    );

    let mut tasks = JoinSet::new();

    for scenario in scenarios {
        let collector = collector.clone();
        let semaphore = semaphore.clone();
        let ui_runner = ui_runner.clone();
        let api_runner = api_runner.clone();

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("scenario semaphore closed");

            let name = scenario.name.clone();
            let kind = scenario.kind;

            // The runner executes on its own task so a panic inside a
            // scenario surfaces as a join error here instead of tearing
            // down the scheduler.
            let execution = tokio::spawn(async move {
                let runner: &dyn ScenarioRunner = match scenario.kind {
                    ScenarioKind::Ui => ui_runner.as_ref(),
                    ScenarioKind::Api => api_runner.as_ref(),
                };
                runner.run(&scenario).await
            });

            let result = match execution.await {
                Ok(result) => result,
                Err(join_error) => ScenarioResult::errored(
                    &name,
                    kind,
                    format!("scenario task panicked: {}", join_error),
                ),
            };

            match result.outcome {
                Outcome::Pass => info!("✓ {} ({} ms)", result.name, result.duration_ms),
                Outcome::Inconclusive => info!(
                    "? {} - {}",
                    result.name,
                    result.reason.as_deref().unwrap_or("inconclusive")
                ),
                _ => error!(
                    "✗ {} - {}",
                    result.name,
                    result.reason.as_deref().unwrap_or("unknown failure")
                ),
            }
            collector.record(result);
        });
    }

    while tasks.join_next().await.is_some() {}

    let collector = Arc::into_inner(collector).expect("collector still shared after join");
    let results = collector.into_results();
    let report = RunReport::new(results, started_at, start.elapsed().as_millis() as u64);

    let s = &report.summary;
    info!(
        "run finished: {} passed, {} failed, {} errored, {} inconclusive ({} ms)",
        s.passed, s.failed, s.errored, s.inconclusive, report.duration_ms
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_scenario_yields_exactly_one_result() {
        // Unreachable API base: every scenario must still produce a result,
        // all with outcome `error`, never a crash.
        let config = HarnessConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_ms: 500,
            scenario_deadline_ms: 2_000,
            jobs: 2,
            ..Default::default()
        };

        let yaml = |name: &str| {
            format!(
                "name: {}\nkind: api\nsteps:\n  - name: ping\n    method: GET\n    path: /health\n",
                name
            )
        };
        let scenarios = vec![
            Scenario::from_yaml(&yaml("one")).unwrap(),
            Scenario::from_yaml(&yaml("two")).unwrap(),
            Scenario::from_yaml(&yaml("three")).unwrap(),
        ];

        let report = run_scenarios(&config, scenarios).await.unwrap();
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.errored, 3);
        assert_eq!(report.results.len(), 3);
    }

    #[tokio::test]
    async fn inconclusive_scenarios_are_counted_separately() {
        let config = HarnessConfig::default();
        let scenario = Scenario::from_yaml(
            "name: placeholder\nkind: api\ninconclusive: true\nsteps: []\n",
        )
        .unwrap();

        let report = run_scenarios(&config, vec![scenario]).await.unwrap();
        assert_eq!(report.summary.inconclusive, 1);
        assert!(report.summary.is_success());
        assert_eq!(report.results[0].outcome, Outcome::Inconclusive);
    }
}
