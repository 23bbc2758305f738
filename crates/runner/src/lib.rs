//! Scenario execution for taskprobe
//!
//! Two independent runners consume the same scenario model and feed the
//! same collector:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     run_scenarios                    │
//! │   JoinSet + semaphore, one task per scenario         │
//! ├──────────────────────────┬───────────────────────────┤
//! │  UiRunner                │  ApiRunner                │
//! │    BrowserSession        │    reqwest::Client        │
//! │    (one node/playwright  │    (per-step timeouts,    │
//! │     process per scenario)│     var capture, cleanup) │
//! ├──────────────────────────┴───────────────────────────┤
//! │  ResultCollector  ->  RunReport  ->  report.json     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Runners are stateless between scenarios; a scenario's browser session or
//! HTTP connection is never shared with another scenario.

pub mod browser;
pub mod collector;
pub mod http;
pub mod report;
pub mod scheduler;
pub mod ui;

use async_trait::async_trait;

use taskprobe_common::{Scenario, ScenarioResult};

pub use collector::ResultCollector;
pub use http::ApiRunner;
pub use scheduler::run_scenarios;
pub use ui::UiRunner;

/// Contract shared by both runners: one scenario in, exactly one result
/// out, on every path.
#[async_trait]
pub trait ScenarioRunner: Send + Sync {
    async fn run(&self, scenario: &Scenario) -> ScenarioResult;
}
