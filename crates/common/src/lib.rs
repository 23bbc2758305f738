//! Shared types for the taskprobe harness
//!
//! This crate holds everything both runners and the CLI agree on: the
//! declarative scenario model, the harness configuration, the error
//! taxonomy, and the result/report types. It performs no I/O beyond
//! loading scenario files.

pub mod config;
pub mod error;
pub mod scenario;
pub mod types;

pub use config::{Browser, HarnessConfig};
pub use error::{Error, Result};
pub use scenario::{ApiStep, Scenario, ScenarioKind, Step, UiStep, Viewport};
pub use types::{Outcome, RunReport, RunSummary, ScenarioResult, StepResult};
