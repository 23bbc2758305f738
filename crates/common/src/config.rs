//! Harness configuration
//!
//! Everything the runners need to reach the SUT is carried in one explicit
//! config value passed into each runner invocation. There are no
//! process-wide singletons; the CLI populates this from flags and
//! `TASKPROBE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser engine for UI scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

/// Configuration shared by both runners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base URL of the SUT web frontend
    pub ui_base_url: String,

    /// Base URL of the SUT REST API
    pub api_base_url: String,

    /// Bearer credential injected into API requests
    pub bearer_token: Option<String>,

    /// Default per-step timeout for UI waits and clicks
    pub step_timeout_ms: u64,

    /// Default per-request timeout for API steps
    pub request_timeout_ms: u64,

    /// Deadline for one whole scenario; overruns abort the session and
    /// record outcome `error`
    pub scenario_deadline_ms: u64,

    /// Maximum number of scenarios running concurrently
    pub jobs: usize,

    pub browser: Browser,

    pub headless: bool,

    /// Directory the JSON report is written to
    pub output_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ui_base_url: "http://127.0.0.1:3000".to_string(),
            api_base_url: "http://127.0.0.1:3004".to_string(),
            bearer_token: None,
            step_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            scenario_deadline_ms: 120_000,
            jobs: 4,
            browser: Browser::Chromium,
            headless: true,
            output_dir: PathBuf::from("probe-results"),
        }
    }
}

impl HarnessConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn scenario_deadline(&self) -> Duration {
        Duration::from_millis(self.scenario_deadline_ms)
    }

    /// Resolve a scenario-relative path against the API base URL
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// Resolve a scenario-relative path against the UI base URL
    pub fn ui_url(&self, path: &str) -> String {
        format!("{}{}", self.ui_base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_strips_trailing_slash() {
        let config = HarnessConfig {
            api_base_url: "http://localhost:3004/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.api_url("/api/tasks"), "http://localhost:3004/api/tasks");
    }

    #[test]
    fn browser_round_trip() {
        let b: Browser = "firefox".parse().unwrap();
        assert_eq!(b.as_str(), "firefox");
        assert!("chrome".parse::<Browser>().is_err());
    }
}
