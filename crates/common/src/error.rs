//! Error types for taskprobe

use thiserror::Error;

/// Result type alias using the harness error
pub type Result<T> = std::result::Result<T, Error>;

/// Harness error taxonomy.
///
/// The three variants that matter for scenario outcomes are
/// `AssertionFailed` (logic defect in the SUT or the scenario),
/// `Environment` (fault unrelated to SUT logic), and `Timeout`
/// (ambiguous between a slow SUT and a genuine hang, always surfaced
/// distinctly). Everything else is loading/transport plumbing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("assertion failed at step '{step}': {detail}")]
    AssertionFailed { step: String, detail: String },

    #[error("environment fault: {0}")]
    Environment(String),

    #[error("timeout after {ms}ms waiting for {what}")]
    Timeout { what: String, ms: u64 },

    #[error("scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("unknown variable '{{{0}}}' in step template")]
    UnknownVariable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether this error is an assertion-level failure (scenario outcome
    /// `fail`) as opposed to an environment/timeout fault (outcome `error`).
    pub fn is_assertion(&self) -> bool {
        matches!(self, Error::AssertionFailed { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

impl From<reqwest::Error> for Error {
    /// Network-level faults are environment errors, never assertion failures.
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout {
                what: e
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "request".to_string()),
                ms: 0,
            }
        } else {
            Error::Environment(e.to_string())
        }
    }
}
