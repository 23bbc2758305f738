//! Declarative YAML scenario definitions
//!
//! Scenarios are data, not code: each YAML file names the SUT flow it
//! exercises and lists the ordered steps to drive it. UI scenarios script a
//! browser session; API scenarios issue HTTP requests. The harness never
//! hard-codes endpoints or locators.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which runner executes a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Ui,
    Api,
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioKind::Ui => write!(f, "ui"),
            ScenarioKind::Api => write!(f, "api"),
        }
    }
}

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    pub kind: ScenarioKind,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Marks a scenario whose expected behavior was never verified against
    /// the SUT. Recorded as `inconclusive` without executing any steps.
    #[serde(default)]
    pub inconclusive: bool,

    /// Overall deadline for this scenario; falls back to the configured
    /// default when absent.
    #[serde(default)]
    pub deadline_ms: Option<u64>,

    /// Browser viewport for UI scenarios; desktop-sized unless the scenario
    /// exercises a narrower layout. Ignored by API scenarios.
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order. A failing step aborts the remainder,
    /// except API cleanup steps which always run.
    pub steps: Vec<Step>,
}

/// Browser viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

impl Default for Viewport {
    fn default() -> Self {
        default_viewport()
    }
}

/// One step of either flavor. The YAML shape disambiguates: UI steps carry
/// an `action` tag, API steps carry `method` and `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Ui(UiStep),
    Api(ApiStep),
}

/// A single browser action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UiStep {
    /// Navigate to a URL (relative to the UI base URL)
    Navigate {
        url: String,
        #[serde(default)]
        wait_until: WaitUntil,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Fill an input field
    Fill {
        selector: String,
        value: String,
        #[serde(default)]
        clear_first: bool,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Press a key, optionally scoped to an element
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        count: Option<usize>,
    },
}

impl UiStep {
    /// Short label used in step results and diagnostics
    pub fn label(&self) -> String {
        match self {
            UiStep::Navigate { url, .. } => format!("navigate:{}", url),
            UiStep::Fill { selector, .. } => format!("fill:{}", selector),
            UiStep::Click { selector, .. } => format!("click:{}", selector),
            UiStep::Press { key, .. } => format!("press:{}", key),
            UiStep::Wait { selector, .. } => format!("wait:{}", selector),
            UiStep::Sleep { ms } => format!("sleep:{}ms", ms),
            UiStep::Assert { selector, .. } => format!("assert:{}", selector),
        }
    }
}

/// Load-state condition for navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// Navigation committed, content may still be loading
    Commit,
    Domcontentloaded,
    #[default]
    Load,
}

impl WaitUntil {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Commit => "commit",
            WaitUntil::Domcontentloaded => "domcontentloaded",
            WaitUntil::Load => "load",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// A single HTTP request with its expectations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStep {
    /// Step label for diagnostics
    pub name: String,

    pub method: HttpMethod,

    /// Path relative to the API base URL. Supports `{var}` interpolation
    /// from values captured by earlier steps.
    pub path: String,

    /// Extra headers; the configured bearer token is injected unless an
    /// Authorization header is given here.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// JSON request body
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// Multipart file upload instead of a JSON body
    #[serde(default)]
    pub upload: Option<UploadPart>,

    /// Per-request timeout; falls back to the configured default (30s)
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub expect: Expect,

    /// Capture response fields for later steps: variable name to JSON pointer
    #[serde(default)]
    pub save: BTreeMap<String, String>,

    /// Cleanup steps run even after a failure, and their own failures are
    /// logged rather than flipping the scenario outcome.
    #[serde(default)]
    pub cleanup: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "PATCH")]
    Patch,
    #[serde(rename = "DELETE")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file part for a multipart upload step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPart {
    /// Form field name, e.g. `file`
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    /// Inline text content
    #[serde(default)]
    pub content: Option<String>,
    /// Binary content, base64-encoded in the YAML
    #[serde(default)]
    pub content_base64: Option<String>,
}

/// Expectations evaluated against one response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Expect {
    /// Acceptable status codes; empty means any 2xx
    #[serde(default)]
    pub status: Vec<u16>,

    /// Substring match on the Content-Type header
    #[serde(default)]
    pub content_type: Option<String>,

    /// Assertions over the JSON response body
    #[serde(default)]
    pub body: Vec<BodyAssertion>,
}

/// A predicate over the JSON response body. Pointers are RFC 6901 JSON
/// pointers (`""` is the document root). String values support `{var}`
/// interpolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum BodyAssertion {
    /// The pointer resolves to some value
    Exists { pointer: String },

    /// The pointer resolves to nothing (e.g. no `error` key)
    Absent { pointer: String },

    /// The value at the pointer equals the expected value
    Equals {
        pointer: String,
        value: serde_json::Value,
    },

    /// The string at the pointer contains a substring
    Contains { pointer: String, value: String },

    /// The value at the pointer is an array
    IsArray { pointer: String },

    /// The array at the pointer has an item whose field equals the value
    AnyItemEquals {
        pointer: String,
        field: String,
        value: serde_json::Value,
    },

    /// No item of the array at the pointer has a field equal to the value
    NoItemEquals {
        pointer: String,
        field: String,
        value: serde_json::Value,
    },
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Yaml(inner) => {
                Error::ScenarioParse(format!("{}: {}", path.display(), inner))
            }
            Error::ScenarioParse(inner) => {
                Error::ScenarioParse(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    /// Load all scenarios from a directory, sorted by file name so the
    /// execution order is stable.
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        let mut entries: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        entries.sort_by(|a, b| a.path().cmp(b.path()));

        let mut scenarios = Vec::new();
        for entry in entries {
            scenarios.push(Self::from_file(entry.path())?);
        }
        Ok(scenarios)
    }

    /// Every step must match the scenario kind
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() && !self.inconclusive {
            return Err(Error::ScenarioParse(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }
        for (i, step) in self.steps.iter().enumerate() {
            let matches = matches!(
                (self.kind, step),
                (ScenarioKind::Ui, Step::Ui(_)) | (ScenarioKind::Api, Step::Api(_))
            );
            if !matches {
                return Err(Error::ScenarioParse(format!(
                    "scenario '{}': step {} does not match kind '{}'",
                    self.name,
                    i + 1,
                    self.kind
                )));
            }
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Borrow the steps as UI steps. Valid only for `kind: ui` scenarios.
    pub fn ui_steps(&self) -> Vec<&UiStep> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Ui(u) => Some(u),
                Step::Api(_) => None,
            })
            .collect()
    }

    /// Borrow the steps as API steps. Valid only for `kind: api` scenarios.
    pub fn api_steps(&self) -> Vec<&ApiStep> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Api(a) => Some(a),
                Step::Ui(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_scenario() {
        let yaml = r#"
name: task-create-delete
description: Create a task, verify it lists, delete it
kind: api
tags:
  - tasks
  - smoke
steps:
  - name: create-task
    method: POST
    path: /api/tasks
    body:
      title: "X"
      status: "To Do"
      priority: "Medium"
    expect:
      status: [201]
      body:
        - check: exists
          pointer: /id
        - check: equals
          pointer: /title
          value: "X"
    save:
      task_id: /id
  - name: delete-task
    method: DELETE
    path: /api/tasks/{task_id}
    cleanup: true
    expect:
      status: [200, 204]
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.kind, ScenarioKind::Api);
        assert_eq!(scenario.steps.len(), 2);

        let steps = scenario.api_steps();
        assert_eq!(steps[0].method, HttpMethod::Post);
        assert_eq!(steps[0].expect.status, vec![201]);
        assert_eq!(steps[0].save.get("task_id").unwrap(), "/id");
        assert!(steps[1].cleanup);
        assert_eq!(steps[1].path, "/api/tasks/{task_id}");
    }

    #[test]
    fn parse_ui_scenario() {
        let yaml = r#"
name: signup-flow
kind: ui
steps:
  - action: navigate
    url: /
    wait_until: commit
  - action: fill
    selector: 'input[name=email]'
    value: user@example.com
  - action: click
    selector: 'button[type=submit]'
  - action: assert
    selector: '.confirmation'
    visible: true
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.kind, ScenarioKind::Ui);
        let steps = scenario.ui_steps();
        assert_eq!(steps.len(), 4);
        match steps[0] {
            UiStep::Navigate { wait_until, .. } => {
                assert_eq!(*wait_until, WaitUntil::Commit)
            }
            _ => panic!("expected navigate"),
        }
    }

    #[test]
    fn viewport_defaults_to_desktop_and_parses_explicit() {
        let yaml = r#"
name: board-desktop
kind: ui
steps:
  - action: navigate
    url: /
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.viewport, Viewport { width: 1280, height: 720 });

        let yaml = r#"
name: board-mobile
kind: ui
viewport:
  width: 390
  height: 844
steps:
  - action: navigate
    url: /
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.viewport.width, 390);
        assert_eq!(scenario.viewport.height, 844);
    }

    #[test]
    fn kind_mismatch_rejected() {
        let yaml = r#"
name: mixed-up
kind: api
steps:
  - action: click
    selector: button
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::ScenarioParse(_)));
    }

    #[test]
    fn empty_steps_rejected_unless_inconclusive() {
        let yaml = "name: empty\nkind: api\nsteps: []\n";
        assert!(Scenario::from_yaml(yaml).is_err());

        let yaml = "name: empty\nkind: api\ninconclusive: true\nsteps: []\n";
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert!(scenario.inconclusive);
    }

    #[test]
    fn load_all_sorted_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, scenario_name: &str| {
            let yaml = format!(
                "name: {}\nkind: api\nsteps:\n  - name: ping\n    method: GET\n    path: /health\n",
                scenario_name
            );
            std::fs::write(dir.path().join(name), yaml).unwrap();
        };
        write("20-second.yaml", "second");
        write("10-first.yaml", "first");
        write("notes.txt", "ignored");

        let scenarios = Scenario::load_all(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "first");
        assert_eq!(scenarios[1].name, "second");
    }

    #[test]
    fn upload_step_parses() {
        let yaml = r#"
name: upload
kind: api
steps:
  - name: upload-png
    method: POST
    path: /api/upload
    upload:
      field: file
      file_name: profile.png
      content_type: image/png
      content_base64: iVBORw0KGgo=
    expect:
      status: [200]
      body:
        - check: absent
          pointer: /error
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        let step = &scenario.api_steps()[0];
        let upload = step.upload.as_ref().unwrap();
        assert_eq!(upload.field, "file");
        assert_eq!(upload.content_type, "image/png");
    }
}
