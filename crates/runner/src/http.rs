//! API scenario runner
//!
//! Issues each step's HTTP request against the SUT, validates the response
//! against the step's expectations, and threads captured response fields
//! (e.g. a created task id) into later steps. Network-level faults and
//! malformed JSON bodies yield outcome `error`; assertion mismatches yield
//! outcome `fail` with the field, expected, and actual values recorded.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use base64::Engine as _;
use tracing::{debug, warn};

use taskprobe_common::scenario::{ApiStep, BodyAssertion, HttpMethod};
use taskprobe_common::{Error, HarnessConfig, Outcome, Result, Scenario, ScenarioResult, StepResult};

use crate::ui::inconclusive_result;
use crate::ScenarioRunner;

/// Variables captured from earlier responses, keyed by name
pub type VarMap = BTreeMap<String, serde_json::Value>;

pub struct ApiRunner {
    config: HarnessConfig,
    client: reqwest::Client,
}

impl ApiRunner {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        // Per-step timeouts are applied on each request; the client itself
        // carries no global timeout.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Environment(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Execute one step and evaluate its expectations
    async fn execute_step(&self, step: &ApiStep, vars: &mut VarMap) -> Result<()> {
        let path = interpolate(&step.path, vars)?;
        let url = self.config.api_url(&path);

        let method = match step.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        debug!(step = %step.name, %method, %url, "sending request");

        let timeout = step
            .timeout_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or_else(|| self.config.request_timeout());

        let mut request = self.client.request(method, &url).timeout(timeout);

        let has_auth_override = step
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization"));
        if let (Some(token), false) = (&self.config.bearer_token, has_auth_override) {
            request = request.bearer_auth(token);
        }
        for (name, value) in &step.headers {
            request = request.header(name, interpolate(value, vars)?);
        }

        if let Some(body) = &step.body {
            request = request.json(&resolve_value(body, vars)?);
        }
        if let Some(upload) = &step.upload {
            let bytes = match (&upload.content, &upload.content_base64) {
                (Some(text), _) => text.clone().into_bytes(),
                (None, Some(encoded)) => base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| {
                        Error::ScenarioParse(format!(
                            "step '{}': invalid base64 upload content: {}",
                            step.name, e
                        ))
                    })?,
                (None, None) => Vec::new(),
            };
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(upload.file_name.clone())
                .mime_str(&upload.content_type)
                .map_err(|e| {
                    Error::ScenarioParse(format!(
                        "step '{}': invalid content type: {}",
                        step.name, e
                    ))
                })?;
            let form = reqwest::multipart::Form::new().part(upload.field.clone(), part);
            request = request.multipart(form);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    what: url.clone(),
                    ms: timeout.as_millis() as u64,
                }
            } else {
                Error::Environment(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body_text = response
            .text()
            .await
            .map_err(|e| Error::Environment(format!("failed to read response body: {}", e)))?;

        // Status-code membership: an empty set means any 2xx
        let status_ok = if step.expect.status.is_empty() {
            (200..300).contains(&status)
        } else {
            step.expect.status.contains(&status)
        };
        if !status_ok {
            let expected = if step.expect.status.is_empty() {
                "2xx".to_string()
            } else {
                format!("{:?}", step.expect.status)
            };
            return Err(Error::AssertionFailed {
                step: step.name.clone(),
                detail: format!("status {} not in {} (body: {})", status, expected, truncate(&body_text, 200)),
            });
        }

        if let Some(expected) = &step.expect.content_type {
            if !content_type.contains(expected.as_str()) {
                return Err(Error::AssertionFailed {
                    step: step.name.clone(),
                    detail: format!(
                        "content-type '{}' does not contain '{}'",
                        content_type, expected
                    ),
                });
            }
        }

        // Only parse the body when something needs it; a malformed JSON body
        // at that point is an environment-grade fault, not an assertion miss.
        if !step.expect.body.is_empty() || !step.save.is_empty() {
            let body: serde_json::Value = serde_json::from_str(&body_text).map_err(|e| {
                Error::Environment(format!(
                    "malformed JSON response from {}: {} (body: {})",
                    url,
                    e,
                    truncate(&body_text, 200)
                ))
            })?;

            // Capture before asserting, so a failed expectation does not
            // lose the ids a trailing cleanup step needs.
            for (name, pointer) in &step.save {
                let value = body.pointer(pointer).ok_or_else(|| Error::AssertionFailed {
                    step: step.name.clone(),
                    detail: format!("cannot save '{}': nothing at pointer '{}'", name, pointer),
                })?;
                vars.insert(name.clone(), value.clone());
            }

            for assertion in &step.expect.body {
                check_body(&step.name, assertion, &body, vars)?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ScenarioRunner for ApiRunner {
    async fn run(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();

        if scenario.inconclusive {
            return inconclusive_result(scenario);
        }

        let deadline = scenario
            .deadline_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or_else(|| self.config.scenario_deadline());

        // Step results live outside the timed future so a deadline abort
        // still reports every step that ran, plus the one in flight.
        let mut steps = Vec::new();
        let run = self.run_steps(scenario, &mut steps);
        let timed = tokio::time::timeout(deadline, run).await;

        let (outcome, reason) = match timed {
            Ok(result) => result,
            Err(_) => {
                let reason = match steps.last() {
                    Some(in_flight) => format!(
                        "timeout: scenario exceeded deadline of {}ms during step {} ({})",
                        deadline.as_millis(),
                        steps.len(),
                        in_flight.name
                    ),
                    None => format!(
                        "timeout: scenario exceeded deadline of {}ms",
                        deadline.as_millis()
                    ),
                };
                (Outcome::Error, Some(reason))
            }
        };

        ScenarioResult {
            name: scenario.name.clone(),
            kind: scenario.kind,
            outcome,
            reason,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
        }
    }
}

impl ApiRunner {
    async fn run_steps(
        &self,
        scenario: &Scenario,
        step_results: &mut Vec<StepResult>,
    ) -> (Outcome, Option<String>) {
        let mut vars = VarMap::new();
        let mut failure: Option<(Outcome, String)> = None;

        for (index, step) in scenario.api_steps().iter().enumerate() {
            // After a failure only cleanup steps still run; resources the
            // scenario created should be deleted best-effort.
            if failure.is_some() && !step.cleanup {
                continue;
            }

            // The record goes in before the request is sent, so a scenario
            // deadline abort still names the step that was in flight. It is
            // overwritten with the real outcome once the step returns.
            let slot = step_results.len();
            step_results.push(StepResult {
                name: step.name.clone(),
                success: false,
                duration_ms: 0,
                error: Some("in flight when the scenario deadline expired".to_string()),
            });

            let step_start = Instant::now();
            let result = self.execute_step(step, &mut vars).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            let Some(entry) = step_results.get_mut(slot) else {
                continue;
            };
            entry.duration_ms = duration_ms;

            match result {
                Ok(()) => {
                    entry.success = true;
                    entry.error = None;
                }
                Err(e) if step.cleanup => {
                    // Cleanup is best-effort: log, record, never change the
                    // scenario outcome.
                    warn!(scenario = %scenario.name, step = %step.name, error = %e,
                        "cleanup step failed");
                    entry.error = Some(format!("cleanup: {}", e));
                }
                Err(e) => {
                    let outcome = if e.is_assertion() {
                        Outcome::Fail
                    } else {
                        Outcome::Error
                    };
                    let reason = format!("step {} ({}): {}", index + 1, step.name, e);
                    entry.error = Some(e.to_string());
                    failure = Some((outcome, reason));
                }
            }
        }

        match failure {
            Some((outcome, reason)) => (outcome, Some(reason)),
            None => (Outcome::Pass, None),
        }
    }
}

/// Evaluate one body assertion, reporting field/expected/actual on mismatch
fn check_body(
    step: &str,
    assertion: &BodyAssertion,
    body: &serde_json::Value,
    vars: &VarMap,
) -> Result<()> {
    let fail = |detail: String| {
        Err(Error::AssertionFailed {
            step: step.to_string(),
            detail,
        })
    };

    match assertion {
        BodyAssertion::Exists { pointer } => match body.pointer(pointer) {
            Some(_) => Ok(()),
            None => fail(format!("expected field at '{}', found nothing", pointer)),
        },
        BodyAssertion::Absent { pointer } => match body.pointer(pointer) {
            None => Ok(()),
            Some(actual) => fail(format!(
                "expected nothing at '{}', found {}",
                pointer, actual
            )),
        },
        BodyAssertion::Equals { pointer, value } => {
            let expected = resolve_value(value, vars)?;
            match body.pointer(pointer) {
                Some(actual) if *actual == expected => Ok(()),
                Some(actual) => fail(format!(
                    "field '{}': expected {}, got {}",
                    pointer, expected, actual
                )),
                None => fail(format!(
                    "field '{}': expected {}, found nothing",
                    pointer, expected
                )),
            }
        }
        BodyAssertion::Contains { pointer, value } => {
            let expected = interpolate(value, vars)?;
            match body.pointer(pointer).and_then(|v| v.as_str()) {
                Some(actual) if actual.contains(&expected) => Ok(()),
                Some(actual) => fail(format!(
                    "field '{}': '{}' does not contain '{}'",
                    pointer, actual, expected
                )),
                None => fail(format!("field '{}': expected a string", pointer)),
            }
        }
        BodyAssertion::IsArray { pointer } => match body.pointer(pointer) {
            Some(serde_json::Value::Array(_)) => Ok(()),
            Some(actual) => fail(format!("field '{}': expected an array, got {}", pointer, actual)),
            None => fail(format!("field '{}': expected an array, found nothing", pointer)),
        },
        BodyAssertion::AnyItemEquals {
            pointer,
            field,
            value,
        } => {
            let expected = resolve_value(value, vars)?;
            let items = array_at(step, body, pointer)?;
            if items.iter().any(|item| item_field_matches(item, field, &expected)) {
                Ok(())
            } else {
                fail(format!(
                    "no item in '{}' has {} == {}",
                    pointer, field, expected
                ))
            }
        }
        BodyAssertion::NoItemEquals {
            pointer,
            field,
            value,
        } => {
            let expected = resolve_value(value, vars)?;
            let items = array_at(step, body, pointer)?;
            if items.iter().any(|item| item_field_matches(item, field, &expected)) {
                fail(format!(
                    "an item in '{}' still has {} == {}",
                    pointer, field, expected
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn array_at<'a>(
    step: &str,
    body: &'a serde_json::Value,
    pointer: &str,
) -> Result<&'a Vec<serde_json::Value>> {
    body.pointer(pointer)
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::AssertionFailed {
            step: step.to_string(),
            detail: format!("expected an array at '{}'", pointer),
        })
}

/// Ids come back as numbers from some SUTs and strings from others, so
/// compare string renderings when the JSON types differ.
fn item_field_matches(item: &serde_json::Value, field: &str, expected: &serde_json::Value) -> bool {
    match item.get(field) {
        Some(actual) if actual == expected => true,
        Some(actual) => value_to_string(actual) == value_to_string(expected),
        None => false,
    }
}

/// Substitute `{var}` references in a template string
pub fn interpolate(template: &str, vars: &VarMap) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let name = &after[..close];
        let value = vars
            .get(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        out.push_str(&value_to_string(value));
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Resolve `{var}` references inside a JSON value. A string that is exactly
/// one reference is replaced by the captured value itself, so numeric ids
/// keep their type.
pub fn resolve_value(value: &serde_json::Value, vars: &VarMap) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('{') && trimmed.ends_with('}') && trimmed.len() > 2 {
                let name = &trimmed[1..trimmed.len() - 1];
                if !name.contains(['{', '}']) {
                    if let Some(captured) = vars.get(name) {
                        return Ok(captured.clone());
                    }
                }
            }
            Ok(serde_json::Value::String(interpolate(s, vars)?))
        }
        serde_json::Value::Array(items) => Ok(serde_json::Value::Array(
            items
                .iter()
                .map(|v| resolve_value(v, vars))
                .collect::<Result<_>>()?,
        )),
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), resolve_value(v, vars)?);
            }
            Ok(serde_json::Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> VarMap {
        let mut vars = VarMap::new();
        vars.insert("task_id".to_string(), json!(42));
        vars.insert("user".to_string(), json!("alice"));
        vars
    }

    #[test]
    fn interpolate_substitutes_vars() {
        let vars = vars();
        assert_eq!(
            interpolate("/api/tasks/{task_id}", &vars).unwrap(),
            "/api/tasks/42"
        );
        assert_eq!(
            interpolate("/api/users/{user}/tasks/{task_id}", &vars).unwrap(),
            "/api/users/alice/tasks/42"
        );
        assert_eq!(interpolate("/api/tasks", &vars).unwrap(), "/api/tasks");
    }

    #[test]
    fn interpolate_rejects_unknown_var() {
        let err = interpolate("/api/tasks/{nope}", &VarMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownVariable(name) if name == "nope"));
    }

    #[test]
    fn resolve_value_preserves_numeric_ids() {
        let vars = vars();
        let resolved = resolve_value(&json!({"id": "{task_id}", "owner": "user {user}"}), &vars).unwrap();
        assert_eq!(resolved, json!({"id": 42, "owner": "user alice"}));
    }

    #[test]
    fn equals_assertion_reports_expected_and_actual() {
        let body = json!({"title": "Y"});
        let assertion = BodyAssertion::Equals {
            pointer: "/title".to_string(),
            value: json!("X"),
        };
        let err = check_body("create-task", &assertion, &body, &VarMap::new()).unwrap_err();
        let detail = err.to_string();
        assert!(detail.contains("/title"));
        assert!(detail.contains("\"X\""));
        assert!(detail.contains("\"Y\""));
    }

    #[test]
    fn absent_assertion() {
        let body = json!({"success": true});
        let assertion = BodyAssertion::Absent {
            pointer: "/error".to_string(),
        };
        check_body("upload", &assertion, &body, &VarMap::new()).unwrap();

        let body = json!({"error": "file type rejected"});
        assert!(check_body("upload", &assertion, &body, &VarMap::new()).is_err());
    }

    #[test]
    fn any_item_equals_matches_mixed_id_types() {
        // SUT returns string ids, the captured var is numeric
        let body = json!([{"id": "42", "title": "X"}, {"id": "7"}]);
        let assertion = BodyAssertion::AnyItemEquals {
            pointer: "".to_string(),
            field: "id".to_string(),
            value: json!("{task_id}"),
        };
        check_body("list-tasks", &assertion, &body, &vars()).unwrap();
    }

    #[test]
    fn no_item_equals_after_delete() {
        let body = json!([{"id": 7}]);
        let assertion = BodyAssertion::NoItemEquals {
            pointer: "".to_string(),
            field: "id".to_string(),
            value: json!("{task_id}"),
        };
        check_body("list-tasks", &assertion, &body, &vars()).unwrap();

        let body = json!([{"id": 42}]);
        assert!(check_body("list-tasks", &assertion, &body, &vars()).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 200), "short");
    }
}
