//! Browser session driving via Playwright
//!
//! Each UI scenario gets its own browser session: the scenario's steps are
//! rendered into one Node script which launches the browser, executes the
//! steps sequentially, and emits one NDJSON record per step on stdout. The
//! Rust side owns the node process (`kill_on_drop`), so the session is
//! released on every exit path, including a scenario deadline abort.

use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use taskprobe_common::scenario::{UiStep, Viewport, WaitState};
use taskprobe_common::{Browser, Error, HarnessConfig, Result};

/// How the script classified a step failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The locator or assertion contract was not met within its timeout
    #[default]
    Assert,
    /// A browser or network fault unrelated to the page's content
    Env,
}

/// One NDJSON record emitted by the generated script
#[derive(Debug, Clone, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub step: usize,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub ms: u64,
    #[serde(default)]
    pub timeout: bool,
    #[serde(default)]
    pub kind: FaultKind,
    #[serde(default)]
    pub fatal: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A scoped browser session for exactly one scenario
pub struct BrowserSession {
    browser: Browser,
    headless: bool,
    base_url: String,
    step_timeout_ms: u64,
}

impl BrowserSession {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            browser: config.browser,
            headless: config.headless,
            base_url: config.ui_base_url.trim_end_matches('/').to_string(),
            step_timeout_ms: config.step_timeout_ms,
        }
    }

    /// Run a scenario's steps in one browser session.
    ///
    /// Step records are pushed into `records` as the script emits them, so a
    /// caller that drops this future on a deadline still sees every step
    /// that completed. Step-level failures come back as `ok: false` records;
    /// the returned value is a session-level fault (browser crash, node
    /// missing), if any.
    pub async fn run_steps(
        &self,
        steps: &[&UiStep],
        viewport: Viewport,
        records: &mut Vec<StepRecord>,
    ) -> Result<Option<String>> {
        let script = self.build_script(steps, viewport);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, &script)?;

        debug!(path = %script_path.display(), "running browser script");

        let mut child = Command::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Environment(format!("failed to spawn node: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Environment("node stdout not captured".to_string()))?;

        // Drain stderr on its own task so a chatty child cannot block on a
        // full pipe while we are still reading stdout.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let mut fatal = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(record) = serde_json::from_str::<StepRecord>(&line) else {
                continue; // page console noise
            };
            if record.fatal {
                fatal = Some(
                    record
                        .error
                        .unwrap_or_else(|| "browser session fault".to_string()),
                );
            } else {
                records.push(record);
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        // A non-zero exit with no records at all means the session never
        // got going (playwright missing, browser failed to launch).
        if records.is_empty() && fatal.is_none() && !status.success() {
            fatal = Some(format!(
                "browser session exited with {}: {}",
                status,
                stderr.trim()
            ));
        }

        Ok(fatal)
    }

    /// Render the scenario's steps into a standalone Playwright script
    pub fn build_script(&self, steps: &[&UiStep], viewport: Viewport) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

const report = (rec) => console.log(JSON.stringify(rec));

// Timeouts and assertion throws mean the page did not meet the step's
// contract; network and browser faults mean the session itself broke.
const classify = (err) => {{
  if (err.name === 'TimeoutError') return 'assert';
  const msg = err.message || '';
  if (/net::ERR_|ECONNREFUSED|Target closed|has been closed|crashed/i.test(msg)) return 'env';
  return 'assert';
}};

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{ viewport: {{ width: {width}, height: {height} }} }});
  context.setDefaultTimeout({timeout});
  const page = await context.newPage();
  const base = {base};

  const steps = [
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = viewport.width,
            height = viewport.height,
            timeout = self.step_timeout_ms,
            base = js_str(&self.base_url),
        ));

        for step in steps {
            script.push_str(&format!(
                "    {{ name: {}, run: async () => {{\n{}\n    }} }},\n",
                js_str(&step.label()),
                self.step_body(step)
            ));
        }

        script.push_str(
            r#"  ];

  let failed = false;
  for (let i = 0; i < steps.length; i++) {
    const start = Date.now();
    try {
      await steps[i].run();
      report({ step: i, name: steps[i].name, ok: true, ms: Date.now() - start });
    } catch (err) {
      report({
        step: i,
        name: steps[i].name,
        ok: false,
        ms: Date.now() - start,
        timeout: err.name === 'TimeoutError',
        kind: classify(err),
        error: err.message,
      });
      failed = true;
      break;
    }
  }

  await browser.close();
  process.exit(failed ? 1 : 0);
})().catch((err) => {
  report({ fatal: true, error: err.message });
  process.exit(3);
});
"#,
        );

        script
    }

    /// JavaScript body for one step
    fn step_body(&self, step: &UiStep) -> String {
        match step {
            UiStep::Navigate {
                url,
                wait_until,
                wait_for_selector,
            } => {
                let mut body = format!(
                    "      await page.goto(base + {}, {{ waitUntil: '{}' }});",
                    js_str(url),
                    wait_until.as_str()
                );
                if let Some(selector) = wait_for_selector {
                    body.push_str(&format!(
                        "\n      await page.waitForSelector({});",
                        js_str(selector)
                    ));
                }
                body
            }
            UiStep::Fill {
                selector,
                value,
                clear_first,
            } => {
                let mut body = String::new();
                if *clear_first {
                    body.push_str(&format!(
                        "      await page.fill({}, '');\n",
                        js_str(selector)
                    ));
                }
                body.push_str(&format!(
                    "      await page.fill({}, {});",
                    js_str(selector),
                    js_str(value)
                ));
                body
            }
            UiStep::Click {
                selector,
                timeout_ms,
            } => {
                let timeout = timeout_ms.unwrap_or(self.step_timeout_ms);
                format!(
                    "      await page.click({}, {{ timeout: {} }});",
                    js_str(selector),
                    timeout
                )
            }
            UiStep::Press { selector, key } => match selector {
                Some(selector) => format!(
                    "      await page.locator({}).press({});",
                    js_str(selector),
                    js_str(key)
                ),
                None => format!("      await page.keyboard.press({});", js_str(key)),
            },
            UiStep::Wait {
                selector,
                timeout_ms,
                state,
            } => {
                let timeout = timeout_ms.unwrap_or(self.step_timeout_ms);
                format!(
                    "      await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
                    js_str(selector),
                    state.as_str(),
                    timeout
                )
            }
            UiStep::Sleep { ms } => format!("      await page.waitForTimeout({});", ms),
            UiStep::Assert {
                selector,
                visible,
                text,
                text_contains,
                count,
            } => {
                let mut checks = Vec::new();
                let sel = js_str(selector);

                if let Some(visible) = visible {
                    let state = if *visible {
                        WaitState::Visible
                    } else {
                        WaitState::Hidden
                    };
                    checks.push(format!(
                        "      await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
                        sel,
                        state.as_str(),
                        self.step_timeout_ms
                    ));
                }
                if let Some(text) = text {
                    checks.push(format!(
                        "      {{ const t = (await page.locator({sel}).first().textContent() || '').trim();\n        if (t !== {expected}) throw new Error(`text mismatch: got '${{t}}'`); }}",
                        sel = sel,
                        expected = js_str(text)
                    ));
                }
                if let Some(fragment) = text_contains {
                    checks.push(format!(
                        "      {{ const t = (await page.locator({sel}).first().textContent() || '');\n        if (!t.includes({expected})) throw new Error(`text does not contain {frag}: got '${{t}}'`); }}",
                        sel = sel,
                        expected = js_str(fragment),
                        frag = fragment.replace('`', "'")
                    ));
                }
                if let Some(count) = count {
                    checks.push(format!(
                        "      {{ const n = await page.locator({sel}).count();\n        if (n !== {count}) throw new Error(`element count mismatch: expected {count}, got ${{n}}`); }}",
                        sel = sel,
                        count = count
                    ));
                }

                if checks.is_empty() {
                    // Bare assert means the selector must resolve to something
                    checks.push(format!(
                        "      await page.waitForSelector({}, {{ state: 'attached', timeout: {} }});",
                        sel, self.step_timeout_ms
                    ));
                }
                checks.join("\n")
            }
        }
    }
}

/// Quote a string as a single-quoted JavaScript literal
fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
