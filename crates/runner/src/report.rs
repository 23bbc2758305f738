//! Report output

use std::path::{Path, PathBuf};

use tracing::info;

use taskprobe_common::{Result, RunReport};

/// Write the machine-readable run report as pretty-printed JSON
pub fn write_report(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("report.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;

    info!("report written to {}", path.display());
    Ok(path)
}

/// One line per scenario: outcome, name, duration, and a diagnostic for
/// anything that did not pass.
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    report
        .results
        .iter()
        .map(|r| match &r.reason {
            Some(reason) => format!(
                "{:<12} {} ({} ms) - {}",
                r.outcome.to_string(),
                r.name,
                r.duration_ms,
                reason
            ),
            None => format!(
                "{:<12} {} ({} ms)",
                r.outcome.to_string(),
                r.name,
                r.duration_ms
            ),
        })
        .collect()
}
