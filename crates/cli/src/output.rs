//! Output formatting for the CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use taskprobe_common::{Outcome, RunReport, Scenario};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

fn colorize(outcome: Outcome) -> String {
    match outcome {
        Outcome::Pass => "pass".green().to_string(),
        Outcome::Fail => "fail".red().to_string(),
        Outcome::Error => "error".red().bold().to_string(),
        Outcome::Inconclusive => "inconclusive".yellow().to_string(),
    }
}

/// Print the run report in the requested format
pub fn print_report(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["scenario", "kind", "outcome", "ms", "reason"]);

            for result in &report.results {
                table.add_row(vec![
                    result.name.clone(),
                    result.kind.to_string(),
                    colorize(result.outcome),
                    result.duration_ms.to_string(),
                    result.reason.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");

            let s = &report.summary;
            println!(
                "\n{} total: {} passed, {} failed, {} errored, {} inconclusive ({} ms)",
                s.total, s.passed, s.failed, s.errored, s.inconclusive, report.duration_ms
            );
        }
    }
}

/// Print the scenario listing
pub fn print_scenarios(scenarios: &[Scenario], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let listing: Vec<_> = scenarios
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "kind": s.kind,
                        "tags": s.tags,
                        "steps": s.steps.len(),
                        "inconclusive": s.inconclusive,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&listing).unwrap_or_default()
            );
        }
        OutputFormat::Table => {
            if scenarios.is_empty() {
                println!("No scenarios found.");
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["scenario", "kind", "steps", "tags"]);
            for scenario in scenarios {
                let steps = if scenario.inconclusive {
                    "inconclusive".to_string()
                } else {
                    scenario.steps.len().to_string()
                };
                table.add_row(vec![
                    scenario.name.clone(),
                    scenario.kind.to_string(),
                    steps,
                    scenario.tags.join(", "),
                ]);
            }
            println!("{table}");
        }
    }
}
