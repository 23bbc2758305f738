//! taskprobe CLI - Main Entry Point
//!
//! Loads declarative scenarios, runs them against the configured SUT, and
//! reports the results. The exit code is non-zero when any scenario fails
//! or errors, so CI can gate on the run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod output;

use taskprobe_common::{Browser, HarnessConfig, Scenario};
use taskprobe_runner::{report, run_scenarios};

/// taskprobe - E2E and API test harness for the task-management SUT
#[derive(Parser)]
#[command(name = "taskprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Base URL of the SUT web frontend
    #[arg(long, global = true, env = "TASKPROBE_UI_BASE_URL", default_value = "http://127.0.0.1:3000")]
    ui_base_url: String,

    /// Base URL of the SUT REST API
    #[arg(long, global = true, env = "TASKPROBE_API_BASE_URL", default_value = "http://127.0.0.1:3004")]
    api_base_url: String,

    /// Bearer credential for API requests
    #[arg(long, global = true, env = "TASKPROBE_TOKEN")]
    token: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against the SUT
    Run(RunArgs),

    /// List the scenarios in the scenario directory
    List(ScenarioDirArgs),

    /// Check that every scenario file parses and is well-formed
    Validate(ScenarioDirArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    #[command(flatten)]
    dir: ScenarioDirArgs,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Maximum scenarios running concurrently
    #[arg(short, long, env = "TASKPROBE_JOBS", default_value = "4")]
    jobs: usize,

    /// Browser for UI scenarios (chromium, firefox, webkit)
    #[arg(long, env = "TASKPROBE_BROWSER", default_value = "chromium")]
    browser: Browser,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Default per-step timeout for UI waits, in milliseconds
    #[arg(long, default_value = "5000")]
    step_timeout_ms: u64,

    /// Default per-request timeout for API steps, in milliseconds
    #[arg(long, default_value = "30000")]
    request_timeout_ms: u64,

    /// Deadline per scenario, in milliseconds
    #[arg(long, default_value = "120000")]
    deadline_ms: u64,

    /// Directory the JSON report is written to
    #[arg(long, default_value = "probe-results")]
    output_dir: PathBuf,
}

#[derive(clap::Args)]
struct ScenarioDirArgs {
    /// Path to the scenario directory
    #[arg(short, long, env = "TASKPROBE_SCENARIOS", default_value = "scenarios")]
    scenarios: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => {
            let mut scenarios = Scenario::load_all(&args.dir.scenarios)?;
            if let Some(tag) = &args.tag {
                scenarios.retain(|s| s.has_tag(tag));
            }
            if let Some(name) = &args.name {
                scenarios.retain(|s| &s.name == name);
                if scenarios.is_empty() {
                    anyhow::bail!("no scenario named '{}'", name);
                }
            }
            if scenarios.is_empty() {
                anyhow::bail!("no scenarios to run");
            }

            let config = HarnessConfig {
                ui_base_url: cli.ui_base_url,
                api_base_url: cli.api_base_url,
                bearer_token: cli.token,
                step_timeout_ms: args.step_timeout_ms,
                request_timeout_ms: args.request_timeout_ms,
                scenario_deadline_ms: args.deadline_ms,
                jobs: args.jobs,
                browser: args.browser,
                headless: !args.headed,
                output_dir: args.output_dir,
            };

            let run = run_scenarios(&config, scenarios).await?;
            report::write_report(&run, &config.output_dir)?;
            output::print_report(&run, cli.format);

            if !run.summary.is_success() {
                std::process::exit(1);
            }
        }
        Commands::List(args) => {
            let scenarios = Scenario::load_all(&args.scenarios)?;
            output::print_scenarios(&scenarios, cli.format);
        }
        Commands::Validate(args) => match Scenario::load_all(&args.scenarios) {
            Ok(scenarios) => {
                println!("✅ {} scenario(s) valid", scenarios.len());
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
