//! casework command line driver
//!
//! Generates synthetic complaints, runs them through the pipeline and prints
//! a JSON summary.

use casework::collaborators::Collaborators;
use casework::config::PolicyConfig;
use casework::observability::{init_default_logging, metrics};
use casework::orchestrator::{CaseRun, Orchestrator};
use casework::report::{CaseReport, RunSummary};
use casework::synthetic::generate_cases;
use casework::{CaseError, CaseResult};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATHS: &[&str] = &["casework.toml", "config/casework.toml"];

/// Complaint case pipeline
#[derive(Parser)]
#[command(name = "casework")]
#[command(about = "Complaint case state machine and handler orchestrator")]
#[command(version)]
struct Cli {
    /// Policy configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true, env = "CASEWORK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process synthetic complaints end to end
    Run {
        /// Number of synthetic complaints
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,

        /// Print each case's event trail
        #[arg(short, long)]
        verbose: bool,

        /// Write a per-case JSON report to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Validate the policy configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            count,
            verbose,
            output,
        } => run_batch(config, count, verbose, output.as_deref()).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(path: Option<&Path>) -> CaseResult<PolicyConfig> {
    if let Some(path) = path {
        info!("Loading configuration from: {}", path.display());
        return Ok(PolicyConfig::load_from_file(path)?);
    }

    for candidate in DEFAULT_CONFIG_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(PolicyConfig::load_from_file(path)?);
        }
    }

    info!("No configuration file found, using built-in policy defaults");
    Ok(PolicyConfig::default())
}

async fn run_batch(
    config: PolicyConfig,
    count: usize,
    verbose: bool,
    output: Option<&Path>,
) -> CaseResult<()> {
    let collaborators = Collaborators::from_config(&config);
    let orchestrator = Orchestrator::with_default_handlers(Arc::new(config));

    info!(count, "Processing synthetic cases");
    let runs = orchestrator
        .process_all(generate_cases(count), &collaborators)
        .await;

    for run in &runs {
        if let Err(e) = &run.result {
            warn!(case_id = %run.case.case_id, error = %e, "Case ended with an error");
        }
        if verbose {
            print_case(run);
        }
    }

    let cases: Vec<_> = runs.into_iter().map(|run| run.case).collect();
    let summary = RunSummary::from_cases(&cases);
    println!("{}", to_pretty_json(&summary)?);

    if let Some(path) = output {
        let report: Vec<CaseReport> = cases.iter().map(CaseReport::from).collect();
        std::fs::write(path, to_pretty_json(&report)?)
            .map_err(|e| CaseError::internal_error(format!("Failed to write report: {e}")))?;
        info!("Wrote case report to {}", path.display());
    }

    info!(
        metrics = %serde_json::to_string(&metrics().snapshot()).unwrap_or_default(),
        "Run complete"
    );
    Ok(())
}

fn print_case(run: &CaseRun) {
    let case = &run.case;
    println!("Case {} final state: {}", case.case_id, case.state);
    if let Some(draft) = &case.draft {
        let excerpt: String = draft.text.chars().take(120).collect();
        println!(" Draft excerpt: {excerpt} ...");
    }
    println!(" Events:");
    for event in case.events() {
        println!(
            "  - step={} handler={} action={} state={}",
            event.step(),
            event.handler(),
            event.action(),
            event.state_entered()
        );
    }
    println!("{}", "-".repeat(60));
}

fn handle_config_command(config: &PolicyConfig, show: bool) -> CaseResult<()> {
    config.validate()?;
    info!("Configuration is valid");

    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| CaseError::internal_error(format!("Failed to render config: {e}")))?;
        println!("{rendered}");
    }
    Ok(())
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> CaseResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CaseError::internal_error(format!("Failed to serialize output: {e}")))
}
