use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use pf_common::Severity;
use pf_model::Workbook;

/// Evaluates a project-finance workbook and prints the resulting context
/// and diagnostics (§6).
#[derive(Parser, Debug)]
#[command(name = "pf", about = "Evaluate a project-finance workbook")]
struct Cli {
    /// Path to a workbook JSON file (`{ config, groups, inputs, keyPeriods, calculations, modules }`).
    workbook: PathBuf,

    /// Pretty-print the output JSON instead of compact single-line.
    #[arg(long)]
    pretty: bool,

    /// Increase log verbosity (-v, -vv). Overridden by `RUST_LOG` if set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let raw = fs::read_to_string(&cli.workbook).with_context(|| format!("reading workbook at {}", cli.workbook.display()))?;
    let workbook: Workbook = serde_json::from_str(&raw).with_context(|| format!("parsing workbook JSON at {}", cli.workbook.display()))?;

    tracing::info!(path = %cli.workbook.display(), "evaluating workbook");

    let output = pf_eval::evaluate(
        &workbook.config,
        &workbook.groups,
        &workbook.inputs,
        &workbook.key_periods,
        &workbook.calculations,
        &workbook.modules,
    );

    let has_errors = output.diagnostics.iter().any(|d| d.severity == Severity::Error);
    if has_errors {
        tracing::warn!(count = output.diagnostics.len(), "evaluation completed with diagnostics");
    }

    let body = serde_json::json!({
        "context": output.context,
        "diagnostics": output.diagnostics,
    });
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&body)
    } else {
        serde_json::to_string(&body)
    }
    .context("serialising evaluation output")?;
    println!("{rendered}");

    Ok(if has_errors { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
