// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! `detctl`: run the deterministic engine over a problem spec file, and
//! check a regenerated trace against a committed golden fixture.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use det_core::ProblemSpec;
use det_engine::ExecuteOptions;
use tracing_subscriber::EnvFilter;

/// Exit code for runtime errors and determinism-check mismatches.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "detctl", version, about = "Deterministic reasoning engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the engine over a problem spec and print the NDJSON trace plus
    /// a JSON summary of the final state.
    Execute {
        /// Path to a `ProblemSpec` JSON file.
        #[arg(long)]
        spec: PathBuf,

        /// Overrides the trace id (defaults to `spec.id`).
        #[arg(long)]
        trace_id: Option<String>,

        /// Overrides the recorded engine version.
        #[arg(long)]
        engine_version: Option<String>,

        /// Overrides the injected clock value (defaults to `spec.created_at`).
        #[arg(long)]
        now: Option<String>,

        /// Write output here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Regenerate a trace for `--spec` and diff it byte-exactly against a
    /// committed golden NDJSON fixture.
    CheckDeterminism {
        /// Path to a `ProblemSpec` JSON file.
        #[arg(long)]
        spec: PathBuf,

        /// Path to the golden NDJSON fixture.
        #[arg(long)]
        golden: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { EnvFilter::new("det=debug") } else { EnvFilter::new("det=info") };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Execute { spec, trace_id, engine_version, now, out } => {
            cmd_execute(&spec, trace_id, engine_version, now, out.as_deref())
        }
        Commands::CheckDeterminism { spec, golden } => cmd_check_determinism(&spec, &golden),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

fn load_spec(path: &std::path::Path) -> Result<ProblemSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read problem spec file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse problem spec file {}", path.display()))
}

fn run(spec: ProblemSpec, opts: ExecuteOptions) -> Result<det_engine::ExecutionResult> {
    det_engine::execute(spec, opts).map_err(|e| anyhow::anyhow!("{e}"))
}

fn cmd_execute(
    spec_path: &std::path::Path,
    trace_id: Option<String>,
    engine_version: Option<String>,
    now: Option<String>,
    out: Option<&std::path::Path>,
) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let result = run(spec, ExecuteOptions { trace_id, engine_version, now })?;

    let ndjson = det_trace::render_ndjson(&result.trace).map_err(|e| anyhow::anyhow!("{e}"))?;
    let summary = serde_json::json!({
        "trace_id": result.trace_id,
        "engine_version": result.engine_version,
        "final_state": result.final_state,
    });
    let summary_json = serde_json::to_string_pretty(&summary)?;

    let rendered = format!("{ndjson}{summary_json}\n");
    match out {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write output to {}", path.display()))?;
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_check_determinism(spec_path: &std::path::Path, golden_path: &std::path::Path) -> Result<()> {
    let spec = load_spec(spec_path)?;
    let result = run(spec, ExecuteOptions::default())?;
    let actual = det_trace::render_ndjson(&result.trace).map_err(|e| anyhow::anyhow!("{e}"))?;

    let expected = std::fs::read_to_string(golden_path)
        .with_context(|| format!("failed to read golden fixture {}", golden_path.display()))?;

    let diffs = diff_ndjson(&expected, &actual);
    if diffs.is_empty() {
        println!("ok: trace matches {}", golden_path.display());
        return Ok(());
    }

    eprintln!("trace diverges from {} ({} line(s) differ):", golden_path.display(), diffs.len());
    for diff in &diffs {
        eprintln!("--- line {}", diff.line);
        eprintln!("- {}", diff.expected.as_deref().unwrap_or("<missing>"));
        eprintln!("+ {}", diff.actual.as_deref().unwrap_or("<missing>"));
    }
    std::process::exit(EXIT_RUNTIME_ERROR);
}

/// One line-level difference between an expected (golden) and actual NDJSON
/// trace.
struct LineDiff {
    /// 1-based line number.
    line: usize,
    /// The golden line, or `None` if the actual trace is longer.
    expected: Option<String>,
    /// The regenerated line, or `None` if the golden trace is longer.
    actual: Option<String>,
}

/// Compare two NDJSON documents line by line. Returns one [`LineDiff`] per
/// line that differs, in order; a length mismatch surfaces as diffs for the
/// extra trailing lines on whichever side is longer.
fn diff_ndjson(expected: &str, actual: &str) -> Vec<LineDiff> {
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let max_len = expected_lines.len().max(actual_lines.len());

    let mut diffs = Vec::new();
    for i in 0..max_len {
        let expected_line = expected_lines.get(i).copied();
        let actual_line = actual_lines.get(i).copied();
        if expected_line != actual_line {
            diffs.push(LineDiff {
                line: i + 1,
                expected: expected_line.map(str::to_string),
                actual: actual_line.map(str::to_string),
            });
        }
    }
    diffs
}
