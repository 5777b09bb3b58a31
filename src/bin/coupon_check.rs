//! coupon-check: consistency report for coupon JSON files.
//!
//! Exits with status 1 when any file is unreadable or has errors.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rikstoto_wrapper::fixtures::{analyze, render_report, AnalysisReport};

#[derive(Parser, Debug)]
#[command(name = "coupon-check")]
#[command(about = "Check V75/V64/V65 coupon JSON for mathematical and logical errors")]
struct Args {
    /// Coupon JSON files to analyse
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print reports as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn load_and_analyze(path: &Path) -> Result<AnalysisReport> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("File not found: {}", path.display()))?;
    let data: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(analyze(&data))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut failed = false;

    for path in &args.files {
        match load_and_analyze(path) {
            Ok(report) => {
                failed |= report.has_errors();
                if args.json {
                    let out = serde_json::json!({
                        "file": path.display().to_string(),
                        "report": report,
                    });
                    println!("{out:#}");
                } else {
                    println!("{}", render_report(&report, Some(&path.display().to_string())));
                }
            }
            Err(e) => {
                failed = true;
                eprintln!("ERROR: {e:#}");
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
