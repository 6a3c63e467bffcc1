//! Render an issue report from a JSON request file.
//!
//! Usage: render-issue-report <request.json> <output.pdf> [options.json]

use anyhow::{bail, Context, Result};
use issue_report_pdf::{generate_report, FontResolver, ReportOptions, ReportRequest};
use std::path::PathBuf;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 3 {
        bail!("usage: render-issue-report <request.json> <output.pdf> [options.json]");
    }
    let request_path = PathBuf::from(&args[0]);
    let output_path = PathBuf::from(&args[1]);

    let options = match args.get(2) {
        Some(path) => ReportOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path))?,
        None => ReportOptions::default(),
    };

    let raw = std::fs::read(&request_path)
        .with_context(|| format!("reading {}", request_path.display()))?;
    let request = ReportRequest::from_json(&raw)
        .with_context(|| format!("parsing {}", request_path.display()))?;

    let fonts = FontResolver::load(&options.fonts).context("loading fonts")?;
    if !fonts.is_unicode() {
        eprintln!("Warning: Unicode fonts unavailable in {}, using Helvetica", options.fonts.dir.display());
    }

    let bytes = generate_report(&request, &fonts, &options)?;
    std::fs::write(&output_path, &bytes)
        .with_context(|| format!("writing {}", output_path.display()))?;

    println!(
        "Wrote issue {} report to {} ({} bytes)",
        request.issue_number,
        output_path.display(),
        bytes.len()
    );
    Ok(())
}
