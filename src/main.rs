//! # METS batch validator CLI (`metscheck`)
//!
//! Walks a batch root for METS manifests (filenames containing
//! `_mets.xml`), validates every package found, and writes two outputs:
//! a diagnostic JSON log of everything wrong and a per-package summary CSV.
//!
//! ## Usage
//!
//! ```bash
//! metscheck <ROOT> [--config ./metscheck.toml] [--schema <SOURCE>]
//!           [--log <PATH>] [--report <PATH>] [--quiet]
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Batch completed; per-package problems are in the reports |
//! | 1 | Batch could not run (schema unobtainable, sinks not writable) |
//! | 2 | Usage error |
//!
//! ## Examples
//!
//! ```bash
//! # Validate a delivery batch with the built-in schema vocabulary
//! metscheck /data/batch_2024_0387
//!
//! # Validate against a locally maintained XSD
//! metscheck /data/batch_2024_0387 --schema schemas/mets.xsd
//!
//! # Send the reports somewhere specific
//! metscheck /data/batch_2024_0387 --log qa/batch.log --report qa/batch.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use mets_check::config::load_config;
use mets_check::discover::{build_exclusions, find_manifests};
use mets_check::report::ReportSinks;
use mets_check::schema::{MetsSchema, SchemaSource};
use mets_check::validate::validate_package;

/// Validate digitized-newspaper METS packages in batch.
///
/// Every file under ROOT whose name contains `_mets.xml` is treated as a
/// package manifest and validated in sorted order. One summary row per
/// package lands in the CSV report; packages with findings additionally get
/// a JSON entry in the diagnostic log.
#[derive(Parser)]
#[command(
    name = "metscheck",
    about = "Batch validator for digitized-newspaper METS packages",
    version
)]
struct Cli {
    /// Batch root searched recursively for METS manifests.
    root: PathBuf,

    /// Path to configuration file (TOML).
    ///
    /// A missing file is not an error; built-in defaults apply.
    #[arg(long, default_value = "./metscheck.toml")]
    config: PathBuf,

    /// Schema source: `builtin`, a local `.xsd` path, or an http(s) URL.
    ///
    /// Overrides `schema.source` from the config file. The batch does not
    /// start if the schema cannot be obtained.
    #[arg(long)]
    schema: Option<String>,

    /// Diagnostic log path. Overrides `report.log` from the config file.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Summary CSV path. Overrides `report.csv` from the config file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Suppress per-manifest progress on stderr.
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(schema) = cli.schema {
        config.schema.source = schema;
    }
    if let Some(log) = cli.log {
        config.report.log = log;
    }
    if let Some(report) = cli.report {
        config.report.csv = report;
    }

    if !cli.root.is_dir() {
        anyhow::bail!("batch root is not a directory: {}", cli.root.display());
    }

    let source = SchemaSource::parse(&config.schema.source);
    let schema = MetsSchema::load(&source)
        .with_context(|| format!("failed to obtain METS schema from {source}"))?;

    let exclude =
        build_exclusions(&config.discovery.exclude_globs).context("bad discovery.exclude_globs")?;
    let mut sinks = ReportSinks::create(&config.report.log, &config.report.csv)?;

    let manifests = find_manifests(&cli.root, &exclude);
    let progress = !cli.quiet && atty::is(atty::Stream::Stderr);

    let mut valid = 0usize;
    let mut with_findings = 0usize;
    for (index, path) in manifests.iter().enumerate() {
        if progress {
            eprintln!(
                "[{}/{}] checking {}",
                index + 1,
                manifests.len(),
                path.display()
            );
        }
        let report = validate_package(path, &schema);
        if report.summary.valid {
            valid += 1;
        }
        if report.has_findings() {
            with_findings += 1;
        }
        sinks.append(&report)?;
    }

    println!("checked {} manifests under {}", manifests.len(), cli.root.display());
    println!("  valid METS: {valid}");
    println!("  with findings: {with_findings}");
    println!("  summary: {}", config.report.csv.display());
    println!("  diagnostics: {}", config.report.log.display());

    Ok(())
}
