//! Batch run configuration (`metscheck.toml`).
//!
//! Every table and key is optional; a missing file yields the defaults.
//! CLI flags override whatever the file provides.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchemaConfig {
    /// `builtin`, a local `.xsd` path, or an http(s) URL.
    #[serde(default = "default_schema_source")]
    pub source: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            source: default_schema_source(),
        }
    }
}

fn default_schema_source() -> String {
    "builtin".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    /// Diagnostic log, one JSON entry per package with findings.
    #[serde(default = "default_log_path")]
    pub log: PathBuf,
    /// Summary report, one CSV row per package.
    #[serde(default = "default_csv_path")]
    pub csv: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            log: default_log_path(),
            csv: default_csv_path(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("output.log")
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("report.csv")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiscoveryConfig {
    /// Glob patterns, relative to the batch root, whose manifests are
    /// skipped.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

/// Load the config file, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.schema.source.trim().is_empty() {
        bail!("schema.source must not be empty");
    }
    if config.report.log == config.report.csv {
        bail!(
            "report.log and report.csv must be different files (both are {})",
            config.report.log.display()
        );
    }
    Ok(())
}
