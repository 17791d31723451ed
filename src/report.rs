//! Report shapes and sinks: the diagnostic JSON log and the per-package
//! summary CSV.
//!
//! Both formats are consumed by downstream batch tooling, so the JSON keys
//! and the CSV column set are fixed contracts. The log receives one
//! pretty-printed JSON object per package with findings; clean packages
//! leave no log entry. The CSV receives one row per package regardless.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Summary CSV columns, in order. The thirteen path-shaped columns are
/// looked up verbatim in the harvested descriptive metadata.
pub const SUMMARY_COLUMNS: [&str; 20] = [
    "METS filename",
    "Valid METS",
    "/mets:metsHdr/mets:agent[1]/mets:name",
    "/mets:metsHdr/mets:agent[2]/mets:name",
    "/mets:metsHdr/mets:agent[3]/mets:name",
    "/mods:mods/mods:titleInfo/mods:title",
    "/mods:mods/mods:typeOfResource",
    "/mods:mods/mods:genre",
    "/mods:mods/mods:originInfo/mods:dateIssued",
    "/mods:mods/mods:originInfo/mods:edition",
    "/mods:mods/mods:language/mods:languageTerm",
    "/mods:mods/mods:identifier[1]",
    "/mods:mods/mods:identifier[2]",
    "/mods:mods/mods:identifier[3]",
    "/mods:mods/mods:recordInfo/mods:recordContentSource",
    "Number of pages",
    "All files from METS present in package",
    "All files in package present in METS",
    "Each page has PDF, JPG, and Alto",
    "Technical metadata for each JPG",
];

/// Staged XML assessment of one manifest. Each flag is `None` until its
/// stage runs, so a syntax failure leaves `valid` unknown rather than false.
#[derive(Debug, Clone, Serialize)]
pub struct XmlValidity {
    pub mets: String,
    #[serde(rename = "value-ok")]
    pub encoding_ok: Option<bool>,
    #[serde(rename = "io-ok")]
    pub io_ok: Option<bool>,
    #[serde(rename = "well-formed")]
    pub well_formed: Option<bool>,
    pub valid: Option<bool>,
    #[serde(rename = "value-error", skip_serializing_if = "Option::is_none")]
    pub encoding_error: Option<String>,
    #[serde(rename = "io-error", skip_serializing_if = "Option::is_none")]
    pub io_error: Option<String>,
    #[serde(rename = "syntax-error", skip_serializing_if = "Option::is_none")]
    pub syntax_error: Option<String>,
    #[serde(rename = "validation-error", skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    #[serde(
        rename = "other-validation-error",
        skip_serializing_if = "Option::is_none"
    )]
    pub other_validation_error: Option<String>,
}

impl XmlValidity {
    /// All stages pending.
    pub fn pending(mets: &str) -> Self {
        Self {
            mets: mets.to_string(),
            encoding_ok: None,
            io_ok: None,
            well_formed: None,
            valid: None,
            encoding_error: None,
            io_error: None,
            syntax_error: None,
            validation_error: None,
            other_validation_error: None,
        }
    }

    /// Read, decoded, and parsed; schema assessment still pending.
    pub fn parsed(mets: &str) -> Self {
        Self {
            io_ok: Some(true),
            encoding_ok: Some(true),
            well_formed: Some(true),
            ..Self::pending(mets)
        }
    }

    /// True when any stage explicitly failed.
    pub fn is_rejected(&self) -> bool {
        [self.encoding_ok, self.io_ok, self.well_formed, self.valid]
            .iter()
            .any(|flag| *flag == Some(false))
    }
}

/// Everything wrong with one package. Serialized under the manifest path as
/// one diagnostic log entry; empty collections stay off the wire.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManifestFindings {
    #[serde(rename = "validation errors", skip_serializing_if = "Option::is_none")]
    pub validation: Option<XmlValidity>,
    #[serde(
        rename = "files in mets not in package",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub files_missing_on_disk: Vec<String>,
    #[serde(
        rename = "files in package not in mets",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub files_not_in_mets: Vec<String>,
    #[serde(
        rename = "missing derivatives in structMap",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub missing_derivatives: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(
        rename = "missing technical metadata",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub missing_tech_md: BTreeMap<String, Option<String>>,
}

impl ManifestFindings {
    pub fn is_clean(&self) -> bool {
        self.validation.is_none()
            && self.files_missing_on_disk.is_empty()
            && self.files_not_in_mets.is_empty()
            && self.missing_derivatives.is_empty()
            && self.missing_tech_md.is_empty()
    }
}

/// One summary CSV row. Check columns are tri-state: `None` renders blank
/// for checks that never ran.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub mets: String,
    pub valid: bool,
    pub metadata: BTreeMap<String, String>,
    pub page_count: Option<usize>,
    pub mets_files_present: Option<bool>,
    pub package_files_declared: Option<bool>,
    pub derivatives_complete: Option<bool>,
    pub tech_md_complete: Option<bool>,
}

impl SummaryRow {
    pub fn new(mets: &str, valid: bool) -> Self {
        Self {
            mets: mets.to_string(),
            valid,
            metadata: BTreeMap::new(),
            page_count: None,
            mets_files_present: None,
            package_files_declared: None,
            derivatives_complete: None,
            tech_md_complete: None,
        }
    }

    /// Metadata cell for a path-shaped column. A `[1]` column falls back to
    /// the unindexed key so a lone element still fills its first column.
    fn metadata_cell(&self, column: &str) -> &str {
        if let Some(value) = self.metadata.get(column) {
            return value;
        }
        if column.contains("[1]") {
            let unindexed = column.replace("[1]", "");
            if let Some(value) = self.metadata.get(&unindexed) {
                return value;
            }
        }
        ""
    }

    /// The row's cells in [`SUMMARY_COLUMNS`] order.
    pub fn record(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(SUMMARY_COLUMNS.len());
        cells.push(self.mets.clone());
        cells.push(yes_no(Some(self.valid)));
        for column in &SUMMARY_COLUMNS[2..15] {
            cells.push(self.metadata_cell(column).to_string());
        }
        cells.push(
            self.page_count
                .map(|count| count.to_string())
                .unwrap_or_default(),
        );
        cells.push(yes_no(self.mets_files_present));
        cells.push(yes_no(self.package_files_declared));
        cells.push(yes_no(self.derivatives_complete));
        cells.push(yes_no(self.tech_md_complete));
        cells
    }
}

fn yes_no(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => String::new(),
    }
}

/// Full validation outcome for one package.
#[derive(Debug)]
pub struct PackageReport {
    pub mets: String,
    pub findings: ManifestFindings,
    pub summary: SummaryRow,
}

impl PackageReport {
    pub fn has_findings(&self) -> bool {
        !self.findings.is_clean()
    }
}

/// The two output files, owned for the lifetime of one batch run. Creation
/// truncates both and writes the CSV header, so a rerun replaces the
/// previous run's output entirely.
pub struct ReportSinks {
    log: BufWriter<File>,
    csv: csv::Writer<File>,
}

impl ReportSinks {
    pub fn create(log_path: &Path, csv_path: &Path) -> Result<Self> {
        let log = File::create(log_path)
            .with_context(|| format!("failed to create diagnostic log {}", log_path.display()))?;
        let mut csv = csv::Writer::from_path(csv_path)
            .with_context(|| format!("failed to create summary report {}", csv_path.display()))?;
        csv.write_record(SUMMARY_COLUMNS)
            .context("failed to write summary header")?;
        csv.flush().context("failed to flush summary header")?;
        Ok(Self {
            log: BufWriter::new(log),
            csv,
        })
    }

    /// Record one package: a log entry when there are findings, a summary
    /// row always. Flushed per package so a crash mid-batch loses nothing
    /// already checked.
    pub fn append(&mut self, report: &PackageReport) -> Result<()> {
        if report.has_findings() {
            let entry = BTreeMap::from([(report.mets.as_str(), &report.findings)]);
            serde_json::to_writer_pretty(&mut self.log, &entry)
                .context("failed to write diagnostic log entry")?;
            self.log.write_all(b"\n")?;
            self.log.flush()?;
        }
        self.csv
            .write_record(report.summary.record())
            .context("failed to append summary row")?;
        self.csv.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_validity_serializes_null_flags_without_errors() {
        let validity = XmlValidity::pending("batch/x_mets.xml");
        let json = serde_json::to_value(&validity).unwrap();
        assert_eq!(json["well-formed"], serde_json::Value::Null);
        assert_eq!(json["valid"], serde_json::Value::Null);
        assert!(json.get("syntax-error").is_none());
        assert!(json.get("io-error").is_none());
    }

    #[test]
    fn rejection_tracks_explicit_false_only() {
        let mut validity = XmlValidity::parsed("x");
        assert!(!validity.is_rejected());
        validity.valid = Some(false);
        assert!(validity.is_rejected());
        assert!(!XmlValidity::pending("x").is_rejected());
    }

    #[test]
    fn findings_serialize_under_legacy_keys() {
        let mut findings = ManifestFindings::default();
        findings.files_missing_on_disk.push("images/pdf/0001.pdf".to_string());
        findings.missing_tech_md.insert("0001_JPG".to_string(), None);
        let json = serde_json::to_value(&findings).unwrap();
        assert_eq!(
            json["files in mets not in package"][0],
            "images/pdf/0001.pdf"
        );
        assert_eq!(
            json["missing technical metadata"]["0001_JPG"],
            serde_json::Value::Null
        );
        assert!(json.get("files in package not in mets").is_none());
        assert!(json.get("missing derivatives in structMap").is_none());
    }

    #[test]
    fn clean_findings_are_detected() {
        assert!(ManifestFindings::default().is_clean());
        let mut findings = ManifestFindings::default();
        findings.validation = Some(XmlValidity::pending("x"));
        assert!(!findings.is_clean());
    }

    #[test]
    fn record_matches_column_layout() {
        let mut row = SummaryRow::new("batch/x_mets.xml", true);
        row.metadata.insert(
            "/mods:mods/mods:titleInfo/mods:title".to_string(),
            "The Daily Example".to_string(),
        );
        row.page_count = Some(4);
        row.mets_files_present = Some(true);
        row.package_files_declared = Some(false);

        let record = row.record();
        assert_eq!(record.len(), SUMMARY_COLUMNS.len());
        assert_eq!(record[0], "batch/x_mets.xml");
        assert_eq!(record[1], "Yes");
        assert_eq!(record[5], "The Daily Example");
        assert_eq!(record[15], "4");
        assert_eq!(record[16], "Yes");
        assert_eq!(record[17], "No");
        // Checks that never ran stay blank.
        assert_eq!(record[18], "");
        assert_eq!(record[19], "");
    }

    #[test]
    fn lone_identifier_fills_the_first_indexed_column() {
        let mut row = SummaryRow::new("x", true);
        row.metadata.insert(
            "/mods:mods/mods:identifier".to_string(),
            "sn0001".to_string(),
        );
        let record = row.record();
        assert_eq!(record[11], "sn0001");
        assert_eq!(record[12], "");
    }

    #[test]
    fn invalid_row_is_otherwise_blank() {
        let record = SummaryRow::new("bad_mets.xml", false).record();
        assert_eq!(record[0], "bad_mets.xml");
        assert_eq!(record[1], "No");
        assert!(record[2..].iter().all(String::is_empty));
    }

    #[test]
    fn sinks_write_header_log_entries_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("output.log");
        let csv_path = dir.path().join("report.csv");

        let mut sinks = ReportSinks::create(&log_path, &csv_path).unwrap();

        let clean = PackageReport {
            mets: "a_mets.xml".to_string(),
            findings: ManifestFindings::default(),
            summary: SummaryRow::new("a_mets.xml", true),
        };
        sinks.append(&clean).unwrap();

        let mut findings = ManifestFindings::default();
        findings.files_not_in_mets.push("notes.txt".to_string());
        let flawed = PackageReport {
            mets: "b_mets.xml".to_string(),
            findings,
            summary: SummaryRow::new("b_mets.xml", true),
        };
        sinks.append(&flawed).unwrap();
        drop(sinks);

        let log = std::fs::read_to_string(&log_path).unwrap();
        assert!(!log.contains("a_mets.xml"));
        assert!(log.contains("b_mets.xml"));
        assert!(log.contains("files in package not in mets"));
        assert!(log.contains("notes.txt"));

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.len(), SUMMARY_COLUMNS.len());
        assert_eq!(&header[0], "METS filename");
        assert_eq!(&header[18], "Each page has PDF, JPG, and Alto");
        let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "a_mets.xml");
        assert_eq!(&rows[1][0], "b_mets.xml");
    }

    #[test]
    fn creation_truncates_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("output.log");
        let csv_path = dir.path().join("report.csv");
        std::fs::write(&log_path, "stale").unwrap();
        std::fs::write(&csv_path, "stale").unwrap();

        let sinks = ReportSinks::create(&log_path, &csv_path).unwrap();
        drop(sinks);

        assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "");
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("METS filename,"));
        assert!(!csv.contains("stale"));
    }
}
