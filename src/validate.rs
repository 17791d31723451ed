//! Package validation pipeline: run every check against one manifest and
//! fold the outcomes into a [`PackageReport`].
//!
//! The pipeline never returns an error. A manifest that cannot be read or
//! parsed produces a report saying so; a check stage that fails leaves a
//! `check not run` entry in its own finding collection and the batch moves
//! on. Summary booleans are derived from the finding collections after all
//! stages, so a stage failure always surfaces as `No` in the matching
//! column, never as a silent `Yes`.
//!
//! A manifest rejected by the XML assessment (unreadable, malformed, or
//! schema-invalid) short-circuits: its summary row says `Valid METS: No`
//! and every other column stays blank.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::debug;

use crate::derivatives::{build_page_map, missing_derivatives};
use crate::descmd::descriptive_metadata;
use crate::document::{MetsDocument, ParseError};
use crate::reconcile::{absent_paths, disk_to_mets, mets_to_disk, package_files};
use crate::registry::build_registry;
use crate::report::{ManifestFindings, PackageReport, SummaryRow, XmlValidity};
use crate::schema::{SchemaEngine, SchemaVerdict};
use crate::techmd::check_technical_metadata;

/// Validate one package, identified by its manifest path.
pub fn validate_package(mets_path: &Path, schema: &dyn SchemaEngine) -> PackageReport {
    let mets = display_path(mets_path);
    let mut findings = ManifestFindings::default();
    debug!("validating {mets}");

    let doc = match MetsDocument::load(mets_path) {
        Ok(doc) => doc,
        Err(err) => {
            debug!("{mets}: rejected at load: {err}");
            findings.validation = Some(load_failure(&mets, &err));
            return PackageReport {
                summary: SummaryRow::new(&mets, false),
                mets,
                findings,
            };
        }
    };

    let mut validity = XmlValidity::parsed(&mets);
    match schema.assess(&doc) {
        SchemaVerdict::Valid => validity.valid = Some(true),
        SchemaVerdict::Invalid(msg) => {
            validity.valid = Some(false);
            validity.validation_error = Some(msg);
        }
        SchemaVerdict::EngineFault(msg) => {
            // An engine that cannot answer must not pass the manifest.
            validity.valid = Some(false);
            validity.other_validation_error = Some(msg);
        }
    }
    if validity.is_rejected() {
        debug!("{mets}: rejected by schema assessment");
        findings.validation = Some(validity);
        return PackageReport {
            summary: SummaryRow::new(&mets, false),
            mets,
            findings,
        };
    }

    let mut summary = SummaryRow::new(&mets, true);
    summary.metadata = descriptive_metadata(&doc);

    match build_registry(&doc) {
        Ok(registry) => {
            match package_files(mets_path) {
                Ok(package) => {
                    findings.files_missing_on_disk =
                        absent_paths(&mets_to_disk(&registry, &package));
                    findings.files_not_in_mets =
                        absent_paths(&disk_to_mets(&registry, &package));
                }
                Err(err) => {
                    let sentinel = check_not_run(&err);
                    findings.files_missing_on_disk.push(sentinel.clone());
                    findings.files_not_in_mets.push(sentinel);
                }
            }
            match build_page_map(&doc, &registry) {
                Ok(page_map) => {
                    summary.page_count = Some(page_map.page_count());
                    findings.missing_derivatives = missing_derivatives(&page_map);
                }
                Err(err) => {
                    findings
                        .missing_derivatives
                        .insert(check_not_run(&err), BTreeMap::new());
                }
            }
            match check_technical_metadata(&doc, &registry) {
                Ok(statuses) => {
                    findings.missing_tech_md = statuses
                        .into_iter()
                        .filter(|status| !status.covered)
                        .map(|status| (status.file_id, status.file_path))
                        .collect();
                }
                Err(err) => {
                    findings.missing_tech_md.insert(check_not_run(&err), None);
                }
            }
        }
        Err(err) => {
            // Every downstream check resolves file IDs through the registry.
            let sentinel = check_not_run(&err);
            findings.files_missing_on_disk.push(sentinel.clone());
            findings.files_not_in_mets.push(sentinel.clone());
            findings
                .missing_derivatives
                .insert(sentinel.clone(), BTreeMap::new());
            findings.missing_tech_md.insert(sentinel, None);
        }
    }

    summary.mets_files_present = Some(findings.files_missing_on_disk.is_empty());
    summary.package_files_declared = Some(findings.files_not_in_mets.is_empty());
    summary.derivatives_complete = Some(findings.missing_derivatives.is_empty());
    summary.tech_md_complete = Some(findings.missing_tech_md.is_empty());

    PackageReport {
        mets,
        findings,
        summary,
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn check_not_run(err: &dyn fmt::Display) -> String {
    format!("check not run: {err}")
}

fn load_failure(mets: &str, err: &ParseError) -> XmlValidity {
    let mut validity = XmlValidity::pending(mets);
    match err {
        ParseError::Io(cause) => {
            validity.io_ok = Some(false);
            validity.io_error = Some(cause.to_string());
        }
        ParseError::Encoding(cause) => {
            validity.io_ok = Some(true);
            validity.encoding_ok = Some(false);
            validity.encoding_error = Some(cause.to_string());
        }
        ParseError::Syntax(cause) => {
            validity.io_ok = Some(true);
            validity.encoding_ok = Some(true);
            validity.well_formed = Some(false);
            validity.syntax_error = Some(cause.clone());
        }
    }
    validity
}
