//! # mets-check
//!
//! Batch validator for digitized-newspaper delivery packages described by
//! METS manifests.
//!
//! A package is a folder holding one manifest (a file whose name contains
//! `_mets.xml`) plus the page renditions it describes: PDFs, JPG masters,
//! and ALTO OCR files. `metscheck` walks a batch root, validates every
//! package it finds, and writes two outputs per run: a diagnostic JSON log
//! of everything wrong and a one-row-per-package summary CSV.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────────────────────┐
//! │ discover │──▶│ document  │──▶│ checks                   │
//! │ *_mets.xml│  │ parse+NS  │   │ schema / files / pages   │
//! └──────────┘   └───────────┘   │ tech MD / descriptive MD │
//!                                └───────────┬──────────────┘
//!                                            ▼
//!                                ┌──────────────────────────┐
//!                                │ report                   │
//!                                │ output.log + report.csv  │
//!                                └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! metscheck /data/batch_0001            # validate every package under the root
//! metscheck /data/batch_0001 --schema schemas/mets.xsd
//! metscheck /data/batch_0001 --log out.log --report out.csv
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`discover`] | Manifest discovery under the batch root |
//! | [`document`] | XML parsing and namespace-qualified queries |
//! | [`schema`] | Schema assessment engine |
//! | [`registry`] | Declared file inventory (fileSec) |
//! | [`reconcile`] | Manifest-versus-disk file reconciliation |
//! | [`derivatives`] | Page rendition tracking and name inference |
//! | [`techmd`] | Technical metadata coverage for JPG masters |
//! | [`descmd`] | Descriptive metadata harvest for the summary |
//! | [`validate`] | Per-package validation pipeline |
//! | [`report`] | Diagnostic log and summary CSV sinks |

pub mod config;
pub mod derivatives;
pub mod descmd;
pub mod discover;
pub mod document;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod schema;
pub mod techmd;
pub mod validate;
