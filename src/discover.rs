//! Batch discovery: find every METS manifest under the root folder.
//!
//! A manifest is any regular file whose name contains `_mets.xml`. Matches
//! are returned in sorted path order so a batch always processes packages
//! in the same sequence. Unreadable directory entries are logged and
//! skipped rather than aborting the batch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::warn;
use walkdir::WalkDir;

/// The naming convention that marks a file as a METS manifest.
pub const MANIFEST_MARKER: &str = "_mets.xml";

/// Compile exclusion patterns into a glob set matched against paths
/// relative to the batch root.
pub fn build_exclusions(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid exclusion pattern '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("failed to compile exclusion patterns")
}

/// All manifests under `root`, sorted.
pub fn find_manifests(root: &Path, exclude: &GlobSet) -> Vec<PathBuf> {
    let mut manifests = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry under {}: {err}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().contains(MANIFEST_MARKER) {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or_else(|_| entry.path());
        if exclude.is_match(rel) {
            continue;
        }
        manifests.push(entry.path().to_path_buf());
    }
    manifests.sort();
    manifests
}
