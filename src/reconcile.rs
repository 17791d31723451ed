//! Reconciliation between the manifest's declared files and the files that
//! actually sit in the package directory.
//!
//! Paths are compared in a canonical relative form: backslashes become
//! forward slashes and a leading `./` is stripped. Manifests written on
//! Windows therefore reconcile cleanly against packages read on Unix.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::registry::FileRegistry;

/// Canonical relative form of a package path.
pub fn canonical_rel(path: &str) -> String {
    let forward = path.replace('\\', "/");
    let stripped = forward.strip_prefix("./").unwrap_or(&forward);
    stripped.to_string()
}

/// Every regular file in the package directory, relative to the manifest's
/// parent directory, canonicalized and sorted. The manifest itself is not a
/// package file and is excluded.
pub fn package_files(mets_path: &Path) -> io::Result<Vec<String>> {
    let root = mets_path.parent().unwrap_or_else(|| Path::new("."));
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path() == mets_path {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or_else(|_| entry.path());
        files.push(canonical_rel(&rel.to_string_lossy()));
    }
    files.sort();
    Ok(files)
}

/// For each declared path: is it present on disk? Keys are canonical paths
/// in sorted order.
pub fn mets_to_disk(registry: &FileRegistry, package: &[String]) -> BTreeMap<String, bool> {
    let on_disk: BTreeSet<&str> = package.iter().map(String::as_str).collect();
    registry
        .declared_paths()
        .map(|declared| {
            let canonical = canonical_rel(declared);
            let present = on_disk.contains(canonical.as_str());
            (canonical, present)
        })
        .collect()
}

/// For each file on disk: is it declared in the manifest? Keys are canonical
/// paths in sorted order.
pub fn disk_to_mets(registry: &FileRegistry, package: &[String]) -> BTreeMap<String, bool> {
    let declared: BTreeSet<String> = registry.declared_paths().map(canonical_rel).collect();
    package
        .iter()
        .map(|path| (path.clone(), declared.contains(path)))
        .collect()
}

/// Paths whose status flag is `false`, in sorted order.
pub fn absent_paths(statuses: &BTreeMap<String, bool>) -> Vec<String> {
    statuses
        .iter()
        .filter(|(_, present)| !**present)
        .map(|(path, _)| path.clone())
        .collect()
}
