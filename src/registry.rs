//! File registry: the manifest's declared file inventory, keyed by file ID.
//!
//! METS newspaper packages nest two levels of `fileGrp` (format group, then
//! format files) under `fileSec`; each `file` entry carries an `ID` and one
//! `FLocat` whose `xlink:href` is the package-relative path.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

use crate::document::{MetsDocument, QueryError, METS_BINDINGS, XLINK_NS};

const FILE_ENTRIES: &str = "./mets:fileSec/mets:fileGrp/mets:fileGrp/mets:file";
const FILE_LOCATION: &str = "./mets:FLocat";

/// Why the registry could not be built from a well-formed manifest.
#[derive(Debug)]
pub enum RegistryError {
    /// A `file` entry has no `ID` attribute.
    MissingId,
    /// A `file` entry has no `FLocat` child.
    MissingLocation { file_id: String },
    /// A `FLocat` has no `xlink:href` attribute.
    MissingHref { file_id: String },
    Query(QueryError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::MissingId => write!(f, "file entry in fileSec has no ID attribute"),
            RegistryError::MissingLocation { file_id } => {
                write!(f, "file entry '{file_id}' has no FLocat location")
            }
            RegistryError::MissingHref { file_id } => {
                write!(f, "FLocat of file entry '{file_id}' has no xlink:href")
            }
            RegistryError::Query(err) => write!(f, "fileSec query failed: {err}"),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<QueryError> for RegistryError {
    fn from(err: QueryError) -> Self {
        RegistryError::Query(err)
    }
}

/// Declared file inventory, ID to package-relative path.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    by_id: BTreeMap<String, String>,
}

impl FileRegistry {
    /// Declared path for a file ID, as written in the manifest.
    pub fn path_for(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// All declared paths, in file-ID order.
    pub fn declared_paths(&self) -> impl Iterator<Item = &str> {
        self.by_id.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            by_id: pairs
                .into_iter()
                .map(|(id, path)| (id.into(), path.into()))
                .collect(),
        }
    }
}

/// Walk the manifest's fileSec and collect every declared file. Duplicate IDs
/// keep the later entry and log a warning.
pub fn build_registry(doc: &MetsDocument) -> Result<FileRegistry, RegistryError> {
    let mut by_id = BTreeMap::new();
    for file in doc.find_all(FILE_ENTRIES, METS_BINDINGS)? {
        let id = file.attr("ID").ok_or(RegistryError::MissingId)?;
        let locat = file
            .find_first(FILE_LOCATION, METS_BINDINGS)?
            .ok_or_else(|| RegistryError::MissingLocation {
                file_id: id.to_string(),
            })?;
        let href = locat
            .attr_ns(XLINK_NS, "href")
            .ok_or_else(|| RegistryError::MissingHref {
                file_id: id.to_string(),
            })?;
        if let Some(replaced) = by_id.insert(id.to_string(), href.to_string()) {
            warn!("duplicate file ID '{id}' in fileSec, keeping later entry (was '{replaced}')");
        }
    }
    Ok(FileRegistry { by_id })
}
