//! Page derivative tracking: which of the three expected renditions (PDF,
//! JPG, ALTO) each structMap page actually points at, and name inference for
//! the ones it is missing.
//!
//! Inference never invents paths from thin air. It rewrites the ID and path
//! of a resolved sibling rendition on the same page, following the naming
//! conventions of digitized newspaper batches (`images/pdf/`, `images/jpg/`,
//! `alto/`). When no sibling is usable, a fixed placeholder marks the gap.

use std::collections::BTreeMap;
use std::fmt;

use crate::document::{MetsDocument, QueryError, METS_BINDINGS};
use crate::registry::FileRegistry;

use DerivKind::{Alto, Jpg, Pdf};

const PAGE_DIVS: &str = "./mets:structMap/mets:div/mets:div";
const PAGE_POINTERS: &str = "./mets:fptr";

/// One of the three expected renditions of a newspaper page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DerivKind {
    Pdf,
    Jpg,
    Alto,
}

impl DerivKind {
    /// Classification priority order. A file ID containing more than one
    /// token is classified by the first match.
    pub const ALL: [DerivKind; 3] = [Pdf, Jpg, Alto];

    /// The substring that marks a file ID as this kind.
    pub fn token(self) -> &'static str {
        match self {
            Pdf => "PDF",
            Jpg => "JPG",
            Alto => "ALTO",
        }
    }

    /// Which siblings to rewrite from when this kind is missing, most
    /// preferred first.
    fn siblings(self) -> [DerivKind; 2] {
        match self {
            Pdf => [Jpg, Alto],
            Jpg => [Pdf, Alto],
            Alto => [Pdf, Jpg],
        }
    }
}

impl fmt::Display for DerivKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Classify a file ID by token substring, or `None` for pointers to
/// non-rendition files.
pub fn classify(file_id: &str) -> Option<DerivKind> {
    DerivKind::ALL
        .into_iter()
        .find(|kind| file_id.contains(kind.token()))
}

/// A page's pointer to one rendition. `file_path` is `None` when the pointer
/// names a file ID absent from the file registry.
#[derive(Debug, Clone)]
pub struct DerivativeRef {
    pub file_id: String,
    pub file_path: Option<String>,
}

/// One page of the structMap with its classified rendition pointers.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub page_id: String,
    pub derivatives: BTreeMap<DerivKind, DerivativeRef>,
}

/// All pages of the issue, in structMap order.
#[derive(Debug, Clone, Default)]
pub struct PageMap {
    pub pages: Vec<PageRecord>,
}

impl PageMap {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Why the structMap could not be read from a well-formed manifest.
#[derive(Debug)]
pub enum StructMapError {
    /// A page `div` has no `ID` attribute.
    MissingPageId,
    /// An `fptr` has no `FILEID` attribute.
    MissingFileId { page_id: String },
    Query(QueryError),
}

impl fmt::Display for StructMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructMapError::MissingPageId => {
                write!(f, "page div in structMap has no ID attribute")
            }
            StructMapError::MissingFileId { page_id } => {
                write!(f, "fptr on page '{page_id}' has no FILEID attribute")
            }
            StructMapError::Query(err) => write!(f, "structMap query failed: {err}"),
        }
    }
}

impl std::error::Error for StructMapError {}

impl From<QueryError> for StructMapError {
    fn from(err: QueryError) -> Self {
        StructMapError::Query(err)
    }
}

/// Walk the structMap's page divs and classify every fptr, resolving file IDs
/// against the registry. Pointers that classify as no rendition kind are
/// ignored. When a page carries two pointers of the same kind the later one
/// wins.
pub fn build_page_map(
    doc: &MetsDocument,
    registry: &FileRegistry,
) -> Result<PageMap, StructMapError> {
    let mut pages = Vec::new();
    for div in doc.find_all(PAGE_DIVS, METS_BINDINGS)? {
        let page_id = div.attr("ID").ok_or(StructMapError::MissingPageId)?;
        let mut derivatives = BTreeMap::new();
        for fptr in div.find_all(PAGE_POINTERS, METS_BINDINGS)? {
            let file_id = fptr
                .attr("FILEID")
                .ok_or_else(|| StructMapError::MissingFileId {
                    page_id: page_id.to_string(),
                })?;
            if let Some(kind) = classify(file_id) {
                derivatives.insert(
                    kind,
                    DerivativeRef {
                        file_id: file_id.to_string(),
                        file_path: registry.path_for(file_id).map(str::to_string),
                    },
                );
            }
        }
        pages.push(PageRecord {
            page_id: page_id.to_string(),
            derivatives,
        });
    }
    Ok(PageMap { pages })
}

/// Rewrite a sibling's file ID into the missing kind's expected ID.
fn derive_id(file_id: &str, from: DerivKind, to: DerivKind) -> String {
    file_id.replace(from.token(), to.token())
}

/// Rewrite a sibling's path into the missing kind's expected path. Every
/// substitution replaces all occurrences.
fn derive_path(path: &str, from: DerivKind, to: DerivKind) -> String {
    match (from, to) {
        (Jpg, Pdf) => path.replace("jpg", "pdf"),
        (Alto, Pdf) => path.replace(".xml", ".pdf").replace("alto", "images/pdf"),
        (Pdf, Jpg) => path.replace("pdf", "jpg"),
        (Alto, Jpg) => path.replace(".xml", ".jpg").replace("alto", "images/jpg"),
        (Pdf, Alto) => path.replace(".pdf", ".xml").replace("images/pdf", "alto"),
        (Jpg, Alto) => path.replace(".jpg", ".xml").replace("images/jpg", "alto"),
        (Pdf, Pdf) | (Jpg, Jpg) | (Alto, Alto) => path.to_string(),
    }
}

fn placeholder(kind: DerivKind) -> (String, String) {
    (
        format!("unknown {} ID", kind.token()),
        format!("unknown {} filename", kind.token()),
    )
}

/// For every page, the renditions it is missing, as inferred ID to inferred
/// filename. A rendition counts as missing when the page has no pointer of
/// that kind or the pointer's file ID did not resolve in the registry. Pages
/// with all three renditions resolved do not appear.
pub fn missing_derivatives(page_map: &PageMap) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut missing = BTreeMap::new();
    for page in &page_map.pages {
        let mut page_missing = BTreeMap::new();
        for kind in DerivKind::ALL {
            let resolved = page
                .derivatives
                .get(&kind)
                .map_or(false, |deriv| deriv.file_path.is_some());
            if resolved {
                continue;
            }
            let sibling = kind.siblings().into_iter().find_map(|candidate| {
                page.derivatives.get(&candidate).and_then(|deriv| {
                    deriv
                        .file_path
                        .as_deref()
                        .map(|path| (candidate, deriv.file_id.as_str(), path))
                })
            });
            let (inferred_id, inferred_path) = match sibling {
                Some((from, sibling_id, sibling_path)) => (
                    derive_id(sibling_id, from, kind),
                    derive_path(sibling_path, from, kind),
                ),
                None => placeholder(kind),
            };
            page_missing.insert(inferred_id, inferred_path);
        }
        if !page_missing.is_empty() {
            missing.insert(page.page_id.clone(), page_missing);
        }
    }
    missing
}
