//! Schema assessment of METS manifests.
//!
//! Full XSD validation needs libxml2 bindings; this crate instead assesses
//! manifests against the schema's declared element vocabulary plus the
//! structural requirements every deliverable package must meet. The
//! [`SchemaEngine`] trait keeps the assessment pluggable so a stricter
//! engine can slot in without touching the validation pipeline.
//!
//! The vocabulary ships built in (METS 1.12) and can be replaced by pointing
//! the `schema.source` config at a local `.xsd` file or an http(s) URL.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::document::{parse_xml, MetsDocument, XmlElement, METS_NS};

/// Canonical location of the published METS schema.
pub const METS_XSD_URL: &str = "http://www.loc.gov/standards/mets/mets.xsd";

const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Element names the built-in METS 1.12 vocabulary declares.
const BUILTIN_ELEMENTS: &[&str] = &[
    "mets",
    "metsHdr",
    "agent",
    "name",
    "note",
    "altRecordID",
    "metsDocumentID",
    "dmdSec",
    "amdSec",
    "techMD",
    "rightsMD",
    "sourceMD",
    "digiprovMD",
    "mdRef",
    "mdWrap",
    "xmlData",
    "binData",
    "fileSec",
    "fileGrp",
    "file",
    "FLocat",
    "FContent",
    "stream",
    "transformFile",
    "structMap",
    "div",
    "mptr",
    "fptr",
    "par",
    "seq",
    "area",
    "structLink",
    "smLink",
    "smLinkGrp",
    "smLocatorLink",
    "smArcLink",
    "behaviorSec",
    "behavior",
    "interfaceDef",
    "mechanism",
];

/// Where to obtain the schema vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Builtin,
    File(PathBuf),
    Url(String),
}

impl SchemaSource {
    /// Interpret a config or CLI value: `builtin`, an http(s) URL, or a
    /// local file path.
    pub fn parse(value: &str) -> SchemaSource {
        if value == "builtin" {
            SchemaSource::Builtin
        } else if value.starts_with("http://") || value.starts_with("https://") {
            SchemaSource::Url(value.to_string())
        } else {
            SchemaSource::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Builtin => f.write_str("builtin"),
            SchemaSource::File(path) => write!(f, "{}", path.display()),
            SchemaSource::Url(url) => f.write_str(url),
        }
    }
}

/// Why a schema could not be obtained. Fatal for the whole batch run.
#[derive(Debug)]
pub enum SchemaError {
    Io(std::io::Error),
    Http(String),
    Xsd(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Io(err) => write!(f, "could not read schema file: {err}"),
            SchemaError::Http(err) => write!(f, "could not fetch schema: {err}"),
            SchemaError::Xsd(msg) => write!(f, "could not use schema: {msg}"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Outcome of one schema assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaVerdict {
    Valid,
    /// The manifest violates the schema; the string describes how.
    Invalid(String),
    /// The engine itself failed; the manifest's validity stays unknown and
    /// the package is reported as not valid.
    EngineFault(String),
}

/// A pluggable schema assessor.
pub trait SchemaEngine {
    fn assess(&self, doc: &MetsDocument) -> SchemaVerdict;
}

/// Vocabulary-and-structure assessor for METS manifests.
#[derive(Debug, Clone)]
pub struct MetsSchema {
    elements: BTreeSet<String>,
}

impl MetsSchema {
    /// The built-in METS 1.12 vocabulary.
    pub fn builtin() -> Self {
        Self {
            elements: BUILTIN_ELEMENTS.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Harvest the declared element names from XSD text.
    pub fn from_xsd(text: &str) -> Result<Self, SchemaError> {
        let root = parse_xml(text).map_err(|err| SchemaError::Xsd(err.to_string()))?;
        let mut elements = BTreeSet::new();
        collect_declared(&root, &mut elements);
        if elements.is_empty() {
            return Err(SchemaError::Xsd(
                "no element declarations found".to_string(),
            ));
        }
        Ok(Self { elements })
    }

    /// Obtain the schema from the configured source.
    pub fn load(source: &SchemaSource) -> Result<Self, SchemaError> {
        match source {
            SchemaSource::Builtin => Ok(Self::builtin()),
            SchemaSource::File(path) => {
                let text = std::fs::read_to_string(path).map_err(SchemaError::Io)?;
                Self::from_xsd(&text)
            }
            SchemaSource::Url(url) => {
                let text = reqwest::blocking::get(url)
                    .and_then(|response| response.error_for_status())
                    .and_then(|response| response.text())
                    .map_err(|err| SchemaError::Http(err.to_string()))?;
                Self::from_xsd(&text)
            }
        }
    }

    pub fn declares(&self, element: &str) -> bool {
        self.elements.contains(element)
    }
}

impl SchemaEngine for MetsSchema {
    fn assess(&self, doc: &MetsDocument) -> SchemaVerdict {
        let root = doc.root();
        let mut problems = Vec::new();

        if root.ns.as_deref() != Some(METS_NS) || root.local != "mets" {
            problems.push(format!(
                "document root is '{}', expected 'mets' in the METS namespace",
                root.local
            ));
        }

        let mut unknown = BTreeSet::new();
        collect_unknown(root, &self.elements, &mut unknown);
        for name in unknown {
            problems.push(format!("element '{name}' is not declared by the schema"));
        }

        let has_struct_map = root
            .children
            .iter()
            .any(|child| child.ns.as_deref() == Some(METS_NS) && child.local == "structMap");
        if !has_struct_map {
            problems.push("required element 'structMap' is missing".to_string());
        }

        if problems.is_empty() {
            SchemaVerdict::Valid
        } else {
            SchemaVerdict::Invalid(problems.join("; "))
        }
    }
}

fn collect_declared(elem: &XmlElement, elements: &mut BTreeSet<String>) {
    if elem.ns.as_deref() == Some(XSD_NS) && elem.local == "element" {
        if let Some(name) = elem.attr("name") {
            elements.insert(name.to_string());
        }
    }
    for child in &elem.children {
        collect_declared(child, elements);
    }
}

/// METS-namespace elements whose name the vocabulary does not declare.
/// Foreign-namespace content (MODS, MIX, ALTO) lives under the `xmlData`
/// extension point and is never checked against the METS vocabulary.
fn collect_unknown(elem: &XmlElement, elements: &BTreeSet<String>, unknown: &mut BTreeSet<String>) {
    if elem.ns.as_deref() == Some(METS_NS) && !elements.contains(&elem.local) {
        unknown.insert(elem.local.clone());
    }
    for child in &elem.children {
        collect_unknown(child, elements, unknown);
    }
}
