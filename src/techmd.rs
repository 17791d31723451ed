//! Technical metadata coverage: every JPG master in the package must link,
//! via its `ADMID`, to a `techMD` record inside the `TECH_MD` amdSec.
//!
//! The check fails closed. A JPG entry with no `ADMID` at all counts as
//! uncovered rather than erroring out, since that is exactly the defect the
//! check exists to find.

use std::collections::BTreeSet;
use std::fmt;

use crate::document::{MetsDocument, QueryError, METS_BINDINGS};
use crate::registry::FileRegistry;

const JPG_FILES: &str =
    "./mets:fileSec/mets:fileGrp[@ID=\"ImageJpgGroup\"]/mets:fileGrp[@ID=\"JPGFiles\"]/mets:file";
const TECH_RECORDS: &str = "./mets:amdSec[@ID=\"TECH_MD\"]/mets:techMD";

/// Coverage verdict for one JPG file entry.
#[derive(Debug, Clone)]
pub struct TechMdStatus {
    pub file_id: String,
    /// The `ADMID` link, if the entry has one.
    pub adm_id: Option<String>,
    /// Declared path of the JPG, if the registry resolves the ID.
    pub file_path: Option<String>,
    /// Whether the `ADMID` names a `techMD` record that exists.
    pub covered: bool,
}

#[derive(Debug)]
pub enum TechMdError {
    /// A JPG `file` entry has no `ID` attribute.
    MissingId,
    Query(QueryError),
}

impl fmt::Display for TechMdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechMdError::MissingId => write!(f, "JPG file entry has no ID attribute"),
            TechMdError::Query(err) => write!(f, "technical metadata query failed: {err}"),
        }
    }
}

impl std::error::Error for TechMdError {}

impl From<QueryError> for TechMdError {
    fn from(err: QueryError) -> Self {
        TechMdError::Query(err)
    }
}

/// Check every JPG master against the declared techMD records.
pub fn check_technical_metadata(
    doc: &MetsDocument,
    registry: &FileRegistry,
) -> Result<Vec<TechMdStatus>, TechMdError> {
    let declared: BTreeSet<&str> = doc
        .find_all(TECH_RECORDS, METS_BINDINGS)?
        .into_iter()
        .filter_map(|tech| tech.attr("ID"))
        .collect();

    let mut statuses = Vec::new();
    for file in doc.find_all(JPG_FILES, METS_BINDINGS)? {
        let file_id = file.attr("ID").ok_or(TechMdError::MissingId)?;
        let adm_id = file.attr("ADMID");
        let covered = adm_id.map_or(false, |id| declared.contains(id));
        statuses.push(TechMdStatus {
            file_id: file_id.to_string(),
            adm_id: adm_id.map(str::to_string),
            file_path: registry.path_for(file_id).map(str::to_string),
            covered,
        });
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(amd_sec: &str, jpg_files: &str) -> MetsDocument {
        let text = format!(
            r#"<mets xmlns="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink">
  <amdSec ID="TECH_MD">{amd_sec}</amdSec>
  <fileSec>
    <fileGrp ID="ImageJpgGroup"><fileGrp ID="JPGFiles">{jpg_files}</fileGrp></fileGrp>
  </fileSec>
</mets>"#
        );
        MetsDocument::parse(&text).unwrap()
    }

    #[test]
    fn linked_jpg_is_covered() {
        let doc = manifest(
            r#"<techMD ID="TMD_0001"/>"#,
            r#"<file ID="0001_JPG" ADMID="TMD_0001"><FLocat xlink:href="images/jpg/0001.jpg"/></file>"#,
        );
        let registry = FileRegistry::from_pairs([("0001_JPG", "images/jpg/0001.jpg")]);
        let statuses = check_technical_metadata(&doc, &registry).unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].covered);
        assert_eq!(statuses[0].adm_id.as_deref(), Some("TMD_0001"));
        assert_eq!(statuses[0].file_path.as_deref(), Some("images/jpg/0001.jpg"));
    }

    #[test]
    fn dangling_admid_is_uncovered() {
        let doc = manifest(
            r#"<techMD ID="TMD_0001"/>"#,
            r#"<file ID="0002_JPG" ADMID="TMD_9999"><FLocat xlink:href="images/jpg/0002.jpg"/></file>"#,
        );
        let statuses = check_technical_metadata(&doc, &FileRegistry::default()).unwrap();
        assert!(!statuses[0].covered);
        assert!(statuses[0].file_path.is_none());
    }

    #[test]
    fn missing_admid_is_uncovered_not_an_error() {
        let doc = manifest(
            r#"<techMD ID="TMD_0001"/>"#,
            r#"<file ID="0003_JPG"><FLocat xlink:href="images/jpg/0003.jpg"/></file>"#,
        );
        let statuses = check_technical_metadata(&doc, &FileRegistry::default()).unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].covered);
        assert!(statuses[0].adm_id.is_none());
    }

    #[test]
    fn other_amdsec_ids_do_not_count() {
        let doc = MetsDocument::parse(
            r#"<mets xmlns="http://www.loc.gov/METS/">
  <amdSec ID="RIGHTS_MD"><techMD ID="TMD_0001"/></amdSec>
  <fileSec>
    <fileGrp ID="ImageJpgGroup"><fileGrp ID="JPGFiles">
      <file ID="0001_JPG" ADMID="TMD_0001"/>
    </fileGrp></fileGrp>
  </fileSec>
</mets>"#,
        )
        .unwrap();
        let statuses = check_technical_metadata(&doc, &FileRegistry::default()).unwrap();
        assert!(!statuses[0].covered);
    }

    #[test]
    fn files_outside_the_jpg_group_are_ignored() {
        let doc = MetsDocument::parse(
            r#"<mets xmlns="http://www.loc.gov/METS/">
  <amdSec ID="TECH_MD"><techMD ID="TMD_0001"/></amdSec>
  <fileSec>
    <fileGrp ID="PdfGroup"><fileGrp ID="PDFFiles">
      <file ID="0001_PDF"/>
    </fileGrp></fileGrp>
  </fileSec>
</mets>"#,
        )
        .unwrap();
        let statuses = check_technical_metadata(&doc, &FileRegistry::default()).unwrap();
        assert!(statuses.is_empty());
    }

    #[test]
    fn jpg_without_id_fails() {
        let doc = manifest(r#"<techMD ID="TMD_0001"/>"#, r#"<file ADMID="TMD_0001"/>"#);
        assert!(matches!(
            check_technical_metadata(&doc, &FileRegistry::default()),
            Err(TechMdError::MissingId)
        ));
    }
}
