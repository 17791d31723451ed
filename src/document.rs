//! METS manifest access: UTF-8 decode, parse into an owned element tree, and
//! namespace-qualified path queries.
//!
//! The tree is built from `quick_xml::NsReader` events with namespaces
//! resolved up front, so downstream checks match on `(namespace URI, local
//! name)` pairs rather than prefixes. Queries evaluate a fixed subset of
//! path expressions: relative child steps `prefix:local`, optionally
//! constrained by one `[@ATTR="value"]` predicate, resolved against caller
//! supplied prefix bindings.

use std::fmt;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

/// METS container vocabulary.
pub const METS_NS: &str = "http://www.loc.gov/METS/";
/// XLink attribute vocabulary (file location pointers).
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
/// MODS descriptive-metadata vocabulary.
pub const MODS_NS: &str = "http://www.loc.gov/mods/v3";

/// The three prefix bindings every METS query in this crate resolves against.
pub const METS_BINDINGS: &[(&str, &str)] = &[
    ("mets", METS_NS),
    ("xlink", XLINK_NS),
    ("mods", MODS_NS),
];

/// Reverse lookup used when rendering element paths for reports.
pub fn prefix_for(uri: &str) -> Option<&'static str> {
    METS_BINDINGS
        .iter()
        .find(|(_, bound)| *bound == uri)
        .map(|(prefix, _)| *prefix)
}

/// Why a manifest could not be loaded. The three causes are reported
/// independently in the diagnostic log, so they are never merged here.
#[derive(Debug)]
pub enum ParseError {
    /// The file could not be read at all.
    Io(std::io::Error),
    /// The bytes are not valid UTF-8.
    Encoding(std::str::Utf8Error),
    /// The content is not well-formed XML.
    Syntax(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(err) => write!(f, "I/O error: {err}"),
            ParseError::Encoding(err) => write!(f, "encoding error: {err}"),
            ParseError::Syntax(msg) => write!(f, "XML syntax error: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// A malformed or unresolvable query path. All paths in this crate are fixed
/// strings, so hitting this means a structural defect in the query itself and
/// is surfaced as a stage-local failure, never a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    UnknownPrefix(String),
    Malformed(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::UnknownPrefix(prefix) => {
                write!(f, "no namespace binding for prefix '{prefix}'")
            }
            QueryError::Malformed(path) => write!(f, "malformed query path '{path}'"),
        }
    }
}

impl std::error::Error for QueryError {}

/// One attribute with its namespace resolved. Unprefixed attributes carry no
/// namespace per the XML spec.
#[derive(Debug, Clone)]
pub struct XmlAttr {
    pub ns: Option<String>,
    pub local: String,
    pub value: String,
}

/// One element of the parsed tree, namespaces resolved, children in document
/// order. `text` concatenates the element's direct character data.
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub ns: Option<String>,
    pub local: String,
    pub attrs: Vec<XmlAttr>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    /// Value of an unprefixed attribute such as `ID` or `FILEID`.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.ns.is_none() && attr.local == local)
            .map(|attr| attr.value.as_str())
    }

    /// Value of a namespaced attribute such as `xlink:href`.
    pub fn attr_ns(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.ns.as_deref() == Some(ns) && attr.local == local)
            .map(|attr| attr.value.as_str())
    }

    /// All descendants matching `path`, evaluated step by step from this
    /// element's children.
    pub fn find_all<'a>(
        &'a self,
        path: &str,
        bindings: &[(&str, &str)],
    ) -> Result<Vec<&'a XmlElement>, QueryError> {
        let steps = parse_steps(path)?;
        let mut current: Vec<&XmlElement> = vec![self];
        for step in &steps {
            let uri = resolve_prefix(step.prefix, bindings)?;
            let mut next = Vec::new();
            for elem in current {
                for child in &elem.children {
                    if child.local == step.local
                        && child.ns.as_deref() == Some(uri)
                        && step
                            .predicate
                            .map_or(true, |(attr, want)| child.attr(attr) == Some(want))
                    {
                        next.push(child);
                    }
                }
            }
            current = next;
        }
        Ok(current)
    }

    /// First match for `path`, in document order.
    pub fn find_first<'a>(
        &'a self,
        path: &str,
        bindings: &[(&str, &str)],
    ) -> Result<Option<&'a XmlElement>, QueryError> {
        Ok(self.find_all(path, bindings)?.into_iter().next())
    }
}

/// A loaded manifest. Owned by one validation run; read-only after parse.
#[derive(Debug, Clone)]
pub struct MetsDocument {
    root: XmlElement,
}

impl MetsDocument {
    /// Read, decode, and parse a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let bytes = std::fs::read(path).map_err(ParseError::Io)?;
        let text = std::str::from_utf8(&bytes).map_err(ParseError::Encoding)?;
        Self::parse(text)
    }

    /// Parse a manifest from already-decoded text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_xml(text).map(|root| Self { root })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn find_all<'a>(
        &'a self,
        path: &str,
        bindings: &[(&str, &str)],
    ) -> Result<Vec<&'a XmlElement>, QueryError> {
        self.root.find_all(path, bindings)
    }

    pub fn find_first<'a>(
        &'a self,
        path: &str,
        bindings: &[(&str, &str)],
    ) -> Result<Option<&'a XmlElement>, QueryError> {
        self.root.find_first(path, bindings)
    }
}

/// Parse UTF-8 XML text into an element tree with resolved namespaces.
pub fn parse_xml(text: &str) -> Result<XmlElement, ParseError> {
    let mut reader = NsReader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(start))) => {
                let elem_ns = owned_namespace(ns);
                let elem = begin_element(&reader, elem_ns, &start)?;
                stack.push(elem);
            }
            Ok((ns, Event::Empty(start))) => {
                let elem_ns = owned_namespace(ns);
                let elem = begin_element(&reader, elem_ns, &start)?;
                close_element(&mut stack, &mut root, elem)?;
            }
            Ok((_, Event::End(_))) => match stack.pop() {
                Some(elem) => close_element(&mut stack, &mut root, elem)?,
                None => {
                    return Err(ParseError::Syntax(
                        "closing tag without a matching opening tag".to_string(),
                    ))
                }
            },
            Ok((_, Event::Text(text))) => {
                let value = text
                    .unescape()
                    .map_err(|err| syntax_error(&reader, &err))?;
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&value);
                }
            }
            Ok((_, Event::CData(data))) => {
                if let Some(open) = stack.last_mut() {
                    open.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(err) => return Err(syntax_error(&reader, &err)),
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Syntax(format!(
            "unexpected end of document inside <{}>",
            open.local
        )));
    }
    root.ok_or_else(|| ParseError::Syntax("document has no root element".to_string()))
}

fn owned_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn begin_element(
    reader: &NsReader<&[u8]>,
    ns: Option<String>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, ParseError> {
    let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|err| ParseError::Syntax(format!("malformed attribute: {err}")))?;
        if attr.key.as_namespace_binding().is_some() {
            // xmlns declarations define scope; they are not data attributes.
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::Syntax(format!("bad attribute value: {err}")))?
            .into_owned();
        let (attr_ns, attr_local) = reader.resolve_attribute(attr.key);
        attrs.push(XmlAttr {
            ns: owned_namespace(attr_ns),
            local: String::from_utf8_lossy(attr_local.as_ref()).into_owned(),
            value,
        });
    }
    Ok(XmlElement {
        ns,
        local,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn close_element(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    elem: XmlElement,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(elem),
        None => {
            if root.is_some() {
                return Err(ParseError::Syntax(
                    "document has more than one root element".to_string(),
                ));
            }
            *root = Some(elem);
        }
    }
    Ok(())
}

fn syntax_error(reader: &NsReader<&[u8]>, err: &dyn fmt::Display) -> ParseError {
    ParseError::Syntax(format!("{err} at byte {}", reader.buffer_position()))
}

struct Step<'a> {
    prefix: &'a str,
    local: &'a str,
    predicate: Option<(&'a str, &'a str)>,
}

fn parse_steps(path: &str) -> Result<Vec<Step<'_>>, QueryError> {
    let trimmed = path.strip_prefix("./").unwrap_or(path);
    let mut steps = Vec::new();
    for raw in trimmed.split('/') {
        if raw.is_empty() {
            return Err(QueryError::Malformed(path.to_string()));
        }
        let (name, predicate) = match raw.find('[') {
            Some(open) => {
                let inner = raw[open..]
                    .strip_prefix("[@")
                    .and_then(|rest| rest.strip_suffix("\"]"))
                    .ok_or_else(|| QueryError::Malformed(path.to_string()))?;
                let eq = inner
                    .find("=\"")
                    .ok_or_else(|| QueryError::Malformed(path.to_string()))?;
                (&raw[..open], Some((&inner[..eq], &inner[eq + 2..])))
            }
            None => (raw, None),
        };
        let (prefix, local) = name
            .split_once(':')
            .ok_or_else(|| QueryError::Malformed(path.to_string()))?;
        steps.push(Step {
            prefix,
            local,
            predicate,
        });
    }
    Ok(steps)
}

fn resolve_prefix<'a>(prefix: &str, bindings: &[(&str, &'a str)]) -> Result<&'a str, QueryError> {
    bindings
        .iter()
        .find(|(bound, _)| *bound == prefix)
        .map(|(_, uri)| *uri)
        .ok_or_else(|| QueryError::UnknownPrefix(prefix.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets xmlns="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink">
  <fileSec>
    <fileGrp ID="Outer">
      <fileGrp ID="Inner">
        <file ID="0001_JPG">
          <FLocat xlink:href="images/jpg/0001.jpg"/>
        </file>
        <file ID="0001_PDF">
          <FLocat xlink:href="images/pdf/0001.pdf"/>
        </file>
      </fileGrp>
    </fileGrp>
  </fileSec>
  <structMap>
    <div TYPE="issue"><div ID="P1"><fptr FILEID="0001_JPG"/></div></div>
  </structMap>
</mets>"#;

    #[test]
    fn parses_and_resolves_namespaces() {
        let doc = MetsDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.root().local, "mets");
        assert_eq!(doc.root().ns.as_deref(), Some(METS_NS));
    }

    #[test]
    fn find_all_follows_child_steps() {
        let doc = MetsDocument::parse(SAMPLE).unwrap();
        let files = doc
            .find_all("./mets:fileSec/mets:fileGrp/mets:fileGrp/mets:file", METS_BINDINGS)
            .unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].attr("ID"), Some("0001_JPG"));
    }

    #[test]
    fn predicate_narrows_matches() {
        let doc = MetsDocument::parse(SAMPLE).unwrap();
        let inner = doc
            .find_all(
                "./mets:fileSec/mets:fileGrp[@ID=\"Outer\"]/mets:fileGrp[@ID=\"Inner\"]/mets:file",
                METS_BINDINGS,
            )
            .unwrap();
        assert_eq!(inner.len(), 2);
        let none = doc
            .find_all("./mets:fileSec/mets:fileGrp[@ID=\"Nope\"]", METS_BINDINGS)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn namespaced_attributes_resolve() {
        let doc = MetsDocument::parse(SAMPLE).unwrap();
        let locat = doc
            .find_first(
                "./mets:fileSec/mets:fileGrp/mets:fileGrp/mets:file/mets:FLocat",
                METS_BINDINGS,
            )
            .unwrap()
            .unwrap();
        assert_eq!(locat.attr_ns(XLINK_NS, "href"), Some("images/jpg/0001.jpg"));
        assert_eq!(locat.attr("href"), None);
    }

    #[test]
    fn text_is_unescaped() {
        let doc = MetsDocument::parse(
            r#"<mets xmlns="http://www.loc.gov/METS/"><metsHdr><agent><name>Smith &amp; Sons</name></agent></metsHdr></mets>"#,
        )
        .unwrap();
        let name = doc
            .find_first("./mets:metsHdr/mets:agent/mets:name", METS_BINDINGS)
            .unwrap()
            .unwrap();
        assert_eq!(name.text, "Smith & Sons");
    }

    #[test]
    fn missing_closing_tag_is_a_syntax_error() {
        let err = MetsDocument::parse(r#"<mets xmlns="http://www.loc.gov/METS/"><fileSec>"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn mismatched_end_tag_is_a_syntax_error() {
        let err = MetsDocument::parse("<a><b></a></b>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn second_root_element_is_rejected() {
        let err = MetsDocument::parse("<a/><b/>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_mets.xml");
        std::fs::write(&path, [0x3c, 0x61, 0xff, 0xfe, 0x3e]).unwrap();
        let err = MetsDocument::load(&path).unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = MetsDocument::load(Path::new("/nonexistent/x_mets.xml")).unwrap_err();
        assert!(matches!(err, ParseError::Io(_)));
    }

    #[test]
    fn unknown_prefix_is_reported() {
        let doc = MetsDocument::parse(SAMPLE).unwrap();
        let err = doc.find_all("./foo:bar", METS_BINDINGS).unwrap_err();
        assert_eq!(err, QueryError::UnknownPrefix("foo".to_string()));
    }

    #[test]
    fn step_without_prefix_is_malformed() {
        let doc = MetsDocument::parse(SAMPLE).unwrap();
        let err = doc.find_all("./fileSec", METS_BINDINGS).unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }
}
