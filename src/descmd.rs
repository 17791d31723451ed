//! Descriptive metadata harvest: flatten the `metsHdr` and MODS subtrees
//! into path-keyed text values for the summary report.
//!
//! Keys mirror the element's position, e.g.
//! `/mets:metsHdr/mets:agent[2]/mets:name`. A positional index appears only
//! when the element has same-named siblings, so a lone `mods:identifier`
//! keys as `/mods:mods/mods:identifier` while three of them key as
//! `[1]`..`[3]`. Only elements with non-blank text contribute a value.

use std::collections::BTreeMap;

use crate::document::{prefix_for, MetsDocument, XmlElement, METS_BINDINGS};

const METS_HDR: &str = "./mets:metsHdr";
const MODS_ROOT: &str = "./mets:dmdSec/mets:mdWrap/mets:xmlData/mods:mods";

/// Collect every non-blank text value under the header and MODS subtrees,
/// keyed by qualified path. Missing subtrees simply contribute nothing.
pub fn descriptive_metadata(doc: &MetsDocument) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for subtree in [METS_HDR, MODS_ROOT] {
        if let Ok(Some(elem)) = doc.find_first(subtree, METS_BINDINGS) {
            flatten(elem, &format!("/{}", qualified(elem)), &mut values);
        }
    }
    values
}

fn flatten(elem: &XmlElement, path: &str, values: &mut BTreeMap<String, String>) {
    let text = elem.text.trim();
    if !text.is_empty() {
        values.insert(path.to_string(), text.to_string());
    }
    for (index, child) in elem.children.iter().enumerate() {
        let step = match sibling_position(elem, index) {
            Some(position) => format!("{}[{}]", qualified(child), position),
            None => qualified(child),
        };
        flatten(child, &format!("{path}/{step}"), values);
    }
}

/// 1-based position among same-named siblings, or `None` when the child has
/// no same-named sibling.
fn sibling_position(parent: &XmlElement, index: usize) -> Option<usize> {
    let child = &parent.children[index];
    let same: Vec<usize> = parent
        .children
        .iter()
        .enumerate()
        .filter(|(_, sibling)| sibling.local == child.local && sibling.ns == child.ns)
        .map(|(position, _)| position)
        .collect();
    if same.len() < 2 {
        return None;
    }
    same.iter().position(|&position| position == index).map(|found| found + 1)
}

fn qualified(elem: &XmlElement) -> String {
    match elem.ns.as_deref().and_then(prefix_for) {
        Some(prefix) => format!("{prefix}:{}", elem.local),
        None => elem.local.clone(),
    }
}
