//! Flattened formatting snapshots.
//!
//! A [`Formatting`] is an ordered key/value map built from a run's `rPr` or a
//! paragraph's `pPr`. Keys use readable property names (`bold`, `size`,
//! `font`, ...); values are canonical strings so two snapshots can be compared
//! with `==` regardless of attribute order in the source markup.

use crate::tree::{vocab, Document, NodeId};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

static PROPERTY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("b", "bold"),
        ("bCs", "bold_complex"),
        ("i", "italic"),
        ("iCs", "italic_complex"),
        ("u", "underline"),
        ("sz", "size"),
        ("szCs", "size_complex"),
        ("rFonts", "font"),
        ("color", "color"),
        ("highlight", "highlight"),
        ("strike", "strike"),
        ("dstrike", "double_strike"),
        ("caps", "caps"),
        ("smallCaps", "small_caps"),
        ("vertAlign", "vertical_align"),
        ("vanish", "hidden"),
        ("shd", "shading"),
        ("rStyle", "style"),
        ("pStyle", "style"),
        ("jc", "alignment"),
        ("ind", "indent"),
        ("spacing", "spacing"),
        ("numPr", "numbering"),
        ("keepNext", "keep_next"),
        ("keepLines", "keep_lines"),
        ("rPr", "mark"),
    ]
    .into_iter()
    .collect()
});

/// On/off properties: an explicit false value is the same as absence.
static TOGGLE_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "b", "bCs", "i", "iCs", "strike", "dstrike", "caps", "smallCaps", "vanish", "emboss",
        "imprint", "outline", "shadow", "keepNext", "keepLines",
    ]
    .into_iter()
    .collect()
});

/// Revision-tracking records nested inside property containers.
static REVISION_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        vocab::R_PR_CHANGE,
        vocab::P_PR_CHANGE,
        vocab::INS,
        vocab::DEL,
        vocab::MOVE_FROM,
        vocab::MOVE_TO,
    ]
    .into_iter()
    .collect()
});

/// Readable name for a property tag; unknown tags keep their own name.
pub fn property_name(tag: &str) -> &str {
    PROPERTY_NAMES.get(tag).copied().unwrap_or(tag)
}

fn is_false_toggle(value: Option<&str>) -> bool {
    matches!(value, Some("0") | Some("false") | Some("off"))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formatting(BTreeMap<String, String>);

impl Formatting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Snapshot of the property container `props` (`rPr`, `pPr`, ...).
    pub fn from_properties(doc: &Document, props: NodeId) -> Self {
        let mut map = BTreeMap::new();
        for child in doc.element_children(props) {
            let Some(tag) = doc.tag(child) else { continue };
            if REVISION_KEYS.contains(tag) {
                continue;
            }
            let val = doc.attribute(child, vocab::ATTR_VAL);
            if TOGGLE_TAGS.contains(tag) {
                if !is_false_toggle(val) {
                    map.insert(property_name(tag).to_string(), "true".to_string());
                }
                continue;
            }
            map.insert(property_name(tag).to_string(), canonical_value(doc, child));
        }
        Self(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy without revision-tracking sub-properties.
    pub fn normalized(&self) -> Formatting {
        Formatting(
            self.0
                .iter()
                .filter(|(k, _)| !REVISION_KEYS.contains(k.as_str()) && !k.starts_with("rsid"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Copy without the given keys.
    pub fn without(&self, keys: &[&str]) -> Formatting {
        Formatting(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Stable one-line rendering, used for hashing and grouping.
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Formatting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Attribute values (sorted by name) followed by nested children, so
/// `<w:rFonts w:hAnsi="A" w:ascii="A"/>` and its reordering agree.
fn canonical_value(doc: &Document, node: NodeId) -> String {
    let Some(data) = doc.get(node) else {
        return String::new();
    };
    let mut attrs: Vec<_> = data
        .attributes()
        .iter()
        .filter(|a| !a.name.starts_with("rsid"))
        .collect();
    if attrs.len() == 1 && attrs[0].name == vocab::ATTR_VAL && doc.element_children(node).next().is_none() {
        return attrs[0].value.clone();
    }
    attrs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut parts: Vec<String> = attrs.iter().map(|a| a.to_string()).collect();
    let nested: Vec<String> = doc
        .element_children(node)
        .filter(|&c| !doc.tag(c).map(|t| REVISION_KEYS.contains(t)).unwrap_or(false))
        .map(|c| format!("{}{{{}}}", doc.tag(c).unwrap_or_default(), canonical_value(doc, c)))
        .collect();
    parts.extend(nested);
    if parts.is_empty() {
        "true".to_string()
    } else {
        parts.join(",")
    }
}

/// Old and new property sets of a formatting-only change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDelta {
    pub old: Formatting,
    pub new: Formatting,
    /// Keys present on one side only, or on both with different values.
    pub changed_property_names: Vec<String>,
}

impl FormatDelta {
    /// Delta between two snapshots after normalization, or `None` when they
    /// are equivalent.
    pub fn between(old: &Formatting, new: &Formatting) -> Option<FormatDelta> {
        let old = old.normalized();
        let new = new.normalized();
        if old == new {
            return None;
        }
        let mut changed: Vec<String> = old
            .0
            .iter()
            .filter(|(k, v)| new.0.get(*k) != Some(*v))
            .map(|(k, _)| k.clone())
            .collect();
        changed.extend(new.0.keys().filter(|k| !old.0.contains_key(*k)).cloned());
        changed.sort();
        Some(FormatDelta {
            old,
            new,
            changed_property_names: changed,
        })
    }

    pub fn signature(&self) -> String {
        format!("{}=>{}", self.old, self.new)
    }
}
