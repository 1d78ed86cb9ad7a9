//! Comparison atoms: the smallest units the content diff works on.

use super::formatting::{FormatDelta, Formatting};
use crate::error::{CompareError, Result};
use crate::tree::Unid;
use crate::util::Hashable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an atom.
///
/// Atoms start `Unknown`, are resolved to `Equal`, `Inserted` or `Deleted`
/// by the content diff, and may be reclassified once more: `Deleted` to
/// `MovedSource` and `Inserted` to `MovedDestination` by move detection, or
/// `Equal` to `FormatChanged` by format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CorrelationStatus {
    #[default]
    Unknown,
    Equal,
    Inserted,
    Deleted,
    MovedSource,
    MovedDestination,
    FormatChanged,
}

impl CorrelationStatus {
    /// Content that exists only in the original document.
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Deleted | Self::MovedSource)
    }

    /// Content that exists only in the modified document.
    pub fn is_addition(self) -> bool {
        matches!(self, Self::Inserted | Self::MovedDestination)
    }

    fn can_become(self, next: Self) -> bool {
        use CorrelationStatus::*;
        matches!(
            (self, next),
            (Unknown, Equal | Inserted | Deleted)
                | (Deleted, MovedSource)
                | (Inserted, MovedDestination)
                | (Equal, FormatChanged)
        )
    }
}

impl fmt::Display for CorrelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What an atom stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomContent {
    /// A word or a single separator character.
    Text(String),
    /// An indivisible element such as a break, tab or drawing; `key` is a
    /// digest of its subtree.
    Leaf { tag: String, key: String },
    /// The end of a paragraph.
    ParagraphMark,
    /// Stands in for a table, row or cell with no content, so the container
    /// survives reconstruction.
    EmptyContainer { tag: String },
}

impl AtomContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            AtomContent::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_paragraph_mark(&self) -> bool {
        matches!(self, AtomContent::ParagraphMark)
    }

    pub fn is_empty_container(&self) -> bool {
        matches!(self, AtomContent::EmptyContainer { .. })
    }
}

/// The matching atom from the other document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterpart {
    pub content: AtomContent,
    pub formatting: Formatting,
    pub ancestor_path: Vec<Unid>,
}

/// Links the two halves of a move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveGroup {
    pub id: u32,
    pub name: String,
}

impl MoveGroup {
    pub fn new(id: u32) -> Self {
        Self { id, name: format!("move{id}") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonAtom {
    pub content: AtomContent,
    /// Element ids from the document root down to the element holding this
    /// atom (the `t` for text, the leaf itself, or the paragraph for a mark).
    pub ancestor_path: Vec<Unid>,
    pub formatting: Formatting,
    pub status: CorrelationStatus,
    pub counterpart: Option<Counterpart>,
    pub move_group: Option<MoveGroup>,
    pub format_delta: Option<FormatDelta>,
    /// Comparison key: content folded per settings.
    pub(crate) key: String,
    /// Whether the atom counts as a word for move detection.
    pub(crate) is_word: bool,
}

impl ComparisonAtom {
    pub(crate) fn new(
        content: AtomContent,
        ancestor_path: Vec<Unid>,
        formatting: Formatting,
        key: String,
        is_word: bool,
    ) -> Self {
        Self {
            content,
            ancestor_path,
            formatting,
            status: CorrelationStatus::Unknown,
            counterpart: None,
            move_group: None,
            format_delta: None,
            key,
            is_word,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_word(&self) -> bool {
        self.is_word
    }

    pub fn text(&self) -> &str {
        self.content.text().unwrap_or_default()
    }

    /// Applies a status transition, rejecting anything that is not a single
    /// forward step of the status lifecycle.
    pub fn reclassify(&mut self, next: CorrelationStatus) -> Result<()> {
        if !self.status.can_become(next) {
            return Err(CompareError::structural(format!(
                "illegal status transition {} -> {} for atom {:?}",
                self.status, next, self.content
            )));
        }
        self.status = next;
        Ok(())
    }

    pub(crate) fn as_counterpart(&self) -> Counterpart {
        Counterpart {
            content: self.content.clone(),
            formatting: self.formatting.clone(),
            ancestor_path: self.ancestor_path.clone(),
        }
    }
}

impl Hashable for ComparisonAtom {
    fn hash(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(text: &str) -> ComparisonAtom {
        ComparisonAtom::new(
            AtomContent::Text(text.to_string()),
            vec![Unid(1)],
            Formatting::new(),
            text.to_string(),
            true,
        )
    }

    #[test]
    fn lifecycle_allows_forward_steps() {
        let mut a = atom("fox");
        a.reclassify(CorrelationStatus::Deleted).unwrap();
        a.reclassify(CorrelationStatus::MovedSource).unwrap();
        assert_eq!(a.status, CorrelationStatus::MovedSource);
    }

    #[test]
    fn lifecycle_rejects_second_reclassification() {
        let mut a = atom("fox");
        a.reclassify(CorrelationStatus::Equal).unwrap();
        a.reclassify(CorrelationStatus::FormatChanged).unwrap();
        assert!(a.reclassify(CorrelationStatus::MovedSource).is_err());
    }

    #[test]
    fn lifecycle_rejects_crossing_passes() {
        let mut a = atom("fox");
        a.reclassify(CorrelationStatus::Equal).unwrap();
        assert!(a.reclassify(CorrelationStatus::MovedDestination).is_err());

        let mut b = atom("fox");
        b.reclassify(CorrelationStatus::Inserted).unwrap();
        assert!(b.reclassify(CorrelationStatus::FormatChanged).is_err());
    }

    #[test]
    fn move_group_names_follow_ids() {
        assert_eq!(MoveGroup::new(3).name, "move3");
    }

    #[test]
    fn status_sides() {
        assert!(CorrelationStatus::MovedSource.is_removal());
        assert!(CorrelationStatus::MovedDestination.is_addition());
    }
}
