//! Revision wrapper vocabulary shared by the writer and the readers.

use crate::compare::CorrelationStatus;
use crate::tree::vocab;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Insertion,
    Deletion,
    MoveSource,
    MoveDestination,
    FormatChange,
}

impl RevisionKind {
    /// Revision produced by an atom with the given status, if any.
    pub fn from_status(status: CorrelationStatus) -> Option<Self> {
        match status {
            CorrelationStatus::Inserted => Some(Self::Insertion),
            CorrelationStatus::Deleted => Some(Self::Deletion),
            CorrelationStatus::MovedSource => Some(Self::MoveSource),
            CorrelationStatus::MovedDestination => Some(Self::MoveDestination),
            CorrelationStatus::FormatChanged => Some(Self::FormatChange),
            CorrelationStatus::Unknown | CorrelationStatus::Equal => None,
        }
    }

    /// Kind of a content wrapper or change marker element.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            vocab::INS => Some(Self::Insertion),
            vocab::DEL => Some(Self::Deletion),
            vocab::MOVE_FROM => Some(Self::MoveSource),
            vocab::MOVE_TO => Some(Self::MoveDestination),
            vocab::R_PR_CHANGE | vocab::P_PR_CHANGE => Some(Self::FormatChange),
            _ => None,
        }
    }

    /// Element wrapping inline content of this kind. Format changes are
    /// recorded inside property containers instead.
    pub fn wrapper_tag(self) -> Option<&'static str> {
        match self {
            Self::Insertion => Some(vocab::INS),
            Self::Deletion => Some(vocab::DEL),
            Self::MoveSource => Some(vocab::MOVE_FROM),
            Self::MoveDestination => Some(vocab::MOVE_TO),
            Self::FormatChange => None,
        }
    }

    /// Range markers bracketing a move wrapper.
    pub fn range_tags(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::MoveSource => Some((vocab::MOVE_FROM_RANGE_START, vocab::MOVE_FROM_RANGE_END)),
            Self::MoveDestination => Some((vocab::MOVE_TO_RANGE_START, vocab::MOVE_TO_RANGE_END)),
            _ => None,
        }
    }

    /// Content of this kind is absent from the modified document.
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Deletion | Self::MoveSource)
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insertion => "insertion",
            Self::Deletion => "deletion",
            Self::MoveSource => "move source",
            Self::MoveDestination => "move destination",
            Self::FormatChange => "format change",
        };
        f.write_str(name)
    }
}
