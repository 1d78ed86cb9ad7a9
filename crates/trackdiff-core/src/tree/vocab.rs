//! Structural vocabulary of document trees.
//!
//! Tags follow WordprocessingML local names so that annotated trees can be
//! written back as `w:`-prefixed markup without renaming.

use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const DOCUMENT: &str = "document";
pub const BODY: &str = "body";
pub const P: &str = "p";
pub const R: &str = "r";
pub const T: &str = "t";
pub const DEL_TEXT: &str = "delText";
pub const TBL: &str = "tbl";
pub const TR: &str = "tr";
pub const TC: &str = "tc";
pub const HYPERLINK: &str = "hyperlink";

pub const P_PR: &str = "pPr";
pub const R_PR: &str = "rPr";
pub const TBL_PR: &str = "tblPr";
pub const TBL_GRID: &str = "tblGrid";
pub const TR_PR: &str = "trPr";
pub const TC_PR: &str = "tcPr";
pub const SECT_PR: &str = "sectPr";

pub const INS: &str = "ins";
pub const DEL: &str = "del";
pub const MOVE_FROM: &str = "moveFrom";
pub const MOVE_TO: &str = "moveTo";
pub const MOVE_FROM_RANGE_START: &str = "moveFromRangeStart";
pub const MOVE_FROM_RANGE_END: &str = "moveFromRangeEnd";
pub const MOVE_TO_RANGE_START: &str = "moveToRangeStart";
pub const MOVE_TO_RANGE_END: &str = "moveToRangeEnd";
pub const R_PR_CHANGE: &str = "rPrChange";
pub const P_PR_CHANGE: &str = "pPrChange";
pub const CELL_INS: &str = "cellIns";
pub const CELL_DEL: &str = "cellDel";

pub const ATTR_ID: &str = "id";
pub const ATTR_AUTHOR: &str = "author";
pub const ATTR_DATE: &str = "date";
pub const ATTR_NAME: &str = "name";
pub const ATTR_VAL: &str = "val";
pub const ATTR_SPACE: &str = "xml:space";

/// Children that describe their parent rather than contribute content.
static PROPERTY_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [P_PR, R_PR, TBL_PR, TBL_GRID, TR_PR, TC_PR, SECT_PR, "tblPrEx", "sdtPr", "sdtEndPr"]
        .into_iter()
        .collect()
});

/// Nodes that never influence comparison and are dropped during normalization.
static IGNORED_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "proofErr",
        "lastRenderedPageBreak",
        "permStart",
        "permEnd",
        "bookmarkStart",
        "bookmarkEnd",
        MOVE_FROM_RANGE_START,
        MOVE_FROM_RANGE_END,
        MOVE_TO_RANGE_START,
        MOVE_TO_RANGE_END,
        R_PR_CHANGE,
        P_PR_CHANGE,
        "tblPrChange",
        "tblGridChange",
        "trPrChange",
        "tcPrChange",
        "sectPrChange",
        "numberingChange",
        CELL_INS,
        CELL_DEL,
    ]
    .into_iter()
    .collect()
});

/// Revision wrappers whose content is kept when an input is normalized.
static WRAPPER_TAGS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| [INS, DEL, MOVE_FROM, MOVE_TO].into_iter().collect());

pub fn is_property_container(tag: &str) -> bool {
    PROPERTY_TAGS.contains(tag)
}

pub fn is_ignored(tag: &str) -> bool {
    IGNORED_TAGS.contains(tag)
}

pub fn is_revision_wrapper(tag: &str) -> bool {
    WRAPPER_TAGS.contains(tag)
}

/// Inline containers that hold runs inside a paragraph.
pub fn is_inline_container(tag: &str) -> bool {
    matches!(tag, HYPERLINK | "smartTag" | "customXml" | "fldSimple")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_containers_are_recognized() {
        assert!(is_property_container("rPr"));
        assert!(is_property_container("tblGrid"));
        assert!(!is_property_container("r"));
    }

    #[test]
    fn revision_markers_are_ignored_but_wrappers_are_not() {
        assert!(is_ignored("rPrChange"));
        assert!(is_ignored("moveToRangeEnd"));
        assert!(!is_ignored("ins"));
        assert!(is_revision_wrapper("moveFrom"));
    }
}
