pub mod compare;
pub mod error;
pub mod hash;
pub mod revision;
pub mod tree;
pub mod util;
pub mod xml;

pub use error::{CompareError, Result};

pub use compare::{compare, compare_detailed, CompareSettings, Comparison, ComparisonStats};
pub use revision::{
    accept_revisions, count_revisions, extract_revisions, reject_revisions, RevisionCounts, RevisionKind,
    RevisionRecord,
};
pub use tree::{Document, Unid};
