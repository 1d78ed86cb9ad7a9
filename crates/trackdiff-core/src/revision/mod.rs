//! Reading and resolving revision markup.
//!
//! These functions work on any annotated document, whether it came out of
//! [`compare`](crate::compare::compare) or was parsed from a file.

mod accept;
mod extract;
pub mod markup;

pub use accept::{accept_revisions, reject_revisions};
pub use extract::{count_revisions, extract_revisions, RevisionCounts, RevisionRecord};
pub use markup::RevisionKind;
