//! XML collaborator: converts WordprocessingML-style markup to and from
//! [`Document`](crate::tree::Document) trees.
//!
//! Parsing keeps local names for WordprocessingML and unqualified markup, and
//! the original prefix (with its `xmlns:` declaration) for anything else,
//! such as DrawingML inside a `drawing`. Serializing writes unprefixed
//! elements and their attributes under the `w:` prefix, which is what word
//! processors expect for the revision markup the comparer emits.

pub mod builder;
pub mod parser;

pub use builder::{serialize, serialize_bytes};
pub use parser::parse;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
