//! Generic document tree.
//!
//! A [`Document`] is an arena of [`DocumentNode`]s. Comparison never mutates
//! its inputs: the normalizer copies both trees and stamps every element with
//! a [`Unid`], a stable identifier that is unique across the pair.

pub mod arena;
pub mod node;
pub mod vocab;

pub use arena::Document;
pub use indextree::NodeId;
pub use node::{Attribute, DocumentNode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an element, assigned depth-first during normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Unid(pub u32);

impl fmt::Display for Unid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
