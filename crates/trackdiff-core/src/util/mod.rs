pub mod group;
pub mod lcs;
pub mod strings;

pub use group::group_adjacent_ranges;
pub use lcs::{correlate, CorrelatedSpan, Hashable, SpanStatus};
pub use strings::{comparison_key, needs_space_preserve, normalize_spaces};
