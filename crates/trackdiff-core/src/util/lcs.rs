//! Longest Common Subsequence alignment.
//!
//! [`correlate`] aligns two sequences of [`Hashable`] items and returns
//! index spans tagged Equal, Deleted or Inserted. It trims the common prefix
//! and suffix, then runs the classic O(n·m) dynamic program over the middle.
//! When a match is available the earliest one in document order is taken, so
//! the result is deterministic for equal-length alternatives.
//!
//! Regions whose table would exceed [`MAX_DP_CELLS`] fall back to recursive
//! longest-common-run matching, which needs only two rows of memory.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Largest DP table (in cells) built for one region.
pub const MAX_DP_CELLS: usize = 16_000_000;

/// Items compared by LCS expose a key; equal keys mean equal items.
pub trait Hashable {
    fn hash(&self) -> &str;
}

impl Hashable for String {
    fn hash(&self) -> &str {
        self
    }
}

impl Hashable for &str {
    fn hash(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Equal,
    Deleted,
    Inserted,
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanStatus::Equal => write!(f, "Equal"),
            SpanStatus::Deleted => write!(f, "Deleted"),
            SpanStatus::Inserted => write!(f, "Inserted"),
        }
    }
}

/// A run of the alignment. Equal spans have ranges of the same length on both
/// sides; Deleted spans have an empty right range and Inserted spans an empty
/// left range (positioned where the run sits in that sequence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatedSpan {
    pub status: SpanStatus,
    pub left: Range<usize>,
    pub right: Range<usize>,
}

impl CorrelatedSpan {
    pub fn equal(left: Range<usize>, right: Range<usize>) -> Self {
        Self { status: SpanStatus::Equal, left, right }
    }

    pub fn deleted(left: Range<usize>, at: usize) -> Self {
        Self { status: SpanStatus::Deleted, left, right: at..at }
    }

    pub fn inserted(right: Range<usize>, at: usize) -> Self {
        Self { status: SpanStatus::Inserted, left: at..at, right }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Match,
    Delete,
    Insert,
}

/// Aligns `left` against `right`.
///
/// Within a change, the Deleted span always precedes the Inserted span.
pub fn correlate<T: Hashable>(left: &[T], right: &[T]) -> Vec<CorrelatedSpan> {
    let (a, b) = intern(left, right);
    let ops = align_ops(&a, &b);
    spans_from_ops(&ops)
}

/// Maps keys to small integers so the inner loops compare `u32`s.
fn intern<T: Hashable>(left: &[T], right: &[T]) -> (Vec<u32>, Vec<u32>) {
    let mut ids: HashMap<&str, u32> = HashMap::new();
    let mut a = Vec::with_capacity(left.len());
    let mut b = Vec::with_capacity(right.len());
    for (items, out) in [(left, &mut a), (right, &mut b)] {
        for item in items {
            let next = ids.len() as u32;
            out.push(*ids.entry(item.hash()).or_insert(next));
        }
    }
    (a, b)
}

fn align_ops(a: &[u32], b: &[u32]) -> Vec<Op> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    #[cfg(feature = "trace")]
    tracing::trace!(prefix, suffix, left = mid_a.len(), right = mid_b.len(), "lcs region");

    let mut ops = Vec::with_capacity(a.len() + b.len());
    ops.extend(std::iter::repeat(Op::Match).take(prefix));
    if mid_a.len().saturating_mul(mid_b.len()) <= MAX_DP_CELLS {
        dp_ops(mid_a, mid_b, &mut ops);
    } else {
        tracing::debug!(
            left = mid_a.len(),
            right = mid_b.len(),
            "lcs region too large for dynamic program, using longest-run matching"
        );
        run_ops(mid_a, mid_b, &mut ops);
    }
    ops.extend(std::iter::repeat(Op::Match).take(suffix));
    ops
}

fn dp_ops(a: &[u32], b: &[u32], ops: &mut Vec<Op>) {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(Op::Match);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(Op::Delete);
            i += 1;
        } else {
            ops.push(Op::Insert);
            j += 1;
        }
    }
    ops.extend(std::iter::repeat(Op::Delete).take(n - i));
    ops.extend(std::iter::repeat(Op::Insert).take(m - j));
}

/// Recursive longest-common-run alignment for oversized regions.
fn run_ops(a: &[u32], b: &[u32], ops: &mut Vec<Op>) {
    match longest_common_run(a, b) {
        Some((i, j, len)) => {
            run_ops(&a[..i], &b[..j], ops);
            ops.extend(std::iter::repeat(Op::Match).take(len));
            run_ops(&a[i + len..], &b[j + len..], ops);
        }
        None => {
            ops.extend(std::iter::repeat(Op::Delete).take(a.len()));
            ops.extend(std::iter::repeat(Op::Insert).take(b.len()));
        }
    }
}

/// Longest contiguous run shared by both slices, earliest on ties.
fn longest_common_run(a: &[u32], b: &[u32]) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        for j in 0..b.len() {
            curr[j + 1] = if a[i] == b[j] { prev[j] + 1 } else { 0 };
            let len = curr[j + 1];
            if len > 0 && best.map_or(true, |(_, _, l)| len > l) {
                best = Some((i + 1 - len, j + 1 - len, len));
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

fn spans_from_ops(ops: &[Op]) -> Vec<CorrelatedSpan> {
    let mut spans = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let mut k = 0;
    while k < ops.len() {
        if ops[k] == Op::Match {
            let start = (i, j);
            while k < ops.len() && ops[k] == Op::Match {
                i += 1;
                j += 1;
                k += 1;
            }
            spans.push(CorrelatedSpan::equal(start.0..i, start.1..j));
            continue;
        }

        let (del_start, ins_start) = (i, j);
        while k < ops.len() && ops[k] != Op::Match {
            match ops[k] {
                Op::Delete => i += 1,
                _ => j += 1,
            }
            k += 1;
        }
        if i > del_start {
            spans.push(CorrelatedSpan::deleted(del_start..i, ins_start));
        }
        if j > ins_start {
            spans.push(CorrelatedSpan::inserted(ins_start..j, i));
        }
    }
    spans
}
