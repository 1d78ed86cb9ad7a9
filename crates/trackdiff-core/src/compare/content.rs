//! Atom-level diff of two paired regions.

use super::atom::{AtomContent, ComparisonAtom, CorrelationStatus};
use super::context::CompareContext;
use crate::error::Result;
use crate::util::{correlate, CorrelatedSpan, SpanStatus};

/// Diffs `left` (original) against `right` (modified) and appends the
/// classified atoms to `out`.
///
/// Equal runs made only of separators that sit between two changes are
/// folded into the surrounding change, so a rewritten sentence does not
/// come out as alternating one-word revisions around every shared space.
/// When the unmatched share of the region exceeds `detail_threshold`, the
/// whole region becomes one deletion followed by one insertion.
pub(crate) fn diff_atoms(
    left: Vec<ComparisonAtom>,
    right: Vec<ComparisonAtom>,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    if left.is_empty() && right.is_empty() {
        return Ok(());
    }

    let spans = fold_separator_anchors(correlate(&left, &right), &left);
    let matched: usize = spans
        .iter()
        .filter(|s| s.status == SpanStatus::Equal)
        .map(|s| s.left.len())
        .sum();
    let total = left.len() + right.len();
    let unmatched = (total - 2 * matched) as f64 / total as f64;

    if matched > 0 && unmatched > ctx.settings.detail_threshold {
        tracing::debug!(
            unmatched,
            threshold = ctx.settings.detail_threshold,
            "region below detail threshold, reporting as replacement"
        );
        return replace_all(left, right, ctx, out);
    }

    let mut lefts = left.into_iter();
    let mut rights = right.into_iter();
    for span in spans {
        match span.status {
            SpanStatus::Equal => {
                for (original, modified) in lefts.by_ref().zip(rights.by_ref()).take(span.left.len()) {
                    push_equal(original, modified, out)?;
                }
            }
            SpanStatus::Deleted => {
                for atom in lefts.by_ref().take(span.left.len()) {
                    push_deleted(atom, ctx, out)?;
                }
            }
            SpanStatus::Inserted => {
                for atom in rights.by_ref().take(span.right.len()) {
                    push_inserted(atom, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Every original atom deleted, then every modified atom inserted.
pub(crate) fn replace_all(
    left: Vec<ComparisonAtom>,
    right: Vec<ComparisonAtom>,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    for atom in left {
        push_deleted(atom, ctx, out)?;
    }
    for atom in right {
        push_inserted(atom, out)?;
    }
    Ok(())
}

/// Keeps the modified atom, linked to its original counterpart.
pub(crate) fn push_equal(
    original: ComparisonAtom,
    mut modified: ComparisonAtom,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    modified.reclassify(CorrelationStatus::Equal)?;
    modified.counterpart = Some(original.as_counterpart());
    out.push(modified);
    Ok(())
}

/// Original atoms are re-homed into matched modified containers.
pub(crate) fn push_deleted(
    mut atom: ComparisonAtom,
    ctx: &CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    atom.ancestor_path = ctx.remap_path(&atom.ancestor_path);
    atom.reclassify(CorrelationStatus::Deleted)?;
    out.push(atom);
    Ok(())
}

pub(crate) fn push_inserted(mut atom: ComparisonAtom, out: &mut Vec<ComparisonAtom>) -> Result<()> {
    atom.reclassify(CorrelationStatus::Inserted)?;
    out.push(atom);
    Ok(())
}

fn is_separator_only(atoms: &[ComparisonAtom]) -> bool {
    atoms
        .iter()
        .all(|a| matches!(a.content, AtomContent::Text(_)) && !a.is_word())
}

/// Demotes separator-only Equal spans enclosed by changes on both sides and
/// merges the result so each change lists its deletions before its
/// insertions.
fn fold_separator_anchors(spans: Vec<CorrelatedSpan>, left: &[ComparisonAtom]) -> Vec<CorrelatedSpan> {
    let demote: Vec<bool> = (0..spans.len())
        .map(|i| {
            spans[i].status == SpanStatus::Equal
                && i > 0
                && i + 1 < spans.len()
                && spans[i - 1].status != SpanStatus::Equal
                && spans[i + 1].status != SpanStatus::Equal
                && is_separator_only(&left[spans[i].left.clone()])
        })
        .collect();

    let mut merged = Vec::with_capacity(spans.len());
    let mut pending: Option<(std::ops::Range<usize>, std::ops::Range<usize>)> = None;

    for (span, demoted) in spans.into_iter().zip(demote) {
        if span.status == SpanStatus::Equal && !demoted {
            flush(&mut pending, &mut merged);
            merged.push(span);
            continue;
        }
        pending = Some(match pending.take() {
            Some((l, r)) => (l.start..span.left.end, r.start..span.right.end),
            None => (span.left.clone(), span.right.clone()),
        });
    }
    flush(&mut pending, &mut merged);
    merged
}

fn flush(
    pending: &mut Option<(std::ops::Range<usize>, std::ops::Range<usize>)>,
    merged: &mut Vec<CorrelatedSpan>,
) {
    if let Some((l, r)) = pending.take() {
        if !l.is_empty() {
            merged.push(CorrelatedSpan::deleted(l.clone(), r.start));
        }
        if !r.is_empty() {
            merged.push(CorrelatedSpan::inserted(r, l.end));
        }
    }
}
