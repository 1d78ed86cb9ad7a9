//! Block correlation.
//!
//! Blocks are aligned by content hash first. The blocks left over between
//! two hash matches form a gap; inside a gap, blocks of the same kind are
//! paired by word similarity and diffed recursively (paragraphs by atoms,
//! tables by rows and cells). Unpaired blocks are deleted or inserted whole.

use super::atom::ComparisonAtom;
use super::block::{build_blocks, Block, BlockKind};
use super::content::{diff_atoms, push_deleted, push_equal, push_inserted};
use super::context::CompareContext;
use super::normalize::NormalizedTree;
use crate::error::Result;
use crate::util::{correlate, SpanStatus};
use std::collections::BTreeSet;

/// Blocks below this word-set similarity are never paired.
pub const MIN_PAIRING_SIMILARITY: f64 = 0.25;

/// Two tables that both have at least this many rows may be aligned by row
/// content.
pub const LARGE_TABLE_ROWS: usize = 7;

/// Share of mismatched positional row pairs above which a large table is
/// aligned by row content instead of position.
pub const ROW_DIVERGENCE_LIMIT: f64 = 0.5;

/// One step of a gap alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Pair(usize, usize),
    Left(usize),
    Right(usize),
}

/// Correlates the two normalized documents into one atom stream in
/// modified-document order.
pub(crate) fn correlate_documents(
    original: &NormalizedTree,
    modified: &NormalizedTree,
    ctx: &mut CompareContext,
) -> Result<Vec<ComparisonAtom>> {
    let mut out = Vec::new();
    let (Some(left_container), Some(right_container)) =
        (original.block_container(), modified.block_container())
    else {
        return Ok(out);
    };

    // The document root and body are always rebuilt from the modified tree.
    let left_path = original.path_to(left_container);
    let right_path = modified.path_to(right_container);
    for (from, to) in left_path.iter().zip(&right_path) {
        ctx.alias(*from, *to);
    }

    let left = build_blocks(original, left_container, ctx.settings);
    let right = build_blocks(modified, right_container, ctx.settings);
    ctx.stats.original_blocks = left.len();
    ctx.stats.modified_blocks = right.len();

    correlate_blocks(left, right, true, ctx, &mut out)?;
    Ok(out)
}

fn correlate_blocks(
    left: Vec<Block>,
    right: Vec<Block>,
    top_level: bool,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    let spans = correlate(&left, &right);

    if top_level && !left.is_empty() && !right.is_empty()
        && spans.iter().all(|s| s.status != SpanStatus::Equal)
    {
        tracing::warn!(
            original = left.len(),
            modified = right.len(),
            "no block matched by content; falling back to similarity pairing"
        );
        ctx.stats.degenerate_fallback = true;
    }

    let mut left: Vec<Option<Block>> = left.into_iter().map(Some).collect();
    let mut right: Vec<Option<Block>> = right.into_iter().map(Some).collect();
    let mut gap_left = Vec::new();
    let mut gap_right = Vec::new();

    for span in spans {
        match span.status {
            SpanStatus::Equal => {
                flush_gap(&mut gap_left, &mut gap_right, ctx, out)?;
                for (i, j) in span.left.zip(span.right) {
                    if let (Some(o), Some(m)) = (left[i].take(), right[j].take()) {
                        emit_equal_block(o, m, ctx, out)?;
                    }
                }
            }
            SpanStatus::Deleted => gap_left.extend(span.left.filter_map(|i| left[i].take())),
            SpanStatus::Inserted => gap_right.extend(span.right.filter_map(|j| right[j].take())),
        }
    }
    flush_gap(&mut gap_left, &mut gap_right, ctx, out)
}

fn flush_gap(
    gap_left: &mut Vec<Block>,
    gap_right: &mut Vec<Block>,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    if gap_left.is_empty() && gap_right.is_empty() {
        return Ok(());
    }
    let left = std::mem::take(gap_left);
    let right = std::mem::take(gap_right);
    let steps = align_by_similarity(&left, &right);
    emit_steps(left, right, &steps, ctx, out)
}

fn emit_steps(
    left: Vec<Block>,
    right: Vec<Block>,
    steps: &[Step],
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    let mut left: Vec<Option<Block>> = left.into_iter().map(Some).collect();
    let mut right: Vec<Option<Block>> = right.into_iter().map(Some).collect();
    for step in steps {
        match *step {
            Step::Pair(i, j) => {
                if let (Some(o), Some(m)) = (left[i].take(), right[j].take()) {
                    emit_paired(o, m, ctx, out)?;
                }
            }
            Step::Left(i) => {
                if let Some(o) = left[i].take() {
                    emit_deleted_block(o, ctx, out)?;
                }
            }
            Step::Right(j) => {
                if let Some(m) = right[j].take() {
                    emit_inserted_block(m, out)?;
                }
            }
        }
    }
    Ok(())
}

fn emit_equal_block(
    original: Block,
    modified: Block,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    let left = original.into_atoms();
    let right = modified.into_atoms();
    if left.len() != right.len() {
        tracing::debug!("hash-equal blocks differ in atom count, diffing atoms");
        return diff_atoms(left, right, ctx, out);
    }
    ctx.stats.equal_blocks += 1;
    for (o, m) in left.into_iter().zip(right) {
        push_equal(o, m, out)?;
    }
    Ok(())
}

fn emit_deleted_block(block: Block, ctx: &CompareContext, out: &mut Vec<ComparisonAtom>) -> Result<()> {
    for atom in block.into_atoms() {
        push_deleted(atom, ctx, out)?;
    }
    Ok(())
}

fn emit_inserted_block(block: Block, out: &mut Vec<ComparisonAtom>) -> Result<()> {
    for atom in block.into_atoms() {
        push_inserted(atom, out)?;
    }
    Ok(())
}

/// Diffs two blocks of the same kind that were paired by similarity.
fn emit_paired(
    mut original: Block,
    mut modified: Block,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    if original.hash == modified.hash {
        return emit_equal_block(original, modified, ctx, out);
    }
    ctx.alias(original.unid, modified.unid);
    match modified.kind {
        BlockKind::Paragraph => emit_paragraph_pair(original, modified, ctx, out),
        BlockKind::Opaque => {
            emit_deleted_block(original, ctx, out)?;
            emit_inserted_block(modified, out)
        }
        kind => {
            emit_empty_markers(&mut original, &mut modified, ctx, out)?;
            match kind {
                BlockKind::Table => emit_table_pair(original, modified, ctx, out),
                BlockKind::Row => emit_row_pair(original, modified, ctx, out),
                _ => correlate_blocks(original.children, modified.children, false, ctx, out),
            }
        }
    }
}

/// Empty-container atoms of two paired containers, ahead of their children.
fn emit_empty_markers(
    original: &mut Block,
    modified: &mut Block,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    match (original.atoms.pop(), modified.atoms.pop()) {
        (Some(o), Some(m)) => push_equal(o, m, out),
        (Some(o), None) => push_deleted(o, ctx, out),
        (None, Some(m)) => push_inserted(m, out),
        (None, None) => Ok(()),
    }
}

/// Content diff of the paragraph body; the two marks always match.
fn emit_paragraph_pair(
    original: Block,
    modified: Block,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    let mut left = original.atoms;
    let mut right = modified.atoms;
    let left_mark = pop_mark(&mut left);
    let right_mark = pop_mark(&mut right);

    diff_atoms(left, right, ctx, out)?;
    match (left_mark, right_mark) {
        (Some(o), Some(m)) => push_equal(o, m, out),
        (Some(o), None) => push_deleted(o, ctx, out),
        (None, Some(m)) => push_inserted(m, out),
        (None, None) => Ok(()),
    }
}

fn pop_mark(atoms: &mut Vec<ComparisonAtom>) -> Option<ComparisonAtom> {
    if atoms.last().is_some_and(|a| a.content.is_paragraph_mark()) {
        atoms.pop()
    } else {
        None
    }
}

fn emit_table_pair(
    original: Block,
    modified: Block,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    let steps = align_rows(&original.children, &modified.children);
    emit_steps(original.children, modified.children, &steps, ctx, out)
}

/// Cells are paired by position; surplus cells are deleted or inserted.
fn emit_row_pair(
    original: Block,
    modified: Block,
    ctx: &mut CompareContext,
    out: &mut Vec<ComparisonAtom>,
) -> Result<()> {
    let mut left = original.children.into_iter();
    let mut right = modified.children.into_iter();
    loop {
        match (left.next(), right.next()) {
            (Some(o), Some(m)) => emit_paired(o, m, ctx, out)?,
            (Some(o), None) => emit_deleted_block(o, ctx, out)?,
            (None, Some(m)) => emit_inserted_block(m, out)?,
            (None, None) => return Ok(()),
        }
    }
}

/// Positional row alignment, switching to content alignment when both
/// tables are large and their rows were mostly inserted, deleted or
/// reordered.
fn align_rows(left: &[Block], right: &[Block]) -> Vec<Step> {
    if left.len().min(right.len()) < LARGE_TABLE_ROWS || !rows_diverge(left, right) {
        return positional(0..left.len(), 0..right.len());
    }

    let mut steps = Vec::new();
    let mut gap_left = Vec::new();
    let mut gap_right = Vec::new();
    for span in correlate(left, right) {
        match span.status {
            SpanStatus::Equal => {
                steps.extend(positional(std::mem::take(&mut gap_left), std::mem::take(&mut gap_right)));
                steps.extend(span.left.zip(span.right).map(|(i, j)| Step::Pair(i, j)));
            }
            SpanStatus::Deleted => gap_left.extend(span.left),
            SpanStatus::Inserted => gap_right.extend(span.right),
        }
    }
    steps.extend(positional(gap_left, gap_right));
    steps
}

fn rows_diverge(left: &[Block], right: &[Block]) -> bool {
    let longest = left.len().max(right.len());
    if longest == 0 {
        return false;
    }
    let matching = left.iter().zip(right).filter(|(o, m)| o.hash == m.hash).count();
    let mismatched = longest - matching;
    mismatched as f64 / longest as f64 > ROW_DIVERGENCE_LIMIT
}

fn positional(
    left: impl IntoIterator<Item = usize>,
    right: impl IntoIterator<Item = usize>,
) -> Vec<Step> {
    let mut left = left.into_iter();
    let mut right = right.into_iter();
    let mut steps = Vec::new();
    loop {
        match (left.next(), right.next()) {
            (Some(i), Some(j)) => steps.push(Step::Pair(i, j)),
            (Some(i), None) => steps.push(Step::Left(i)),
            (None, Some(j)) => steps.push(Step::Right(j)),
            (None, None) => return steps,
        }
    }
}

/// Similarity of two blocks, or `None` when they must not be paired.
fn similarity(left: &Block, right: &Block, left_words: &BTreeSet<&str>, right_words: &BTreeSet<&str>) -> Option<f64> {
    if left.kind != right.kind || left.kind == BlockKind::Opaque {
        return None;
    }
    let score = if left_words.is_empty() && right_words.is_empty() {
        1.0
    } else {
        jaccard(left_words, right_words)
    };
    (score >= MIN_PAIRING_SIMILARITY).then_some(score)
}

pub(crate) fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Monotone alignment maximizing the summed similarity of paired blocks.
///
/// Scores are scaled to integers so ties resolve the same way on every run;
/// on a tie the earliest pairing wins. Between two pairs, unpaired original
/// blocks come before unpaired modified blocks.
fn align_by_similarity(left: &[Block], right: &[Block]) -> Vec<Step> {
    let (n, m) = (left.len(), right.len());
    let left_words: Vec<_> = left.iter().map(Block::word_set).collect();
    let right_words: Vec<_> = right.iter().map(Block::word_set).collect();

    let mut score = vec![vec![None; m]; n];
    for i in 0..n {
        for j in 0..m {
            score[i][j] = similarity(&left[i], &right[j], &left_words[i], &right_words[j])
                .map(|s| (s * 1000.0).round() as u64 + 1);
        }
    }

    let mut best = vec![vec![0u64; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            let skip = best[i + 1][j].max(best[i][j + 1]);
            let take = score[i][j].map(|s| s + best[i + 1][j + 1]).unwrap_or(0);
            best[i][j] = skip.max(take);
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        match score[i][j] {
            Some(s) if s + best[i + 1][j + 1] == best[i][j] => {
                pairs.push((i, j));
                i += 1;
                j += 1;
            }
            _ if best[i + 1][j] >= best[i][j + 1] => i += 1,
            _ => j += 1,
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut next_left, mut next_right) = (0, 0);
    for (pi, pj) in pairs {
        steps.extend((next_left..pi).map(Step::Left));
        steps.extend((next_right..pj).map(Step::Right));
        steps.push(Step::Pair(pi, pj));
        next_left = pi + 1;
        next_right = pj + 1;
    }
    steps.extend((next_left..n).map(Step::Left));
    steps.extend((next_right..m).map(Step::Right));
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::atom::CorrelationStatus;
    use crate::compare::normalize::normalize;
    use crate::compare::settings::CompareSettings;
    use crate::xml::parse;

    fn run(original: &str, modified: &str, settings: &CompareSettings) -> (Vec<ComparisonAtom>, bool) {
        let mut ctx = CompareContext::new(settings);
        let o = normalize(&parse(original).unwrap(), &mut ctx).unwrap();
        let m = normalize(&parse(modified).unwrap(), &mut ctx).unwrap();
        let atoms = correlate_documents(&o, &m, &mut ctx).unwrap();
        (atoms, ctx.stats.degenerate_fallback)
    }

    fn para(text: &str) -> String {
        format!("<p><r><t xml:space=\"preserve\">{text}</t></r></p>")
    }

    fn doc(paras: &[&str]) -> String {
        let body: String = paras.iter().map(|p| para(p)).collect();
        format!("<document><body>{body}</body></document>")
    }

    #[test]
    fn identical_documents_are_all_equal() {
        let xml = doc(&["One two", "Three four"]);
        let (atoms, fallback) = run(&xml, &xml, &CompareSettings::default());
        assert!(atoms.iter().all(|a| a.status == CorrelationStatus::Equal));
        assert!(!fallback);
    }

    #[test]
    fn edited_paragraph_is_paired_and_diffed_by_word() {
        let (atoms, _) = run(
            &doc(&["Keep this", "The quick brown fox"]),
            &doc(&["Keep this", "The slow brown fox"]),
            &CompareSettings::default(),
        );
        let changed: Vec<_> = atoms
            .iter()
            .filter(|a| a.status != CorrelationStatus::Equal)
            .map(|a| (a.text(), a.status))
            .collect();
        assert_eq!(
            changed,
            vec![("quick", CorrelationStatus::Deleted), ("slow", CorrelationStatus::Inserted)]
        );
    }

    #[test]
    fn unrelated_paragraph_is_deleted_and_inserted_whole() {
        let (atoms, _) = run(
            &doc(&["Anchor text", "alpha beta gamma"]),
            &doc(&["Anchor text", "delta epsilon zeta"]),
            &CompareSettings::default(),
        );
        let deleted = atoms.iter().filter(|a| a.status == CorrelationStatus::Deleted).count();
        let inserted = atoms.iter().filter(|a| a.status == CorrelationStatus::Inserted).count();
        // five tokens plus the paragraph mark on each side
        assert_eq!(deleted, 6);
        assert_eq!(inserted, 6);
    }

    #[test]
    fn no_matching_block_sets_fallback_flag() {
        let (_, fallback) = run(
            &doc(&["alpha beta"]),
            &doc(&["alpha gamma"]),
            &CompareSettings::default(),
        );
        assert!(fallback);
    }

    #[test]
    fn jaccard_counts_distinct_words() {
        let a = jaccard(&["a", "b"].into_iter().collect(), &["a", "b", "c"].into_iter().collect());
        assert!((a - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn large_table_with_inserted_rows_aligns_by_content() {
        let rows: Vec<String> = (0..8).map(|i| format!("<tr><tc>{}</tc></tr>", para(&format!("row {i}")))).collect();
        let mut shifted = vec![format!("<tr><tc>{}</tc></tr>", para("new first row"))];
        shifted.extend(rows.iter().cloned());
        let original = format!("<document><body><tbl>{}</tbl></body></document>", rows.concat());
        let modified = format!("<document><body><tbl>{}</tbl></body></document>", shifted.concat());

        let (atoms, _) = run(&original, &modified, &CompareSettings::default());
        assert!(atoms.iter().all(|a| a.status != CorrelationStatus::Deleted));
        let inserted: String = atoms
            .iter()
            .filter(|a| a.status == CorrelationStatus::Inserted)
            .map(|a| a.text())
            .collect();
        assert_eq!(inserted, "new first row");
    }

    #[test]
    fn smaller_table_below_the_row_limit_stays_positional() {
        let rows: Vec<String> = (0..6).map(|i| format!("<tr><tc>{}</tc></tr>", para(&format!("row {i}")))).collect();
        let mut shifted = vec![format!("<tr><tc>{}</tc></tr>", para("new first row"))];
        shifted.extend(rows.iter().cloned());
        let original = format!("<document><body><tbl>{}</tbl></body></document>", rows.concat());
        let modified = format!("<document><body><tbl>{}</tbl></body></document>", shifted.concat());

        let (atoms, _) = run(&original, &modified, &CompareSettings::default());
        assert!(atoms.iter().any(|a| a.status == CorrelationStatus::Deleted));
    }

    #[test]
    fn empty_cell_pairs_with_filled_cell() {
        let table = |cell: &str| {
            format!(
                "<document><body>{}<tbl><tr><tc>{}</tc><tc>{cell}</tc></tr></tbl></body></document>",
                para("Anchor"),
                para("kept words")
            )
        };
        let (atoms, _) = run(&table(""), &table(&para("fresh")), &CompareSettings::default());
        let empty: Vec<_> = atoms.iter().filter(|a| a.content.is_empty_container()).collect();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].status, CorrelationStatus::Deleted);
        let inserted: String = atoms
            .iter()
            .filter(|a| a.status == CorrelationStatus::Inserted)
            .map(|a| a.text())
            .collect();
        assert_eq!(inserted, "fresh");
    }
}
