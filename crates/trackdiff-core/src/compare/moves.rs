//! Move detection.
//!
//! A move is a deleted run and an inserted run whose word sets are similar
//! enough. Runs are maximal stretches of consecutive atoms sharing the
//! status; each deleted run, in document order, claims the most similar
//! unclaimed inserted run.

use super::atom::{ComparisonAtom, CorrelationStatus};
use super::context::CompareContext;
use super::correlate::jaccard;
use crate::error::Result;
use crate::util::group_adjacent_ranges;
use std::collections::BTreeSet;
use std::ops::Range;

struct Run<'a> {
    range: Range<usize>,
    words: BTreeSet<&'a str>,
}

fn runs_with_status<'a>(
    atoms: &'a [ComparisonAtom],
    status: CorrelationStatus,
    min_words: usize,
) -> Vec<Run<'a>> {
    // Empty-container atoms hold no text and never join a run.
    group_adjacent_ranges(atoms, |a| (a.status, a.content.is_empty_container()))
        .into_iter()
        .filter(|&((s, empty), _)| s == status && !empty)
        .filter_map(|(_, range)| {
            let word_atoms: Vec<&str> = atoms[range.clone()]
                .iter()
                .filter(|a| a.is_word())
                .map(|a| a.key())
                .collect();
            if word_atoms.is_empty() || word_atoms.len() < min_words {
                return None;
            }
            Some(Run { range, words: word_atoms.into_iter().collect() })
        })
        .collect()
}

/// Reclassifies matching deleted/inserted runs as move pairs.
pub(crate) fn detect_moves(atoms: &mut [ComparisonAtom], ctx: &mut CompareContext) -> Result<()> {
    if !ctx.settings.detect_moves {
        return Ok(());
    }
    let threshold = ctx.settings.move_similarity_threshold;
    let min_words = ctx.settings.min_move_words();

    let matches: Vec<(Range<usize>, Range<usize>)> = {
        let sources = runs_with_status(atoms, CorrelationStatus::Deleted, min_words);
        let destinations = runs_with_status(atoms, CorrelationStatus::Inserted, min_words);
        let mut claimed = vec![false; destinations.len()];
        let mut matches = Vec::new();

        for source in &sources {
            let mut best: Option<(usize, f64)> = None;
            for (k, dest) in destinations.iter().enumerate() {
                if claimed[k] {
                    continue;
                }
                let score = jaccard(&source.words, &dest.words);
                if score >= threshold && best.map_or(true, |(_, b)| score > b) {
                    best = Some((k, score));
                }
            }
            if let Some((k, score)) = best {
                tracing::debug!(
                    source = ?source.range,
                    destination = ?destinations[k].range,
                    score,
                    "move detected"
                );
                claimed[k] = true;
                matches.push((source.range.clone(), destinations[k].range.clone()));
            }
        }
        matches
    };

    for (source, destination) in matches {
        let group = ctx.next_move_group();
        for atom in &mut atoms[source] {
            atom.reclassify(CorrelationStatus::MovedSource)?;
            atom.move_group = Some(group.clone());
        }
        for atom in &mut atoms[destination] {
            atom.reclassify(CorrelationStatus::MovedDestination)?;
            atom.move_group = Some(group.clone());
        }
    }
    Ok(())
}
