//! Document comparison.
//!
//! [`compare`] takes an original and a modified document and returns the
//! modified document annotated with revision markup describing how to get
//! there from the original. The pipeline runs in fixed stages:
//!
//! 1. normalize both inputs (drop noise, assign unids),
//! 2. correlate blocks and diff atoms,
//! 3. detect moves,
//! 4. detect formatting-only changes,
//! 5. rebuild the annotated tree.
//!
//! Every stage is deterministic: the same inputs and settings always give
//! byte-identical output.

pub mod atom;
mod atomizer;
mod block;
mod content;
mod context;
mod correlate;
mod format_change;
pub mod formatting;
mod moves;
mod normalize;
mod reconstruct;
pub mod settings;

pub use atom::{AtomContent, ComparisonAtom, Counterpart, CorrelationStatus, MoveGroup};
pub use atomizer::tokenize;
pub use context::ComparisonStats;
pub use formatting::{FormatDelta, Formatting};
pub use settings::CompareSettings;

use crate::error::Result;
use crate::tree::Document;
use context::CompareContext;

/// Full result of a comparison: the annotated document plus the classified
/// atom stream it was built from.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub document: Document,
    pub atoms: Vec<ComparisonAtom>,
    pub stats: ComparisonStats,
}

/// Compares `original` against `modified` and returns the annotated
/// document.
pub fn compare(original: &Document, modified: &Document, settings: &CompareSettings) -> Result<Document> {
    compare_detailed(original, modified, settings).map(|c| c.document)
}

/// Like [`compare`], also returning the atom stream and statistics.
pub fn compare_detailed(
    original: &Document,
    modified: &Document,
    settings: &CompareSettings,
) -> Result<Comparison> {
    settings.validate()?;
    let mut ctx = CompareContext::new(settings);

    let original = normalize::normalize(original, &mut ctx)?;
    let modified = normalize::normalize(modified, &mut ctx)?;
    tracing::debug!(
        original_nodes = original.doc.node_count(),
        modified_nodes = modified.doc.node_count(),
        "normalized inputs"
    );

    let mut atoms = correlate::correlate_documents(&original, &modified, &mut ctx)?;
    tracing::debug!(atoms = atoms.len(), "correlated");

    moves::detect_moves(&mut atoms, &mut ctx)?;
    format_change::detect_format_changes(&mut atoms, &ctx)?;

    let document = reconstruct::reconstruct(&atoms, &original, &modified, &mut ctx)?;

    let mut stats = ctx.stats;
    stats.count_atoms(&atoms);
    tracing::info!(
        equal = stats.equal_atoms,
        inserted = stats.inserted_atoms,
        deleted = stats.deleted_atoms,
        moved = stats.move_groups,
        format_changed = stats.format_changed_atoms,
        revisions = stats.revision_ids_used,
        "comparison complete"
    );

    Ok(Comparison { document, atoms, stats })
}
