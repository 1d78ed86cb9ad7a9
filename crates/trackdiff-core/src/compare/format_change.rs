use super::atom::{ComparisonAtom, CorrelationStatus};
use super::context::CompareContext;
use super::formatting::FormatDelta;
use crate::error::Result;

/// Marks matched atoms whose formatting differs from their counterpart.
pub(crate) fn detect_format_changes(atoms: &mut [ComparisonAtom], ctx: &CompareContext) -> Result<()> {
    if !ctx.settings.detect_format_changes {
        return Ok(());
    }
    for atom in atoms.iter_mut().filter(|a| a.status == CorrelationStatus::Equal) {
        let Some(counterpart) = &atom.counterpart else { continue };
        if let Some(delta) = FormatDelta::between(&counterpart.formatting, &atom.formatting) {
            atom.reclassify(CorrelationStatus::FormatChanged)?;
            atom.format_delta = Some(delta);
        }
    }
    Ok(())
}
