//! Call-scoped comparison state.
//!
//! Every counter the pipeline needs lives here and is threaded through the
//! recursive stages by `&mut`, so concurrent comparisons share nothing.

use super::atom::{ComparisonAtom, CorrelationStatus, MoveGroup};
use super::settings::CompareSettings;
use crate::error::{CompareError, Result};
use crate::tree::Unid;
use serde::Serialize;
use std::collections::HashMap;

/// Counters describing one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonStats {
    pub original_blocks: usize,
    pub modified_blocks: usize,
    pub equal_blocks: usize,
    /// Top-level correlation found no matching block and every block went
    /// through similarity pairing and atom-level diffing.
    pub degenerate_fallback: bool,
    pub equal_atoms: usize,
    pub inserted_atoms: usize,
    pub deleted_atoms: usize,
    pub moved_source_atoms: usize,
    pub moved_destination_atoms: usize,
    pub format_changed_atoms: usize,
    pub move_groups: usize,
    pub revision_ids_used: usize,
}

impl ComparisonStats {
    pub(crate) fn count_atoms(&mut self, atoms: &[ComparisonAtom]) {
        for atom in atoms {
            match atom.status {
                CorrelationStatus::Equal => self.equal_atoms += 1,
                CorrelationStatus::Inserted => self.inserted_atoms += 1,
                CorrelationStatus::Deleted => self.deleted_atoms += 1,
                CorrelationStatus::MovedSource => self.moved_source_atoms += 1,
                CorrelationStatus::MovedDestination => self.moved_destination_atoms += 1,
                CorrelationStatus::FormatChanged => self.format_changed_atoms += 1,
                CorrelationStatus::Unknown => {}
            }
        }
    }
}

pub(crate) struct CompareContext<'s> {
    pub settings: &'s CompareSettings,
    pub stats: ComparisonStats,
    next_unid: u32,
    /// `None` once the id space is exhausted.
    next_revision_id: Option<u32>,
    next_move_group: u32,
    /// Original-tree containers matched to a modified-tree container.
    aliases: HashMap<Unid, Unid>,
}

impl<'s> CompareContext<'s> {
    pub fn new(settings: &'s CompareSettings) -> Self {
        Self {
            settings,
            stats: ComparisonStats::default(),
            next_unid: 1,
            next_revision_id: Some(settings.first_revision_id),
            next_move_group: 1,
            aliases: HashMap::new(),
        }
    }

    pub fn next_unid(&mut self) -> Unid {
        let id = Unid(self.next_unid);
        self.next_unid += 1;
        id
    }

    pub fn next_revision_id(&mut self) -> Result<u32> {
        let id = self.next_revision_id.ok_or_else(|| {
            CompareError::structural(format!(
                "revision ids exhausted after {} ids starting at {}",
                self.stats.revision_ids_used, self.settings.first_revision_id
            ))
        })?;
        self.next_revision_id = id.checked_add(1);
        self.stats.revision_ids_used += 1;
        Ok(id)
    }

    pub fn next_move_group(&mut self) -> MoveGroup {
        let group = MoveGroup::new(self.next_move_group);
        self.next_move_group += 1;
        self.stats.move_groups += 1;
        group
    }

    /// Records that original container `from` is rebuilt as modified
    /// container `to`.
    pub fn alias(&mut self, from: Unid, to: Unid) {
        self.aliases.insert(from, to);
    }

    /// Rewrites an original-tree path so that matched containers resolve to
    /// their modified-tree counterparts.
    pub fn remap_path(&self, path: &[Unid]) -> Vec<Unid> {
        path.iter()
            .map(|u| self.aliases.get(u).copied().unwrap_or(*u))
            .collect()
    }
}
