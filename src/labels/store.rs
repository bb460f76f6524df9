//! Master label set: authoritative merge/dedup logic for corrected labels
//!
//! The store holds at most one assignment per record id. Human (`manual`)
//! assignments take precedence over service (`api`) assignments: once a
//! record has been manually corrected it can only be re-corrected
//! manually, never downgraded back to an api prediction.

use crate::identity::RecordId;
use crate::labels::types::{LabelAssignment, LabelSource};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Counters describing what a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records newly added to the master set
    pub inserted: usize,
    /// Records whose assignment was replaced
    pub replaced: usize,
    /// Corrections identical to the current assignment (no-ops)
    pub unchanged: usize,
    /// Api corrections rejected by manual precedence
    pub rejected: usize,
}

impl MergeOutcome {
    fn absorb(&mut self, other: MergeOutcome) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.unchanged += other.unchanged;
        self.rejected += other.rejected;
    }
}

/// One correction batch with its creation time, used for chronological
/// multi-batch merges.
#[derive(Debug, Clone)]
pub struct CorrectionBatch {
    pub created_at: DateTime<Utc>,
    pub corrections: Vec<LabelAssignment>,
}

/// The authoritative, ordered master label set.
#[derive(Debug, Clone, Default)]
pub struct LabelStore {
    entries: Vec<LabelAssignment>,
    index: HashMap<RecordId, usize>,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted snapshot.
    ///
    /// Snapshots are written by [`LabelStore::assignments`], so ids are
    /// unique; a duplicate id in a hand-edited snapshot resolves to the
    /// later entry.
    pub fn from_assignments(assignments: Vec<LabelAssignment>) -> Self {
        let mut store = Self::new();
        for assignment in assignments {
            match store.index.get(&assignment.record_id) {
                Some(&idx) => store.entries[idx] = assignment,
                None => {
                    store
                        .index
                        .insert(assignment.record_id.clone(), store.entries.len());
                    store.entries.push(assignment);
                }
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&LabelAssignment> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }

    /// Record ids currently present in the master set
    pub fn labeled_ids(&self) -> HashSet<RecordId> {
        self.index.keys().cloned().collect()
    }

    /// All assignments in master-set order (oldest first)
    pub fn assignments(&self) -> &[LabelAssignment] {
        &self.entries
    }

    /// Assignments available for prompting, most recently added first.
    ///
    /// A re-corrected record keeps its original position, so recency here
    /// is the order records first entered the master set.
    pub fn example_pool(&self) -> Vec<&LabelAssignment> {
        self.entries.iter().rev().collect()
    }

    /// Merge a batch of corrections into the master set.
    ///
    /// Per correction: absent record ids are inserted; an existing `api`
    /// assignment is replaced by any incoming assignment; an existing
    /// `manual` assignment is replaced only by another `manual` one.
    /// Replacement happens in place, so merging the same corrections
    /// twice leaves the set (including its order) unchanged.
    pub fn merge(&mut self, corrections: Vec<LabelAssignment>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for correction in corrections {
            match self.index.get(&correction.record_id) {
                None => {
                    self.index
                        .insert(correction.record_id.clone(), self.entries.len());
                    self.entries.push(correction);
                    outcome.inserted += 1;
                }
                Some(&idx) => {
                    let existing = &self.entries[idx];
                    if existing.source == LabelSource::Manual
                        && correction.source == LabelSource::Api
                    {
                        tracing::debug!(
                            record_id = %correction.record_id,
                            "api correction rejected: record is manually labeled"
                        );
                        outcome.rejected += 1;
                    } else if *existing == correction {
                        outcome.unchanged += 1;
                    } else {
                        self.entries[idx] = correction;
                        outcome.replaced += 1;
                    }
                }
            }
        }

        tracing::info!(
            inserted = outcome.inserted,
            replaced = outcome.replaced,
            unchanged = outcome.unchanged,
            rejected = outcome.rejected,
            total = self.entries.len(),
            "merged corrections into master label set"
        );

        outcome
    }

    /// Merge multiple correction batches in strictly chronological order
    /// (oldest batch first), so later human corrections win for the same
    /// record.
    pub fn merge_batches(&mut self, mut batches: Vec<CorrectionBatch>) -> MergeOutcome {
        batches.sort_by_key(|b| b.created_at);
        let mut outcome = MergeOutcome::default();
        for batch in batches {
            outcome.absorb(self.merge(batch.corrections));
        }
        outcome
    }
}
