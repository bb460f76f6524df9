//! Reconciliation of out-of-band human edits
//!
//! A review export leaves the system, gets edited by a human, and comes
//! back. The reconciler diffs the edited snapshot against its source
//! snapshot, reports every difference, and optionally folds the approved
//! changes back into the master label set as manual corrections. Records
//! missing from the edited sheet are reported as removed but never
//! deleted: dropping a row from a review sheet is not a label deletion.

use crate::batch::BatchFile;
use crate::config::CategoryDef;
use crate::error::{Error, Result};
use crate::identity::RecordId;
use crate::labels::{CategoryValues, LabelAssignment, LabelSource, LabelStore, MergeOutcome};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One reviewable row: the text and its category values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub text_content: String,
    pub category_values: CategoryValues,
}

/// A review snapshot keyed by record id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewSnapshot(BTreeMap<RecordId, ReviewEntry>);

impl ReviewSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record_id: RecordId, entry: ReviewEntry) {
        self.0.insert(record_id, entry);
    }

    pub fn get(&self, id: &RecordId) -> Option<&ReviewEntry> {
        self.0.get(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Snapshot of a batch file's predicted entries
    pub fn from_batch(batch: &BatchFile) -> Self {
        let mut snapshot = Self::new();
        for entry in &batch.entries {
            if let Some(values) = &entry.api_prediction {
                snapshot.insert(
                    entry.record_id.clone(),
                    ReviewEntry {
                        text_content: entry.text_content.clone(),
                        category_values: values.clone(),
                    },
                );
            }
        }
        snapshot
    }
}

/// What changed for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "change")]
pub enum ChangeKind {
    Modified {
        before: CategoryValues,
        after: CategoryValues,
    },
    Added {
        after: CategoryValues,
    },
    Removed,
}

/// One detected difference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEntry {
    pub record_id: RecordId,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

/// All detected differences, in record-id order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeReport {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn modified_count(&self) -> usize {
        self.count(|k| matches!(k, ChangeKind::Modified { .. }))
    }

    pub fn added_count(&self) -> usize {
        self.count(|k| matches!(k, ChangeKind::Added { .. }))
    }

    pub fn removed_count(&self) -> usize {
        self.count(|k| matches!(k, ChangeKind::Removed))
    }

    fn count(&self, pred: impl Fn(&ChangeKind) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.kind)).count()
    }
}

fn validate_snapshot(
    snapshot: &ReviewSnapshot,
    categories: &[CategoryDef],
    which: &str,
) -> Result<()> {
    for (id, entry) in &snapshot.0 {
        entry
            .category_values
            .conforms_to(categories)
            .map_err(|reason| {
                Error::ReconcileSchemaMismatch(format!("{which} snapshot, record {id}: {reason}"))
            })?;
    }
    Ok(())
}

/// Diff two snapshots. The report is always produced, in stable
/// record-id order.
pub fn diff(original: &ReviewSnapshot, edited: &ReviewSnapshot) -> ChangeReport {
    let keys: BTreeSet<&RecordId> = original.0.keys().chain(edited.0.keys()).collect();

    let mut entries = Vec::new();
    for key in keys {
        match (original.0.get(key), edited.0.get(key)) {
            (Some(before), Some(after)) => {
                if before.category_values != after.category_values {
                    entries.push(ChangeEntry {
                        record_id: key.clone(),
                        kind: ChangeKind::Modified {
                            before: before.category_values.clone(),
                            after: after.category_values.clone(),
                        },
                    });
                }
            }
            (None, Some(after)) => entries.push(ChangeEntry {
                record_id: key.clone(),
                kind: ChangeKind::Added {
                    after: after.category_values.clone(),
                },
            }),
            (Some(_), None) => entries.push(ChangeEntry {
                record_id: key.clone(),
                kind: ChangeKind::Removed,
            }),
            (None, None) => unreachable!("key came from one of the two snapshots"),
        }
    }

    ChangeReport { entries }
}

/// Diff `edited` against `original` and, when `integrate` carries a
/// store, merge every modified/added entry into it as a manual
/// correction. Removed entries are reported but never delete anything.
///
/// Both snapshots must conform to the configured category enumeration;
/// otherwise no merge is performed and the mismatch is surfaced.
pub fn reconcile(
    original: &ReviewSnapshot,
    edited: &ReviewSnapshot,
    categories: &[CategoryDef],
    integrate: Option<&mut LabelStore>,
) -> Result<(ChangeReport, Option<MergeOutcome>)> {
    validate_snapshot(original, categories, "original")?;
    validate_snapshot(edited, categories, "edited")?;

    let report = diff(original, edited);
    tracing::info!(
        modified = report.modified_count(),
        added = report.added_count(),
        removed = report.removed_count(),
        "reconciled review snapshots"
    );

    let Some(store) = integrate else {
        return Ok((report, None));
    };

    let now = Utc::now();
    let corrections: Vec<LabelAssignment> = report
        .entries
        .iter()
        .filter_map(|entry| {
            let after = match &entry.kind {
                ChangeKind::Modified { after, .. } | ChangeKind::Added { after } => after,
                ChangeKind::Removed => return None,
            };
            let text = edited.get(&entry.record_id)?.text_content.clone();
            Some(LabelAssignment {
                record_id: entry.record_id.clone(),
                text_content: text,
                category_values: after.clone(),
                source: LabelSource::Manual,
                model_ref: None,
                timestamp: now,
            })
        })
        .collect();

    let outcome = store.merge(corrections);
    Ok((report, Some(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;

    fn categories() -> Vec<CategoryDef> {
        vec![CategoryDef {
            name: "catA".to_string(),
            description: String::new(),
        }]
    }

    fn entry(text: &str, cat_a: bool) -> (RecordId, ReviewEntry) {
        (
            identity::identify(text),
            ReviewEntry {
                text_content: text.to_string(),
                category_values: CategoryValues::from_pairs([("catA", cat_a)]),
            },
        )
    }

    fn snapshot(entries: Vec<(RecordId, ReviewEntry)>) -> ReviewSnapshot {
        let mut snapshot = ReviewSnapshot::new();
        for (id, e) in entries {
            snapshot.insert(id, e);
        }
        snapshot
    }

    #[test]
    fn test_modified_added_removed() {
        let original = snapshot(vec![entry("r1", false), entry("gone", true)]);
        let edited = snapshot(vec![entry("r1", true), entry("r2", true)]);

        let report = diff(&original, &edited);
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.modified_count(), 1);
        assert_eq!(report.added_count(), 1);
        assert_eq!(report.removed_count(), 1);

        // Stable record-id order
        let mut ids: Vec<RecordId> = report.entries.iter().map(|e| e.record_id.clone()).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort();
            s
        };
        assert_eq!(ids, sorted);

        ids.retain(|id| *id == identity::identify("r1"));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_identical_snapshots_empty_report() {
        let original = snapshot(vec![entry("r1", true)]);
        let report = diff(&original, &original.clone());
        assert!(report.is_empty());
    }

    #[test]
    fn test_reconcile_integrates_as_manual() {
        let original = snapshot(vec![entry("r1", false)]);
        let edited = snapshot(vec![entry("r1", true), entry("r2", true)]);
        let mut store = LabelStore::new();

        let (report, outcome) =
            reconcile(&original, &edited, &categories(), Some(&mut store)).unwrap();
        assert_eq!(report.modified_count(), 1);
        assert_eq!(report.added_count(), 1);
        assert_eq!(outcome.unwrap().inserted, 2);

        for text in ["r1", "r2"] {
            let assignment = store.get(&identity::identify(text)).unwrap();
            assert_eq!(assignment.source, LabelSource::Manual);
            assert_eq!(assignment.category_values.get("catA"), Some(1));
        }
    }

    #[test]
    fn test_removed_never_deletes() {
        let mut store = LabelStore::new();
        let original = snapshot(vec![entry("r1", true)]);
        let edited = ReviewSnapshot::new();

        // Pre-populate the store with the record about to be "removed"
        reconcile(
            &ReviewSnapshot::new(),
            &original,
            &categories(),
            Some(&mut store),
        )
        .unwrap();
        assert_eq!(store.len(), 1);

        let (report, outcome) =
            reconcile(&original, &edited, &categories(), Some(&mut store)).unwrap();
        assert_eq!(report.removed_count(), 1);
        assert_eq!(outcome.unwrap(), MergeOutcome::default());
        assert_eq!(store.len(), 1);
        assert!(store.get(&identity::identify("r1")).is_some());
    }

    #[test]
    fn test_schema_mismatch_blocks_merge() {
        let original = snapshot(vec![entry("r1", false)]);
        let mut bad_entry = entry("r1", true);
        bad_entry.1.category_values.set("unknown", true);
        let edited = snapshot(vec![bad_entry]);
        let mut store = LabelStore::new();

        let result = reconcile(&original, &edited, &categories(), Some(&mut store));
        assert!(matches!(result, Err(Error::ReconcileSchemaMismatch(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_report_without_integration() {
        let original = snapshot(vec![entry("r1", false)]);
        let edited = snapshot(vec![entry("r1", true)]);

        let (report, outcome) = reconcile(&original, &edited, &categories(), None).unwrap();
        assert_eq!(report.modified_count(), 1);
        assert!(outcome.is_none());
    }
}
