//! Master label set snapshot persistence
//!
//! Directory layout:
//! ```text
//! <snapshots_dir>/
//! ├── index.json                         (append-only snapshot index)
//! ├── master-20250801_120000_000000-17.json
//! ├── master-20250802_093015_412003-42.json
//! └── ...
//! ```
//!
//! Every persist writes a new snapshot document named with an embedded
//! timestamp and total-count suffix and appends its metadata to
//! `index.json`. Prior snapshots are never overwritten or deleted;
//! which snapshot is current is decided by the index's chronological
//! order, not by filename sorting.

use crate::error::{Error, Result};
use crate::labels::types::LabelAssignment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for one persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Snapshot identifier (also the document file stem)
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
}

/// Storage abstraction for master label set snapshots.
///
/// Implementations must be append-only: `save` creates a new snapshot and
/// never touches earlier ones.
pub trait SnapshotRepository: Send + Sync {
    /// All snapshot metadata in chronological order (oldest first)
    fn list(&self) -> Result<Vec<SnapshotMeta>>;

    /// Load the assignments of a specific snapshot
    fn load(&self, meta: &SnapshotMeta) -> Result<Vec<LabelAssignment>>;

    /// Persist a new snapshot, returning its metadata
    fn save(&self, assignments: &[LabelAssignment]) -> Result<SnapshotMeta>;

    /// Metadata of the most recent snapshot, if any
    fn latest(&self) -> Result<Option<SnapshotMeta>> {
        Ok(self.list()?.into_iter().last())
    }

    /// Load the most recent snapshot's assignments, if any
    fn load_latest(&self) -> Result<Option<(SnapshotMeta, Vec<LabelAssignment>)>> {
        match self.latest()? {
            Some(meta) => {
                let assignments = self.load(&meta)?;
                Ok(Some((meta, assignments)))
            }
            None => Ok(None),
        }
    }
}

/// Filesystem-backed snapshot repository (JSON documents + JSON index)
pub struct FsSnapshotRepository {
    dir: PathBuf,
}

impl FsSnapshotRepository {
    /// Open (creating if needed) a repository rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn snapshot_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_index(&self) -> Result<Vec<SnapshotMeta>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        let mut index: Vec<SnapshotMeta> = serde_json::from_str(&content)
            .map_err(|e| Error::Snapshot(format!("corrupt index {}: {}", path.display(), e)))?;
        // Chronological regardless of how the file was edited
        index.sort_by_key(|m| m.created_at);
        Ok(index)
    }

    fn write_index(&self, index: &[SnapshotMeta]) -> Result<()> {
        std::fs::write(self.index_path(), serde_json::to_string_pretty(index)?)?;
        Ok(())
    }
}

impl SnapshotRepository for FsSnapshotRepository {
    fn list(&self) -> Result<Vec<SnapshotMeta>> {
        self.read_index()
    }

    fn load(&self, meta: &SnapshotMeta) -> Result<Vec<LabelAssignment>> {
        let path = self.snapshot_path(&meta.id);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Snapshot(format!("missing snapshot {}: {}", path.display(), e)))?;
        let assignments: Vec<LabelAssignment> = serde_json::from_str(&content)
            .map_err(|e| Error::Snapshot(format!("corrupt snapshot {}: {}", path.display(), e)))?;
        Ok(assignments)
    }

    fn save(&self, assignments: &[LabelAssignment]) -> Result<SnapshotMeta> {
        let created_at = Utc::now();
        let id = format!(
            "master-{}-{}",
            created_at.format("%Y%m%d_%H%M%S_%6f"),
            assignments.len()
        );
        let path = self.snapshot_path(&id);
        if path.exists() {
            return Err(Error::Snapshot(format!(
                "snapshot {} already exists",
                path.display()
            )));
        }

        std::fs::write(&path, serde_json::to_string_pretty(&assignments)?)?;

        let meta = SnapshotMeta {
            id,
            created_at,
            record_count: assignments.len(),
        };
        let mut index = self.read_index()?;
        index.push(meta.clone());
        self.write_index(&index)?;

        tracing::info!(
            snapshot = %meta.id,
            records = meta.record_count,
            "persisted master label set snapshot"
        );

        Ok(meta)
    }
}

/// Load the current master label set from a repository, or an empty one
/// when nothing has been persisted yet.
pub fn load_master(repo: &dyn SnapshotRepository) -> Result<crate::labels::LabelStore> {
    match repo.load_latest()? {
        Some((meta, assignments)) => {
            tracing::debug!(snapshot = %meta.id, records = meta.record_count, "loaded master label set");
            Ok(crate::labels::LabelStore::from_assignments(assignments))
        }
        None => Ok(crate::labels::LabelStore::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;
    use crate::labels::types::{CategoryValues, LabelSource};
    use tempfile::TempDir;

    fn assignment(text: &str) -> LabelAssignment {
        LabelAssignment {
            record_id: identity::identify(text),
            text_content: text.to_string(),
            category_values: CategoryValues::from_pairs([("catA", true)]),
            source: LabelSource::Manual,
            model_ref: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_repository() {
        let dir = TempDir::new().unwrap();
        let repo = FsSnapshotRepository::new(dir.path()).unwrap();
        assert!(repo.list().unwrap().is_empty());
        assert!(repo.latest().unwrap().is_none());
        assert!(repo.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let repo = FsSnapshotRepository::new(dir.path()).unwrap();

        let assignments = vec![assignment("one"), assignment("two")];
        let meta = repo.save(&assignments).unwrap();
        assert_eq!(meta.record_count, 2);
        assert!(meta.id.ends_with("-2"));

        let loaded = repo.load(&meta).unwrap();
        assert_eq!(loaded, assignments);
    }

    #[test]
    fn test_snapshots_are_retained() {
        let dir = TempDir::new().unwrap();
        let repo = FsSnapshotRepository::new(dir.path()).unwrap();

        let first = repo.save(&[assignment("one")]).unwrap();
        let second = repo.save(&[assignment("one"), assignment("two")]).unwrap();

        let index = repo.list().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0], first);
        assert_eq!(index[1], second);

        // The earlier snapshot document is still loadable
        assert_eq!(repo.load(&first).unwrap().len(), 1);
        assert_eq!(repo.latest().unwrap().unwrap(), second);
    }

    #[test]
    fn test_load_master_reflects_latest() {
        let dir = TempDir::new().unwrap();
        let repo = FsSnapshotRepository::new(dir.path()).unwrap();

        let empty = load_master(&repo).unwrap();
        assert!(empty.is_empty());

        repo.save(&[assignment("one")]).unwrap();
        repo.save(&[assignment("one"), assignment("two")]).unwrap();

        let store = load_master(&repo).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(&identity::identify("two")).is_some());
    }

    #[test]
    fn test_corrupt_index_is_an_error() {
        let dir = TempDir::new().unwrap();
        let repo = FsSnapshotRepository::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("index.json"), "not json").unwrap();
        assert!(matches!(repo.list(), Err(Error::Snapshot(_))));
    }
}
