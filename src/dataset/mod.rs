//! Dataset consolidation
//!
//! Collapses raw text occurrences into deduplicated [`Record`]s keyed by
//! content id. The consolidated dataset is an explicit owned value handed
//! from stage to stage; no stage mutates a shared copy.

use crate::error::{Error, Result};
use crate::identity::{self, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A deduplicated unit of text content with a stable identity.
///
/// Immutable once created; `appearance_count` is the number of source
/// occurrences collapsed into this record (always >= 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub text_content: String,
    pub appearance_count: u32,
}

/// The consolidated dataset produced by [`consolidate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidatedDataset {
    records: Vec<Record>,
}

impl ConsolidatedDataset {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total source occurrences across all records
    pub fn total_occurrences(&self) -> u64 {
        self.records.iter().map(|r| r.appearance_count as u64).sum()
    }

    /// Load a previously consolidated dataset from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the dataset to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Consolidate raw text occurrences into deduplicated records.
///
/// Texts that are empty after normalization are dropped. Identical
/// normalized texts collapse into a single record whose
/// `appearance_count` is the number of occurrences. Records keep
/// first-appearance order, so consolidation is deterministic for a given
/// input sequence.
///
/// A collision — two distinct normalized texts mapping to the same id —
/// is an unrecoverable integrity failure and aborts consolidation.
pub fn consolidate<I>(texts: I) -> Result<ConsolidatedDataset>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut records: Vec<Record> = Vec::new();
    let mut by_id: HashMap<RecordId, usize> = HashMap::new();

    for raw in texts {
        let normalized = identity::normalize(raw.as_ref());
        if normalized.is_empty() {
            continue;
        }
        let id = identity::identify(&normalized);

        match by_id.get(&id) {
            Some(&idx) => {
                let existing = &mut records[idx];
                if existing.text_content != normalized {
                    return Err(Error::IdentityCollision {
                        id,
                        existing: existing.text_content.clone(),
                        incoming: normalized,
                    });
                }
                existing.appearance_count += 1;
            }
            None => {
                by_id.insert(id.clone(), records.len());
                records.push(Record {
                    id,
                    text_content: normalized,
                    appearance_count: 1,
                });
            }
        }
    }

    tracing::info!(
        unique = records.len(),
        "consolidated dataset from raw occurrences"
    );

    Ok(ConsolidatedDataset { records })
}
