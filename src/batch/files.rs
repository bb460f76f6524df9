//! Batch file persistence
//!
//! Batch files are JSON documents named with their selection method and
//! creation timestamp. Corrected batch files are validated against the
//! configured category enumeration before any of their entries reach the
//! master label set; a file that fails validation is skipped whole.

use crate::batch::types::BatchFile;
use crate::config::CategoryDef;
use crate::error::{Error, Result};
use crate::labels::{CorrectionBatch, LabelAssignment, LabelSource};
use std::path::{Path, PathBuf};

/// Write a batch file into `dir`, returning the path
pub fn save_batch(dir: &Path, batch: &BatchFile) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = format!(
        "batch-{}-{}.json",
        batch.selection_method,
        batch.created_at.format("%Y%m%d_%H%M%S_%6f")
    );
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(batch)?)?;
    tracing::info!(path = %path.display(), entries = batch.entries.len(), "saved batch file");
    Ok(path)
}

/// Load a batch file, surfacing parse failures as a malformed file
pub fn load_batch(path: &Path) -> Result<BatchFile> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::MalformedCorrectionFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| Error::MalformedCorrectionFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load a human-corrected batch file as a correction batch.
///
/// Every entry carrying category values must conform to the configured
/// closed enumeration; one bad entry makes the whole file malformed and
/// none of its corrections are applied. Entries without a prediction
/// (failed classifications the reviewer left untouched) are skipped.
pub fn load_corrections(path: &Path, categories: &[CategoryDef]) -> Result<CorrectionBatch> {
    let batch = load_batch(path)?;

    let mut corrections = Vec::with_capacity(batch.entries.len());
    for entry in &batch.entries {
        let Some(values) = &entry.api_prediction else {
            tracing::debug!(record_id = %entry.record_id, "skipping entry without prediction");
            continue;
        };
        values
            .conforms_to(categories)
            .map_err(|reason| Error::MalformedCorrectionFile {
                path: path.to_path_buf(),
                reason: format!("record {}: {}", entry.record_id, reason),
            })?;
        corrections.push(LabelAssignment {
            record_id: entry.record_id.clone(),
            text_content: entry.text_content.clone(),
            category_values: values.clone(),
            source: LabelSource::Manual,
            model_ref: batch.model_ref.clone(),
            timestamp: batch.created_at,
        });
    }

    Ok(CorrectionBatch {
        created_at: batch.created_at,
        corrections,
    })
}
