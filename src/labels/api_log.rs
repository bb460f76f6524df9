//! Append-only audit log of raw API predictions
//!
//! Predictions are logged as soon as a batch comes back from the
//! classification service, before any human correction, so the original
//! model output stays auditable after the master set diverges from it.

use crate::error::Result;
use crate::labels::types::LabelAssignment;
use std::path::{Path, PathBuf};

/// JSON-file-backed prediction log
pub struct ApiPredictionLog {
    path: PathBuf,
}

impl ApiPredictionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append predictions to the log, creating it if missing
    pub fn append(&self, predictions: &[LabelAssignment]) -> Result<usize> {
        let mut all = self.read()?;
        all.extend_from_slice(predictions);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;

        tracing::info!(
            added = predictions.len(),
            total = all.len(),
            "logged api predictions"
        );
        Ok(all.len())
    }

    /// Read the full log (empty when the file does not exist)
    pub fn read(&self) -> Result<Vec<LabelAssignment>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
