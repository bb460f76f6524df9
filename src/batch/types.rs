//! Batch file wire types
//!
//! A batch file is the unit of human review: it carries the selected
//! records together with their api predictions, gets hand-corrected in
//! place, and is terminal once merged into the master label set.

use crate::batch::SelectionMethod;
use crate::identity::RecordId;
use crate::labels::CategoryValues;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One record in a batch file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub record_id: RecordId,
    pub text_content: String,

    /// The service's prediction; `None` when classification failed after
    /// all retries. Humans correct these values in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_prediction: Option<CategoryValues>,

    /// Structured failure reason when no prediction was obtained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// A persisted unit of work: records selected for prediction and review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    pub batch_id: Uuid,
    pub selection_method: SelectionMethod,
    pub created_at: DateTime<Utc>,

    /// Identifier of the model that produced the predictions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,

    pub entries: Vec<BatchEntry>,
}

impl BatchFile {
    /// Number of entries that carry a prediction
    pub fn predicted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.api_prediction.is_some())
            .count()
    }

    /// Number of entries whose classification failed
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.failure.is_some()).count()
    }
}
