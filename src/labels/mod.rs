//! Label provenance and the authoritative master label set
//!
//! Human corrections accumulate here; the store's contents feed both the
//! few-shot prompt builder and the training export.

mod api_log;
mod snapshot;
mod store;
mod types;

pub use api_log::ApiPredictionLog;
pub use snapshot::{load_master, FsSnapshotRepository, SnapshotMeta, SnapshotRepository};
pub use store::{CorrectionBatch, LabelStore, MergeOutcome};
pub use types::{CategoryValues, LabelAssignment, LabelSource};
