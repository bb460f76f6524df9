//! Batch selection, classification, and persistence
//!
//! A batch is born from the selector, filled in by the classification
//! pipeline, persisted for human review, and finally consumed as a
//! correction batch by the master label set.

mod files;
mod runner;
mod selector;
mod types;

pub use files::{load_batch, load_corrections, save_batch};
pub use runner::{build_batch_file, classify_records, ClassifiedRecords, ClassifyOptions};
pub use selector::{select, SelectionMethod, DEFAULT_RANDOM_SEED};
pub use types::{BatchEntry, BatchFile};
