//! labelforge - Iterative human-corrected text classification
//!
//! labelforge drives a labeling loop in which a remote classification
//! service proposes labels, a human reviews and corrects them, and the
//! corrections accumulate into an authoritative master label set. That
//! set improves future predictions through progressive few-shot prompting
//! and seeds periodic model retraining.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       Consolidation                            │
//! │   raw text occurrences ──► deduplicated Records                │
//! │   (content-hash identity, appearance counting)                 │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │ ConsolidatedDataset
//! ┌───────────────────────────────▼────────────────────────────────┐
//! │                       BatchSelector                            │
//! │   unlabeled pool ──► longest | shortest | medium | random      │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │ selected Records
//! ┌───────────────────────────────▼────────────────────────────────┐
//! │                  Classification pipeline                       │
//! │   few-shot prompt ──► gateway (bounded concurrency,            │
//! │   per-record retry/timeout) ──► BatchFile for human review     │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │ corrected BatchFile
//! ┌───────────────────────────────▼────────────────────────────────┐
//! │                        LabelStore                              │
//! │   merge with manual precedence ──► master label set            │
//! │   snapshots (append-only) ──► few-shot examples, training      │
//! │   export; ChangeReconciler folds external edits back in        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`identity`]: deterministic content hashing for record identity
//! - [`dataset`]: consolidation of raw text into deduplicated records
//! - [`labels`]: the authoritative master label set and its snapshots
//! - [`batch`]: batch selection, classification pipeline, batch files
//! - [`prompt`]: progressive few-shot prompt assembly
//! - [`reconcile`]: diffing and merging external human edits
//! - [`gateway`]: the remote classification service interface
//! - [`export`]: training data export
//! - [`config`]: configuration management

pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod gateway;
pub mod identity;
pub mod labels;
pub mod prompt;
pub mod reconcile;

pub use config::LabelForgeConfig;
pub use error::{Error, Result};
