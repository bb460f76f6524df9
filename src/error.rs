//! labelforge error types

use crate::identity::RecordId;
use std::path::PathBuf;
use thiserror::Error;

/// labelforge error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two distinct normalized texts produced the same content id.
    /// Fatal integrity condition; aborts the operation that triggered it.
    #[error("Identity collision on {id}: {existing:?} vs {incoming:?}")]
    IdentityCollision {
        id: RecordId,
        existing: String,
        incoming: String,
    },

    /// A correction file could not be parsed or failed schema validation.
    /// The file is skipped; the master label set is left unmodified.
    #[error("Malformed correction file {path}: {reason}")]
    MalformedCorrectionFile { path: PathBuf, reason: String },

    /// Original and edited review snapshots have incompatible keys/shape
    #[error("Reconcile schema mismatch: {0}")]
    ReconcileSchemaMismatch(String),

    /// Snapshot repository error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Classification gateway error
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for labelforge operations
pub type Result<T> = std::result::Result<T, Error>;
