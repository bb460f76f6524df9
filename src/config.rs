//! labelforge configuration management

use crate::batch::SelectionMethod;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main labelforge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelForgeConfig {
    /// Category definitions (the closed label enumeration)
    pub categories: Vec<CategoryDef>,

    /// Batch selection and prompting defaults
    #[serde(default)]
    pub batch: BatchConfig,

    /// Classification gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// One classification category: a name plus the description shown to the
/// classification service in every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Category name (a stable key in every label assignment)
    pub name: String,

    /// Human-readable definition included in the prompt
    pub description: String,
}

/// Batch selection and prompting defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of records per batch
    pub size: usize,

    /// Default selection method
    pub method: SelectionMethod,

    /// Maximum few-shot examples embedded in the prompt
    pub max_examples: usize,

    /// Seed for the `random` selection method
    pub random_seed: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 10,
            method: SelectionMethod::Longest,
            max_examples: 30,
            random_seed: 42,
        }
    }
}

/// Classification gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the chat-completions endpoint
    pub base_url: String,

    /// Model used for batch classification
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum attempts per record (first try + retries)
    pub max_attempts: u32,

    /// Initial retry backoff in milliseconds (doubles per attempt)
    pub initial_backoff_ms: u64,

    /// Maximum in-flight classification calls
    pub concurrency: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4.1-2025-04-14".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            initial_backoff_ms: 500,
            concurrency: 4,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for all persisted state
    pub base_dir: PathBuf,

    /// Master label set snapshots
    pub snapshots_dir: PathBuf,

    /// Batch files awaiting (or carrying) manual correction
    pub batches_dir: PathBuf,

    /// Append-only log of raw API predictions
    pub api_log_file: PathBuf,

    /// Training export (JSONL, one example per line)
    pub training_export: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = PathBuf::from("labelforge-data");
        Self {
            snapshots_dir: base.join("snapshots"),
            batches_dir: base.join("batches"),
            api_log_file: base.join("api_predictions.json"),
            training_export: base.join("training.jsonl"),
            base_dir: base,
        }
    }
}

impl LabelForgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants the rest of the system relies on
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(Error::Config(
                "at least one category must be defined".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for cat in &self.categories {
            if cat.name.trim().is_empty() {
                return Err(Error::Config("category name must not be empty".to_string()));
            }
            if !seen.insert(cat.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate category name '{}'",
                    cat.name
                )));
            }
        }
        if self.batch.size == 0 {
            return Err(Error::Config("batch.size must be at least 1".to_string()));
        }
        if self.gateway.max_attempts == 0 {
            return Err(Error::Config(
                "gateway.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.gateway.concurrency == 0 {
            return Err(Error::Config(
                "gateway.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Category names in configured order
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }
}
