//! Batch classification pipeline
//!
//! Issues per-record classification calls with bounded concurrency,
//! retries each record independently with capped exponential backoff, and
//! only assembles the batch file once every record has either a
//! prediction or an explicit failure. Dropping the returned future
//! cancels cleanly: nothing is written and the master label set is never
//! touched from here.

use crate::batch::types::{BatchEntry, BatchFile};
use crate::batch::SelectionMethod;
use crate::config::GatewayConfig;
use crate::dataset::Record;
use crate::gateway::{ClassificationGateway, GatewayError, Prediction};
use crate::identity::RecordId;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Retry cap; backoff never grows beyond this
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Tuning for the classification pipeline
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Maximum in-flight calls
    pub concurrency: usize,
    /// Attempts per record (first try + retries)
    pub max_attempts: u32,
    /// Initial backoff, doubled per failed attempt
    pub initial_backoff: Duration,
    /// Per-call timeout
    pub timeout: Duration,
}

impl From<&GatewayConfig> for ClassifyOptions {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Result of classifying a set of records: one entry per input record,
/// in input order, plus the model that served the batch.
#[derive(Debug, Clone)]
pub struct ClassifiedRecords {
    pub entries: Vec<BatchEntry>,
    pub model_ref: Option<String>,
}

/// Classify one record with bounded retries.
///
/// Timeout, malformed responses, and service errors are all retryable;
/// after the attempt budget is exhausted the last error is returned.
async fn classify_with_retry<G>(
    gateway: &G,
    system_instruction: &str,
    record: &Record,
    opts: &ClassifyOptions,
) -> std::result::Result<Prediction, GatewayError>
where
    G: ClassificationGateway + ?Sized,
{
    let mut backoff = opts.initial_backoff;
    let mut attempt = 1u32;
    loop {
        let outcome = tokio::time::timeout(
            opts.timeout,
            gateway.classify(system_instruction, &record.text_content),
        )
        .await;

        let error = match outcome {
            Ok(Ok(prediction)) => return Ok(prediction),
            Ok(Err(e)) => e,
            Err(_) => GatewayError::Timeout(opts.timeout),
        };

        if attempt >= opts.max_attempts {
            tracing::warn!(
                record_id = %record.id,
                attempts = attempt,
                error = %error,
                "classification failed; recording missing prediction"
            );
            return Err(error);
        }

        tracing::debug!(
            record_id = %record.id,
            attempt,
            error = %error,
            backoff_ms = backoff.as_millis() as u64,
            "classification attempt failed; retrying"
        );
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
        attempt += 1;
    }
}

/// Classify all records with bounded concurrency.
///
/// Responses complete in any order; results are keyed by record id and
/// re-assembled in input order once every record has resolved. A failed
/// record becomes an entry with no prediction and a structured failure
/// reason; it never aborts its siblings.
pub async fn classify_records<G>(
    gateway: &G,
    records: &[Record],
    system_instruction: &str,
    opts: &ClassifyOptions,
) -> ClassifiedRecords
where
    G: ClassificationGateway + ?Sized,
{
    let results: HashMap<RecordId, std::result::Result<Prediction, GatewayError>> =
        stream::iter(records.iter())
            .map(|record| async move {
                let result = classify_with_retry(gateway, system_instruction, record, opts).await;
                (record.id.clone(), result)
            })
            .buffer_unordered(opts.concurrency.max(1))
            .collect()
            .await;

    let mut model_ref = None;
    let entries = records
        .iter()
        .map(|record| {
            // Every input record has a keyed result by construction
            match &results[&record.id] {
                Ok(prediction) => {
                    if model_ref.is_none() {
                        model_ref = Some(prediction.model.clone());
                    }
                    BatchEntry {
                        record_id: record.id.clone(),
                        text_content: record.text_content.clone(),
                        api_prediction: Some(prediction.category_values.clone()),
                        failure: None,
                    }
                }
                Err(error) => BatchEntry {
                    record_id: record.id.clone(),
                    text_content: record.text_content.clone(),
                    api_prediction: None,
                    failure: Some(error.to_string()),
                },
            }
        })
        .collect();

    ClassifiedRecords { entries, model_ref }
}

/// Assemble a batch file from classified records
pub fn build_batch_file(method: SelectionMethod, classified: ClassifiedRecords) -> BatchFile {
    BatchFile {
        batch_id: Uuid::new_v4(),
        selection_method: method,
        created_at: Utc::now(),
        model_ref: classified.model_ref,
        entries: classified.entries,
    }
}
