//! Classification gateway
//!
//! The remote classification service is reached through the
//! [`ClassificationGateway`] trait so the batch pipeline can run against
//! the real HTTP service or a test double. The gateway surfaces exactly
//! three failure modes; all of them are per-record and retryable.

mod http;

pub use http::HttpGateway;

use crate::labels::CategoryValues;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A classification returned by the service
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Category values conforming to the configured schema
    pub category_values: CategoryValues,
    /// Identifier of the model that produced the prediction
    pub model: String,
}

/// Failure modes surfaced to the core
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The call did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered, but the payload violates the schema
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Transport or service-side failure
    #[error("service error: {0}")]
    ServiceError(String),
}

/// Interface to the remote classification service
#[async_trait]
pub trait ClassificationGateway: Send + Sync {
    /// Classify one text under the given system instruction
    async fn classify(
        &self,
        system_instruction: &str,
        text: &str,
    ) -> std::result::Result<Prediction, GatewayError>;
}
