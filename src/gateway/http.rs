//! HTTP classification gateway
//!
//! Speaks an OpenAI-style chat-completions protocol with a strict
//! JSON-schema response format built from the configured categories, so
//! every response either conforms to the closed category enumeration or
//! is rejected as malformed.

use crate::config::{CategoryDef, GatewayConfig};
use crate::error::{Error, Result};
use crate::gateway::{ClassificationGateway, GatewayError, Prediction};
use crate::labels::CategoryValues;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// reqwest-backed gateway to the classification service
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    categories: Vec<CategoryDef>,
    timeout: Duration,
}

impl HttpGateway {
    /// Build a gateway from configuration. The API key is resolved from
    /// the environment variable named in the config.
    pub fn from_config(config: &GatewayConfig, categories: &[CategoryDef]) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Gateway(format!(
                "API key environment variable '{}' is not set",
                config.api_key_env
            ))
        })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
            categories: categories.to_vec(),
            timeout,
        })
    }

    /// Use a different model (e.g. a fine-tuned one) for this gateway
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Strict JSON schema over the configured categories: every category
/// required, values restricted to 0|1, no additional properties.
fn response_schema(categories: &[CategoryDef]) -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = categories
        .iter()
        .map(|c| (c.name.clone(), json!({"type": "integer", "enum": [0, 1]})))
        .collect();
    let required: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    json!({
        "type": "json_schema",
        "json_schema": {
            "strict": true,
            "name": "classification",
            "schema": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        }
    })
}

fn user_message(text: &str) -> String {
    format!("Classify the following text.\n\nText: {text}")
}

/// Parse and validate the model's content payload against the closed
/// category enumeration.
fn parse_prediction(
    content: &str,
    categories: &[CategoryDef],
) -> std::result::Result<CategoryValues, GatewayError> {
    let values: CategoryValues = serde_json::from_str(content)
        .map_err(|e| GatewayError::MalformedResponse(format!("invalid JSON payload: {e}")))?;
    values
        .conforms_to(categories)
        .map_err(GatewayError::MalformedResponse)?;
    Ok(values)
}

#[async_trait]
impl ClassificationGateway for HttpGateway {
    async fn classify(
        &self,
        system_instruction: &str,
        text: &str,
    ) -> std::result::Result<Prediction, GatewayError> {
        let user = user_message(text);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            response_format: response_schema(&self.categories),
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.timeout)
                } else {
                    GatewayError::ServiceError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::ServiceError(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("invalid response body: {e}")))?;

        let choice = parsed
            .choices
            .first()
            .ok_or_else(|| GatewayError::MalformedResponse("response has no choices".to_string()))?;

        let category_values = parse_prediction(&choice.message.content, &self.categories)?;

        Ok(Prediction {
            category_values,
            model: parsed.model,
        })
    }
}
