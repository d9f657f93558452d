//! # Structured Generation
//!
//! The seam between agent stages and text-generation backends.
//!
//! ```text
//! AgentStage ──GenerationRequest──▶ StructuredGenerator::generate
//!                                     ├── complete()  (backend specific, network I/O)
//!                                     └── decode      (extract + validate JSON)
//! ```
//!
//! Backends only implement [`StructuredGenerator::complete`]; extraction and
//! schema checks are shared so every vendor honours the same contract.

pub mod decode;
pub mod gemini;
pub mod local;
pub mod openai;
pub mod schema;
pub mod scripted;

use crate::error::GenerationError;
use async_trait::async_trait;
use serde_json::Value;

pub use decode::{decode_structured, extract_json};
pub use gemini::GeminiClient;
pub use local::LocalClient;
pub use openai::OpenAiClient;
pub use schema::{JsonShape, SchemaDescriptor};
pub use scripted::{OfflineGenerator, ScriptedGenerator};

/// One structured generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub schema: SchemaDescriptor,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self {
            prompt: prompt.into(),
            schema,
            system_prompt: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Prompt text sent to the backend: schema instructions first, then the
    /// stage prompt so the stage's closing directives stay last.
    pub fn rendered_prompt(&self) -> String {
        format!("{}\n\n{}", self.schema.render_instructions(), self.prompt)
    }
}

/// A text-generation backend able to return schema-conforming JSON.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Issue the request and return the raw textual answer.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Issue the request and decode the structured answer.
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let raw = self.complete(request).await?;
        if raw.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                backend: self.name().to_string(),
            });
        }
        decode_structured(&raw, &request.schema)
    }
}

/// POST a JSON body and return the parsed JSON reply, mapping transport and
/// HTTP failures into [`GenerationError`].
pub(crate) async fn post_json(
    backend: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
    timeout_secs: u64,
) -> Result<Value, GenerationError> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::transport(backend, &e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GenerationError::Api {
            backend: backend.to_string(),
            status: status.as_u16(),
            message: message.chars().take(500).collect(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| GenerationError::transport(backend, &e, timeout_secs))
}
