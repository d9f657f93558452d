//! OpenAI chat-completions backend. Also works against OpenAI-compatible
//! servers through the base URL override.

use super::{post_json, GenerationRequest, StructuredGenerator};
use crate::error::GenerationError;
use crate::models::ModelConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    default_temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let api_key = config.api_key()?.unwrap_or_default();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.resolved_base_url(),
            model: config.resolved_model().to_string(),
            default_temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.rendered_prompt()}));

        json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature.unwrap_or(self.default_temperature),
            "max_tokens": self.max_tokens,
        })
    }
}

#[async_trait]
impl StructuredGenerator for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, schema = request.schema.name(), "OpenAI request");

        let reply = post_json(
            self.name(),
            self.http.post(url).bearer_auth(&self.api_key),
            &self.body(request),
            self.timeout_secs,
        )
        .await?;

        Ok(reply["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}
