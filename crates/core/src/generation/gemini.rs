//! Google Gemini `generateContent` backend.

use super::{post_json, GenerationRequest, StructuredGenerator};
use crate::error::GenerationError;
use crate::models::ModelConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    default_temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl GeminiClient {
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
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.rendered_prompt()}],
            }],
            "generationConfig": {
                "temperature": request.temperature.unwrap_or(self.default_temperature),
                "maxOutputTokens": self.max_tokens,
                "responseMimeType": "application/json",
            },
        });
        if let Some(system) = &request.system_prompt {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        body
    }

    /// Concatenate the text parts of the first candidate.
    fn candidate_text(reply: &Value) -> String {
        reply["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl StructuredGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::debug!(model = %self.model, schema = request.schema.name(), "Gemini request");

        let reply = post_json(
            self.name(),
            self.http.post(url).query(&[("key", &self.api_key)]),
            &self.body(request),
            self.timeout_secs,
        )
        .await?;

        Ok(Self::candidate_text(&reply))
    }
}
