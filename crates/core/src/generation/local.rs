//! Locally hosted backend speaking the Ollama `/api/generate` protocol.

use super::{post_json, GenerationRequest, StructuredGenerator};
use crate::error::GenerationError;
use crate::models::ModelConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct LocalClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    default_temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl LocalClient {
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.resolved_base_url(),
            model: config.resolved_model().to_string(),
            default_temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "prompt": request.rendered_prompt(),
            "stream": false,
            "format": "json",
            "options": {
                "temperature": request.temperature.unwrap_or(self.default_temperature),
                "num_predict": self.max_tokens,
            },
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = json!(system);
        }
        body
    }
}

#[async_trait]
impl StructuredGenerator for LocalClient {
    fn name(&self) -> &str {
        "local"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!(model = %self.model, schema = request.schema.name(), "Local request");

        let reply = post_json(
            self.name(),
            self.http.post(url),
            &self.body(request),
            self.timeout_secs,
        )
        .await?;

        Ok(reply["response"].as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::SchemaDescriptor;
    use crate::models::LlmProvider;

    #[test]
    fn test_body_is_non_streaming_with_options() {
        let client = LocalClient::new(&ModelConfig::with_provider(LlmProvider::Local, "")).unwrap();
        let request = GenerationRequest::new(
            "Synthesize",
            SchemaDescriptor::new("sample", json!({"type": "object"})),
        )
        .with_system_prompt("You are a synthesizer")
        .with_temperature(0.7);

        let body = client.body(&request);
        assert_eq!(body["model"], "llama2");
        assert_eq!(body["stream"], false);
        assert_eq!(body["system"], "You are a synthesizer");
        assert_eq!(body["options"]["num_predict"], 4000);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_generation_error() {
        let config = ModelConfig {
            request_timeout_secs: 2,
            ..ModelConfig::with_provider(LlmProvider::Local, "")
        }
        .with_base_url("http://127.0.0.1:9");
        let client = LocalClient::new(&config).unwrap();
        let request = GenerationRequest::new(
            "x",
            SchemaDescriptor::new("sample", json!({"type": "object"})),
        );

        let err = client.generate(&request).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Transport { .. } | GenerationError::Timeout { .. }
        ));
    }
}
