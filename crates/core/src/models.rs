//! # Cofounder Models
//!
//! Centralized generation-backend configuration. The orchestrator never
//! looks at the provider; it only receives the `StructuredGenerator` built
//! here.

use crate::generation::{
    GeminiClient, LocalClient, OfflineGenerator, OpenAiClient, StructuredGenerator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Supported generation backends
///
/// - Gemini (Google) - `GEMINI_API_KEY`
/// - OpenAI (GPT) - `OPENAI_API_KEY`, base URL overridable for compatible servers
/// - Local (Ollama) - no key
/// - Offline - never calls out; every stage uses its fallback
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Local,
    Offline,
}

impl LlmProvider {
    /// Display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "Gemini",
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::Local => "Local",
            LlmProvider::Offline => "Offline",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-1.5-pro",
            LlmProvider::OpenAI => "gpt-4o",
            LlmProvider::Local => "llama2",
            LlmProvider::Offline => "offline",
        }
    }

    /// Endpoint used when no base URL is configured
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Gemini => Some("https://generativelanguage.googleapis.com"),
            LlmProvider::OpenAI => Some("https://api.openai.com"),
            LlmProvider::Local => Some("http://localhost:11434"),
            LlmProvider::Offline => None,
        }
    }

    /// Environment variable holding the API key, if the backend needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Gemini => Some("GEMINI_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Local | LlmProvider::Offline => None,
        }
    }
}

/// Configuration for generation backend selection
///
/// ## Example
/// ```rust,ignore
/// use cofounder_core::models::{LlmProvider, ModelConfig};
///
/// let config = ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o");
/// let generator = config.create_generator()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Backend to use
    pub provider: LlmProvider,
    /// Model name; empty means the provider default
    pub model: String,
    /// Optional base URL override
    pub base_url: Option<String>,
    /// Default sampling temperature when a stage does not set one
    pub temperature: f32,
    /// Maximum tokens per response
    pub max_tokens: u32,
    /// Per-call timeout, enforced by the HTTP client
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: LlmProvider::Gemini.default_model().to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 4000,
            request_timeout_secs: 60,
        }
    }
}

impl ModelConfig {
    /// Create config for a specific provider
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Configured model, or the provider default
    pub fn resolved_model(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    /// Configured base URL without a trailing slash, or the provider default
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .or(self.provider.default_base_url())
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string()
    }

    /// Read the API key for the configured provider from the environment
    pub fn api_key(&self) -> anyhow::Result<Option<String>> {
        match self.provider.api_key_env() {
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| anyhow::anyhow!("{} is not set", var)),
            None => Ok(None),
        }
    }

    /// Create the generation backend for the configured provider
    pub fn create_generator(&self) -> anyhow::Result<Arc<dyn StructuredGenerator>> {
        tracing::info!(
            provider = self.provider.display_name(),
            model = self.resolved_model(),
            "Creating generation backend"
        );
        let generator: Arc<dyn StructuredGenerator> = match self.provider {
            LlmProvider::Gemini => Arc::new(GeminiClient::new(self)?),
            LlmProvider::OpenAI => Arc::new(OpenAiClient::new(self)?),
            LlmProvider::Local => Arc::new(LocalClient::new(self)?),
            LlmProvider::Offline => Arc::new(OfflineGenerator::new()),
        };
        Ok(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::Gemini);
        assert!(config.model.contains("gemini"));
        assert_eq!(config.max_tokens, 4000);
    }

    #[test]
    fn test_provider_display_names() {
        assert_eq!(LlmProvider::Gemini.display_name(), "Gemini");
        assert_eq!(LlmProvider::OpenAI.display_name(), "OpenAI");
    }

    #[test]
    fn test_resolved_model_and_base_url() {
        let config = ModelConfig::with_provider(LlmProvider::Local, "");
        assert_eq!(config.resolved_model(), "llama2");
        assert_eq!(config.resolved_base_url(), "http://localhost:11434");

        let config = config.with_base_url("http://gpu-box:11434/");
        assert_eq!(config.resolved_base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_offline_generator_needs_no_key() {
        let config = ModelConfig::with_provider(LlmProvider::Offline, "");
        let generator = config.create_generator().unwrap();
        assert_eq!(generator.name(), "offline");
    }

    #[test]
    fn test_model_config_serialization() {
        let config = ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("openai"));
        assert!(json.contains("gpt-4o"));
    }
}
