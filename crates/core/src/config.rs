//! # Cofounder Configuration
//!
//! Layered loading with figment, highest priority last:
//!
//! 1. Built-in defaults
//! 2. `<workspace>/cofounder.toml`
//! 3. Environment variables (`COFOUNDER_*` prefix, `__` as separator)
//!
//! `COFOUNDER_LLM__PROVIDER=openai` maps to `llm.provider`,
//! `COFOUNDER_SCORING__NOVELTY=0.3` to `scoring.novelty`.

use crate::models::ModelConfig;
use crate::scoring::ScoringWeights;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project-level config file.
pub const CONFIG_FILE: &str = "cofounder.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CofounderConfig {
    #[serde(default)]
    pub llm: ModelConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ideas drafted per `generate` call when the caller does not say
    pub default_idea_count: usize,
    /// Idea chains processed at once; 1 keeps the batch strictly sequential
    pub max_concurrent_ideas: usize,
    /// Capacity of the pipeline event channel
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_idea_count: 3,
            max_concurrent_ideas: 1,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_path: PathBuf::from(".cofounder/cofounder.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `COFOUNDER_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CofounderConfig {
    /// Provider chain for a workspace directory.
    pub fn figment(workspace: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = workspace.join(CONFIG_FILE);
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed("COFOUNDER_").split("__"))
    }

    /// Relative storage paths resolve against the workspace.
    fn resolve_paths(mut self, workspace: &Path) -> Self {
        if self.storage.database_path.is_relative() {
            self.storage.database_path = workspace.join(&self.storage.database_path);
        }
        self
    }
}

/// Load configuration for `workspace`, reading `<workspace>/.env` first.
///
/// Invalid scoring weights are a load error.
pub fn load_config(workspace: impl AsRef<Path>) -> anyhow::Result<CofounderConfig> {
    let workspace = workspace.as_ref();
    let _ = dotenvy::from_path(workspace.join(".env"));

    let config: CofounderConfig = CofounderConfig::figment(workspace).extract()?;
    config.scoring.validate()?;
    if config.pipeline.max_concurrent_ideas == 0 {
        anyhow::bail!("pipeline.max_concurrent_ideas must be at least 1");
    }
    if config.pipeline.event_buffer == 0 {
        anyhow::bail!("pipeline.event_buffer must be at least 1");
    }

    tracing::debug!(
        provider = config.llm.provider.display_name(),
        "Configuration loaded"
    );
    Ok(config.resolve_paths(workspace))
}
