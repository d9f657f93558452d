//! # Cofounder Core
//!
//! The "Brain" of the Cofounder system: agent stages that turn a topic into
//! startup ideas, the pipeline that runs them, composite scoring and record
//! storage.
//!
//! ## Architecture
//!
//! - `generation/` - Structured generation backends (Gemini, OpenAI, Ollama, offline)
//! - `skills/` - Agent stages (MarketAnalyst, IdeaGenerator, Critic, PMRefiner, Synthesizer)
//! - `scoring/` - Component scores and the weighted composite scorer
//! - `state/` - Idea snapshots, feedback and stores
//! - `pipeline/` - Orchestration of `generate` and `iterate`
//! - `models` / `config` - Provider selection and layered configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cofounder_core::{config::load_config, pipeline::Orchestrator, skills::Constraints};
//!
//! let config = load_config(".")?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let ideas = orchestrator.generate("pet-sitting app", Constraints::new(), 3).await?;
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod skills;
pub mod state;
pub mod telemetry;

pub use error::{PipelineError, Result};
pub use pipeline::{IterationType, Orchestrator, OrchestratorConfig};
pub use state::{IdeaSnapshot, IdeaStatus};
