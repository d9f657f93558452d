//! # Pipeline
//!
//! Orchestration of the agent stages into the idea lifecycle:
//! `generate` drafts and develops a batch, `iterate` re-runs one stage of a
//! finished idea with user feedback.

pub mod events;
pub mod iteration;
pub mod orchestrator;
pub mod stages;

pub use events::{PipelineEvent, PipelineEventKind};
pub use iteration::IterationType;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use stages::PipelineStage;
