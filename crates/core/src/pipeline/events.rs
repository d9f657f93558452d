//! # Pipeline Events
//!
//! Progress events streamed to an optional observer channel.

use super::stages::PipelineStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of pipeline event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineEventKind {
    /// `generate` started
    BatchStarted,
    /// A stage started
    StageStarted,
    /// A stage finished with generated output
    StageCompleted,
    /// A stage finished on its fallback value
    StageFellBack,
    /// Scoring failed, previous scores kept
    ScoringFailed,
    /// One idea chain finished
    IdeaCompleted,
    /// `generate` finished and persisted
    BatchCompleted,
    /// `iterate` started
    IterationStarted,
    /// `iterate` finished and persisted
    IterationCompleted,
}

/// An event in the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Unique event ID
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: PipelineEventKind,
    #[serde(default)]
    pub stage: Option<PipelineStage>,
    /// Idea the event is about, if any
    #[serde(default)]
    pub idea_id: Option<String>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl PipelineEvent {
    pub fn new(kind: PipelineEventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            stage: None,
            idea_id: None,
            data: None,
        }
    }

    pub fn with_stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_idea(mut self, idea_id: &str) -> Self {
        self.idea_id = Some(idea_id.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
