//! # Pipeline Stages
//!
//! Order in which one idea chain moves through the agent stages.

use serde::{Deserialize, Serialize};

/// Stage of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// MarketAnalyst sizing the topic (once per batch)
    MarketAnalysis,
    /// IdeaGenerator drafting N ideas (once per batch)
    IdeaGeneration,
    /// Critic reviewing one idea
    Critique,
    /// PMRefiner planning one idea
    Refinement,
    /// Synthesizer producing the final concept
    Synthesis,
    /// Composite scorer
    Scoring,
    /// Chain done
    Complete,
}

impl PipelineStage {
    /// First stage of an idea chain, after the batch-level stages
    pub const CHAIN_START: PipelineStage = PipelineStage::Critique;

    /// Next stage; `Complete` stays put
    pub fn next(self) -> Self {
        match self {
            Self::MarketAnalysis => Self::IdeaGeneration,
            Self::IdeaGeneration => Self::Critique,
            Self::Critique => Self::Refinement,
            Self::Refinement => Self::Synthesis,
            Self::Synthesis => Self::Scoring,
            Self::Scoring => Self::Complete,
            Self::Complete => Self::Complete,
        }
    }

    /// Advance in place
    pub fn advance(&mut self) {
        *self = self.next();
    }

    pub fn is_complete(&self) -> bool {
        *self == Self::Complete
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketAnalysis => "market_analysis",
            Self::IdeaGeneration => "idea_generation",
            Self::Critique => "critique",
            Self::Refinement => "refinement",
            Self::Synthesis => "synthesis",
            Self::Scoring => "scoring",
            Self::Complete => "complete",
        }
    }
}
