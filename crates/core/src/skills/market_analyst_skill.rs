//! # Market Analyst Skill
//!
//! Runs once per `generate` batch and sizes the market around the topic.
//! Its output feeds every later stage and the market-signal score.

use super::{decode_as, feedback, pretty, prompts, strings, AgentStage, Constraints};
use crate::error::GenerationError;
use crate::generation::SchemaDescriptor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured market analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarketAnalysis {
    /// Overall market size, e.g. "Large" or "$4B"
    pub market_size: String,
    /// "Low", "Medium" or "High"
    pub competition_level: String,
    /// Growth outlook; "high"/"medium" drive the market-signal score
    pub growth_potential: String,
    pub key_trends: Vec<String>,
    pub target_segments: Vec<String>,
    #[serde(default)]
    pub market_opportunity: String,
    #[serde(default)]
    pub competitive_landscape: String,
    /// Concrete openings for a new entrant
    #[serde(default)]
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketAnalystInput {
    pub topic: String,
    pub constraints: Constraints,
    pub feedback: Option<String>,
}

impl MarketAnalystInput {
    pub fn new(topic: impl Into<String>, constraints: Constraints) -> Self {
        Self {
            topic: topic.into(),
            constraints,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarketAnalystSkill;

impl AgentStage for MarketAnalystSkill {
    type Input = MarketAnalystInput;
    type Output = MarketAnalysis;

    const NAME: &'static str = "market_analyst";

    fn system_prompt(&self) -> &'static str {
        prompts::MARKET_ANALYST
    }

    fn build_prompt(&self, input: &MarketAnalystInput) -> String {
        let prompt = format!(
            "Analyze the market for this startup topic.\n\n\
             Topic: {}\n\n\
             Constraints:\n{}\n\n\
             Cover market size, competition level, growth potential, key trends, \
             target segments, the main market opportunity, the competitive landscape \
             and concrete opportunities for a new entrant.",
            input.topic,
            pretty(&input.constraints)
        );
        feedback::inject(prompt, input.feedback.as_deref())
    }

    fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::of::<MarketAnalysis>("market_analysis")
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn fallback(&self, _input: &MarketAnalystInput) -> MarketAnalysis {
        MarketAnalysis {
            market_size: "Large".to_string(),
            competition_level: "High".to_string(),
            growth_potential: "High".to_string(),
            key_trends: strings(&["AI adoption", "Remote work", "Sustainability"]),
            target_segments: strings(&["SMBs", "Enterprises", "Consumers"]),
            market_opportunity: "Growing demand for digital solutions in this space".to_string(),
            competitive_landscape: "Fragmented market with several established players"
                .to_string(),
            opportunities: Vec::new(),
        }
    }

    fn decode(
        &self,
        value: Value,
        _input: &MarketAnalystInput,
    ) -> Result<MarketAnalysis, GenerationError> {
        decode_as(Self::NAME, value)
    }
}
