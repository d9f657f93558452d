//! # Critic Skill
//!
//! Reviews one idea against the market analysis. Scores are authored on a
//! 0-10 scale; the scorer normalizes them into critic severity.

use super::{
    decode_as, feedback, pretty, prompts, strings, AgentStage, IdeaDraft, MarketAnalysis,
};
use crate::error::GenerationError;
use crate::generation::SchemaDescriptor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-dimension critic scores, each 0-10
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CriticScores {
    #[serde(default, alias = "overall_score")]
    pub overall: Option<f64>,
    #[serde(default, alias = "feasibility_score")]
    pub feasibility: Option<f64>,
    #[serde(default, alias = "market_potential_score")]
    pub market_potential: Option<f64>,
    #[serde(default, alias = "innovation_score")]
    pub innovation: Option<f64>,
    #[serde(default, alias = "competitive_advantage_score")]
    pub competitive_advantage: Option<f64>,
    #[serde(default, alias = "implementation_score")]
    pub implementation: Option<f64>,
}

impl CriticScores {
    /// Scores that were actually given.
    pub fn present(&self) -> Vec<f64> {
        [
            self.overall,
            self.feasibility,
            self.market_potential,
            self.innovation,
            self.competitive_advantage,
            self.implementation,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Output from the critic skill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Critique {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    /// Overall score, 0-10
    pub score: f64,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub scores: CriticScores,
}

#[derive(Debug, Clone)]
pub struct CriticInput {
    pub idea: IdeaDraft,
    pub market_analysis: Option<MarketAnalysis>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CriticSkill;

impl AgentStage for CriticSkill {
    type Input = CriticInput;
    type Output = Critique;

    const NAME: &'static str = "critic";

    fn system_prompt(&self) -> &'static str {
        prompts::CRITIC
    }

    fn build_prompt(&self, input: &CriticInput) -> String {
        let market = input
            .market_analysis
            .as_ref()
            .map(pretty)
            .unwrap_or_else(|| "Not available".to_string());

        let prompt = format!(
            "Critically evaluate this startup idea.\n\n\
             Idea:\n{}\n\n\
             Market Analysis:\n{}\n\n\
             List strengths, weaknesses, risks, opportunities and improvement \
             suggestions. Give an overall score from 0 to 10 and per-dimension scores \
             (feasibility, market potential, innovation, competitive advantage, \
             implementation), also 0 to 10.",
            pretty(&input.idea),
            market
        );
        feedback::inject(prompt, input.feedback.as_deref())
    }

    fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::of::<Critique>("critique")
    }

    fn temperature(&self) -> f32 {
        0.4
    }

    fn fallback(&self, _input: &CriticInput) -> Critique {
        Critique {
            strengths: strings(&["Clear value proposition", "Good market fit"]),
            weaknesses: strings(&["High competition", "Complex implementation"]),
            suggestions: strings(&["Simplify MVP", "Focus on niche market"]),
            score: 6.0,
            risks: Vec::new(),
            opportunities: Vec::new(),
            scores: CriticScores::default(),
        }
    }

    fn decode(&self, value: Value, _input: &CriticInput) -> Result<Critique, GenerationError> {
        let critique: Critique = decode_as(Self::NAME, value)?;
        if !critique.score.is_finite() {
            return Err(GenerationError::SchemaMismatch {
                schema: Self::NAME.to_string(),
                message: "score is not a finite number".to_string(),
            });
        }
        Ok(critique)
    }
}
