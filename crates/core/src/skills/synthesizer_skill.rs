//! # Synthesizer Skill
//!
//! Final stage of an idea chain: folds the market analysis and refinement
//! plan into the polished concept.

use super::{
    decode_as, feedback, pretty, prompts, strings, AgentStage, IdeaDraft, MarketAnalysis,
    Refinement,
};
use crate::error::GenerationError;
use crate::generation::SchemaDescriptor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final concept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Synthesis {
    pub final_concept: String,
    pub key_features: Vec<String>,
    pub business_model: String,
    pub go_to_market: String,
    #[serde(default)]
    pub value_proposition: String,
    #[serde(default)]
    pub competitive_advantage: String,
    #[serde(default)]
    pub target_customers: Vec<String>,
    #[serde(default)]
    pub revenue_projections: String,
}

#[derive(Debug, Clone)]
pub struct SynthesizerInput {
    pub idea: IdeaDraft,
    pub market_analysis: Option<MarketAnalysis>,
    pub refinement: Option<Refinement>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthesizerSkill;

impl AgentStage for SynthesizerSkill {
    type Input = SynthesizerInput;
    type Output = Synthesis;

    const NAME: &'static str = "synthesizer";

    fn system_prompt(&self) -> &'static str {
        prompts::SYNTHESIZER
    }

    fn build_prompt(&self, input: &SynthesizerInput) -> String {
        let mut prompt = format!(
            "Synthesize the final version of this startup idea.\n\n\
             Idea:\n{}\n\n\
             Market Analysis:\n{}",
            pretty(&input.idea),
            input
                .market_analysis
                .as_ref()
                .map(pretty)
                .unwrap_or_else(|| "Not available".to_string())
        );
        if let Some(refinement) = &input.refinement {
            prompt.push_str("\n\nRefinement Plan:\n");
            prompt.push_str(&pretty(refinement));
        }
        prompt.push_str(
            "\n\nProduce the final concept, key features, business model, go-to-market \
             strategy, value proposition, competitive advantage, target customers and \
             revenue projections.",
        );
        feedback::inject(prompt, input.feedback.as_deref())
    }

    fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::of::<Synthesis>("synthesis")
    }

    fn temperature(&self) -> f32 {
        0.7
    }

    fn fallback(&self, _input: &SynthesizerInput) -> Synthesis {
        Synthesis {
            final_concept: "Polished idea concept".to_string(),
            key_features: strings(&["Feature 1", "Feature 2", "Feature 3"]),
            business_model: "SaaS subscription".to_string(),
            go_to_market: "Direct sales + partnerships".to_string(),
            ..Synthesis::default()
        }
    }

    fn decode(&self, value: Value, _input: &SynthesizerInput) -> Result<Synthesis, GenerationError> {
        decode_as(Self::NAME, value)
    }
}
