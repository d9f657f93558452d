//! # PM Refiner Skill
//!
//! Turns an idea plus its critique (or user feedback) into a product plan.

use super::{
    decode_as, feedback, pretty, prompts, strings, AgentStage, Constraints, Critique, IdeaDraft,
};
use crate::error::GenerationError;
use crate::generation::SchemaDescriptor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Product plan produced by the refiner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Refinement {
    pub refinements: Vec<String>,
    pub priorities: Vec<String>,
    pub timeline: String,
    pub resources: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub user_stories: Vec<String>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PmRefinerInput {
    pub idea: IdeaDraft,
    pub critique: Option<Critique>,
    pub feedback: Option<String>,
    pub constraints: Constraints,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PmRefinerSkill;

impl AgentStage for PmRefinerSkill {
    type Input = PmRefinerInput;
    type Output = Refinement;

    const NAME: &'static str = "pm_refiner";

    fn system_prompt(&self) -> &'static str {
        prompts::PM_REFINER
    }

    fn build_prompt(&self, input: &PmRefinerInput) -> String {
        let critique = input
            .critique
            .as_ref()
            .map(pretty)
            .unwrap_or_else(|| "No critique available".to_string());

        let prompt = format!(
            "Refine this startup idea into a product plan based on the critique.\n\n\
             Original Idea:\n{}\n\n\
             Critique:\n{}\n\n\
             Constraints:\n{}\n\n\
             Describe the refinements, priorities, timeline, required resources, \
             features, user stories and success metrics.",
            pretty(&input.idea),
            critique,
            pretty(&input.constraints)
        );
        feedback::inject(prompt, input.feedback.as_deref())
    }

    fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::of::<Refinement>("refinement")
    }

    fn temperature(&self) -> f32 {
        0.6
    }

    fn fallback(&self, _input: &PmRefinerInput) -> Refinement {
        Refinement {
            refinements: strings(&["Simplified feature set", "Clearer user journey"]),
            priorities: strings(&["Core functionality first", "User feedback loop"]),
            timeline: "3-6 months MVP".to_string(),
            resources: strings(&["2 developers", "1 designer"]),
            features: Vec::new(),
            user_stories: Vec::new(),
            success_metrics: Vec::new(),
        }
    }

    fn decode(&self, value: Value, _input: &PmRefinerInput) -> Result<Refinement, GenerationError> {
        decode_as(Self::NAME, value)
    }
}
