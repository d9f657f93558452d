//! # Rewrite Skill
//!
//! Feedback-guided rewrite of an idea description, used by iterations that
//! do not target a specific stage.

use super::{decode_as, feedback, prompts, AgentStage};
use crate::error::GenerationError;
use crate::generation::SchemaDescriptor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RewrittenDescription {
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RewriteInput {
    pub title: String,
    pub description: String,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteSkill;

impl AgentStage for RewriteSkill {
    type Input = RewriteInput;
    type Output = String;

    const NAME: &'static str = "rewriter";

    fn system_prompt(&self) -> &'static str {
        prompts::REWRITER
    }

    fn build_prompt(&self, input: &RewriteInput) -> String {
        let prompt = format!(
            "Rewrite the description of this startup idea.\n\n\
             Title: {}\n\n\
             Current Description:\n{}",
            input.title, input.description
        );
        feedback::inject(prompt, Some(&input.feedback))
    }

    fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::of::<RewrittenDescription>("rewritten_description")
    }

    fn temperature(&self) -> f32 {
        0.6
    }

    fn fallback(&self, input: &RewriteInput) -> String {
        format!(
            "{}\n\n[Refined based on feedback: {}]",
            input.description, input.feedback
        )
    }

    fn decode(&self, value: Value, _input: &RewriteInput) -> Result<String, GenerationError> {
        let rewritten: RewrittenDescription = decode_as(Self::NAME, value)?;
        if rewritten.description.trim().is_empty() {
            return Err(GenerationError::SchemaMismatch {
                schema: Self::NAME.to_string(),
                message: "description is empty".to_string(),
            });
        }
        Ok(rewritten.description)
    }
}
