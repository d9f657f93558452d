//! # Cofounder Skills
//!
//! The agent stages of the idea pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator
//!   └── AgentStage::run (prompt + schema + fallback)
//!         └── StructuredGenerator (backend)
//! ```
//!
//! ## Stages
//!
//! - `MarketAnalystSkill` - sizes the market around a topic
//! - `IdeaGeneratorSkill` - drafts N ideas from the analysis
//! - `CriticSkill` - critiques and scores one idea
//! - `PmRefinerSkill` - turns critique or feedback into a product plan
//! - `SynthesizerSkill` - produces the final concept
//!
//! `RewriteSkill` is the generic feedback-guided description rewrite used by
//! iterations that target no particular stage.
//!
//! A stage never fails: when the backend errors or answers with something
//! unusable, the stage substitutes its documented fallback and says so in
//! the returned [`StageRun`].

pub mod feedback;
pub mod prompts;

pub mod critic_skill;
pub mod idea_generator_skill;
pub mod market_analyst_skill;
pub mod pm_refiner_skill;
pub mod rewrite_skill;
pub mod synthesizer_skill;

pub use critic_skill::{CriticInput, CriticScores, CriticSkill, Critique};
pub use idea_generator_skill::{IdeaDetails, IdeaDraft, IdeaGeneratorInput, IdeaGeneratorSkill};
pub use market_analyst_skill::{MarketAnalysis, MarketAnalystInput, MarketAnalystSkill};
pub use pm_refiner_skill::{PmRefinerInput, PmRefinerSkill, Refinement};
pub use rewrite_skill::{RewriteInput, RewriteSkill, RewrittenDescription};
pub use synthesizer_skill::{Synthesis, SynthesizerInput, SynthesizerSkill};

use crate::error::GenerationError;
use crate::generation::{GenerationRequest, SchemaDescriptor, StructuredGenerator};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Free-form generation constraints (budget, region, team size, ...).
pub type Constraints = serde_json::Map<String, Value>;

/// Result of one stage execution.
#[derive(Debug, Clone)]
pub struct StageRun<T> {
    pub output: T,
    /// Why the fallback was used, if it was
    pub fallback_reason: Option<GenerationError>,
}

impl<T> StageRun<T> {
    pub fn generated(output: T) -> Self {
        Self {
            output,
            fallback_reason: None,
        }
    }

    pub fn fallback(output: T, reason: GenerationError) -> Self {
        Self {
            output,
            fallback_reason: Some(reason),
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }

    pub fn into_output(self) -> T {
        self.output
    }
}

/// One agent stage: prompt policy, output schema and fallback.
#[async_trait]
pub trait AgentStage: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Stage name used in logs and events
    const NAME: &'static str;

    fn system_prompt(&self) -> &'static str;

    /// User prompt for `input`, including any feedback directive.
    fn build_prompt(&self, input: &Self::Input) -> String;

    fn schema(&self) -> SchemaDescriptor;

    fn temperature(&self) -> f32;

    /// Deterministic output used when generation fails.
    fn fallback(&self, input: &Self::Input) -> Self::Output;

    /// Turn the validated JSON into the stage output.
    fn decode(&self, value: Value, input: &Self::Input) -> Result<Self::Output, GenerationError>;

    /// Build the full generation request for `input`.
    fn request(&self, input: &Self::Input) -> GenerationRequest {
        GenerationRequest::new(self.build_prompt(input), self.schema())
            .with_system_prompt(self.system_prompt())
            .with_temperature(self.temperature())
    }

    /// Run the stage. Never fails; falls back on any generation error.
    async fn run(
        &self,
        generator: &dyn StructuredGenerator,
        input: &Self::Input,
    ) -> StageRun<Self::Output> {
        let request = self.request(input);
        let decoded = match generator.generate(&request).await {
            Ok(value) => self.decode(value, input),
            Err(error) => Err(error),
        };

        match decoded {
            Ok(output) => {
                tracing::debug!(stage = Self::NAME, backend = generator.name(), "Stage completed");
                StageRun::generated(output)
            }
            Err(error) => {
                tracing::warn!(
                    stage = Self::NAME,
                    backend = generator.name(),
                    error = %error,
                    "Stage failed, using fallback"
                );
                StageRun::fallback(self.fallback(input), error)
            }
        }
    }
}

/// Deserialize a stage payload, reporting a schema mismatch on failure.
pub(crate) fn decode_as<T: DeserializeOwned>(
    schema: &str,
    value: Value,
) -> Result<T, GenerationError> {
    serde_json::from_value(value).map_err(|e| GenerationError::SchemaMismatch {
        schema: schema.to_string(),
        message: e.to_string(),
    })
}

/// Pretty JSON for embedding structured context into prompts.
pub(crate) fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Owned copies of string literals.
pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
