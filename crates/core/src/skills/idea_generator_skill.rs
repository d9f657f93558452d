//! # Idea Generator Skill
//!
//! Drafts exactly `count` ideas from the market analysis. Short answers are
//! padded with placeholder ideas so callers can rely on the count.

use super::{decode_as, pretty, prompts, AgentStage, Constraints, MarketAnalysis};
use crate::error::GenerationError;
use crate::generation::SchemaDescriptor;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Business facets of an idea, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdeaDetails {
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub target_market: String,
    #[serde(default)]
    pub business_model: String,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub differentiators: Vec<String>,
    #[serde(default)]
    pub technology_requirements: Vec<String>,
    /// e.g. "3 months to MVP"
    #[serde(default)]
    pub implementation_timeline: String,
}

/// One drafted idea
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdeaDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub details: IdeaDetails,
}

impl IdeaDraft {
    /// Placeholder for slot `index` (0-based).
    pub fn placeholder(index: usize, topic: &str) -> Self {
        Self {
            title: format!("Idea {} for {}", index + 1, topic),
            description: format!("Detailed description for idea {}", index + 1),
            details: IdeaDetails::default(),
        }
    }
}

/// Wire shape of the generator answer
#[derive(JsonSchema)]
struct IdeaBatch {
    ideas: Vec<IdeaDraft>,
}

#[derive(Debug, Clone)]
pub struct IdeaGeneratorInput {
    pub topic: String,
    pub constraints: Constraints,
    pub market_analysis: MarketAnalysis,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdeaGeneratorSkill;

impl IdeaGeneratorSkill {
    fn pad(mut ideas: Vec<IdeaDraft>, input: &IdeaGeneratorInput) -> Vec<IdeaDraft> {
        ideas.truncate(input.count);
        let missing = input.count - ideas.len();
        if missing > 0 {
            tracing::warn!(
                stage = Self::NAME,
                requested = input.count,
                missing,
                "Generator returned too few ideas, padding with placeholders"
            );
        }
        for index in ideas.len()..input.count {
            ideas.push(IdeaDraft::placeholder(index, &input.topic));
        }
        ideas
    }
}

impl AgentStage for IdeaGeneratorSkill {
    type Input = IdeaGeneratorInput;
    type Output = Vec<IdeaDraft>;

    const NAME: &'static str = "idea_generator";

    fn system_prompt(&self) -> &'static str {
        prompts::IDEA_GENERATOR
    }

    fn build_prompt(&self, input: &IdeaGeneratorInput) -> String {
        format!(
            "Generate {} distinct startup ideas for the topic below.\n\n\
             Topic: {}\n\n\
             Market Analysis:\n{}\n\n\
             Constraints:\n{}\n\n\
             Return them under \"ideas\". For each idea give a title, a description, \
             the problem, the solution, the target market, the business model, key \
             features, differentiators, technology requirements and an implementation \
             timeline.",
            input.count,
            input.topic,
            pretty(&input.market_analysis),
            pretty(&input.constraints)
        )
    }

    fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::of::<IdeaBatch>("idea_batch")
    }

    fn temperature(&self) -> f32 {
        0.8
    }

    fn fallback(&self, input: &IdeaGeneratorInput) -> Vec<IdeaDraft> {
        (0..input.count)
            .map(|index| IdeaDraft::placeholder(index, &input.topic))
            .collect()
    }

    fn decode(
        &self,
        value: Value,
        input: &IdeaGeneratorInput,
    ) -> Result<Vec<IdeaDraft>, GenerationError> {
        let entries = match value {
            Value::Object(mut object) => match object.remove("ideas") {
                Some(Value::Array(entries)) => entries,
                _ => {
                    return Err(GenerationError::SchemaMismatch {
                        schema: Self::NAME.to_string(),
                        message: "\"ideas\" is not an array".to_string(),
                    })
                }
            },
            _ => {
                return Err(GenerationError::SchemaMismatch {
                    schema: Self::NAME.to_string(),
                    message: "expected an object with \"ideas\"".to_string(),
                })
            }
        };

        let ideas: Vec<IdeaDraft> = entries
            .into_iter()
            .filter_map(|entry| decode_as::<IdeaDraft>(Self::NAME, entry).ok())
            .filter(|idea| !idea.title.trim().is_empty())
            .map(|mut idea| {
                if idea.description.trim().is_empty() {
                    idea.description = format!("{} {}", idea.details.problem, idea.details.solution)
                        .trim()
                        .to_string();
                }
                idea
            })
            .collect();

        if ideas.is_empty() && input.count > 0 {
            return Err(GenerationError::SchemaMismatch {
                schema: Self::NAME.to_string(),
                message: "no usable ideas in response".to_string(),
            });
        }

        Ok(Self::pad(ideas, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{OfflineGenerator, ScriptedGenerator};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn input(count: usize) -> IdeaGeneratorInput {
        IdeaGeneratorInput {
            topic: "pet-sitting app".to_string(),
            constraints: Constraints::new(),
            market_analysis: MarketAnalysis::default(),
            count,
        }
    }

    #[tokio::test]
    async fn test_fallback_numbers_ideas_from_one() {
        let run = IdeaGeneratorSkill.run(&OfflineGenerator::new(), &input(2)).await;
        assert!(run.used_fallback());
        assert_eq!(
            run.output,
            vec![
                IdeaDraft::placeholder(0, "pet-sitting app"),
                IdeaDraft::placeholder(1, "pet-sitting app"),
            ]
        );
        assert_eq!(run.output[1].title, "Idea 2 for pet-sitting app");
        assert_eq!(run.output[1].description, "Detailed description for idea 2");
    }

    #[tokio::test]
    async fn test_short_answer_is_padded() {
        let generator = ScriptedGenerator::new().with_response(
            "idea_batch",
            json!({"ideas": [
                {"title": "PawPal", "description": "Sitters on demand", "key_features": ["Booking"]},
                {"description": "no title, dropped"}
            ]}),
        );
        let run = IdeaGeneratorSkill.run(&generator, &input(3)).await;
        assert!(!run.used_fallback());
        assert_eq!(run.output.len(), 3);
        assert_eq!(run.output[0].title, "PawPal");
        assert_eq!(run.output[0].details.key_features, vec!["Booking"]);
        assert_eq!(run.output[1].title, "Idea 2 for pet-sitting app");
        assert_eq!(run.output[2].title, "Idea 3 for pet-sitting app");
    }

    #[tokio::test]
    async fn test_long_answer_is_truncated() {
        let generator = ScriptedGenerator::new().with_response(
            "idea_batch",
            json!({"ideas": [{"title": "A"}, {"title": "B"}, {"title": "C"}]}),
        );
        let run = IdeaGeneratorSkill.run(&generator, &input(2)).await;
        let titles: Vec<_> = run.output.iter().map(|idea| idea.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_description_built_from_problem_and_solution() {
        let value = json!({"ideas": [{"title": "A", "problem": "Pets get lonely.", "solution": "Video calls."}]});
        let ideas = IdeaGeneratorSkill.decode(value, &input(1)).unwrap();
        assert_eq!(ideas[0].description, "Pets get lonely. Video calls.");
    }

    #[test]
    fn test_prompt_mentions_count_and_topic() {
        let prompt = IdeaGeneratorSkill.build_prompt(&input(4));
        assert!(prompt.contains("Generate 4 distinct"));
        assert!(prompt.contains("pet-sitting app"));
    }
}
