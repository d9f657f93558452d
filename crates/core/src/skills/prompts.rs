//! Default system prompts bundled at compile time.

/// Market Analyst - sizes the market around a topic
pub const MARKET_ANALYST: &str = include_str!("defaults/market_analyst.md");

/// Idea Generator - drafts startup concepts from the market analysis
pub const IDEA_GENERATOR: &str = include_str!("defaults/idea_generator.md");

/// Critic - scores and critiques a single idea
pub const CRITIC: &str = include_str!("defaults/critic.md");

/// PM Refiner - turns critique into a product plan
pub const PM_REFINER: &str = include_str!("defaults/pm_refiner.md");

/// Synthesizer - merges everything into the final concept
pub const SYNTHESIZER: &str = include_str!("defaults/synthesizer.md");

/// Rewriter - feedback-guided description rewrite
pub const REWRITER: &str = include_str!("defaults/rewriter.md");

/// All default prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("market_analyst", MARKET_ANALYST),
        ("idea_generator", IDEA_GENERATOR),
        ("critic", CRITIC),
        ("pm_refiner", PM_REFINER),
        ("synthesizer", SYNTHESIZER),
        ("rewriter", REWRITER),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_prompts_non_empty() {
        for (slug, content) in all_defaults() {
            assert!(!content.is_empty(), "Prompt '{}' should not be empty", slug);
            assert!(content.len() > 50, "Prompt '{}' seems too short", slug);
        }
    }

    #[test]
    fn test_prompt_count() {
        assert_eq!(all_defaults().len(), 6, "Should have 6 default prompts");
    }
}
