//! Component score calculators.
//!
//! Each calculator is a pure function of the idea facets, the market
//! analysis or the critique, and returns a value clamped to [0, 1].

use crate::skills::{Critique, IdeaDetails, MarketAnalysis};
use crate::state::NEUTRAL_SCORE;
use regex::Regex;
use std::sync::OnceLock;

const NOVEL_TECH: &[&str] = &["ai", "blockchain", "quantum", "ar", "vr", "iot", "ml"];
const UNIQUE_PROBLEM: &[&str] = &["new", "novel", "unique", "innovative", "breakthrough"];
const UNIQUE_SOLUTION: &[&str] = &["revolutionary", "disruptive", "cutting-edge", "pioneering"];

/// Case-insensitive whole-word alternation.
fn word_pattern(words: &[&str]) -> Option<Regex> {
    let alternation = words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).ok()
}

fn mentions(pattern: &OnceLock<Option<Regex>>, words: &[&str], text: &str) -> bool {
    pattern
        .get_or_init(|| word_pattern(words))
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

fn is_novel_tech(text: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    mentions(&PATTERN, NOVEL_TECH, text)
}

fn has_unique_problem(text: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    mentions(&PATTERN, UNIQUE_PROBLEM, text)
}

fn has_unique_solution(text: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    mentions(&PATTERN, UNIQUE_SOLUTION, text)
}

fn clamp_unit(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

/// Market signal from growth tier, opportunity and trend counts, and
/// whether the idea targets one of the analysed segments.
pub fn market_signal_score(idea: &IdeaDetails, market: Option<&MarketAnalysis>) -> f64 {
    let Some(market) = market else {
        return NEUTRAL_SCORE;
    };

    let mut score = 0.0;

    let growth = market.growth_potential.to_lowercase();
    if !growth.trim().is_empty() {
        score += if growth.contains("high") {
            0.3
        } else if growth.contains("medium") {
            0.2
        } else {
            0.1
        };
    }

    score += (market.opportunities.len() as f64 * 0.1).min(0.3);
    score += (market.key_trends.len() as f64 * 0.05).min(0.2);

    let target = idea.target_market.to_lowercase();
    if !target.trim().is_empty()
        && market.target_segments.iter().any(|segment| {
            let segment = segment.trim().to_lowercase();
            !segment.is_empty() && target.contains(&segment)
        })
    {
        score += 0.2;
    }

    clamp_unit(score)
}

/// Feasibility from stack size, timeline tier, business model detail and
/// feature count.
pub fn feasibility_score(idea: &IdeaDetails) -> f64 {
    let mut score = 0.0;

    let stack = idea.technology_requirements.len();
    if stack > 0 {
        score += (1.0 - stack as f64 * 0.1).max(0.0) * 0.3;
    }

    let timeline = idea.implementation_timeline.to_lowercase();
    if !timeline.trim().is_empty() {
        score += if timeline.contains("3 months") || timeline.contains("6 months") {
            0.3
        } else if timeline.contains("1 year") {
            0.2
        } else {
            0.1
        };
    }

    let model = idea.business_model.trim();
    if !model.is_empty() {
        score += if model.chars().count() > 50 { 0.2 } else { 0.1 };
    }

    score += match idea.key_features.len() {
        0 => 0.0,
        1..=2 => 0.1,
        3..=7 => 0.2,
        _ => 0.05,
    };

    clamp_unit(score)
}

/// Novelty from differentiators, novel technology and uniqueness markers.
pub fn novelty_score(idea: &IdeaDetails) -> f64 {
    let mut score = (idea.differentiators.len() as f64 * 0.15).min(0.4);

    let novel_tech = idea
        .technology_requirements
        .iter()
        .filter(|tech| is_novel_tech(tech))
        .count();
    score += (novel_tech as f64 * 0.1).min(0.3);

    if has_unique_problem(&idea.problem) {
        score += 0.2;
    }
    if has_unique_solution(&idea.solution) {
        score += 0.1;
    }

    clamp_unit(score)
}

/// Mean of the critic's 0-10 sub-scores, normalized to [0, 1]. Falls back
/// to the overall critique score when no sub-scores were given.
pub fn critic_severity_score(critique: Option<&Critique>) -> f64 {
    let Some(critique) = critique else {
        return NEUTRAL_SCORE;
    };

    let present: Vec<f64> = critique
        .scores
        .present()
        .into_iter()
        .filter(|score| score.is_finite())
        .collect();

    let mean = if present.is_empty() {
        critique.score
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    };

    if !mean.is_finite() {
        return NEUTRAL_SCORE;
    }
    clamp_unit(mean / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::CriticScores;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_market_signal_without_analysis_is_neutral() {
        assert_eq!(market_signal_score(&IdeaDetails::default(), None), 0.5);
    }

    #[test]
    fn test_market_signal_components() {
        let market = MarketAnalysis {
            growth_potential: "High growth".into(),
            opportunities: strings(&["a", "b", "c", "d"]),
            key_trends: strings(&["x", "y"]),
            target_segments: strings(&["Pet owners", "Vets"]),
            ..MarketAnalysis::default()
        };
        let idea = IdeaDetails {
            target_market: "Urban pet owners aged 25-40".into(),
            ..IdeaDetails::default()
        };
        // 0.3 growth + 0.3 capped opportunities + 0.1 trends + 0.2 alignment
        assert!((market_signal_score(&idea, Some(&market)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_feasibility_components() {
        let idea = IdeaDetails {
            technology_requirements: strings(&["Rust", "Postgres"]),
            implementation_timeline: "6 months to MVP".into(),
            business_model: "Subscription".into(),
            key_features: strings(&["a", "b", "c"]),
            ..IdeaDetails::default()
        };
        // 0.8 * 0.3 + 0.3 + 0.1 + 0.2
        assert!((feasibility_score(&idea) - 0.84).abs() < 1e-9);
        assert_eq!(feasibility_score(&IdeaDetails::default()), 0.0);
    }

    #[test]
    fn test_large_stack_and_many_features() {
        let idea = IdeaDetails {
            technology_requirements: (0..12).map(|i| format!("tech {i}")).collect(),
            implementation_timeline: "2 years".into(),
            key_features: (0..9).map(|i| format!("feature {i}")).collect(),
            ..IdeaDetails::default()
        };
        assert!((feasibility_score(&idea) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_novel_tech_is_word_matched() {
        assert!(is_novel_tech("AI-powered matching"));
        assert!(is_novel_tech("AR glasses"));
        assert!(!is_novel_tech("React frontend"));
        assert!(!is_novel_tech("Mailchimp"));
    }

    #[test]
    fn test_novelty_components() {
        let idea = IdeaDetails {
            differentiators: strings(&["a", "b", "c"]),
            technology_requirements: strings(&["ML ranking", "IoT collars", "Blockchain", "VR"]),
            problem: "A unique gap in pet care".into(),
            solution: "A cutting-edge marketplace".into(),
            ..IdeaDetails::default()
        };
        // 0.4 capped + 0.3 capped + 0.2 + 0.1, clamped
        assert_eq!(novelty_score(&idea), 1.0);
        assert_eq!(novelty_score(&IdeaDetails::default()), 0.0);
    }

    #[test]
    fn test_critic_severity() {
        assert_eq!(critic_severity_score(None), 0.5);

        let mut critique = Critique {
            score: 6.0,
            ..Critique::default()
        };
        assert!((critic_severity_score(Some(&critique)) - 0.6).abs() < 1e-9);

        critique.scores = CriticScores {
            feasibility: Some(8.0),
            innovation: Some(4.0),
            ..CriticScores::default()
        };
        assert!((critic_severity_score(Some(&critique)) - 0.6).abs() < 1e-9);

        critique.scores.overall = Some(15.0);
        critique.scores.feasibility = Some(15.0);
        critique.scores.innovation = Some(15.0);
        assert_eq!(critic_severity_score(Some(&critique)), 1.0);
    }
}
