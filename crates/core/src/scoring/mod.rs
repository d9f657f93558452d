//! # Composite Scorer
//!
//! Four component scores, each in [0, 1], combined by a weighted sum:
//!
//! ```text
//! overall = market_signal * w_m + feasibility * w_f + novelty * w_n + critic_severity * w_c
//! ```
//!
//! The weight table is process-wide; updates are validated and swapped
//! under an exclusive lock so concurrent scoring always sees one
//! consistent set.

pub mod components;
pub mod weights;

pub use components::{critic_severity_score, feasibility_score, market_signal_score, novelty_score};
pub use weights::{ScoringWeights, WEIGHT_TOLERANCE};

use crate::error::{ScoringError, WeightError};
use crate::skills::{Critique, IdeaDetails, MarketAnalysis};
use crate::state::IdeaSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// Per-aspect scores of one idea
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub market_signal: f64,
    pub feasibility: f64,
    pub novelty: f64,
    pub critic_severity: f64,
}

impl ComponentScores {
    /// Weighted sum, clamped to [0, 1].
    pub fn overall(&self, weights: &ScoringWeights) -> f64 {
        let sum = self.market_signal * weights.market_signal
            + self.feasibility * weights.feasibility
            + self.novelty * weights.novelty
            + self.critic_severity * weights.critic_severity;
        sum.clamp(0.0, 1.0)
    }

    fn check_finite(&self) -> Result<(), ScoringError> {
        [
            ("market_signal", self.market_signal),
            ("feasibility", self.feasibility),
            ("novelty", self.novelty),
            ("critic_severity", self.critic_severity),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map_or(Ok(()), |(component, _)| {
            Err(ScoringError::NonFinite { component })
        })
    }
}

/// What the calculators read from a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringInputs {
    pub idea: IdeaDetails,
    pub market_analysis: Option<MarketAnalysis>,
    pub critique: Option<Critique>,
}

impl ScoringInputs {
    /// Merge the drafted idea with later stage outputs. Synthesizer and
    /// refiner values win over the generator's where they are present.
    pub fn from_snapshot(snapshot: &IdeaSnapshot) -> Self {
        let mut idea = snapshot.details.clone();

        if let Some(synthesis) = &snapshot.synthesizer_output {
            if !synthesis.business_model.trim().is_empty() {
                idea.business_model = synthesis.business_model.clone();
            }
            if !synthesis.key_features.is_empty() {
                idea.key_features = synthesis.key_features.clone();
            }
            if idea.target_market.trim().is_empty() && !synthesis.target_customers.is_empty() {
                idea.target_market = synthesis.target_customers.join(", ");
            }
        }

        if let Some(refinement) = &snapshot.pm_refiner_output {
            if idea.implementation_timeline.trim().is_empty() {
                idea.implementation_timeline = refinement.timeline.clone();
            }
        }

        Self {
            idea,
            market_analysis: snapshot.market_analysis.clone(),
            critique: snapshot.critic_output.clone(),
        }
    }

    pub fn component_scores(&self) -> ComponentScores {
        ComponentScores {
            market_signal: market_signal_score(&self.idea, self.market_analysis.as_ref()),
            feasibility: feasibility_score(&self.idea),
            novelty: novelty_score(&self.idea),
            critic_severity: critic_severity_score(self.critique.as_ref()),
        }
    }
}

/// Vector-similarity collaborator consulted for novelty.
#[async_trait]
pub trait NoveltyOracle: Send + Sync {
    /// Highest similarity in [0, 1] between the idea and anything known.
    async fn max_similarity(&self, snapshot: &IdeaSnapshot) -> Result<f64, ScoringError>;
}

/// Weighted aggregator holding the shared weight table
#[derive(Debug, Default)]
pub struct CompositeScorer {
    weights: RwLock<ScoringWeights>,
}

impl CompositeScorer {
    pub fn new(weights: ScoringWeights) -> Result<Self, WeightError> {
        weights.validate()?;
        Ok(Self {
            weights: RwLock::new(weights),
        })
    }

    /// Consistent copy of the current weights.
    pub fn weights(&self) -> ScoringWeights {
        *self.weights.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the weights. Invalid sets are rejected and the old weights
    /// stay in effect.
    pub fn update_weights(&self, weights: ScoringWeights) -> Result<(), WeightError> {
        weights.validate()?;
        *self.weights.write().unwrap_or_else(PoisonError::into_inner) = weights;
        tracing::info!(?weights, "Scoring weights updated");
        Ok(())
    }

    pub fn score(&self, components: &ComponentScores) -> f64 {
        components.overall(&self.weights())
    }

    /// Recompute all scores for a snapshot. With an oracle the heuristic
    /// novelty is blended 50/50 with `1 - max_similarity`.
    pub async fn score_snapshot(
        &self,
        snapshot: &IdeaSnapshot,
        oracle: Option<&dyn NoveltyOracle>,
    ) -> Result<(ComponentScores, f64), ScoringError> {
        let mut components = ScoringInputs::from_snapshot(snapshot).component_scores();

        if let Some(oracle) = oracle {
            let similarity = oracle.max_similarity(snapshot).await?;
            if !similarity.is_finite() {
                return Err(ScoringError::Novelty {
                    message: format!("similarity is not finite: {}", similarity),
                });
            }
            let distinct = 1.0 - similarity.clamp(0.0, 1.0);
            components.novelty = (0.5 * components.novelty + 0.5 * distinct).clamp(0.0, 1.0);
        }

        components.check_finite()?;
        let overall = self.score(&components);
        tracing::debug!(
            idea_id = %snapshot.id,
            overall,
            market_signal = components.market_signal,
            feasibility = components.feasibility,
            novelty = components.novelty,
            critic_severity = components.critic_severity,
            "Idea scored"
        );
        Ok((components, overall))
    }
}

/// One row of a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedIdea {
    /// 1 = best
    pub rank: usize,
    pub id: String,
    pub title: String,
    pub overall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreGap {
    pub from_rank: usize,
    pub to_rank: usize,
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Ranking of a set of ideas by overall score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub ranked: Vec<RankedIdea>,
    /// `None` for an empty input
    pub stats: Option<ScoreStats>,
    pub gaps: Vec<ScoreGap>,
}

/// Rank snapshots by overall score, best first.
pub fn compare(snapshots: &[IdeaSnapshot]) -> Comparison {
    let mut sorted: Vec<&IdeaSnapshot> = snapshots.iter().collect();
    sorted.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));

    let ranked: Vec<RankedIdea> = sorted
        .iter()
        .enumerate()
        .map(|(index, snapshot)| RankedIdea {
            rank: index + 1,
            id: snapshot.id.clone(),
            title: snapshot.title.clone(),
            overall_score: snapshot.overall_score,
        })
        .collect();

    let gaps = ranked
        .windows(2)
        .map(|pair| ScoreGap {
            from_rank: pair[0].rank,
            to_rank: pair[1].rank,
            gap: pair[0].overall_score - pair[1].overall_score,
        })
        .collect();

    Comparison {
        stats: stats(&ranked),
        ranked,
        gaps,
    }
}

fn stats(ranked: &[RankedIdea]) -> Option<ScoreStats> {
    if ranked.is_empty() {
        return None;
    }
    let n = ranked.len() as f64;
    // Ranked descending, so first is max and last is min.
    let scores: Vec<f64> = ranked.iter().rev().map(|r| r.overall_score).collect();
    let mean = scores.iter().sum::<f64>() / n;
    let mid = scores.len() / 2;
    let median = if scores.len() % 2 == 0 {
        (scores[mid - 1] + scores[mid]) / 2.0
    } else {
        scores[mid]
    };
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

    Some(ScoreStats {
        min: scores[0],
        max: scores[scores.len() - 1],
        mean,
        median,
        std_dev: variance.sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{Constraints, IdeaDraft, Synthesis};
    use proptest::prelude::*;

    fn snapshot(title: &str, overall: f64) -> IdeaSnapshot {
        let mut snapshot = IdeaSnapshot::draft(
            "pets",
            Constraints::new(),
            IdeaDraft {
                title: title.into(),
                ..IdeaDraft::default()
            },
            MarketAnalysis::default(),
        );
        snapshot.overall_score = overall;
        snapshot
    }

    struct FixedOracle(Result<f64, ScoringError>);

    #[async_trait]
    impl NoveltyOracle for FixedOracle {
        async fn max_similarity(&self, _snapshot: &IdeaSnapshot) -> Result<f64, ScoringError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_weighted_overall_example() {
        let weights = ScoringWeights::new(0.3, 0.25, 0.25, 0.2);
        let components = ComponentScores {
            market_signal: 0.8,
            feasibility: 0.6,
            novelty: 0.9,
            critic_severity: 0.4,
        };
        assert!((components.overall(&weights) - 0.695).abs() < 1e-9);
    }

    #[test]
    fn test_rejected_update_keeps_old_weights() {
        let scorer = CompositeScorer::default();
        let before = scorer.weights();
        assert!(scorer
            .update_weights(ScoringWeights::new(0.5, 0.5, 0.5, 0.5))
            .is_err());
        assert_eq!(scorer.weights(), before);
    }

    #[test]
    fn test_synthesis_overrides_generator_facets() {
        let mut snapshot = snapshot("A", 0.0);
        snapshot.details.business_model = "Ads".into();
        snapshot.synthesizer_output = Some(Synthesis {
            business_model: "Subscription with a per-visit fee for premium sitters".into(),
            key_features: vec!["Booking".into()],
            target_customers: vec!["Pet owners".into()],
            ..Synthesis::default()
        });

        let inputs = ScoringInputs::from_snapshot(&snapshot);
        assert!(inputs.idea.business_model.starts_with("Subscription"));
        assert_eq!(inputs.idea.key_features, vec!["Booking"]);
        assert_eq!(inputs.idea.target_market, "Pet owners");
    }

    #[tokio::test]
    async fn test_oracle_blends_novelty() {
        let scorer = CompositeScorer::default();
        let snapshot = snapshot("A", 0.0);

        let (plain, _) = scorer.score_snapshot(&snapshot, None).await.unwrap();
        assert_eq!(plain.novelty, 0.0);

        let oracle = FixedOracle(Ok(0.2));
        let (blended, overall) = scorer.score_snapshot(&snapshot, Some(&oracle)).await.unwrap();
        assert!((blended.novelty - 0.4).abs() < 1e-9);
        assert!((overall - scorer.score(&blended)).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_oracle_failure_is_scoring_error() {
        let scorer = CompositeScorer::default();
        let oracle = FixedOracle(Err(ScoringError::Novelty {
            message: "index offline".into(),
        }));
        let result = scorer.score_snapshot(&snapshot("A", 0.0), Some(&oracle)).await;
        assert!(matches!(result, Err(ScoringError::Novelty { .. })));
    }

    #[test]
    fn test_compare_ranks_and_gaps() {
        let comparison = compare(&[snapshot("low", 0.2), snapshot("high", 0.9), snapshot("mid", 0.5)]);
        let titles: Vec<_> = comparison.ranked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "mid", "low"]);
        assert_eq!(comparison.ranked[0].rank, 1);

        let stats = comparison.stats.unwrap();
        assert_eq!(stats.max, 0.9);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.median, 0.5);
        assert!((comparison.gaps[0].gap - 0.4).abs() < 1e-9);
        assert_eq!(comparison.gaps.len(), 2);
    }

    #[test]
    fn test_compare_empty() {
        let comparison = compare(&[]);
        assert!(comparison.ranked.is_empty());
        assert!(comparison.stats.is_none());
    }

    fn unit() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    proptest! {
        #[test]
        fn prop_overall_stays_in_unit_interval(
            m in unit(), f in unit(), n in unit(), c in unit(),
            raw in prop::array::uniform4(0.0f64..1.0),
        ) {
            let total: f64 = raw.iter().sum();
            prop_assume!(total > 1e-6);
            let weights = ScoringWeights::new(
                raw[0] / total, raw[1] / total, raw[2] / total, raw[3] / total,
            );
            let scores = ComponentScores { market_signal: m, feasibility: f, novelty: n, critic_severity: c };
            let overall = scores.overall(&weights);
            prop_assert!((0.0..=1.0).contains(&overall));
        }

        #[test]
        fn prop_weight_update_respects_tolerance(
            raw in prop::array::uniform4(0.0f64..0.5),
        ) {
            let scorer = CompositeScorer::default();
            let before = scorer.weights();
            let candidate = ScoringWeights::new(raw[0], raw[1], raw[2], raw[3]);
            let result = scorer.update_weights(candidate);

            if (candidate.sum() - 1.0).abs() <= WEIGHT_TOLERANCE {
                prop_assert!(result.is_ok());
                prop_assert_eq!(scorer.weights(), candidate);
                let market_only = ComponentScores { market_signal: 1.0, feasibility: 0.0, novelty: 0.0, critic_severity: 0.0 };
                prop_assert!((scorer.score(&market_only) - candidate.market_signal.min(1.0)).abs() < 1e-12);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(scorer.weights(), before);
            }
        }

        #[test]
        fn prop_normalized_weights_are_accepted(raw in prop::array::uniform4(0.01f64..1.0)) {
            let total: f64 = raw.iter().sum();
            let scorer = CompositeScorer::default();
            let weights = ScoringWeights::new(raw[0] / total, raw[1] / total, raw[2] / total, raw[3] / total);
            prop_assert!(scorer.update_weights(weights).is_ok());
            prop_assert_eq!(scorer.weights(), weights);
        }

        #[test]
        fn prop_blended_novelty_stays_in_unit_interval(similarity in -2.0f64..3.0) {
            let scorer = CompositeScorer::default();
            let oracle = FixedOracle(Ok(similarity));
            let (components, overall) =
                tokio_test::block_on(scorer.score_snapshot(&snapshot("A", 0.0), Some(&oracle)))
                    .unwrap();
            prop_assert!((0.0..=1.0).contains(&components.novelty));
            prop_assert!((0.0..=1.0).contains(&overall));
        }
    }
}
