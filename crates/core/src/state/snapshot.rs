//! # Idea Snapshots
//!
//! The versioned record the pipeline produces and the store persists, plus
//! the user feedback that references it.

use crate::error::InvalidTransition;
use crate::scoring::ComponentScores;
use crate::skills::{
    Constraints, Critique, IdeaDetails, IdeaDraft, MarketAnalysis, Refinement, Synthesis,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a snapshot
///
/// ```text
/// Draft ──▶ Completed ──▶ Refining ──▶ Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdeaStatus {
    #[default]
    Draft,
    Refining,
    Completed,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Refining => "REFINING",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(self, next: IdeaStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Completed)
                | (Self::Completed, Self::Refining)
                | (Self::Refining, Self::Completed)
        )
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Neutral score used before anything has been computed.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// One version of an idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaSnapshot {
    /// Minted once when the idea is drafted; shared by all versions
    pub id: String,
    /// Starts at 1, +1 per iteration
    pub version: u32,
    pub topic: String,
    #[serde(default)]
    pub constraints: Constraints,

    pub title: String,
    pub description: String,
    #[serde(default)]
    pub details: IdeaDetails,
    pub market_analysis: Option<MarketAnalysis>,

    pub market_analyst_output: Option<MarketAnalysis>,
    pub critic_output: Option<Critique>,
    pub pm_refiner_output: Option<Refinement>,
    pub synthesizer_output: Option<Synthesis>,

    pub feasibility_score: f64,
    pub novelty_score: f64,
    pub market_signal_score: f64,
    pub critic_severity_score: f64,
    pub overall_score: f64,

    pub status: IdeaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdeaSnapshot {
    /// New version-1 draft for a generated idea.
    pub fn draft(
        topic: impl Into<String>,
        constraints: Constraints,
        idea: IdeaDraft,
        market_analysis: MarketAnalysis,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: 1,
            topic: topic.into(),
            constraints,
            title: idea.title,
            description: idea.description,
            details: idea.details,
            market_analyst_output: Some(market_analysis.clone()),
            market_analysis: Some(market_analysis),
            critic_output: None,
            pm_refiner_output: None,
            synthesizer_output: None,
            feasibility_score: NEUTRAL_SCORE,
            novelty_score: NEUTRAL_SCORE,
            market_signal_score: NEUTRAL_SCORE,
            critic_severity_score: NEUTRAL_SCORE,
            overall_score: NEUTRAL_SCORE,
            status: IdeaStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// The idea as stage input.
    pub fn idea(&self) -> IdeaDraft {
        IdeaDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            details: self.details.clone(),
        }
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: IdeaStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Copy into the next version, status REFINING. Only a COMPLETED
    /// snapshot can be iterated.
    pub fn next_version(&self) -> Result<Self, InvalidTransition> {
        let mut next = self.clone();
        next.transition(IdeaStatus::Refining)?;
        next.version = self.version + 1;
        Ok(next)
    }

    pub fn component_scores(&self) -> ComponentScores {
        ComponentScores {
            market_signal: self.market_signal_score,
            feasibility: self.feasibility_score,
            novelty: self.novelty_score,
            critic_severity: self.critic_severity_score,
        }
    }

    pub fn apply_scores(&mut self, scores: ComponentScores, overall: f64) {
        self.market_signal_score = scores.market_signal;
        self.feasibility_score = scores.feasibility;
        self.novelty_score = scores.novelty;
        self.critic_severity_score = scores.critic_severity;
        self.overall_score = overall;
    }
}

/// User feedback on an idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub idea_id: String,
    /// Free-form category, e.g. "general", "market", "feature"
    pub feedback_type: String,
    pub content: String,
    /// 1-5
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(
        idea_id: impl Into<String>,
        feedback_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            idea_id: idea_id.into(),
            feedback_type: feedback_type.into(),
            content: content.into(),
            rating: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a rating, clamped to 1-5.
    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating.clamp(1, 5));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> IdeaSnapshot {
        IdeaSnapshot::draft(
            "pets",
            Constraints::new(),
            IdeaDraft::placeholder(0, "pets"),
            MarketAnalysis::default(),
        )
    }

    #[test]
    fn test_draft_starts_at_version_one() {
        let snapshot = snapshot();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.status, IdeaStatus::Draft);
        assert_eq!(snapshot.title, "Idea 1 for pets");
        assert!(snapshot.market_analyst_output.is_some());
        assert_eq!(snapshot.overall_score, NEUTRAL_SCORE);
    }

    #[test]
    fn test_status_transitions() {
        assert!(IdeaStatus::Draft.can_transition_to(IdeaStatus::Completed));
        assert!(IdeaStatus::Completed.can_transition_to(IdeaStatus::Refining));
        assert!(IdeaStatus::Refining.can_transition_to(IdeaStatus::Completed));
        assert!(!IdeaStatus::Draft.can_transition_to(IdeaStatus::Refining));
        assert!(!IdeaStatus::Completed.can_transition_to(IdeaStatus::Draft));
    }

    #[test]
    fn test_next_version_requires_completed() {
        let mut snapshot = snapshot();
        let err = snapshot.next_version().unwrap_err();
        assert_eq!(err.from, IdeaStatus::Draft);

        snapshot.transition(IdeaStatus::Completed).unwrap();
        let next = snapshot.next_version().unwrap();
        assert_eq!(next.id, snapshot.id);
        assert_eq!(next.version, 2);
        assert_eq!(next.status, IdeaStatus::Refining);
        assert_eq!(snapshot.version, 1);
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&IdeaStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
    }

    #[test]
    fn test_feedback_rating_clamped() {
        let feedback = Feedback::new("idea", "general", "love it").with_rating(9);
        assert_eq!(feedback.rating, Some(5));
    }
}
