//! Scoring weights and the sum-to-one invariant.

use crate::error::WeightError;
use serde::{Deserialize, Serialize};

/// Allowed distance of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Relative importance of each component score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub market_signal: f64,
    pub feasibility: f64,
    pub novelty: f64,
    pub critic_severity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            market_signal: 0.3,
            feasibility: 0.25,
            novelty: 0.25,
            critic_severity: 0.2,
        }
    }
}

impl ScoringWeights {
    pub fn new(market_signal: f64, feasibility: f64, novelty: f64, critic_severity: f64) -> Self {
        Self {
            market_signal,
            feasibility,
            novelty,
            critic_severity,
        }
    }

    pub fn sum(&self) -> f64 {
        self.market_signal + self.feasibility + self.novelty + self.critic_severity
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("market_signal", self.market_signal),
            ("feasibility", self.feasibility),
            ("novelty", self.novelty),
            ("critic_severity", self.critic_severity),
        ]
    }

    /// Weights must be finite, non-negative and sum to 1.0 within tolerance.
    pub fn validate(&self) -> Result<(), WeightError> {
        if let Some((name, value)) = self
            .named()
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(WeightError::Invalid { name, value });
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(WeightError::SumOutOfTolerance { sum });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_are_valid() {
        let weights = ScoringWeights::default();
        assert!(weights.validate().is_ok());
        assert!((weights.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tolerance_boundary() {
        assert!(ScoringWeights::new(0.3, 0.25, 0.25, 0.205).validate().is_ok());
        match ScoringWeights::new(0.3, 0.3, 0.3, 0.3).validate() {
            Err(WeightError::SumOutOfTolerance { sum }) => assert!((sum - 1.2).abs() < 1e-9),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = ScoringWeights::new(0.7, 0.5, -0.2, 0.0).validate().unwrap_err();
        assert_eq!(
            err,
            WeightError::Invalid {
                name: "novelty",
                value: -0.2
            }
        );
    }
}
