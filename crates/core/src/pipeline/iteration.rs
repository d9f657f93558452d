//! Iteration selector.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Which single stage an iteration re-runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationType {
    /// Critic, writes `critic_output`
    Critique,
    /// PMRefiner, writes `pm_refiner_output`
    Refinement,
    /// Synthesizer, writes `synthesizer_output`
    Synthesis,
    /// MarketAnalyst, writes `market_analysis` and `market_analyst_output`
    MarketAnalysis,
    /// Feedback-guided rewrite of the description
    General,
}

impl IterationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critique => "critique",
            Self::Refinement => "refinement",
            Self::Synthesis => "synthesis",
            Self::MarketAnalysis => "market_analysis",
            Self::General => "general",
        }
    }
}

impl FromStr for IterationType {
    type Err = Infallible;

    /// Unknown selectors map to `General`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "critique" | "critic" => Self::Critique,
            "refinement" | "refine" | "pm_refiner" => Self::Refinement,
            "synthesis" | "synthesize" | "synthesizer" => Self::Synthesis,
            "market_analysis" | "market" | "market_analyst" => Self::MarketAnalysis,
            _ => Self::General,
        })
    }
}

impl From<&str> for IterationType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for IterationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
