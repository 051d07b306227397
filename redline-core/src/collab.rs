//! Collaborator primitive types.
//!
//! Pure data types for the AI relevance/update exchange. Traits and the
//! registry live in redline-llm; the deterministic fallbacks live in
//! redline-engine.

use crate::{PatchOperation, RiskLevel, SideEffect};
use serde::{Deserialize, Serialize};

/// Verdict on whether a change brief applies to a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceJudgement {
    pub is_relevant: bool,
    /// Applicability measure in [0, 1].
    pub relevance_score: f32,
    /// Why the case was recalled, for operator review.
    pub recall_reason: String,
}

impl RelevanceJudgement {
    /// A judgement that rules the case out entirely.
    pub fn irrelevant(reason: &str) -> Self {
        Self {
            is_relevant: false,
            relevance_score: 0.0,
            recall_reason: reason.to_string(),
        }
    }
}

/// A synthesized edit for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub reasoning: String,
    pub patch: Vec<PatchOperation>,
    pub side_effects: Vec<SideEffect>,
    pub risk_level: RiskLevel,
}

impl UpdatePlan {
    /// A plan with no operations. The generator silently skips candidates
    /// that end up with an empty patch.
    pub fn empty(reasoning: &str) -> Self {
        Self {
            reasoning: reasoning.to_string(),
            patch: Vec::new(),
            side_effects: Vec::new(),
            risk_level: RiskLevel::Low,
        }
    }

    /// Whether the plan carries no operations.
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty()
    }
}
