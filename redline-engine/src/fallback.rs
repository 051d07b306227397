//! Deterministic collaborator fallbacks.
//!
//! When no AI collaborator is registered, or a registered one fails, the
//! generator downgrades to these keyword heuristics so a session still
//! produces a reviewable (if conservative) result.

use redline_core::{
    EngineConfig, PatchOperation, RelevanceJudgement, RiskLevel, SideEffect, Severity,
    TestCaseDocument, UpdatePlan,
};
use redline_patch::structured_steps;
use serde_json::json;

/// Keyword-overlap relevance: the share of usable brief tokens that occur
/// as substrings of the case title or serialized steps, compared
/// case-insensitively. Tokens at or below the configured length are noise
/// and ignored.
pub fn fallback_relevance(
    brief: &str,
    case: &TestCaseDocument,
    config: &EngineConfig,
) -> RelevanceJudgement {
    let tokens: Vec<String> = brief
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > config.min_token_chars)
        .collect();

    let haystack = format!("{}\n{}", case.title, case.steps.serialized()).to_lowercase();
    let matched = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
    let score = matched as f32 / tokens.len().max(1) as f32;

    RelevanceJudgement {
        is_relevant: score > config.relevance_threshold,
        relevance_score: score,
        recall_reason: format!("matched {} of {} brief keywords", matched, tokens.len()),
    }
}

/// Keyword-driven update synthesis, covering the one change class the
/// heuristic understands: a brief requesting a popup rewrites every
/// navigation step to end in a popup confirmation. Anything else yields an
/// empty plan, which the generator silently drops.
pub fn fallback_update(
    brief: &str,
    case: &TestCaseDocument,
    config: &EngineConfig,
) -> UpdatePlan {
    let brief_lower = brief.to_lowercase();
    let wants_popup = config
        .popup_keywords
        .iter()
        .any(|k| brief_lower.contains(&k.to_lowercase()));
    if !wants_popup {
        return UpdatePlan::empty("brief requests no change the keyword heuristic covers");
    }

    let steps = structured_steps(&case.steps);
    let patch: Vec<PatchOperation> = steps
        .iter()
        .enumerate()
        .filter(|(_, step)| {
            let description = step.description.to_lowercase();
            config
                .navigation_keywords
                .iter()
                .any(|k| description.contains(&k.to_lowercase()))
        })
        .map(|(i, step)| {
            PatchOperation::replace(
                &format!("/steps/{i}/description"),
                json!(format!("{} and show popup confirmation", step.description)),
            )
        })
        .collect();

    let side_effects = if patch.is_empty() {
        Vec::new()
    } else {
        vec![SideEffect::new(
            "navigation steps now expect a popup confirmation",
            Severity::Info,
        )]
    };

    UpdatePlan {
        reasoning: format!(
            "brief requests a popup; appended popup confirmation to {} navigation step(s)",
            patch.len()
        ),
        risk_level: RiskLevel::from_operation_count(patch.len()),
        patch,
        side_effects,
    }
}

// ============================================================================
// TESTS
// ============================================================================
