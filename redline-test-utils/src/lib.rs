//! REDLINE Test Utilities
//!
//! Centralized test infrastructure for the REDLINE workspace:
//! - Scripted and failing collaborator providers
//! - Proptest generators for entity types
//! - Test fixtures for common scenarios

// Re-export mock storage from its source crate
pub use redline_storage::MockStorage;

// Re-export core types and llm mocks for convenience
pub use redline_core::{
    compute_content_hash, new_entity_id, BulkEditSession, CasePatchProposal, CaseSteps,
    ContentHash, EngineConfig, EntityId, PatchOperation, ProposalApplyStatus, RedlineError,
    RedlineResult, RelevanceJudgement, RiskLevel, SessionScope, SessionStatus, StepRecord,
    TestCaseDocument, UpdatePlan,
};
pub use redline_llm::{MockRelevanceProvider, MockUpdateProvider, RelevanceProvider, UpdateProvider};

use redline_core::CollaboratorError;
use std::sync::Mutex;

// ============================================================================
// SCRIPTED PROVIDERS
// ============================================================================

/// Relevance provider that replays a fixed sequence of judgements, one per
/// call, then falls back to irrelevant. Lets a test give each candidate in
/// a batch a different verdict.
pub struct ScriptedRelevance {
    script: Mutex<Vec<RelevanceJudgement>>,
}

impl ScriptedRelevance {
    pub fn new(judgements: Vec<RelevanceJudgement>) -> Self {
        let mut script = judgements;
        // Pop from the back; store reversed.
        script.reverse();
        Self {
            script: Mutex::new(script),
        }
    }
}

impl RelevanceProvider for ScriptedRelevance {
    fn judge(&self, _brief: &str, _case: &TestCaseDocument) -> RedlineResult<RelevanceJudgement> {
        let judgement = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop())
            .unwrap_or_else(|| RelevanceJudgement::irrelevant("script exhausted"));
        Ok(judgement)
    }

    fn model_id(&self) -> &str {
        "scripted-relevance"
    }
}

/// Update provider that replays a fixed sequence of plans, then empty ones.
pub struct ScriptedUpdate {
    script: Mutex<Vec<UpdatePlan>>,
}

impl ScriptedUpdate {
    pub fn new(plans: Vec<UpdatePlan>) -> Self {
        let mut script = plans;
        script.reverse();
        Self {
            script: Mutex::new(script),
        }
    }
}

impl UpdateProvider for ScriptedUpdate {
    fn plan(
        &self,
        _brief: &str,
        _case: &TestCaseDocument,
        _judgement: &RelevanceJudgement,
    ) -> RedlineResult<UpdatePlan> {
        let plan = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop())
            .unwrap_or_else(|| UpdatePlan::empty("script exhausted"));
        Ok(plan)
    }

    fn model_id(&self) -> &str {
        "scripted-update"
    }
}

// ============================================================================
// FAILING PROVIDERS
// ============================================================================

/// Relevance provider that always fails, to exercise the deterministic
/// fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRelevance;

impl RelevanceProvider for FailingRelevance {
    fn judge(&self, _brief: &str, _case: &TestCaseDocument) -> RedlineResult<RelevanceJudgement> {
        Err(CollaboratorError::RelevanceFailed {
            reason: "simulated outage".to_string(),
        }
        .into())
    }

    fn model_id(&self) -> &str {
        "failing-relevance"
    }
}

/// Update provider that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingUpdate;

impl UpdateProvider for FailingUpdate {
    fn plan(
        &self,
        _brief: &str,
        _case: &TestCaseDocument,
        _judgement: &RelevanceJudgement,
    ) -> RedlineResult<UpdatePlan> {
        Err(CollaboratorError::UpdateFailed {
            reason: "simulated outage".to_string(),
        }
        .into())
    }

    fn model_id(&self) -> &str {
        "failing-update"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for REDLINE entity types.

    use super::*;
    use proptest::prelude::*;

    /// Step descriptions that survive text round-trips: non-empty, single
    /// line, no ordinal marker, no surrounding whitespace.
    pub fn step_description() -> impl Strategy<Value = String> {
        "[a-z][a-z ]{0,28}[a-z]".prop_map(|s| s.trim().to_string())
    }

    /// Structured step records with description only.
    pub fn step_record() -> impl Strategy<Value = StepRecord> {
        step_description().prop_map(|d| StepRecord::from_description(&d))
    }

    /// Either representation of a steps field, built from the same
    /// description pool.
    pub fn case_steps() -> impl Strategy<Value = CaseSteps> {
        let descriptions = prop::collection::vec(step_description(), 1..8);
        descriptions.prop_flat_map(|descriptions| {
            let text = descriptions
                .iter()
                .enumerate()
                .map(|(i, d)| format!("{}、{}", i + 1, d))
                .collect::<Vec<_>>()
                .join("\n");
            let records: Vec<StepRecord> = descriptions
                .iter()
                .map(|d| StepRecord::from_description(d))
                .collect();
            prop_oneof![
                Just(CaseSteps::Serialized(text)),
                Just(CaseSteps::Structured(records)),
            ]
        })
    }

    /// A replace operation on some step's description.
    pub fn replace_step_op() -> impl Strategy<Value = PatchOperation> {
        (0usize..8, step_description()).prop_map(|(i, description)| {
            PatchOperation::replace(
                &format!("/steps/{i}/description"),
                serde_json::json!(description),
            )
        })
    }

    /// A whole test case within the fixed portal/auth scope.
    pub fn test_case() -> impl Strategy<Value = TestCaseDocument> {
        ("[a-z ]{3,30}", case_steps())
            .prop_map(|(title, steps)| TestCaseDocument::new(&title, steps, "portal", "auth"))
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// A case whose second step is a navigation step, matching the popup
    /// rewrite heuristic.
    pub fn nav_case() -> TestCaseDocument {
        TestCaseDocument::new(
            "login flow",
            CaseSteps::Serialized("1、click login button\n2、navigate to home page".to_string()),
            "portal",
            "auth",
        )
    }

    /// A case with no navigation steps and no login keywords.
    pub fn plain_case() -> TestCaseDocument {
        TestCaseDocument::new(
            "invoice export",
            CaseSteps::Serialized("1、open invoice\n2、press export".to_string()),
            "portal",
            "billing",
        )
    }

    /// A structurally-stepped variant of the nav case.
    pub fn structured_nav_case() -> TestCaseDocument {
        TestCaseDocument::new(
            "login flow",
            CaseSteps::Structured(vec![
                StepRecord::from_description("click login button"),
                StepRecord::from_description("navigate to home page"),
            ]),
            "portal",
            "auth",
        )
    }

    /// A fresh dry-run session asking for a popup confirmation.
    pub fn popup_session() -> BulkEditSession {
        BulkEditSession::new(SessionScope::default(), "add popup confirmation", "qa-lead")
    }

    /// A pending proposal carrying the given patch against the given case.
    pub fn pending_proposal(
        session: &BulkEditSession,
        case: &TestCaseDocument,
        patch: Vec<PatchOperation>,
        new_hash: ContentHash,
    ) -> CasePatchProposal {
        let plan = UpdatePlan {
            reasoning: "fixture plan".to_string(),
            risk_level: RiskLevel::from_operation_count(patch.len()),
            patch,
            side_effects: Vec::new(),
        };
        CasePatchProposal::new(
            session.session_id,
            case,
            &plan,
            "fixture recall",
            case.steps.content_hash(),
            new_hash,
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
