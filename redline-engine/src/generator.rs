//! Dry-run proposal generation.

use redline_core::{
    BulkEditSession, CasePatchProposal, EngineConfig, RelevanceJudgement, SessionPhase,
    TestCaseDocument, UpdatePlan,
};
use redline_events::{ProgressBroadcaster, ProgressEvent};
use redline_llm::CollaboratorRegistry;
use redline_patch::apply_to_case_steps;

use crate::fallback::{fallback_relevance, fallback_update};

/// Walk the candidate list sequentially and synthesize one proposal per
/// relevant case. Candidates that are irrelevant, yield an empty plan, or
/// whose plan does not apply cleanly are skipped; the rest of the batch is
/// unaffected.
pub(crate) fn generate_proposals(
    session: &BulkEditSession,
    candidates: &[TestCaseDocument],
    registry: &CollaboratorRegistry,
    config: &EngineConfig,
    broadcaster: &dyn ProgressBroadcaster,
    seq: &mut u64,
) -> Vec<CasePatchProposal> {
    let total = candidates.len();
    let mut proposals = Vec::new();

    for (i, case) in candidates.iter().enumerate() {
        broadcaster.broadcast(ProgressEvent::SessionProgress {
            session_id: session.session_id,
            seq: *seq,
            phase: SessionPhase::GeneratingProposals,
            current: i + 1,
            total,
            case_title: case.title.clone(),
        });
        *seq += 1;

        let judgement = judge_relevance(&session.change_brief, case, registry, config);
        if !judgement.is_relevant {
            continue;
        }

        let plan = plan_update(&session.change_brief, case, &judgement, registry, config);
        if plan.is_empty() {
            continue;
        }

        let old_hash = case.steps.content_hash();
        let patched = match apply_to_case_steps(&case.steps, &plan.patch) {
            Ok(patched) => patched,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    case_id = %case.case_id,
                    "Synthesized patch does not apply; skipping candidate"
                );
                continue;
            }
        };
        let new_hash = patched.content_hash();

        proposals.push(CasePatchProposal::new(
            session.session_id,
            case,
            &plan,
            &judgement.recall_reason,
            old_hash,
            new_hash,
        ));
    }

    proposals
}

/// AI relevance with deterministic downgrade. An unconfigured role is the
/// expected offline mode; a failing provider is logged.
fn judge_relevance(
    brief: &str,
    case: &TestCaseDocument,
    registry: &CollaboratorRegistry,
    config: &EngineConfig,
) -> RelevanceJudgement {
    match registry.relevance() {
        Ok(provider) => match provider.judge(brief, case) {
            Ok(judgement) => judgement,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    case_id = %case.case_id,
                    "Relevance provider failed; using keyword fallback"
                );
                fallback_relevance(brief, case, config)
            }
        },
        Err(_) => fallback_relevance(brief, case, config),
    }
}

fn plan_update(
    brief: &str,
    case: &TestCaseDocument,
    judgement: &RelevanceJudgement,
    registry: &CollaboratorRegistry,
    config: &EngineConfig,
) -> UpdatePlan {
    match registry.update() {
        Ok(provider) => match provider.plan(brief, case, judgement) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    case_id = %case.case_id,
                    "Update provider failed; using keyword fallback"
                );
                fallback_update(brief, case, config)
            }
        },
        Err(_) => fallback_update(brief, case, config),
    }
}

// ============================================================================
// TESTS
// ============================================================================
