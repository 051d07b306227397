//! Proposal application.

use redline_core::{
    BulkEditSession, CasePatchProposal, EngineConfig, EntityId, EntityType, PatchOperation,
    ProposalApplyStatus, RedlineError, RedlineResult, SessionPhase, StorageError, ValidationError,
};
use redline_events::{ProgressBroadcaster, ProgressEvent};
use redline_patch::apply_to_case_steps;
use redline_storage::{ProposalUpdate, StorageTrait};

/// Outcome of one proposal within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalApplyResult {
    pub proposal_id: EntityId,
    pub case_id: EntityId,
    pub case_title: String,
    pub status: ProposalApplyStatus,
    /// Version number of the backup snapshot taken before the write; only
    /// present when the proposal applied.
    pub new_version: Option<i64>,
    /// Failure detail when the proposal ended `Conflicted`.
    pub error: Option<String>,
}

/// Aggregate outcome of an application batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplyOutcome {
    pub applied_count: usize,
    pub failed_count: usize,
    pub results: Vec<ProposalApplyResult>,
}

/// Apply the requested pending proposals of a session, one at a time.
///
/// Ids that are unknown, belong to another session, or are no longer
/// pending are silently ignored. A failing proposal is marked `Conflicted`
/// (best effort) and counted; it never aborts the rest of the batch.
pub(crate) fn apply_proposals(
    storage: &dyn StorageTrait,
    session: &BulkEditSession,
    requested: &[EntityId],
    config: &EngineConfig,
    broadcaster: &dyn ProgressBroadcaster,
    seq: &mut u64,
) -> RedlineResult<ApplyOutcome> {
    let eligible: Vec<CasePatchProposal> = storage
        .proposal_list_by_session(session.session_id)?
        .into_iter()
        .filter(|p| p.apply_status == ProposalApplyStatus::Pending)
        .filter(|p| requested.contains(&p.proposal_id))
        .collect();
    let total = eligible.len();

    broadcaster.broadcast(ProgressEvent::ApplyStarted {
        session_id: session.session_id,
        total,
    });

    let mut outcome = ApplyOutcome::default();
    for (i, proposal) in eligible.iter().enumerate() {
        broadcaster.broadcast(ProgressEvent::ApplyProgress {
            session_id: session.session_id,
            seq: *seq,
            phase: SessionPhase::ApplyingProposals,
            current: i + 1,
            total,
            case_title: proposal.case_title.clone(),
        });
        *seq += 1;

        match apply_single(storage, proposal, config) {
            Ok(new_version) => {
                outcome.applied_count += 1;
                outcome.results.push(ProposalApplyResult {
                    proposal_id: proposal.proposal_id,
                    case_id: proposal.case_id,
                    case_title: proposal.case_title.clone(),
                    status: ProposalApplyStatus::Applied,
                    new_version: Some(new_version),
                    error: None,
                });
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    proposal_id = %proposal.proposal_id,
                    case_id = %proposal.case_id,
                    "Proposal application failed; marking conflicted"
                );
                mark_conflicted(storage, proposal.proposal_id);
                outcome.failed_count += 1;
                outcome.results.push(ProposalApplyResult {
                    proposal_id: proposal.proposal_id,
                    case_id: proposal.case_id,
                    case_title: proposal.case_title.clone(),
                    status: ProposalApplyStatus::Conflicted,
                    new_version: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    broadcaster.broadcast(ProgressEvent::ApplyCompleted {
        session_id: session.session_id,
        applied_count: outcome.applied_count,
        failed_count: outcome.failed_count,
    });

    Ok(outcome)
}

/// Apply one proposal: load the live case, check the optimistic hash,
/// decode and run the patch, snapshot the pre-patch content, then write
/// the patched steps and the applied mark in one storage transaction.
/// Returns the version number of the backup snapshot.
fn apply_single(
    storage: &dyn StorageTrait,
    proposal: &CasePatchProposal,
    config: &EngineConfig,
) -> RedlineResult<i64> {
    let case = storage.case_get(proposal.case_id)?.ok_or(RedlineError::Storage(
        StorageError::NotFound {
            entity_type: EntityType::Case,
            id: proposal.case_id,
        },
    ))?;

    if config.verify_old_hash && case.steps.content_hash() != proposal.old_hash {
        return Err(RedlineError::Storage(StorageError::ConstraintViolation {
            constraint: "old_hash".to_string(),
            reason: "live content changed since proposal generation".to_string(),
        }));
    }

    let operations = decode_operations(&proposal.diff_json)?;
    let patched = apply_to_case_steps(&case.steps, &operations)?;

    let length = patched.serialized().chars().count();
    if length > config.max_steps_chars {
        return Err(RedlineError::Validation(ValidationError::Oversized {
            length,
            limit: config.max_steps_chars,
        }));
    }

    let snapshot = storage.version_create(case.case_id, &case.steps.serialized())?;
    storage.case_apply_update(case.case_id, &patched, proposal.proposal_id)?;
    Ok(snapshot.version)
}

/// Decode a proposal's stored operation list. Stores may persist the array
/// directly or as a pre-serialized JSON string; both decode here.
fn decode_operations(diff_json: &serde_json::Value) -> RedlineResult<Vec<PatchOperation>> {
    match diff_json {
        serde_json::Value::Array(_) => serde_json::from_value(diff_json.clone()).map_err(|e| {
            RedlineError::Validation(ValidationError::MalformedPatch {
                reason: e.to_string(),
            })
        }),
        serde_json::Value::String(text) => serde_json::from_str(text).map_err(|e| {
            RedlineError::Validation(ValidationError::MalformedPatch {
                reason: e.to_string(),
            })
        }),
        other => Err(RedlineError::Validation(ValidationError::MalformedPatch {
            reason: format!("expected an operation array, got {other}"),
        })),
    }
}

fn mark_conflicted(storage: &dyn StorageTrait, proposal_id: EntityId) {
    let update = ProposalUpdate {
        apply_status: Some(ProposalApplyStatus::Conflicted),
    };
    if let Err(e) = storage.proposal_update(proposal_id, update) {
        tracing::warn!(
            error = %e,
            proposal_id = %proposal_id,
            "Failed to mark proposal conflicted"
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
