//! Session lifecycle orchestration.

use redline_core::{
    BulkEditSession, CasePatchProposal, EngineConfig, EntityId, ProposalApplyStatus,
    RedlineResult, SessionError, SessionPhase, SessionScope, SessionStatus,
};
use redline_events::{NullBroadcaster, ProgressBroadcaster, ProgressEvent};
use redline_llm::CollaboratorRegistry;
use redline_storage::{ProposalUpdate, SessionUpdate, StorageTrait};
use std::sync::Arc;

use crate::applier::{self, ApplyOutcome};
use crate::generator::generate_proposals;
use crate::selector::CandidateSelector;

/// A session with its proposals and per-status tallies, for operator review.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDetails {
    pub session: BulkEditSession,
    pub proposals: Vec<CasePatchProposal>,
    pub pending_count: usize,
    pub applied_count: usize,
    pub skipped_count: usize,
    pub conflicted_count: usize,
}

/// The bulk-edit engine: owns the storage handle, collaborator registry,
/// candidate selector, broadcaster, and tuning knobs, and drives sessions
/// through their full lifecycle.
pub struct BulkEditEngine {
    storage: Arc<dyn StorageTrait>,
    collaborators: CollaboratorRegistry,
    selector: Arc<dyn CandidateSelector>,
    broadcaster: Arc<dyn ProgressBroadcaster>,
    config: EngineConfig,
}

impl BulkEditEngine {
    /// Create an engine with no collaborators, a discarded event stream,
    /// and default configuration.
    pub fn new(storage: Arc<dyn StorageTrait>, selector: Arc<dyn CandidateSelector>) -> Self {
        Self {
            storage,
            collaborators: CollaboratorRegistry::new(),
            selector,
            broadcaster: Arc::new(NullBroadcaster),
            config: EngineConfig::default(),
        }
    }

    /// Set the collaborator registry.
    pub fn with_collaborators(mut self, collaborators: CollaboratorRegistry) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Set the progress broadcaster.
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn ProgressBroadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// Set the engine configuration. Validated on the next `create_session`.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // === Session Operations ===

    /// Run a full dry run: persist the session, discover candidates,
    /// generate proposals, and settle the session in `ProposalsReady`,
    /// `NoCasesFound`, or `Failed`.
    ///
    /// Collaborator outages degrade to the keyword fallbacks and never fail
    /// the session; selector and storage failures abort it, after a
    /// best-effort error broadcast and `Failed` mark.
    pub fn create_session(
        &self,
        scope: SessionScope,
        change_brief: &str,
        created_by: &str,
    ) -> RedlineResult<BulkEditSession> {
        self.config.validate()?;
        let session = BulkEditSession::new(scope, change_brief, created_by);

        match self.run_dry_run(&session) {
            Ok(settled) => Ok(settled),
            Err(e) => {
                self.broadcaster.broadcast(ProgressEvent::SessionError {
                    session_id: session.session_id,
                    message: e.to_string(),
                });
                self.mark_failed(session.session_id);
                Err(SessionError::CreateFailed {
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    fn run_dry_run(&self, session: &BulkEditSession) -> RedlineResult<BulkEditSession> {
        self.storage.session_insert(session)?;
        self.broadcaster.broadcast(ProgressEvent::SessionStarted {
            session_id: session.session_id,
            phase: SessionPhase::FindingCases,
        });

        let candidates = self
            .selector
            .select(&session.scope, &session.change_brief)?;
        if candidates.is_empty() {
            return self.settle(session.session_id, SessionStatus::NoCasesFound, 0);
        }

        let mut seq = 0;
        let proposals = generate_proposals(
            session,
            &candidates,
            &self.collaborators,
            &self.config,
            self.broadcaster.as_ref(),
            &mut seq,
        );
        if proposals.is_empty() {
            return self.settle(session.session_id, SessionStatus::NoCasesFound, 0);
        }

        for proposal in &proposals {
            self.storage.proposal_insert(proposal)?;
        }
        self.settle(
            session.session_id,
            SessionStatus::ProposalsReady,
            proposals.len(),
        )
    }

    /// Persist a terminal-or-reviewable status, re-read the session, and
    /// announce completion.
    fn settle(
        &self,
        session_id: EntityId,
        status: SessionStatus,
        proposal_count: usize,
    ) -> RedlineResult<BulkEditSession> {
        self.storage.session_update(
            session_id,
            SessionUpdate {
                status: Some(status),
            },
        )?;
        let session = self.load_session(session_id)?;
        self.broadcaster.broadcast(ProgressEvent::SessionCompleted {
            session_id,
            status,
            proposal_count,
        });
        Ok(session)
    }

    fn mark_failed(&self, session_id: EntityId) {
        let update = SessionUpdate {
            status: Some(SessionStatus::Failed),
        };
        if let Err(e) = self.storage.session_update(session_id, update) {
            tracing::warn!(
                error = %e,
                session_id = %session_id,
                "Failed to mark session failed"
            );
        }
    }

    fn load_session(&self, session_id: EntityId) -> RedlineResult<BulkEditSession> {
        self.storage
            .session_get(session_id)?
            .ok_or_else(|| SessionError::NotFound { id: session_id }.into())
    }

    /// Apply the requested pending proposals, then move the session to
    /// `Applied` regardless of partial failures; individual outcomes are in
    /// the returned tallies.
    pub fn apply_proposals(
        &self,
        session_id: EntityId,
        proposal_ids: &[EntityId],
    ) -> RedlineResult<ApplyOutcome> {
        let session = self.load_session(session_id)?;
        if session.status != SessionStatus::ProposalsReady {
            return Err(SessionError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Applied,
            }
            .into());
        }

        let mut seq = 0;
        let outcome = match applier::apply_proposals(
            self.storage.as_ref(),
            &session,
            proposal_ids,
            &self.config,
            self.broadcaster.as_ref(),
            &mut seq,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.broadcaster.broadcast(ProgressEvent::ApplyError {
                    session_id,
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        self.storage.session_update(
            session_id,
            SessionUpdate {
                status: Some(SessionStatus::Applied),
            },
        )?;
        Ok(outcome)
    }

    /// Mark unwanted pending proposals `Skipped` ahead of an apply.
    /// Unknown, foreign, and non-pending ids are ignored. Returns how many
    /// proposals were marked.
    pub fn skip_proposals(
        &self,
        session_id: EntityId,
        proposal_ids: &[EntityId],
    ) -> RedlineResult<usize> {
        let session = self.load_session(session_id)?;
        let eligible: Vec<EntityId> = self
            .storage
            .proposal_list_by_session(session.session_id)?
            .into_iter()
            .filter(|p| p.apply_status == ProposalApplyStatus::Pending)
            .filter(|p| proposal_ids.contains(&p.proposal_id))
            .map(|p| p.proposal_id)
            .collect();

        for id in &eligible {
            self.storage.proposal_update(
                *id,
                ProposalUpdate {
                    apply_status: Some(ProposalApplyStatus::Skipped),
                },
            )?;
        }
        Ok(eligible.len())
    }

    /// Cancel a reviewable session. Cooperative only: an already-running
    /// generation is not interrupted.
    pub fn cancel_session(&self, session_id: EntityId) -> RedlineResult<BulkEditSession> {
        self.load_session(session_id)?;
        self.storage.session_update(
            session_id,
            SessionUpdate {
                status: Some(SessionStatus::Cancelled),
            },
        )?;
        self.broadcaster
            .broadcast(ProgressEvent::SessionCancelled { session_id });
        self.load_session(session_id)
    }

    /// Fetch a session with its proposals and per-status tallies.
    pub fn get_session_details(&self, session_id: EntityId) -> RedlineResult<SessionDetails> {
        let session = self.load_session(session_id)?;
        let proposals = self.storage.proposal_list_by_session(session_id)?;

        let count = |status: ProposalApplyStatus| {
            proposals.iter().filter(|p| p.apply_status == status).count()
        };
        Ok(SessionDetails {
            pending_count: count(ProposalApplyStatus::Pending),
            applied_count: count(ProposalApplyStatus::Applied),
            skipped_count: count(ProposalApplyStatus::Skipped),
            conflicted_count: count(ProposalApplyStatus::Conflicted),
            session,
            proposals,
        })
    }
}

impl std::fmt::Debug for BulkEditEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkEditEngine")
            .field("collaborators", &self.collaborators)
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::FixedSelector;
    use redline_core::{
        CaseSteps, CollaboratorError, RedlineError, TestCaseDocument,
    };
    use redline_events::RecordingBroadcaster;
    use redline_llm::MockRelevanceProvider;
    use redline_storage::MockStorage;

    struct FailingSelector;

    impl CandidateSelector for FailingSelector {
        fn select(
            &self,
            _scope: &SessionScope,
            _brief: &str,
        ) -> RedlineResult<Vec<TestCaseDocument>> {
            Err(CollaboratorError::SelectorFailed {
                reason: "search backend unreachable".to_string(),
            }
            .into())
        }
    }

    fn nav_case() -> TestCaseDocument {
        TestCaseDocument::new(
            "login flow",
            CaseSteps::Serialized("1、click login button\n2、navigate to home page".to_string()),
            "portal",
            "auth",
        )
    }

    fn engine_with(
        storage: Arc<MockStorage>,
        candidates: Vec<TestCaseDocument>,
        broadcaster: Arc<RecordingBroadcaster>,
    ) -> BulkEditEngine {
        let mut collaborators = CollaboratorRegistry::new();
        collaborators.register_relevance(Box::new(MockRelevanceProvider::always_relevant(0.9)));
        BulkEditEngine::new(storage, Arc::new(FixedSelector::new(candidates)))
            .with_collaborators(collaborators)
            .with_broadcaster(broadcaster)
    }

    #[test]
    fn test_create_session_reaches_proposals_ready() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let case = nav_case();
        storage.case_insert(&case).unwrap();
        let engine = engine_with(storage.clone(), vec![case], broadcaster.clone());

        let session = engine
            .create_session(SessionScope::default(), "add popup confirmation", "qa-lead")
            .unwrap();
        assert_eq!(session.status, SessionStatus::ProposalsReady);

        let details = engine.get_session_details(session.session_id).unwrap();
        assert_eq!(details.proposals.len(), 1);
        assert_eq!(details.pending_count, 1);

        let events = broadcaster.events();
        assert!(matches!(events[0], ProgressEvent::SessionStarted { .. }));
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::SessionCompleted {
                status: SessionStatus::ProposalsReady,
                proposal_count: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_candidates_settles_no_cases_found() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let engine = engine_with(storage, vec![], broadcaster.clone());

        let session = engine
            .create_session(SessionScope::default(), "add popup confirmation", "qa-lead")
            .unwrap();
        assert_eq!(session.status, SessionStatus::NoCasesFound);
        assert!(matches!(
            broadcaster.events().last(),
            Some(ProgressEvent::SessionCompleted {
                status: SessionStatus::NoCasesFound,
                proposal_count: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_no_proposals_settles_no_cases_found() {
        // Relevance gate passes nothing without a registered collaborator
        // and with no keyword overlap.
        let case = TestCaseDocument::new(
            "invoice export",
            CaseSteps::Serialized("1、open invoice".to_string()),
            "portal",
            "billing",
        );
        let engine = BulkEditEngine::new(
            Arc::new(MockStorage::new()),
            Arc::new(FixedSelector::new(vec![case])),
        );

        let session = engine
            .create_session(SessionScope::default(), "totally unrelated brief", "qa-lead")
            .unwrap();
        assert_eq!(session.status, SessionStatus::NoCasesFound);
    }

    #[test]
    fn test_selector_failure_fails_session() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let engine = BulkEditEngine::new(storage.clone(), Arc::new(FailingSelector))
            .with_broadcaster(broadcaster.clone());

        let result =
            engine.create_session(SessionScope::default(), "add popup confirmation", "qa-lead");
        assert!(matches!(
            result,
            Err(RedlineError::Session(SessionError::CreateFailed { .. }))
        ));

        // The session was persisted and marked failed.
        let events = broadcaster.events();
        let session_id = events[0].session_id();
        let failed = storage.session_get(session_id).unwrap().unwrap();
        assert_eq!(failed.status, SessionStatus::Failed);
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::SessionError { .. })));
    }

    #[test]
    fn test_apply_moves_session_to_applied() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let case = nav_case();
        storage.case_insert(&case).unwrap();
        let engine = engine_with(storage.clone(), vec![case], broadcaster.clone());

        let session = engine
            .create_session(SessionScope::default(), "add popup confirmation", "qa-lead")
            .unwrap();
        let details = engine.get_session_details(session.session_id).unwrap();
        let ids: Vec<EntityId> = details.proposals.iter().map(|p| p.proposal_id).collect();

        let outcome = engine.apply_proposals(session.session_id, &ids).unwrap();
        assert_eq!(outcome.applied_count, 1);
        assert_eq!(outcome.failed_count, 0);

        let applied = storage.session_get(session.session_id).unwrap().unwrap();
        assert_eq!(applied.status, SessionStatus::Applied);
        assert!(applied.applied_at.is_some());
        assert!(matches!(
            broadcaster.events().last(),
            Some(ProgressEvent::ApplyCompleted { .. })
        ));
    }

    #[test]
    fn test_apply_rejected_outside_proposals_ready() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let engine = engine_with(storage, vec![], broadcaster);

        let session = engine
            .create_session(SessionScope::default(), "add popup confirmation", "qa-lead")
            .unwrap();
        // Session settled NoCasesFound; applying is not a legal move.
        let result = engine.apply_proposals(session.session_id, &[]);
        assert!(matches!(
            result,
            Err(RedlineError::Session(SessionError::InvalidTransition { .. }))
        ));
    }

    #[test]
    fn test_cancel_session() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let case = nav_case();
        let engine = engine_with(storage, vec![case], broadcaster.clone());

        let session = engine
            .create_session(SessionScope::default(), "add popup confirmation", "qa-lead")
            .unwrap();
        let cancelled = engine.cancel_session(session.session_id).unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        assert!(matches!(
            broadcaster.events().last(),
            Some(ProgressEvent::SessionCancelled { .. })
        ));

        // Terminal; applying afterwards is rejected.
        assert!(engine.apply_proposals(session.session_id, &[]).is_err());
    }

    #[test]
    fn test_skip_proposals_marks_pending_only() {
        let storage = Arc::new(MockStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let case_a = nav_case();
        let case_b = nav_case();
        let engine = engine_with(storage, vec![case_a, case_b], broadcaster);

        let session = engine
            .create_session(SessionScope::default(), "add popup confirmation", "qa-lead")
            .unwrap();
        let details = engine.get_session_details(session.session_id).unwrap();
        assert_eq!(details.proposals.len(), 2);
        let first = details.proposals[0].proposal_id;

        let skipped = engine.skip_proposals(session.session_id, &[first]).unwrap();
        assert_eq!(skipped, 1);
        // Skipping the same id again does nothing.
        let again = engine.skip_proposals(session.session_id, &[first]).unwrap();
        assert_eq!(again, 0);

        let details = engine.get_session_details(session.session_id).unwrap();
        assert_eq!(details.skipped_count, 1);
        assert_eq!(details.pending_count, 1);
    }

    #[test]
    fn test_get_session_details_unknown_session() {
        let storage = Arc::new(MockStorage::new());
        let engine = BulkEditEngine::new(storage, Arc::new(FixedSelector::empty()));
        let result = engine.get_session_details(redline_core::new_entity_id());
        assert!(matches!(
            result,
            Err(RedlineError::Session(SessionError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_any_write() {
        let storage = Arc::new(MockStorage::new());
        let engine = BulkEditEngine::new(storage.clone(), Arc::new(FixedSelector::empty()))
            .with_config(EngineConfig {
                relevance_threshold: 2.0,
                ..EngineConfig::default()
            });

        let result =
            engine.create_session(SessionScope::default(), "add popup confirmation", "qa-lead");
        assert!(matches!(result, Err(RedlineError::Config(_))));
        assert_eq!(storage.session_count(), 0);
    }
}
