//! REDLINE Storage - Storage Trait and Mock Implementation
//!
//! Defines the storage abstraction layer for REDLINE entities: sessions,
//! proposals, test cases, and version snapshots. Production backends are
//! user-supplied; the in-memory mock here backs the test suites and the
//! engine's documentation examples.

use redline_core::{
    BulkEditSession, CasePatchProposal, CaseSteps, EntityType, ProposalApplyStatus, RedlineError,
    RedlineResult, SessionScope, SessionStatus, StorageError, TestCaseDocument, VersionSnapshot,
    MAX_STEPS_CHARS,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// New status; the write goes through the session's forward-only state
    /// machine and is rejected if the move is not permitted.
    pub status: Option<SessionStatus>,
}

/// Update payload for proposals.
#[derive(Debug, Clone, Default)]
pub struct ProposalUpdate {
    /// New apply status; moving to `Applied` stamps `applied_at`.
    pub apply_status: Option<ProposalApplyStatus>,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage trait for REDLINE entities.
/// Implementations provide persistence for sessions, proposals, cases, and
/// version snapshots.
pub trait StorageTrait: Send + Sync {
    // === Session Operations ===

    /// Insert a new session.
    fn session_insert(&self, s: &BulkEditSession) -> RedlineResult<()>;

    /// Get a session by ID.
    fn session_get(&self, id: Uuid) -> RedlineResult<Option<BulkEditSession>>;

    /// Update a session. Status changes are validated against the session
    /// state machine.
    fn session_update(&self, id: Uuid, update: SessionUpdate) -> RedlineResult<()>;

    // === Proposal Operations ===

    /// Insert a new proposal.
    fn proposal_insert(&self, p: &CasePatchProposal) -> RedlineResult<()>;

    /// Get a proposal by ID.
    fn proposal_get(&self, id: Uuid) -> RedlineResult<Option<CasePatchProposal>>;

    /// List proposals belonging to a session, oldest first.
    fn proposal_list_by_session(&self, session_id: Uuid) -> RedlineResult<Vec<CasePatchProposal>>;

    /// Update a proposal.
    fn proposal_update(&self, id: Uuid, update: ProposalUpdate) -> RedlineResult<()>;

    // === Case Operations ===

    /// Insert a new test case.
    fn case_insert(&self, c: &TestCaseDocument) -> RedlineResult<()>;

    /// Get a test case by ID.
    fn case_get(&self, id: Uuid) -> RedlineResult<Option<TestCaseDocument>>;

    /// List test cases matching a session scope.
    fn case_list_by_scope(&self, scope: &SessionScope) -> RedlineResult<Vec<TestCaseDocument>>;

    /// Write a case's patched steps and mark the driving proposal applied,
    /// as one transaction. Neither write happens if either entity is
    /// missing or the steps exceed the size ceiling.
    fn case_apply_update(
        &self,
        case_id: Uuid,
        steps: &CaseSteps,
        proposal_id: Uuid,
    ) -> RedlineResult<()>;

    // === Version Operations ===

    /// Create a version snapshot of a case's steps content. Version numbers
    /// are assigned monotonically per case, starting at 1.
    fn version_create(&self, case_id: Uuid, content: &str) -> RedlineResult<VersionSnapshot>;

    /// List snapshots for a case, oldest first.
    fn version_list_by_case(&self, case_id: Uuid) -> RedlineResult<Vec<VersionSnapshot>>;
}

// ============================================================================
// MOCK STORAGE
// ============================================================================

/// In-memory mock storage for testing.
#[derive(Debug, Default)]
pub struct MockStorage {
    sessions: Arc<RwLock<HashMap<Uuid, BulkEditSession>>>,
    proposals: Arc<RwLock<HashMap<Uuid, CasePatchProposal>>>,
    cases: Arc<RwLock<HashMap<Uuid, TestCaseDocument>>>,
    versions: Arc<RwLock<HashMap<Uuid, Vec<VersionSnapshot>>>>,
}

fn read_guard<T>(lock: &RwLock<T>) -> RedlineResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| RedlineError::Storage(StorageError::LockPoisoned))
}

fn write_guard<T>(lock: &RwLock<T>) -> RedlineResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| RedlineError::Storage(StorageError::LockPoisoned))
}

/// Whether a case falls inside a session scope. The priority filter is
/// carried for external case stores; local cases hold no priority field,
/// so it does not constrain the mock.
fn case_in_scope(case: &TestCaseDocument, scope: &SessionScope) -> bool {
    if let Some(system) = &scope.system {
        if &case.system != system {
            return false;
        }
    }
    if let Some(module) = &scope.module {
        if &case.module != module {
            return false;
        }
    }
    scope.tags.iter().all(|tag| case.tags.contains(tag))
}

fn check_steps_ceiling(steps: &CaseSteps) -> RedlineResult<()> {
    let length = steps.serialized().chars().count();
    if length > MAX_STEPS_CHARS {
        return Err(RedlineError::Storage(StorageError::OversizedPayload {
            length,
            limit: MAX_STEPS_CHARS,
        }));
    }
    Ok(())
}

impl MockStorage {
    /// Create a new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.clear();
        }
        if let Ok(mut proposals) = self.proposals.write() {
            proposals.clear();
        }
        if let Ok(mut cases) = self.cases.write() {
            cases.clear();
        }
        if let Ok(mut versions) = self.versions.write() {
            versions.clear();
        }
    }

    /// Get count of stored sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored proposals.
    pub fn proposal_count(&self) -> usize {
        self.proposals.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored cases.
    pub fn case_count(&self) -> usize {
        self.cases.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl StorageTrait for MockStorage {
    // === Session Operations ===

    fn session_insert(&self, s: &BulkEditSession) -> RedlineResult<()> {
        let mut sessions = write_guard(&self.sessions)?;
        if sessions.contains_key(&s.session_id) {
            return Err(RedlineError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Session,
                reason: "already exists".to_string(),
            }));
        }
        sessions.insert(s.session_id, s.clone());
        Ok(())
    }

    fn session_get(&self, id: Uuid) -> RedlineResult<Option<BulkEditSession>> {
        let sessions = read_guard(&self.sessions)?;
        Ok(sessions.get(&id).cloned())
    }

    fn session_update(&self, id: Uuid, update: SessionUpdate) -> RedlineResult<()> {
        let mut sessions = write_guard(&self.sessions)?;
        let session = sessions
            .get_mut(&id)
            .ok_or(RedlineError::Storage(StorageError::NotFound {
                entity_type: EntityType::Session,
                id,
            }))?;

        if let Some(status) = update.status {
            session.transition(status)?;
        }

        Ok(())
    }

    // === Proposal Operations ===

    fn proposal_insert(&self, p: &CasePatchProposal) -> RedlineResult<()> {
        let mut proposals = write_guard(&self.proposals)?;
        if proposals.contains_key(&p.proposal_id) {
            return Err(RedlineError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Proposal,
                reason: "already exists".to_string(),
            }));
        }
        proposals.insert(p.proposal_id, p.clone());
        Ok(())
    }

    fn proposal_get(&self, id: Uuid) -> RedlineResult<Option<CasePatchProposal>> {
        let proposals = read_guard(&self.proposals)?;
        Ok(proposals.get(&id).cloned())
    }

    fn proposal_list_by_session(&self, session_id: Uuid) -> RedlineResult<Vec<CasePatchProposal>> {
        let proposals = read_guard(&self.proposals)?;
        let mut matched: Vec<CasePatchProposal> = proposals
            .values()
            .filter(|p| p.session_id == session_id)
            .cloned()
            .collect();
        // UUIDv7 ids sort by creation time.
        matched.sort_by_key(|p| p.proposal_id);
        Ok(matched)
    }

    fn proposal_update(&self, id: Uuid, update: ProposalUpdate) -> RedlineResult<()> {
        let mut proposals = write_guard(&self.proposals)?;
        let proposal = proposals
            .get_mut(&id)
            .ok_or(RedlineError::Storage(StorageError::NotFound {
                entity_type: EntityType::Proposal,
                id,
            }))?;

        if let Some(apply_status) = update.apply_status {
            let now = chrono::Utc::now();
            proposal.apply_status = apply_status;
            proposal.updated_at = now;
            if apply_status == ProposalApplyStatus::Applied {
                proposal.applied_at = Some(now);
            }
        }

        Ok(())
    }

    // === Case Operations ===

    fn case_insert(&self, c: &TestCaseDocument) -> RedlineResult<()> {
        check_steps_ceiling(&c.steps)?;
        let mut cases = write_guard(&self.cases)?;
        if cases.contains_key(&c.case_id) {
            return Err(RedlineError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Case,
                reason: "already exists".to_string(),
            }));
        }
        cases.insert(c.case_id, c.clone());
        Ok(())
    }

    fn case_get(&self, id: Uuid) -> RedlineResult<Option<TestCaseDocument>> {
        let cases = read_guard(&self.cases)?;
        Ok(cases.get(&id).cloned())
    }

    fn case_list_by_scope(&self, scope: &SessionScope) -> RedlineResult<Vec<TestCaseDocument>> {
        let cases = read_guard(&self.cases)?;
        let mut matched: Vec<TestCaseDocument> = cases
            .values()
            .filter(|c| case_in_scope(c, scope))
            .cloned()
            .collect();
        matched.sort_by_key(|c| c.case_id);
        Ok(matched)
    }

    fn case_apply_update(
        &self,
        case_id: Uuid,
        steps: &CaseSteps,
        proposal_id: Uuid,
    ) -> RedlineResult<()> {
        check_steps_ceiling(steps)?;

        // Both locks for the whole write; validate both entities before
        // mutating either.
        let mut cases = write_guard(&self.cases)?;
        let mut proposals = write_guard(&self.proposals)?;

        if !cases.contains_key(&case_id) {
            return Err(RedlineError::Storage(StorageError::NotFound {
                entity_type: EntityType::Case,
                id: case_id,
            }));
        }
        let proposal =
            proposals
                .get_mut(&proposal_id)
                .ok_or(RedlineError::Storage(StorageError::NotFound {
                    entity_type: EntityType::Proposal,
                    id: proposal_id,
                }))?;

        let now = chrono::Utc::now();
        if let Some(case) = cases.get_mut(&case_id) {
            case.steps = steps.clone();
            case.updated_at = now;
        }
        proposal.apply_status = ProposalApplyStatus::Applied;
        proposal.applied_at = Some(now);
        proposal.updated_at = now;

        Ok(())
    }

    // === Version Operations ===

    fn version_create(&self, case_id: Uuid, content: &str) -> RedlineResult<VersionSnapshot> {
        let mut versions = write_guard(&self.versions)?;
        let history = versions.entry(case_id).or_default();
        let next = history.last().map(|v| v.version + 1).unwrap_or(1);
        let snapshot = VersionSnapshot::new(case_id, next, content);
        history.push(snapshot.clone());
        Ok(snapshot)
    }

    fn version_list_by_case(&self, case_id: Uuid) -> RedlineResult<Vec<VersionSnapshot>> {
        let versions = read_guard(&self.versions)?;
        Ok(versions.get(&case_id).cloned().unwrap_or_default())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::{new_entity_id, RiskLevel, SessionError, UpdatePlan};

    fn session() -> BulkEditSession {
        BulkEditSession::new(SessionScope::default(), "add popup confirmation", "qa-lead")
    }

    fn case(system: &str, module: &str) -> TestCaseDocument {
        TestCaseDocument::new(
            "login flow",
            CaseSteps::Serialized("1、click login button".to_string()),
            system,
            module,
        )
    }

    fn proposal(session_id: Uuid, case: &TestCaseDocument) -> CasePatchProposal {
        let plan = UpdatePlan {
            reasoning: "popup required".to_string(),
            patch: vec![],
            side_effects: vec![],
            risk_level: RiskLevel::Low,
        };
        CasePatchProposal::new(
            session_id,
            case,
            &plan,
            "keyword match",
            "old".to_string(),
            "new".to_string(),
        )
    }

    #[test]
    fn test_session_insert_and_get() {
        let storage = MockStorage::new();
        let s = session();
        storage.session_insert(&s).unwrap();
        let fetched = storage.session_get(s.session_id).unwrap().unwrap();
        assert_eq!(fetched.session_id, s.session_id);
        assert_eq!(fetched.status, SessionStatus::DryRun);
    }

    #[test]
    fn test_session_duplicate_insert_fails() {
        let storage = MockStorage::new();
        let s = session();
        storage.session_insert(&s).unwrap();
        assert!(storage.session_insert(&s).is_err());
    }

    #[test]
    fn test_session_update_walks_state_machine() {
        let storage = MockStorage::new();
        let s = session();
        storage.session_insert(&s).unwrap();

        storage
            .session_update(
                s.session_id,
                SessionUpdate {
                    status: Some(SessionStatus::ProposalsReady),
                },
            )
            .unwrap();
        let fetched = storage.session_get(s.session_id).unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::ProposalsReady);
    }

    #[test]
    fn test_session_update_rejects_invalid_transition() {
        let storage = MockStorage::new();
        let s = session();
        storage.session_insert(&s).unwrap();

        let result = storage.session_update(
            s.session_id,
            SessionUpdate {
                status: Some(SessionStatus::Applied),
            },
        );
        assert!(matches!(
            result,
            Err(RedlineError::Session(SessionError::InvalidTransition { .. }))
        ));
        // Session stays put.
        let fetched = storage.session_get(s.session_id).unwrap().unwrap();
        assert_eq!(fetched.status, SessionStatus::DryRun);
    }

    #[test]
    fn test_session_update_missing_is_not_found() {
        let storage = MockStorage::new();
        let result = storage.session_update(new_entity_id(), SessionUpdate::default());
        assert!(matches!(
            result,
            Err(RedlineError::Storage(StorageError::NotFound {
                entity_type: EntityType::Session,
                ..
            }))
        ));
    }

    #[test]
    fn test_proposal_list_by_session_filters_and_orders() {
        let storage = MockStorage::new();
        let s1 = session();
        let s2 = session();
        let c = case("portal", "auth");

        let p1 = proposal(s1.session_id, &c);
        let p2 = proposal(s1.session_id, &c);
        let other = proposal(s2.session_id, &c);
        storage.proposal_insert(&p1).unwrap();
        storage.proposal_insert(&p2).unwrap();
        storage.proposal_insert(&other).unwrap();

        let listed = storage.proposal_list_by_session(s1.session_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].proposal_id, p1.proposal_id);
        assert_eq!(listed[1].proposal_id, p2.proposal_id);
    }

    #[test]
    fn test_proposal_update_applied_stamps_timestamp() {
        let storage = MockStorage::new();
        let s = session();
        let c = case("portal", "auth");
        let p = proposal(s.session_id, &c);
        storage.proposal_insert(&p).unwrap();

        storage
            .proposal_update(
                p.proposal_id,
                ProposalUpdate {
                    apply_status: Some(ProposalApplyStatus::Applied),
                },
            )
            .unwrap();
        let fetched = storage.proposal_get(p.proposal_id).unwrap().unwrap();
        assert_eq!(fetched.apply_status, ProposalApplyStatus::Applied);
        assert!(fetched.applied_at.is_some());
    }

    #[test]
    fn test_proposal_update_conflicted_leaves_applied_at_empty() {
        let storage = MockStorage::new();
        let s = session();
        let c = case("portal", "auth");
        let p = proposal(s.session_id, &c);
        storage.proposal_insert(&p).unwrap();

        storage
            .proposal_update(
                p.proposal_id,
                ProposalUpdate {
                    apply_status: Some(ProposalApplyStatus::Conflicted),
                },
            )
            .unwrap();
        let fetched = storage.proposal_get(p.proposal_id).unwrap().unwrap();
        assert_eq!(fetched.apply_status, ProposalApplyStatus::Conflicted);
        assert!(fetched.applied_at.is_none());
    }

    #[test]
    fn test_case_list_by_scope() {
        let storage = MockStorage::new();
        let auth = case("portal", "auth");
        let billing = case("portal", "billing");
        let tagged = case("portal", "auth").with_tags(vec!["smoke".to_string()]);
        storage.case_insert(&auth).unwrap();
        storage.case_insert(&billing).unwrap();
        storage.case_insert(&tagged).unwrap();

        let scope = SessionScope {
            system: Some("portal".to_string()),
            module: Some("auth".to_string()),
            ..SessionScope::default()
        };
        assert_eq!(storage.case_list_by_scope(&scope).unwrap().len(), 2);

        let scope = SessionScope {
            tags: vec!["smoke".to_string()],
            ..SessionScope::default()
        };
        let listed = storage.case_list_by_scope(&scope).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].case_id, tagged.case_id);
    }

    #[test]
    fn test_case_apply_update_writes_both_entities() {
        let storage = MockStorage::new();
        let s = session();
        let c = case("portal", "auth");
        let p = proposal(s.session_id, &c);
        storage.case_insert(&c).unwrap();
        storage.proposal_insert(&p).unwrap();

        let patched = CaseSteps::Serialized("1、click login and confirm popup".to_string());
        storage
            .case_apply_update(c.case_id, &patched, p.proposal_id)
            .unwrap();

        let fetched_case = storage.case_get(c.case_id).unwrap().unwrap();
        assert_eq!(fetched_case.steps, patched);
        let fetched_proposal = storage.proposal_get(p.proposal_id).unwrap().unwrap();
        assert_eq!(fetched_proposal.apply_status, ProposalApplyStatus::Applied);
        assert!(fetched_proposal.applied_at.is_some());
    }

    #[test]
    fn test_case_apply_update_missing_proposal_leaves_case_untouched() {
        let storage = MockStorage::new();
        let c = case("portal", "auth");
        storage.case_insert(&c).unwrap();

        let patched = CaseSteps::Serialized("1、something else".to_string());
        let result = storage.case_apply_update(c.case_id, &patched, new_entity_id());
        assert!(matches!(
            result,
            Err(RedlineError::Storage(StorageError::NotFound {
                entity_type: EntityType::Proposal,
                ..
            }))
        ));
        let fetched = storage.case_get(c.case_id).unwrap().unwrap();
        assert_eq!(fetched.steps, c.steps);
    }

    #[test]
    fn test_case_apply_update_rejects_oversized_steps() {
        let storage = MockStorage::new();
        let s = session();
        let c = case("portal", "auth");
        let p = proposal(s.session_id, &c);
        storage.case_insert(&c).unwrap();
        storage.proposal_insert(&p).unwrap();

        let oversized = CaseSteps::Serialized("x".repeat(MAX_STEPS_CHARS + 1));
        let result = storage.case_apply_update(c.case_id, &oversized, p.proposal_id);
        assert!(matches!(
            result,
            Err(RedlineError::Storage(StorageError::OversizedPayload { .. }))
        ));
    }

    #[test]
    fn test_version_numbers_increment_per_case() {
        let storage = MockStorage::new();
        let c1 = case("portal", "auth");
        let c2 = case("portal", "billing");

        let v1 = storage.version_create(c1.case_id, "first").unwrap();
        let v2 = storage.version_create(c1.case_id, "second").unwrap();
        let other = storage.version_create(c2.case_id, "first").unwrap();

        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);
        assert_eq!(other.version, 1);

        let history = storage.version_list_by_case(c1.case_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[test]
    fn test_clear_empties_everything() {
        let storage = MockStorage::new();
        storage.session_insert(&session()).unwrap();
        storage.case_insert(&case("portal", "auth")).unwrap();
        assert_eq!(storage.session_count(), 1);
        assert_eq!(storage.case_count(), 1);

        storage.clear();
        assert_eq!(storage.session_count(), 0);
        assert_eq!(storage.case_count(), 0);
        assert_eq!(storage.proposal_count(), 0);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
