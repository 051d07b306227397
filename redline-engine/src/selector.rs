//! Candidate discovery.

use redline_core::{RedlineResult, SessionScope, TestCaseDocument};
use redline_storage::StorageTrait;
use std::sync::Arc;

/// Trait for candidate selectors: given a session scope and change brief,
/// return the test cases the dry run should consider.
/// Implementations must be thread-safe (Send + Sync).
///
/// Selector failures are fatal to session creation; there is no fallback
/// for discovery.
pub trait CandidateSelector: Send + Sync {
    /// Select candidate cases for a session.
    fn select(&self, scope: &SessionScope, brief: &str) -> RedlineResult<Vec<TestCaseDocument>>;
}

/// Selector backed by the local store's scope filter. External deployments
/// typically substitute a search-service-backed implementation here.
pub struct StorageCandidateSelector {
    storage: Arc<dyn StorageTrait>,
}

impl StorageCandidateSelector {
    pub fn new(storage: Arc<dyn StorageTrait>) -> Self {
        Self { storage }
    }
}

impl CandidateSelector for StorageCandidateSelector {
    fn select(&self, scope: &SessionScope, _brief: &str) -> RedlineResult<Vec<TestCaseDocument>> {
        self.storage.case_list_by_scope(scope)
    }
}

impl std::fmt::Debug for StorageCandidateSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCandidateSelector").finish()
    }
}

/// Selector that returns a fixed candidate list, for tests.
#[derive(Debug, Clone, Default)]
pub struct FixedSelector {
    candidates: Vec<TestCaseDocument>,
}

impl FixedSelector {
    /// Create a selector that always returns the given cases.
    pub fn new(candidates: Vec<TestCaseDocument>) -> Self {
        Self { candidates }
    }

    /// Create a selector that never finds anything.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl CandidateSelector for FixedSelector {
    fn select(&self, _scope: &SessionScope, _brief: &str) -> RedlineResult<Vec<TestCaseDocument>> {
        Ok(self.candidates.clone())
    }
}
