//! REDLINE LLM - Collaborator Abstraction Layer
//!
//! Provider-agnostic traits for the two AI collaborators the generator
//! consults: relevance judgement and update synthesis. This crate defines
//! the interfaces that collaborators must implement; actual provider
//! implementations are user-supplied, and the deterministic fallbacks live
//! in redline-engine.

use redline_core::{
    CollaboratorError, RedlineError, RedlineResult, RelevanceJudgement, TestCaseDocument,
    UpdatePlan,
};
use std::sync::Arc;

// ============================================================================
// RELEVANCE PROVIDER TRAIT
// ============================================================================

/// Trait for relevance collaborators.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct ClaudeRelevance { /* ... */ }
///
/// impl RelevanceProvider for ClaudeRelevance {
///     fn judge(&self, brief: &str, case: &TestCaseDocument) -> RedlineResult<RelevanceJudgement> {
///         // Call model API
///     }
///     // ...
/// }
/// ```
pub trait RelevanceProvider: Send + Sync {
    /// Judge whether a change brief applies to a test case.
    ///
    /// # Arguments
    /// * `brief` - The operator's change brief
    /// * `case` - The candidate case under consideration
    ///
    /// # Returns
    /// * `Ok(RelevanceJudgement)` - The verdict with score and recall reason
    /// * `Err(RedlineError::Collaborator)` - If the provider fails
    fn judge(&self, brief: &str, case: &TestCaseDocument) -> RedlineResult<RelevanceJudgement>;

    /// Get the model identifier for this provider.
    fn model_id(&self) -> &str;
}

// ============================================================================
// UPDATE PROVIDER TRAIT
// ============================================================================

/// Trait for update-synthesis collaborators.
/// Implementations must be thread-safe (Send + Sync).
///
/// The returned plan's `patch` must follow the proposal wire format
/// (ordered `op`/`path`/`value` records addressing the case document).
pub trait UpdateProvider: Send + Sync {
    /// Synthesize an edit plan for a case already judged relevant.
    ///
    /// # Arguments
    /// * `brief` - The operator's change brief
    /// * `case` - The relevant case to edit
    /// * `judgement` - The relevance verdict that recalled the case
    ///
    /// # Returns
    /// * `Ok(UpdatePlan)` - Reasoning, patch operations, side effects, risk
    /// * `Err(RedlineError::Collaborator)` - If the provider fails
    fn plan(
        &self,
        brief: &str,
        case: &TestCaseDocument,
        judgement: &RelevanceJudgement,
    ) -> RedlineResult<UpdatePlan>;

    /// Get the model identifier for this provider.
    fn model_id(&self) -> &str;
}

// ============================================================================
// COLLABORATOR REGISTRY
// ============================================================================

/// Registry for AI collaborators.
/// Collaborators must be explicitly registered - no auto-discovery. An
/// unconfigured role yields `CollaboratorError::NotConfigured`, which the
/// generator treats as its cue to use the deterministic fallback.
///
/// # Example
/// ```ignore
/// let mut registry = CollaboratorRegistry::new();
/// registry.register_relevance(Box::new(my_relevance_provider));
/// registry.register_update(Box::new(my_update_provider));
///
/// let judgement = registry.relevance()?.judge(brief, &case)?;
/// ```
pub struct CollaboratorRegistry {
    /// Registered relevance provider (optional)
    relevance: Option<Arc<dyn RelevanceProvider>>,
    /// Registered update provider (optional)
    update: Option<Arc<dyn UpdateProvider>>,
}

impl CollaboratorRegistry {
    /// Create a new empty registry. No collaborators are registered by
    /// default.
    pub fn new() -> Self {
        Self {
            relevance: None,
            update: None,
        }
    }

    /// Register a relevance provider.
    /// Replaces any previously registered relevance provider.
    pub fn register_relevance(&mut self, provider: Box<dyn RelevanceProvider>) {
        self.relevance = Some(Arc::from(provider));
    }

    /// Register an update provider.
    /// Replaces any previously registered update provider.
    pub fn register_update(&mut self, provider: Box<dyn UpdateProvider>) {
        self.update = Some(Arc::from(provider));
    }

    /// Get the registered relevance provider.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn RelevanceProvider>)` - Handle to the provider
    /// * `Err(CollaboratorError::NotConfigured)` - If none registered
    pub fn relevance(&self) -> RedlineResult<Arc<dyn RelevanceProvider>> {
        self.relevance.clone().ok_or(RedlineError::Collaborator(
            CollaboratorError::NotConfigured { role: "relevance" },
        ))
    }

    /// Get the registered update provider.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn UpdateProvider>)` - Handle to the provider
    /// * `Err(CollaboratorError::NotConfigured)` - If none registered
    pub fn update(&self) -> RedlineResult<Arc<dyn UpdateProvider>> {
        self.update.clone().ok_or(RedlineError::Collaborator(
            CollaboratorError::NotConfigured { role: "update" },
        ))
    }

    /// Check if a relevance provider is registered.
    pub fn has_relevance(&self) -> bool {
        self.relevance.is_some()
    }

    /// Check if an update provider is registered.
    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    /// Clear the relevance provider registration.
    pub fn clear_relevance(&mut self) {
        self.relevance = None;
    }

    /// Clear the update provider registration.
    pub fn clear_update(&mut self) {
        self.update = None;
    }
}

impl Default for CollaboratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CollaboratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaboratorRegistry")
            .field("relevance", &self.relevance.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

// ============================================================================
// MOCK PROVIDERS FOR TESTING
// ============================================================================

/// Mock relevance provider for testing.
/// Returns the same judgement for every case.
#[derive(Debug, Clone)]
pub struct MockRelevanceProvider {
    /// Model identifier
    model_id: String,
    /// Judgement to return
    judgement: RelevanceJudgement,
}

impl MockRelevanceProvider {
    /// Create a mock that returns a fixed judgement.
    pub fn new(model_id: impl Into<String>, judgement: RelevanceJudgement) -> Self {
        Self {
            model_id: model_id.into(),
            judgement,
        }
    }

    /// Create a mock that judges every case relevant at the given score.
    pub fn always_relevant(score: f32) -> Self {
        Self::new(
            "mock-relevance",
            RelevanceJudgement {
                is_relevant: true,
                relevance_score: score,
                recall_reason: "mock judgement".to_string(),
            },
        )
    }

    /// Create a mock that judges every case irrelevant.
    pub fn never_relevant() -> Self {
        Self::new(
            "mock-relevance",
            RelevanceJudgement::irrelevant("mock judgement"),
        )
    }
}

impl RelevanceProvider for MockRelevanceProvider {
    fn judge(&self, _brief: &str, _case: &TestCaseDocument) -> RedlineResult<RelevanceJudgement> {
        Ok(self.judgement.clone())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Mock update provider for testing.
/// Returns the same plan for every case.
#[derive(Debug, Clone)]
pub struct MockUpdateProvider {
    /// Model identifier
    model_id: String,
    /// Plan to return
    plan: UpdatePlan,
}

impl MockUpdateProvider {
    /// Create a mock that returns a fixed plan.
    pub fn new(model_id: impl Into<String>, plan: UpdatePlan) -> Self {
        Self {
            model_id: model_id.into(),
            plan,
        }
    }

    /// Create a mock that always returns an empty plan.
    pub fn empty() -> Self {
        Self::new("mock-update", UpdatePlan::empty("mock plan"))
    }
}

impl UpdateProvider for MockUpdateProvider {
    fn plan(
        &self,
        _brief: &str,
        _case: &TestCaseDocument,
        _judgement: &RelevanceJudgement,
    ) -> RedlineResult<UpdatePlan> {
        Ok(self.plan.clone())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
