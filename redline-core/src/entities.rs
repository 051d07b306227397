//! Core entity structures.

use crate::{
    compute_content_hash, new_entity_id, ContentHash, EntityId, ProposalApplyStatus, RiskLevel,
    SessionError, SessionStatus, Severity, StatusParseError, PatchOpKind, Timestamp, UpdatePlan,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// PATCH OPERATION
// ============================================================================

/// One `{op, path, value?}` instruction addressing a location in a nested
/// document via a slash-delimited path.
///
/// The `op` tag stays a free string on the wire so that an unknown tag is
/// reported as an unsupported operation at apply time instead of failing
/// deserialization of the whole proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl PatchOperation {
    /// Create a `replace` operation.
    pub fn replace(path: &str, value: serde_json::Value) -> Self {
        Self {
            op: PatchOpKind::Replace.as_db_str().to_string(),
            path: path.to_string(),
            value: Some(value),
        }
    }

    /// Create an `add` operation.
    pub fn add(path: &str, value: serde_json::Value) -> Self {
        Self {
            op: PatchOpKind::Add.as_db_str().to_string(),
            path: path.to_string(),
            value: Some(value),
        }
    }

    /// Create a `remove` operation.
    pub fn remove(path: &str) -> Self {
        Self {
            op: PatchOpKind::Remove.as_db_str().to_string(),
            path: path.to_string(),
            value: None,
        }
    }

    /// Resolve the operation tag, or report the unknown tag.
    pub fn kind(&self) -> Result<PatchOpKind, StatusParseError> {
        PatchOpKind::from_db_str(&self.op)
    }
}

// ============================================================================
// TEST CASE DOCUMENT
// ============================================================================

/// One structured step of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub expected_result: String,
    #[serde(default)]
    pub action: String,
}

impl StepRecord {
    /// Create a step with only a description, as produced when a delimited
    /// text blob is normalized into structured form.
    pub fn from_description(description: &str) -> Self {
        Self {
            description: description.to_string(),
            expected_result: String::new(),
            action: String::new(),
        }
    }
}

/// The `steps` field of a test case: either a delimited text blob or a
/// structured ordered step list. Both representations are accepted
/// everywhere; the patch engine converts at its boundary and restores the
/// original representation on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseSteps {
    Serialized(String),
    Structured(Vec<StepRecord>),
}

impl CaseSteps {
    /// Serialized form of the steps, as used for content hashing and for
    /// the fallback relevance substring scan.
    pub fn serialized(&self) -> String {
        match self {
            Self::Serialized(text) => text.clone(),
            // Vec<StepRecord> serialization cannot fail; plain strings only.
            Self::Structured(list) => serde_json::to_string(list).unwrap_or_default(),
        }
    }

    /// Content fingerprint of the serialized steps.
    pub fn content_hash(&self) -> ContentHash {
        compute_content_hash(&self.serialized())
    }
}

/// A structured test-case document, the unit a bulk-edit session operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseDocument {
    pub case_id: EntityId,
    pub title: String,
    pub steps: CaseSteps,
    pub tags: Vec<String>,
    pub system: String,
    pub module: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TestCaseDocument {
    /// Create a new test case.
    pub fn new(title: &str, steps: CaseSteps, system: &str, module: &str) -> Self {
        let now = Utc::now();
        Self {
            case_id: new_entity_id(),
            title: title.to_string(),
            steps,
            tags: Vec::new(),
            system: system.to_string(),
            module: module.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

// ============================================================================
// BULK EDIT SESSION
// ============================================================================

/// Filter block scoping which test cases a session considers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionScope {
    pub system: Option<String>,
    pub module: Option<String>,
    pub tags: Vec<String>,
    pub priority_filter: Option<String>,
}

/// One request to propose changes across a scoped group of test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkEditSession {
    pub session_id: EntityId,
    pub scope: SessionScope,
    pub change_brief: String,
    pub status: SessionStatus,
    pub created_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub applied_at: Option<Timestamp>,
}

impl BulkEditSession {
    /// Create a new session in the initial `DryRun` state.
    pub fn new(scope: SessionScope, change_brief: &str, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: new_entity_id(),
            scope,
            change_brief: change_brief.to_string(),
            status: SessionStatus::DryRun,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
            applied_at: None,
        }
    }

    /// Advance the session through the state machine. Rejects any move the
    /// forward-only machine does not permit; stamps `applied_at` on the
    /// transition into `Applied`.
    pub fn transition(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next == SessionStatus::Applied {
            self.applied_at = Some(now);
        }
        Ok(())
    }
}

// ============================================================================
// PATCH PROPOSAL
// ============================================================================

/// A predicted side effect of applying a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffect {
    pub description: String,
    pub severity: Severity,
}

impl SideEffect {
    pub fn new(description: &str, severity: Severity) -> Self {
        Self {
            description: description.to_string(),
            severity,
        }
    }
}

/// A candidate edit set for one test case, awaiting operator accept/reject.
///
/// `diff_json` holds the ordered operation list either as a JSON array or
/// as a string encoding one; the applier accepts both, for interop with
/// stores that persist the array pre-serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasePatchProposal {
    pub proposal_id: EntityId,
    pub session_id: EntityId,
    pub case_id: EntityId,
    pub case_title: String,
    pub diff_json: serde_json::Value,
    pub rationale: String,
    pub side_effects: Vec<SideEffect>,
    pub risk_level: RiskLevel,
    pub recall_reason: String,
    pub old_hash: ContentHash,
    pub new_hash: ContentHash,
    pub apply_status: ProposalApplyStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub applied_at: Option<Timestamp>,
}

impl CasePatchProposal {
    /// Create a pending proposal from a synthesized update plan.
    pub fn new(
        session_id: EntityId,
        case: &TestCaseDocument,
        plan: &UpdatePlan,
        recall_reason: &str,
        old_hash: ContentHash,
        new_hash: ContentHash,
    ) -> Self {
        let now = Utc::now();
        Self {
            proposal_id: new_entity_id(),
            session_id,
            case_id: case.case_id,
            case_title: case.title.clone(),
            // Vec<PatchOperation> serialization cannot fail.
            diff_json: serde_json::to_value(&plan.patch).unwrap_or_default(),
            rationale: plan.reasoning.clone(),
            side_effects: plan.side_effects.clone(),
            risk_level: plan.risk_level,
            recall_reason: recall_reason.to_string(),
            old_hash,
            new_hash,
            apply_status: ProposalApplyStatus::Pending,
            created_at: now,
            updated_at: now,
            applied_at: None,
        }
    }
}

// ============================================================================
// VERSION SNAPSHOT
// ============================================================================

/// An immutable backup of a case's steps content taken before a patch is
/// applied. Version numbers increase monotonically per case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub snapshot_id: EntityId,
    pub case_id: EntityId,
    pub version: i64,
    pub content: String,
    pub created_at: Timestamp,
}

impl VersionSnapshot {
    /// Create a snapshot of the given content at the given version.
    pub fn new(case_id: EntityId, version: i64, content: &str) -> Self {
        Self {
            snapshot_id: new_entity_id(),
            case_id,
            version,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
