//! REDLINE Core - Entity Types
//!
//! Pure data structures with no behavior beyond constructors and state
//! transitions. All other crates depend on this. Business logic lives in
//! redline-patch and redline-engine.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

mod collab;
mod config;
mod entities;
mod enums;
mod error;

pub use collab::{RelevanceJudgement, UpdatePlan};
pub use config::EngineConfig;
pub use entities::{
    BulkEditSession, CasePatchProposal, CaseSteps, PatchOperation, SessionScope, SideEffect,
    StepRecord, TestCaseDocument, VersionSnapshot,
};
pub use enums::{
    EntityType, PatchOpKind, ProposalApplyStatus, RiskLevel, SessionPhase, SessionStatus, Severity,
    StatusParseError,
};
pub use error::{
    CollaboratorError, ConfigError, PatchError, RedlineError, RedlineResult, SessionError,
    StorageError, ValidationError,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Hex-encoded SHA-256 fingerprint of serialized content.
/// Stored as an opaque string; only ever compared for equality.
pub type ContentHash = String;

/// Maximum serialized length of a case's steps field, in characters.
/// Enforced by the applier before persistence and by the store as a backstop.
pub const MAX_STEPS_CHARS: usize = 65535;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Compute the content fingerprint of serialized content.
///
/// Deterministic: identical input always produces an identical hash, and
/// any change to the input changes the hash. Used as a conflict-detection
/// signal between proposal generation and proposal application.
pub fn compute_content_hash(content: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================
