//! Error types for REDLINE operations.

use crate::{EntityId, EntityType, SessionStatus};
use thiserror::Error;

/// Patch engine errors. A failing operation aborts the whole batch; the
/// input document is never partially mutated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("Path {path} navigates through a scalar at segment '{segment}'")]
    PathType { path: String, segment: String },

    #[error("Unsupported patch operation: {op}")]
    UnsupportedOperation { op: String },

    #[error("Malformed document: {reason}")]
    MalformedDocument { reason: String },
}

/// Validation errors for post-patch documents and patch payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Serialized steps length {length} exceeds ceiling {limit}")]
    Oversized { length: usize, limit: usize },

    #[error("Malformed patch payload: {reason}")]
    MalformedPatch { reason: String },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: EntityId },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: EntityId,
        reason: String,
    },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },

    #[error("Payload of {length} chars exceeds ceiling {limit}")]
    OversizedPayload { length: usize, limit: usize },

    #[error("Malformed stored content: {reason}")]
    MalformedContent { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// External collaborator errors. Relevance and update failures are always
/// caught by the generator and downgraded to the deterministic fallback;
/// selector failures are fatal to session creation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("No collaborator configured for {role}")]
    NotConfigured { role: &'static str },

    #[error("Relevance check failed: {reason}")]
    RelevanceFailed { reason: String },

    #[error("Update synthesis failed: {reason}")]
    UpdateFailed { reason: String },

    #[error("Candidate selector failed: {reason}")]
    SelectorFailed { reason: String },
}

/// Session workflow errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {id}")]
    NotFound { id: EntityId },

    #[error("Session creation failed: {reason}")]
    CreateFailed { reason: String },

    #[error("Invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all REDLINE errors.
#[derive(Debug, Clone, Error)]
pub enum RedlineError {
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for REDLINE operations.
pub type RedlineResult<T> = Result<T, RedlineError>;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_patch_error_display_path_type() {
        let err = PatchError::PathType {
            path: "/steps/0/description/deep".to_string(),
            segment: "description".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("navigates through a scalar"));
        assert!(msg.contains("description"));
    }

    #[test]
    fn test_patch_error_display_unsupported() {
        let err = PatchError::UnsupportedOperation {
            op: "move".to_string(),
        };
        assert!(format!("{}", err).contains("move"));
    }

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity_type: EntityType::Proposal,
            id: Uuid::nil(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Proposal"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_validation_error_display_oversized() {
        let err = ValidationError::Oversized {
            length: 70000,
            limit: 65535,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("70000"));
        assert!(msg.contains("65535"));
    }

    #[test]
    fn test_session_error_display_invalid_transition() {
        let err = SessionError::InvalidTransition {
            from: SessionStatus::Cancelled,
            to: SessionStatus::DryRun,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Cancelled"));
        assert!(msg.contains("DryRun"));
    }

    #[test]
    fn test_redline_error_from_variants() {
        let patch = RedlineError::from(PatchError::UnsupportedOperation {
            op: "test".to_string(),
        });
        assert!(matches!(patch, RedlineError::Patch(_)));

        let storage = RedlineError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, RedlineError::Storage(_)));

        let collab = RedlineError::from(CollaboratorError::NotConfigured { role: "relevance" });
        assert!(matches!(collab, RedlineError::Collaborator(_)));

        let session = RedlineError::from(SessionError::NotFound { id: Uuid::nil() });
        assert!(matches!(session, RedlineError::Session(_)));

        let validation = RedlineError::from(ValidationError::MalformedPatch {
            reason: "not an array".to_string(),
        });
        assert!(matches!(validation, RedlineError::Validation(_)));

        let config = RedlineError::from(ConfigError::InvalidValue {
            field: "relevance_threshold".to_string(),
            value: "2.0".to_string(),
            reason: "must be within [0, 1]".to_string(),
        });
        assert!(matches!(config, RedlineError::Config(_)));
    }
}
