//! Status enums and their store string codecs.
//!
//! Every enum persisted by the store carries `as_db_str`/`from_db_str`
//! codecs so the storage layer never depends on serde's representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a status enum from its store string representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value: {value}")]
pub struct StatusParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Entity type discriminator for storage errors and polymorphic references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Session,
    Proposal,
    Case,
    Version,
}

// ============================================================================
// SESSION STATUS
// ============================================================================

/// Lifecycle status of a bulk-edit session.
///
/// Forward-only state machine:
/// `DryRun → {NoCasesFound, Failed, ProposalsReady}`,
/// `ProposalsReady → {Applied, Cancelled}`.
/// `NoCasesFound`, `Failed`, `Applied` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Initial state: candidates are being gathered and scored.
    DryRun,
    /// The candidate selector returned nothing for the scope.
    NoCasesFound,
    /// Session setup failed (selector or store unavailable).
    Failed,
    /// Proposals are persisted and awaiting operator review.
    ProposalsReady,
    /// The operator applied a (possibly partial) batch of proposals.
    Applied,
    /// The operator abandoned the session.
    Cancelled,
}

impl SessionStatus {
    /// Convert to store string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::NoCasesFound => "no_cases_found",
            Self::Failed => "failed",
            Self::ProposalsReady => "proposals_ready",
            Self::Applied => "applied",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from store string representation.
    pub fn from_db_str(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "dry_run" => Ok(Self::DryRun),
            "no_cases_found" => Ok(Self::NoCasesFound),
            "failed" => Ok(Self::Failed),
            "proposals_ready" => Ok(Self::ProposalsReady),
            "applied" => Ok(Self::Applied),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(StatusParseError {
                kind: "session status",
                value: s.to_string(),
            }),
        }
    }

    /// Whether no further transition is allowed out of this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NoCasesFound | Self::Failed | Self::Applied | Self::Cancelled
        )
    }

    /// Whether the state machine permits moving from `self` to `next`.
    /// There is no resurrection of a cancelled or failed session.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (
                Self::DryRun,
                Self::NoCasesFound | Self::Failed | Self::ProposalsReady
            ) | (Self::ProposalsReady, Self::Applied | Self::Cancelled)
        )
    }
}

// ============================================================================
// PROPOSAL APPLY STATUS
// ============================================================================

/// Apply status of a patch proposal. `Pending` is initial; the other three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalApplyStatus {
    Pending,
    Applied,
    Skipped,
    Conflicted,
}

impl ProposalApplyStatus {
    /// Convert to store string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Conflicted => "conflicted",
        }
    }

    /// Parse from store string representation.
    pub fn from_db_str(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "pending" => Ok(Self::Pending),
            "applied" => Ok(Self::Applied),
            "skipped" => Ok(Self::Skipped),
            "conflicted" => Ok(Self::Conflicted),
            _ => Err(StatusParseError {
                kind: "proposal apply status",
                value: s.to_string(),
            }),
        }
    }

    /// Whether this status admits no further change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// ============================================================================
// RISK LEVEL
// ============================================================================

/// Risk classification of a synthesized patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Convert to store string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse from store string representation.
    pub fn from_db_str(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(StatusParseError {
                kind: "risk level",
                value: s.to_string(),
            }),
        }
    }

    /// Classify by operation count: zero is low, one or two medium,
    /// anything more high. Used by the deterministic update fallback.
    pub fn from_operation_count(count: usize) -> Self {
        match count {
            0 => Self::Low,
            1 | 2 => Self::Medium,
            _ => Self::High,
        }
    }
}

// ============================================================================
// PATCH OP KIND
// ============================================================================

/// Recognized patch operation tags.
///
/// The wire form keeps `op` as a free string so that unknown tags surface
/// as `PatchError::UnsupportedOperation` at apply time rather than as a
/// deserialization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Replace,
    Add,
    Remove,
}

impl PatchOpKind {
    /// Convert to the wire/store tag.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }

    /// Parse a wire tag. Unknown tags are the caller's
    /// `UnsupportedOperation` case.
    pub fn from_db_str(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "replace" => Ok(Self::Replace),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(StatusParseError {
                kind: "patch op",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// SIDE-EFFECT SEVERITY
// ============================================================================

/// Severity of a predicted side effect of applying a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

// ============================================================================
// SESSION PHASE
// ============================================================================

/// Phase reported by progress events during a session workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    FindingCases,
    GeneratingProposals,
    ApplyingProposals,
}

// ============================================================================
// TESTS
// ============================================================================
