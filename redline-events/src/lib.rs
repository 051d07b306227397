//! REDLINE Events - Session Progress Events
//!
//! Event types emitted while a bulk-edit session runs, and the broadcaster
//! trait that carries them to an operator-facing channel. Broadcasting is
//! strictly fire-and-forget: a lost or slow consumer never affects the
//! session outcome, so the trait returns nothing.

use redline_core::{EntityId, SessionPhase, SessionStatus};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// ============================================================================
// PROGRESS EVENTS
// ============================================================================

/// One progress event in a session's lifetime.
///
/// Progress variants carry an explicit `seq`, monotonically increasing
/// within one session run, so consumers on lossy channels can detect gaps
/// and reorderings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Dry run started; candidate discovery begins.
    SessionStarted {
        session_id: EntityId,
        phase: SessionPhase,
    },
    /// One candidate processed during the dry run.
    SessionProgress {
        session_id: EntityId,
        seq: u64,
        phase: SessionPhase,
        current: usize,
        total: usize,
        case_title: String,
    },
    /// Dry run finished; the session reached a persisted status.
    SessionCompleted {
        session_id: EntityId,
        status: SessionStatus,
        proposal_count: usize,
    },
    /// Dry run aborted with an error.
    SessionError {
        session_id: EntityId,
        message: String,
    },
    /// Session cancelled by the operator.
    SessionCancelled { session_id: EntityId },
    /// Proposal application started.
    ApplyStarted {
        session_id: EntityId,
        total: usize,
    },
    /// One proposal applied (or skipped/conflicted) during application.
    ApplyProgress {
        session_id: EntityId,
        seq: u64,
        phase: SessionPhase,
        current: usize,
        total: usize,
        case_title: String,
    },
    /// Application finished with per-proposal tallies.
    ApplyCompleted {
        session_id: EntityId,
        applied_count: usize,
        failed_count: usize,
    },
    /// Application aborted with an error.
    ApplyError {
        session_id: EntityId,
        message: String,
    },
}

impl ProgressEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> EntityId {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::SessionProgress { session_id, .. }
            | Self::SessionCompleted { session_id, .. }
            | Self::SessionError { session_id, .. }
            | Self::SessionCancelled { session_id }
            | Self::ApplyStarted { session_id, .. }
            | Self::ApplyProgress { session_id, .. }
            | Self::ApplyCompleted { session_id, .. }
            | Self::ApplyError { session_id, .. } => *session_id,
        }
    }
}

// ============================================================================
// BROADCASTER
// ============================================================================

/// Sink for progress events.
/// Implementations must be thread-safe (Send + Sync) and must not fail:
/// dropping an event is always preferable to blocking the session.
pub trait ProgressBroadcaster: Send + Sync {
    /// Deliver one event. Best effort; never blocks the caller on consumer
    /// backpressure.
    fn broadcast(&self, event: ProgressEvent);
}

/// Broadcaster that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcaster;

impl ProgressBroadcaster for NullBroadcaster {
    fn broadcast(&self, _event: ProgressEvent) {}
}

/// Broadcaster that records every event in memory, for tests.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingBroadcaster {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events recorded so far, in delivery order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl ProgressBroadcaster for RecordingBroadcaster {
    fn broadcast(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
