//! REDLINE Engine - Bulk-Edit Session Workflow
//!
//! Orchestrates the full session lifecycle: candidate discovery, relevance
//! judgement, proposal synthesis during the dry run, and partial-failure-safe
//! application of accepted proposals with versioned backups.
//!
//! Candidates are processed strictly sequentially. A failing candidate is
//! logged and skipped; only selector and storage failures abort a session.

mod applier;
mod fallback;
mod generator;
mod selector;
mod session;

pub use applier::{ApplyOutcome, ProposalApplyResult};
pub use fallback::{fallback_relevance, fallback_update};
pub use selector::{CandidateSelector, FixedSelector, StorageCandidateSelector};
pub use session::{BulkEditEngine, SessionDetails};
