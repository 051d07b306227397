//! REDLINE Patch - Structured Document Patch Engine
//!
//! Applies an ordered list of patch operations to a test-case document
//! whose `steps` field may arrive either as a delimited text blob or as a
//! structured step list, restoring the original representation on output.
//!
//! All internal patch logic operates on a canonical structured
//! `serde_json::Value` tree; representation branching happens exactly once
//! at entry and once at exit.

mod document;
mod engine;

pub use document::{steps_from_text, steps_to_text, structured_steps};
pub use engine::{apply_patch, apply_to_case_steps, PatchDocument};
