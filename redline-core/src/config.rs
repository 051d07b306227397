//! Engine configuration.

use crate::{ConfigError, RedlineResult, MAX_STEPS_CHARS};
use serde::{Deserialize, Serialize};

/// Tuning knobs for the bulk-edit engine, mostly for the deterministic
/// fallbacks that kick in when the AI collaborators are unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fallback relevance: scores strictly above this are relevant.
    pub relevance_threshold: f32,
    /// Fallback relevance: brief tokens at or below this many characters
    /// are ignored.
    pub min_token_chars: usize,
    /// Ceiling on the serialized steps length enforced before persistence.
    pub max_steps_chars: usize,
    /// Brief keywords that trigger the popup rewrite fallback.
    pub popup_keywords: Vec<String>,
    /// Step-description keywords the popup rewrite targets.
    pub navigation_keywords: Vec<String>,
    /// Verify the live steps hash against a proposal's old_hash before
    /// applying; mismatch is a conflict.
    pub verify_old_hash: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.1,
            min_token_chars: 2,
            max_steps_chars: MAX_STEPS_CHARS,
            popup_keywords: vec![
                "popup".to_string(),
                "modal".to_string(),
                "dialog".to_string(),
                "弹窗".to_string(),
            ],
            navigation_keywords: vec![
                "navigate".to_string(),
                "redirect".to_string(),
                "jump".to_string(),
                "go to".to_string(),
                "跳转".to_string(),
            ],
            verify_old_hash: true,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> RedlineResult<()> {
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "relevance_threshold".to_string(),
                value: self.relevance_threshold.to_string(),
                reason: "must be within [0.0, 1.0]".to_string(),
            }
            .into());
        }

        if self.max_steps_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_steps_chars".to_string(),
                value: "0".to_string(),
                reason: "ceiling must be positive".to_string(),
            }
            .into());
        }

        if self.popup_keywords.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "popup_keywords".to_string(),
                value: "[]".to_string(),
                reason: "fallback keyword list must not be empty".to_string(),
            }
            .into());
        }

        if self.navigation_keywords.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "navigation_keywords".to_string(),
                value: "[]".to_string(),
                reason: "fallback keyword list must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
