//! Conversions between the two `steps` representations.
//!
//! A delimited text blob like `"1、click login\n2、navigate home"` converts
//! to an ordered list of step records and back. The conversion is total and
//! order-preserving; ordinal markers and surrounding whitespace are
//! normalized rather than preserved byte-for-byte (rendering always uses
//! the `、` enumerator).

use once_cell::sync::Lazy;
use redline_core::{CaseSteps, StepRecord};
use regex::Regex;

/// Leading ordinal markers: `1、`, `2.`, ` 3 、 ` and the like.
static ORDINAL_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*[、.]\s*").expect("ordinal marker regex is valid"));

/// Split a delimited text blob into structured step records.
///
/// Each non-empty line becomes one step: the ordinal marker is stripped,
/// the remainder trimmed into `description`, and `expected_result`/`action`
/// left empty.
pub fn steps_from_text(text: &str) -> Vec<StepRecord> {
    text.lines()
        .map(|line| ORDINAL_MARKER.replace(line, "").to_string())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .map(|line| StepRecord::from_description(&line))
        .collect()
}

/// Render structured steps back into delimited text:
/// `"{index+1}、{description}"` joined by newlines.
pub fn steps_to_text(steps: &[StepRecord]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}、{}", i + 1, step.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Canonical structured form of a `steps` field, whichever representation
/// it arrived in.
pub fn structured_steps(steps: &CaseSteps) -> Vec<StepRecord> {
    match steps {
        CaseSteps::Serialized(text) => steps_from_text(text),
        CaseSteps::Structured(list) => list.clone(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_from_text_strips_ordinals() {
        let steps = steps_from_text("1、click login button\n2.navigate to home page");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].description, "click login button");
        assert_eq!(steps[1].description, "navigate to home page");
        assert_eq!(steps[0].expected_result, "");
        assert_eq!(steps[0].action, "");
    }

    #[test]
    fn test_steps_from_text_handles_loose_whitespace() {
        let steps = steps_from_text("  1 、  open settings  \n\n 2.  save profile");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].description, "open settings");
        assert_eq!(steps[1].description, "save profile");
    }

    #[test]
    fn test_steps_from_text_keeps_unmarked_lines() {
        let steps = steps_from_text("click login\nverify dashboard");
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].description, "click login");
    }

    #[test]
    fn test_steps_to_text_renders_ordinals() {
        let steps = vec![
            StepRecord::from_description("click login button"),
            StepRecord::from_description("navigate to home page"),
        ];
        assert_eq!(
            steps_to_text(&steps),
            "1、click login button\n2、navigate to home page"
        );
    }

    #[test]
    fn test_empty_text_gives_no_steps() {
        assert!(steps_from_text("").is_empty());
        assert!(steps_from_text("\n\n").is_empty());
    }

    #[test]
    fn test_structured_steps_is_identity_on_lists() {
        let list = vec![StepRecord::from_description("click login")];
        let steps = CaseSteps::Structured(list.clone());
        assert_eq!(structured_steps(&steps), list);
    }
}
