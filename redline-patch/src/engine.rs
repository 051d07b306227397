//! The patch engine proper.
//!
//! Operations are applied strictly in array order, so an operation may
//! target a path created by an earlier operation in the same batch.
//! Failure is atomic at the batch level: a `PathType` or
//! `UnsupportedOperation` error partway through aborts the whole call and
//! the caller's input is never mutated.

use crate::document::{steps_from_text, steps_to_text, structured_steps};
use redline_core::{CaseSteps, PatchError, PatchOpKind, PatchOperation, StepRecord};
use serde_json::Value;

/// A document at the patch engine boundary: either a JSON-encoded string
/// or an already-structured value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchDocument {
    Serialized(String),
    Structured(Value),
}

/// Apply an ordered operation list to a document, restoring the original
/// representation on output.
///
/// A string-encoded document is parsed first; if its `steps` value is a
/// delimited text blob it is normalized into a structured step list before
/// any operation runs, and converted back (and the whole document
/// re-serialized) afterwards.
pub fn apply_patch(
    document: &PatchDocument,
    operations: &[PatchOperation],
) -> Result<PatchDocument, PatchError> {
    let (mut root, was_serialized) = match document {
        PatchDocument::Serialized(text) => {
            let mut value: Value =
                serde_json::from_str(text).map_err(|e| PatchError::MalformedDocument {
                    reason: e.to_string(),
                })?;
            normalize_steps_field(&mut value);
            (value, true)
        }
        PatchDocument::Structured(value) => (value.clone(), false),
    };

    apply_operations(&mut root, operations)?;

    if was_serialized {
        restore_steps_field(&mut root);
        let text = serde_json::to_string(&root).map_err(|e| PatchError::MalformedDocument {
            reason: e.to_string(),
        })?;
        Ok(PatchDocument::Serialized(text))
    } else {
        Ok(PatchDocument::Structured(root))
    }
}

/// Apply an ordered operation list to a case's `steps` field.
///
/// Operations address the steps through a `/steps/...` path root, matching
/// the proposal wire format. The input representation (text blob or
/// structured list) is restored on output.
pub fn apply_to_case_steps(
    steps: &CaseSteps,
    operations: &[PatchOperation],
) -> Result<CaseSteps, PatchError> {
    let structured = structured_steps(steps);
    // Vec<StepRecord> serialization cannot fail.
    let mut root = serde_json::json!({
        "steps": serde_json::to_value(&structured).unwrap_or_default()
    });

    apply_operations(&mut root, operations)?;

    let steps_value = root.get("steps").cloned().unwrap_or(Value::Null);
    match steps {
        CaseSteps::Serialized(_) => {
            let arr = steps_value
                .as_array()
                .ok_or_else(|| PatchError::MalformedDocument {
                    reason: "steps is no longer an ordered list".to_string(),
                })?;
            Ok(CaseSteps::Serialized(render_steps(arr)))
        }
        CaseSteps::Structured(_) => {
            let list: Vec<StepRecord> =
                serde_json::from_value(steps_value).map_err(|e| PatchError::MalformedDocument {
                    reason: format!("patched steps are not step records: {e}"),
                })?;
            Ok(CaseSteps::Structured(list))
        }
    }
}

// ============================================================================
// OPERATION DISPATCH
// ============================================================================

fn apply_operations(root: &mut Value, operations: &[PatchOperation]) -> Result<(), PatchError> {
    for op in operations {
        let kind = op.kind().map_err(|_| PatchError::UnsupportedOperation {
            op: op.op.clone(),
        })?;
        match kind {
            // replace and add are identical: no distinct insertion semantics.
            PatchOpKind::Replace | PatchOpKind::Add => {
                let value = op.value.clone().unwrap_or(Value::Null);
                apply_set(root, &op.path, value)?;
            }
            PatchOpKind::Remove => apply_remove(root, &op.path)?,
        }
    }
    Ok(())
}

/// Walk the path, auto-creating empty objects for absent intermediate keys,
/// and overwrite (or create) the final key.
///
/// Arrays accept decimal-index segments; an intermediate index that is
/// non-numeric or out of range is a path type error since nothing sensible
/// can be vivified inside a list. A final index equal to the length appends.
fn apply_set(root: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, intermediate)) = segments.split_last() else {
        // A path with no segments addresses nothing.
        return Ok(());
    };

    let mut current = root;
    for segment in intermediate {
        current = descend_or_create(current, segment, path)?;
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        Value::Array(arr) => {
            let index = parse_index(last, path)?;
            match index {
                i if i < arr.len() => {
                    arr[i] = value;
                    Ok(())
                }
                i if i == arr.len() => {
                    arr.push(value);
                    Ok(())
                }
                _ => Err(path_type_error(path, last)),
            }
        }
        _ => Err(path_type_error(path, last)),
    }
}

/// Walk the path; any missing intermediate segment makes the whole
/// operation a no-op. Deleting an absent final key is also a no-op.
/// Traversing through a scalar is still a path type error.
fn apply_remove(root: &mut Value, path: &str) -> Result<(), PatchError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, intermediate)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for segment in intermediate {
        match current {
            Value::Object(map) => match map.get_mut(*segment) {
                Some(next) => current = next,
                None => return Ok(()),
            },
            Value::Array(arr) => {
                match segment.parse::<usize>().ok().and_then(|i| arr.get_mut(i)) {
                    Some(next) => current = next,
                    None => return Ok(()),
                }
            }
            _ => return Err(path_type_error(path, segment)),
        }
    }

    match current {
        Value::Object(map) => {
            map.remove(*last);
        }
        Value::Array(arr) => {
            if let Ok(i) = last.parse::<usize>() {
                if i < arr.len() {
                    arr.remove(i);
                }
            }
        }
        // A scalar holds no keys; deleting from it is vacuously a no-op.
        _ => {}
    }
    Ok(())
}

fn descend_or_create<'a>(
    current: &'a mut Value,
    segment: &str,
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    match current {
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()))),
        Value::Array(arr) => {
            let index = parse_index(segment, path)?;
            let len = arr.len();
            arr.get_mut(index)
                .ok_or_else(|| path_type_error_owned(path, format!("{segment} (len {len})")))
        }
        _ => Err(path_type_error(path, segment)),
    }
}

fn parse_index(segment: &str, path: &str) -> Result<usize, PatchError> {
    segment
        .parse::<usize>()
        .map_err(|_| path_type_error(path, segment))
}

fn path_type_error(path: &str, segment: &str) -> PatchError {
    PatchError::PathType {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

fn path_type_error_owned(path: &str, segment: String) -> PatchError {
    PatchError::PathType {
        path: path.to_string(),
        segment,
    }
}

// ============================================================================
// STEPS FIELD NORMALIZATION
// ============================================================================

/// If the parsed document carries `steps` as a delimited text blob, replace
/// it with the canonical structured list.
fn normalize_steps_field(value: &mut Value) {
    let Some(map) = value.as_object_mut() else {
        return;
    };
    let Some(text) = map.get("steps").and_then(Value::as_str).map(String::from) else {
        return;
    };
    let structured = steps_from_text(&text);
    map.insert(
        "steps".to_string(),
        serde_json::to_value(structured).unwrap_or_default(),
    );
}

/// If `steps` is a structured list after patching, render it back into
/// delimited text for the string-encoded output.
fn restore_steps_field(value: &mut Value) {
    let Some(map) = value.as_object_mut() else {
        return;
    };
    let Some(arr) = map.get("steps").and_then(Value::as_array).cloned() else {
        return;
    };
    map.insert("steps".to_string(), Value::String(render_steps(&arr)));
}

/// Render raw step values the way `steps_to_text` renders typed records;
/// elements missing a string `description` render as empty lines.
fn render_steps(arr: &[Value]) -> String {
    let records: Vec<StepRecord> = arr
        .iter()
        .map(|v| {
            StepRecord::from_description(
                v.get("description").and_then(Value::as_str).unwrap_or(""),
            )
        })
        .collect();
    steps_to_text(&records)
}

// ============================================================================
// TESTS
// ============================================================================
