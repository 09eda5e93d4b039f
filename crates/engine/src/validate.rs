// Operation validation: a pure check of a proposal against a freshly
// re-parsed target document.
//
// Errors accumulate, one per violated rule per operation, and each
// carries the failing rule name plus a human-readable message. Nothing
// here mutates state, so validation may run any number of times and
// concurrently with anything.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use folio_common::adl::{self, machine};
use folio_common::proposal::{NewBlock, Operation, Proposal};
use folio_common::types::{Document, MACHINE_REQUIRED_FIELDS};
use folio_common::value::get_path;

use crate::registry::DocumentTree;

/// Rule names, stable across releases; callers match on them.
pub mod rules {
    pub const TARGET_EXISTS: &str = "target_exists";
    pub const ANCHOR_EXISTS: &str = "anchor_exists";
    pub const TYPE_COMPATIBLE: &str = "type_compatible";
    pub const REQUIRED_FIELD: &str = "required_field";
    pub const PREVIOUS_VALUE_MATCHES: &str = "previous_value_matches";
    pub const EVENT_TYPE: &str = "event_type";
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationError {
    /// Index of the offending operation; `None` for proposal-level rules.
    pub op_index: Option<usize>,
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }
}

/// Validate a proposal against the live document. Read-only; the target
/// is re-parsed on every call so repeated validation is idempotent as
/// long as the document does not change.
pub fn validate(tree: &dyn DocumentTree, proposal: &Proposal) -> Result<ValidationReport> {
    let Some(text) = tree.read(&proposal.target_file)? else {
        // Fatal: without a target nothing else is checkable.
        return Ok(ValidationReport::from_errors(vec![ValidationError {
            op_index: None,
            rule: rules::TARGET_EXISTS.to_string(),
            message: format!("target file `{}` does not exist", proposal.target_file),
        }]));
    };
    let document = adl::parse(&text, &proposal.target_file);

    let mut errors = Vec::new();
    for (index, op) in proposal.ops.iter().enumerate() {
        check_operation(&document, index, op, &mut errors);
    }
    Ok(ValidationReport::from_errors(errors))
}

fn check_operation(
    document: &Document,
    index: usize,
    op: &Operation,
    errors: &mut Vec<ValidationError>,
) {
    let mut push = |rule: &str, message: String| {
        errors.push(ValidationError {
            op_index: Some(index),
            rule: rule.to_string(),
            message,
        });
    };

    match op {
        Operation::UpdateYaml { anchor, path, value, old_value } => {
            let Some(block) = document.block(anchor) else {
                push(rules::ANCHOR_EXISTS, format!("anchor `{anchor}` does not exist"));
                return;
            };

            if MACHINE_REQUIRED_FIELDS.contains(&path.as_str()) && is_null_or_empty(value) {
                push(
                    rules::REQUIRED_FIELD,
                    format!("required field `{path}` may not be set to null/empty"),
                );
            }

            let current_record = machine::to_value(&block.machine);
            match get_path(&current_record, path) {
                Some(current) => {
                    if !types_compatible(current, value) {
                        push(
                            rules::TYPE_COMPATIBLE,
                            format!(
                                "field `{path}` holds {} but the new value is {}",
                                type_name(current),
                                type_name(value)
                            ),
                        );
                    }
                    if let Some(expected) = old_value {
                        if current != expected {
                            push(
                                rules::PREVIOUS_VALUE_MATCHES,
                                format!("field `{path}` no longer holds the expected value"),
                            );
                        }
                    }
                }
                None => {
                    if old_value.is_some() {
                        push(
                            rules::PREVIOUS_VALUE_MATCHES,
                            format!("field `{path}` is absent but a previous value was expected"),
                        );
                    }
                }
            }
        }

        Operation::InsertBlock { after, block } => {
            if document.block(after).is_none() {
                push(rules::ANCHOR_EXISTS, format!("anchor `{after}` does not exist"));
            }
            check_new_block_required_fields(block, &mut push);
        }

        Operation::AppendEvent { after, event } => {
            if document.block(after).is_none() {
                push(rules::ANCHOR_EXISTS, format!("anchor `{after}` does not exist"));
            }
            let record = machine::overlay_defaults(Some(&Value::Object(event.machine.clone())));
            if record.kind != "event" {
                push(
                    rules::EVENT_TYPE,
                    format!("appended record type must be `event`, got `{}`", record.kind),
                );
            }
        }

        Operation::UpdateBody { anchor, .. } => {
            if document.block(anchor).is_none() {
                push(rules::ANCHOR_EXISTS, format!("anchor `{anchor}` does not exist"));
            }
        }
    }
}

fn check_new_block_required_fields(block: &NewBlock, push: &mut impl FnMut(&str, String)) {
    // The defaults merge backfills `status`, so only `type` and `id` can
    // end up missing (or anything explicitly set to null/empty).
    let record = machine::overlay_defaults(Some(&Value::Object(block.machine.clone())));
    if record.kind.is_empty() {
        push(
            rules::REQUIRED_FIELD,
            format!("new block `{}` is missing required field `type`", block.anchor),
        );
    }
    if record.id.is_empty() {
        push(
            rules::REQUIRED_FIELD,
            format!("new block `{}` is missing required field `id`", block.anchor),
        );
    }
}

fn is_null_or_empty(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(|text| text.trim().is_empty())
}

/// Type compatibility for `update_yaml`.
///
/// Matching kinds are compatible; the sole coercion is a numeric string
/// replacing a number. Booleans and date-like strings fail closed.
fn types_compatible(current: &Value, new: &Value) -> bool {
    if std::mem::discriminant(current) == std::mem::discriminant(new) {
        return true;
    }
    if current.is_number() {
        if let Some(text) = new.as_str() {
            return text.trim().parse::<f64>().is_ok();
        }
    }
    false
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
