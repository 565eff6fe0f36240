//! Merge-patch of a record with a map of field overrides.
//!
//! The merge is shallow: every top-level field of the patch replaces the
//! field of the same name in the base, all other base fields are kept.

use serde::Serialize;
use serde_json::Value;

use crate::BodyError;

/// Merge `patch` over the fields of `base`.
///
/// Both values must serialize to a map (a struct or a map type). A patch that
/// serializes to `null` leaves the base unchanged.
pub fn merge_patch<B, P>(base: &B, patch: &P) -> Result<Value, BodyError>
where
    B: Serialize + ?Sized,
    P: Serialize + ?Sized,
{
    let base = serde_json::to_value(base).map_err(|e| BodyError::encode("merge", e))?;
    let patch = serde_json::to_value(patch).map_err(|e| BodyError::encode("merge", e))?;
    merge_values(base, patch)
}

/// Merge two already serialized values.
pub(crate) fn merge_values(base: Value, patch: Value) -> Result<Value, BodyError> {
    let mut fields = match base {
        Value::Object(fields) => fields,
        other => {
            return Err(BodyError::invalid_argument(format!(
                "merge base must be a map or struct, got {}",
                kind(&other)
            )));
        }
    };

    match patch {
        Value::Null => {}
        Value::Object(overrides) => fields.extend(overrides),
        other => {
            return Err(BodyError::invalid_argument(format!(
                "merge patch must be a map or struct, got {}",
                kind(&other)
            )));
        }
    }

    Ok(Value::Object(fields))
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}
