//! Structural shape validators.
//!
//! Pure predicates over a decoded `serde_json::Value`. Exact-shape checks:
//! every required key present, every field the right primitive/sequence
//! type, the `action` enumeration closed. Wrong types fail rather than being
//! cast.

use serde_json::Value;

const PLAN_LIST_KEYS: [&str; 4] = [
    "files_to_read",
    "files_to_create",
    "files_to_modify",
    "dependencies_required",
];

const VALID_ACTIONS: [&str; 3] = ["create", "modify", "delete"];

/// Does `value` satisfy the Planning stage's contract?
pub fn is_plan_result(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    if !obj.get("analysis").is_some_and(Value::is_string) {
        return false;
    }

    PLAN_LIST_KEYS.iter().all(|key| {
        obj.get(*key)
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().all(Value::is_string))
    })
}

/// Does `value` satisfy the Writing stage's contract?
///
/// Every element of `files` is checked independently; one bad element
/// rejects the entire value.
pub fn is_write_result(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    if !obj.get("summary").is_some_and(Value::is_string) {
        return false;
    }

    let Some(files) = obj.get("files").and_then(Value::as_array) else {
        return false;
    };

    files.iter().all(is_file_op)
}

fn is_file_op(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    if !obj.get("path").is_some_and(Value::is_string) {
        return false;
    }
    if !obj.get("content").is_some_and(Value::is_string) {
        return false;
    }

    obj.get("action")
        .and_then(Value::as_str)
        .is_some_and(|action| VALID_ACTIONS.contains(&action))
}
