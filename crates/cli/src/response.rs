#![forbid(unsafe_code)]

use gm_core::GoalError;
use serde_json::{Value, json};

pub(crate) fn ok_with_warnings(intent: &str, result: Value, warnings: Vec<Value>) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "warnings": warnings,
        "error": null
    })
}

pub(crate) fn error_with(code: &str, message: &str, recovery: Option<&str>) -> Value {
    let mut error_obj = serde_json::Map::new();
    error_obj.insert("code".to_string(), Value::String(code.to_string()));
    error_obj.insert(
        "message".to_string(),
        Value::String(message.trim().to_string()),
    );
    if let Some(recovery) = recovery {
        error_obj.insert(
            "recovery".to_string(),
            Value::String(recovery.trim().to_string()),
        );
    }
    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "warnings": [],
        "error": Value::Object(error_obj)
    })
}

pub(crate) fn goal_error(err: &GoalError) -> Value {
    let recovery = match err {
        GoalError::Validation(_) => Some("Fix the input and retry."),
        GoalError::NotFound { .. } => Some("Run `goalmap list` to see current goal ids."),
        GoalError::PartialCascade { .. } => Some("Retry the delete on the remaining goals."),
        GoalError::Store(_) => Some("Check the storage directory and retry."),
        GoalError::MalformedTree { .. } | GoalError::Cycle { .. } => None,
    };
    error_with(err.code(), &err.to_string(), recovery)
}

/// Assembly diagnostics surfaced alongside a successful result.
pub(crate) fn diagnostics(errors: &[GoalError]) -> Vec<Value> {
    errors
        .iter()
        .map(|err| json!({ "code": err.code(), "message": err.to_string() }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gm_core::{GoalId, ValidationError};

    #[test]
    fn error_envelope_carries_code_and_recovery() {
        let err = GoalError::NotFound {
            id: GoalId::try_new(5).unwrap(),
        };
        let value = goal_error(&err);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "NOT_FOUND");
        assert_eq!(value["error"]["message"], "goal 5 not found");
        assert!(value["error"]["recovery"].is_string());
    }

    #[test]
    fn validation_message_is_passed_through() {
        let err = GoalError::from(ValidationError::EmptyTitle);
        let value = goal_error(&err);
        assert_eq!(value["error"]["code"], "VALIDATION");
        assert_eq!(
            value["error"]["message"],
            "validation failed: title must not be empty"
        );
    }

    #[test]
    fn ok_envelope_lists_warnings() {
        let value = ok_with_warnings("list", json!([]), vec![json!({"code": "CYCLE"})]);
        assert_eq!(value["success"], true);
        assert_eq!(value["warnings"][0]["code"], "CYCLE");
        assert!(value["error"].is_null());
    }
}
