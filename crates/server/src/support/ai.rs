#![forbid(unsafe_code)]

use census_storage::{CensusError, StoreError};
use serde_json::{Map, Value, json};

pub(crate) fn ai_ok(intent: &str, result: Value) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "error": null
    })
}

fn ai_failure(error: Map<String, Value>) -> Value {
    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "error": error
    })
}

pub(crate) fn ai_error(code: &str, message: &str) -> Value {
    let mut error = Map::new();
    error.insert("code".to_string(), Value::String(code.to_string()));
    error.insert(
        "message".to_string(),
        Value::String(message.trim().to_string()),
    );
    ai_failure(error)
}

pub(crate) fn format_store_error(err: &StoreError) -> String {
    match err {
        StoreError::Io(e) => format!("IO: {e}"),
        StoreError::Sql(e) => format!("SQL: {e}"),
        StoreError::Constraint(msg) => format!("Constraint violated: {msg}"),
        StoreError::InvalidInput(msg) => format!("Invalid input: {msg}"),
        StoreError::Decode {
            table,
            column,
            reason,
        } => format!("Stored row is unreadable: {table}.{column} ({reason})"),
    }
}

/// Envelope for registrant API failures. Validation errors carry the full
/// per-field violation map; synchronizer failures name the step.
pub(crate) fn census_error(err: &CensusError) -> Value {
    let message = match err {
        CensusError::Validation(_) => "The registrant payload is invalid".to_string(),
        CensusError::Persistence(err) => {
            format!("Step {} failed: {}", err.step, format_store_error(&err.cause))
        }
        CensusError::NotFound(id) => format!("Registrant {id} not found"),
        CensusError::Cancelled { step } => format!("Cancelled before step {step}"),
        CensusError::Store(err) => format_store_error(err),
    };

    let mut error = Map::new();
    error.insert("code".to_string(), Value::String(err.code().to_string()));
    error.insert("message".to_string(), Value::String(message));
    if let CensusError::Validation(validation) = err {
        error.insert(
            "violations".to_string(),
            serde_json::to_value(validation.violations()).unwrap_or(Value::Null),
        );
    }
    if let Some(step) = err.step() {
        error.insert("step".to_string(), Value::String(step.to_string()));
    }
    ai_failure(error)
}
