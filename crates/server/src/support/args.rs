#![forbid(unsafe_code)]

use super::ai::ai_error;
use census_core::ids::RegistrantId;
use serde_json::{Map, Value};

pub(crate) fn require_object(args: &Value) -> Result<&Map<String, Value>, Value> {
    args.as_object()
        .ok_or_else(|| ai_error("INVALID_INPUT", "arguments must be an object"))
}

pub(crate) fn require_payload(args: &Map<String, Value>, key: &str) -> Result<Value, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ai_error("INVALID_INPUT", &format!("{key} is required"))),
        Some(value) => Ok(value.clone()),
    }
}

/// Accepts the id as a JSON integer or as its decimal string.
pub(crate) fn require_registrant_id(
    args: &Map<String, Value>,
    key: &str,
) -> Result<RegistrantId, Value> {
    let parsed = match args.get(key) {
        None | Some(Value::Null) => {
            return Err(ai_error("INVALID_INPUT", &format!("{key} is required")));
        }
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => RegistrantId::try_new(v),
            None => {
                return Err(ai_error(
                    "INVALID_INPUT",
                    &format!("{key} must be an integer"),
                ));
            }
        },
        Some(Value::String(raw)) => RegistrantId::parse(raw),
        Some(_) => {
            return Err(ai_error(
                "INVALID_INPUT",
                &format!("{key} must be an integer"),
            ));
        }
    };
    parsed.map_err(|err| ai_error("INVALID_INPUT", &format!("{key}: {}", err.message())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_code(value: &Value) -> Option<&str> {
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str())
    }

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        let args = json!({ "a": 7, "b": "12" });
        let obj = args.as_object().expect("object");
        assert_eq!(require_registrant_id(obj, "a").expect("a").get(), 7);
        assert_eq!(require_registrant_id(obj, "b").expect("b").get(), 12);
    }

    #[test]
    fn ids_reject_non_positive_and_garbage() {
        let args = json!({ "zero": 0, "word": "seven", "list": [] });
        let obj = args.as_object().expect("object");
        for key in ["zero", "word", "list", "missing"] {
            let err = require_registrant_id(obj, key).expect_err(key);
            assert_eq!(error_code(&err), Some("INVALID_INPUT"));
        }
    }

    #[test]
    fn payload_must_be_present() {
        let args = json!({ "payload": null });
        let obj = args.as_object().expect("object");
        let err = require_payload(obj, "payload").expect_err("null payload");
        assert_eq!(error_code(&err), Some("INVALID_INPUT"));
    }
}
