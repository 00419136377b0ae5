#![forbid(unsafe_code)]

use crate::CensusServer;
use crate::support::{ai_ok, census_error, require_object};
use serde_json::{Value, json};

pub(super) fn summary(server: &mut CensusServer, args: Value) -> Value {
    if let Err(resp) = require_object(&args) {
        return resp;
    }

    match server.store.crop_summary() {
        Ok(crops) => ai_ok(
            "crops_summary",
            json!({ "crops": serde_json::to_value(&crops).unwrap_or(Value::Null) }),
        ),
        Err(err) => census_error(&err),
    }
}
