#![forbid(unsafe_code)]

use crate::CensusServer;
use crate::support::{
    ai_ok, census_error, require_object, require_payload, require_registrant_id,
};
use census_storage::{CreateRegistrantRequest, ReplaceRegistrantRequest};
use serde_json::{Value, json};

pub(super) fn create(server: &mut CensusServer, args: Value) -> Value {
    let args = match require_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let payload = match require_payload(args, "payload") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server
        .store
        .create_registrant(CreateRegistrantRequest::new(payload))
    {
        Ok(id) => ai_ok("registrants_create", json!({ "id": id })),
        Err(err) => census_error(&err),
    }
}

pub(super) fn replace(server: &mut CensusServer, args: Value) -> Value {
    let args = match require_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let id = match require_registrant_id(args, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let payload = match require_payload(args, "payload") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server
        .store
        .replace_registrant(ReplaceRegistrantRequest::new(id, payload))
    {
        Ok(()) => ai_ok("registrants_replace", json!({ "id": id })),
        Err(err) => census_error(&err),
    }
}

pub(super) fn delete(server: &mut CensusServer, args: Value) -> Value {
    let args = match require_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let id = match require_registrant_id(args, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.delete_registrant(id) {
        Ok(()) => ai_ok("registrants_delete", json!({ "id": id, "deleted": true })),
        Err(err) => census_error(&err),
    }
}

pub(super) fn get(server: &mut CensusServer, args: Value) -> Value {
    let args = match require_object(&args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let id = match require_registrant_id(args, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match server.store.get_registrant(id) {
        Ok(detail) => ai_ok(
            "registrants_get",
            json!({ "registrant": serde_json::to_value(&detail).unwrap_or(Value::Null) }),
        ),
        Err(err) => census_error(&err),
    }
}

pub(super) fn list(server: &mut CensusServer, args: Value) -> Value {
    if let Err(resp) = require_object(&args) {
        return resp;
    }

    match server.store.list_registrants() {
        Ok(details) => ai_ok(
            "registrants_list",
            json!({
                "count": details.len(),
                "registrants": serde_json::to_value(&details).unwrap_or(Value::Null),
            }),
        ),
        Err(err) => census_error(&err),
    }
}
