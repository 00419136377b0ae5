#![forbid(unsafe_code)]

use serde_json::{Value, json};

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": ["integer", "string"], "description": "Registrant id" }
        },
        "required": ["id"]
    })
}

fn payload_property() -> Value {
    json!({
        "type": "object",
        "description": "Census form in camelCase (name, lastName, ci, dateOfBirth, hasRuc, rucNumber, gender, hasFarm, farmHa, farmName, crops, hasWorkers, totalWorkers, menWorkers, womanWorkers, over18Workers, under18Workers, minorWorkersOccupation, hasPregnantWorkers, pregnantWorkers, pregnantWorkersOccupation, family)"
    })
}

pub(crate) fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "registrants_create",
            "description": "Validate a census form and store it as a new registrant.",
            "inputSchema": {
                "type": "object",
                "properties": { "payload": payload_property() },
                "required": ["payload"]
            },
        }),
        json!({
            "name": "registrants_replace",
            "description": "Validate a census form and replace an existing registrant with it, crops and family included.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": { "type": ["integer", "string"], "description": "Registrant id" },
                    "payload": payload_property()
                },
                "required": ["id", "payload"]
            },
        }),
        json!({
            "name": "registrants_delete",
            "description": "Delete a registrant together with its crops and family members.",
            "inputSchema": id_schema(),
        }),
        json!({
            "name": "registrants_get",
            "description": "Fetch one registrant with its crops and family members.",
            "inputSchema": id_schema(),
        }),
        json!({
            "name": "registrants_list",
            "description": "List every registrant with its crops and family members.",
            "inputSchema": empty_schema(),
        }),
        json!({
            "name": "crops_summary",
            "description": "Count registrants per crop name.",
            "inputSchema": empty_schema(),
        }),
    ]
}
