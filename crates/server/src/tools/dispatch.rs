#![forbid(unsafe_code)]

use crate::CensusServer;
use serde_json::Value;

use super::{crops, registrants};

pub(crate) fn dispatch_tool(server: &mut CensusServer, name: &str, args: Value) -> Option<Value> {
    let resp = match name {
        "registrants_create" => registrants::create(server, args),
        "registrants_replace" => registrants::replace(server, args),
        "registrants_delete" => registrants::delete(server, args),
        "registrants_get" => registrants::get(server, args),
        "registrants_list" => registrants::list(server, args),
        "crops_summary" => crops::summary(server, args),
        _ => return None,
    };
    Some(resp)
}
