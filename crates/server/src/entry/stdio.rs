#![forbid(unsafe_code)]

use crate::CensusServer;
use crate::support::{INVALID_REQUEST, JsonRpcRequest, PARSE_ERROR, json_rpc_error};
use serde_json::Value;
use std::io::{BufRead, Write};

/// Serves newline-delimited JSON-RPC until the reader hits EOF.
pub(crate) fn run_stdio(
    server: &mut CensusServer,
    reader: impl BufRead,
    mut writer: impl Write,
) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        if let Some(resp) = handle_newline_request(server, raw) {
            write_newline_json(&mut writer, &resp)?;
        }
    }
    tracing::debug!("stdin closed");
    Ok(())
}

fn write_newline_json(writer: &mut impl Write, resp: &Value) -> std::io::Result<()> {
    writeln!(writer, "{}", serde_json::to_string(resp)?)?;
    writer.flush()
}

fn handle_newline_request(server: &mut CensusServer, raw: &str) -> Option<Value> {
    let data: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable request line");
            return Some(json_rpc_error(None, PARSE_ERROR, &format!("Parse error: {e}")));
        }
    };

    let (id, has_method) = match data.as_object() {
        Some(obj) => (obj.get("id").cloned(), obj.contains_key("method")),
        None => return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request")),
    };
    if !has_method {
        return Some(json_rpc_error(id, INVALID_REQUEST, "Invalid Request"));
    }

    let request: JsonRpcRequest = match serde_json::from_value(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("Invalid Request: {e}"),
            ));
        }
    };

    tracing::debug!(method = %request.method, "request");
    server.handle(request)
}
