#![forbid(unsafe_code)]

use crate::CensusServer;
use crate::support::{
    INVALID_PARAMS, JsonRpcRequest, METHOD_NOT_FOUND, ai_error, json_rpc_error,
    json_rpc_response, tool_text_content,
};
use census_storage::SqliteStore;
use serde_json::{Value, json};

const NOT_INITIALIZED: i64 = -32002;

impl CensusServer {
    pub(crate) fn new(store: SqliteStore) -> Self {
        Self {
            initialized: false,
            store,
        }
    }

    /// Returns `None` for notifications.
    pub(crate) fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();

        if method == "initialize" {
            self.initialized = true;
            return Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": crate::PROTOCOL_VERSION,
                    "serverInfo": { "name": crate::SERVER_NAME, "version": crate::SERVER_VERSION },
                    "capabilities": { "tools": {} }
                }),
            ));
        }

        if method.starts_with("notifications/") {
            if method == "notifications/initialized" {
                self.initialized = true;
            }
            return None;
        }

        if !self.initialized {
            return Some(json_rpc_error(
                request.id,
                NOT_INITIALIZED,
                "Server not initialized",
            ));
        }

        if method == "ping" {
            return Some(json_rpc_response(request.id, json!({})));
        }

        if method == "tools/list" {
            return Some(json_rpc_response(
                request.id,
                json!({ "tools": crate::tools::tool_definitions() }),
            ));
        }

        if method == "tools/call" {
            let Some(params_obj) = request.params.as_ref().and_then(|v| v.as_object()) else {
                return Some(json_rpc_error(
                    request.id,
                    INVALID_PARAMS,
                    "params must be an object",
                ));
            };
            let Some(tool_name) = params_obj.get("name").and_then(|v| v.as_str()) else {
                return Some(json_rpc_error(
                    request.id,
                    INVALID_PARAMS,
                    "params.name must be a string",
                ));
            };
            let args = params_obj
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            let response_body = self.call_tool(tool_name, args);

            return Some(json_rpc_response(
                request.id,
                json!({
                    "content": [tool_text_content(&response_body)],
                    "structuredContent": response_body,
                    "isError": !response_body.get("success").and_then(|v| v.as_bool()).unwrap_or(false)
                }),
            ));
        }

        Some(json_rpc_error(
            request.id,
            METHOD_NOT_FOUND,
            &format!("Method not found: {method}"),
        ))
    }

    pub(crate) fn call_tool(&mut self, name: &str, args: Value) -> Value {
        let Some(resp) = crate::tools::dispatch_tool(self, name, args) else {
            tracing::warn!(tool = name, "unknown tool");
            return ai_error("UNKNOWN_TOOL", &format!("Unknown tool: {name}"));
        };
        let success = resp.get("success").and_then(|v| v.as_bool()) == Some(true);
        if success {
            tracing::debug!(tool = name, "tool call succeeded");
        } else {
            let code = resp
                .get("error")
                .and_then(|e| e.get("code"))
                .and_then(|c| c.as_str())
                .unwrap_or("UNKNOWN");
            tracing::info!(tool = name, code, "tool call failed");
        }
        resp
    }
}
