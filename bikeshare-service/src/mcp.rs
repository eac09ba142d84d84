//! Tool-invocation endpoint speaking JSON-RPC 2.0 (the MCP tool subset).
//!
//! Only plain request/response over `POST /mcp` is supported: `initialize`,
//! `ping`, `tools/list` and `tools/call`. Notifications are acknowledged
//! with `202 Accepted` and no body.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bikeshare::{BikeQuery, DockQuery};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::handlers::{run_blocking, ApiError};
use crate::AppState;

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// A JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Absent for notifications. An explicit `null` is kept as `Some(Null)`.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Any value that is present, `null` included, becomes `Some`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn default_count() -> usize {
    1
}

fn default_min_available() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct FindNearestBikeArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default)]
    bike_type: Option<String>,
    #[serde(default = "default_min_available")]
    min_available: u32,
}

#[derive(Debug, Deserialize)]
struct FindNearestDockArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default = "default_min_available")]
    min_available: u32,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Tool descriptors returned by `tools/list`.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "find_nearest_bike",
            "description": "Find the nearest stations or free-floating bikes with rentable bikes, closest first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "latitude": {"type": "number", "description": "Latitude of the search location."},
                    "longitude": {"type": "number", "description": "Longitude of the search location."},
                    "count": {"type": "integer", "minimum": 1, "default": 1, "description": "Number of results to return."},
                    "bike_type": {"type": "string", "enum": ["classic_bike", "electric_bike"], "description": "Restrict to one bike type. Any type when omitted."},
                    "min_available": {"type": "integer", "minimum": 1, "default": 1, "description": "Minimum bikes a station must hold. Free-floating bikes only qualify at 1."}
                },
                "required": ["latitude", "longitude"]
            }
        },
        {
            "name": "find_nearest_dock_spaces",
            "description": "Find the nearest stations with free docks to return a bike, closest first.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "latitude": {"type": "number", "description": "Latitude of the search location."},
                    "longitude": {"type": "number", "description": "Longitude of the search location."},
                    "count": {"type": "integer", "minimum": 1, "default": 1, "description": "Number of results to return."},
                    "min_available": {"type": "integer", "minimum": 1, "default": 1, "description": "Minimum free docks a station must have."}
                },
                "required": ["latitude", "longitude"]
            }
        }
    ])
}

/// Handle one JSON-RPC message.
///
/// The body is parsed here rather than by an extractor so malformed input
/// still gets a JSON-RPC error object.
pub async fn handle(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            return Json(JsonRpcResponse::error(Value::Null, PARSE_ERROR, e.to_string()))
                .into_response()
        }
    };
    let request: JsonRpcRequest = match serde_json::from_value(raw.clone()) {
        Ok(request) => request,
        Err(e) => {
            let id = raw.get("id").cloned().unwrap_or(Value::Null);
            return Json(JsonRpcResponse::error(id, INVALID_REQUEST, e.to_string()))
                .into_response();
        }
    };

    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "Notification acknowledged");
        return StatusCode::ACCEPTED.into_response();
    };
    if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        tracing::debug!(version = ?request.jsonrpc, "Unexpected JSON-RPC version");
    }

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "bikeshare", "version": env!("CARGO_PKG_VERSION")}
            }),
        ),
        "ping" => JsonRpcResponse::result(id, json!({})),
        "tools/list" => JsonRpcResponse::result(id, json!({"tools": tool_definitions()})),
        "tools/call" => call_tool(&state, id, request.params).await,
        method if method.starts_with("notifications/") => {
            return StatusCode::ACCEPTED.into_response();
        }
        method => {
            JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
        }
    };

    Json(response).into_response()
}

async fn call_tool(state: &Arc<AppState>, id: Value, params: Value) -> JsonRpcResponse {
    let call: ToolCall = match serde_json::from_value(params) {
        Ok(call) => call,
        Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
    };
    tracing::info!(tool = %call.name, "Tool call");

    let outcome = match call.name.as_str() {
        "find_nearest_bike" => {
            let args: FindNearestBikeArgs = match serde_json::from_value(call.arguments) {
                Ok(args) => args,
                Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
            };
            let bike_type = match bikeshare::service::parse_bike_type(args.bike_type.as_deref()) {
                Ok(bike_type) => bike_type,
                Err(e) => return JsonRpcResponse::result(id, tool_result(e.to_string(), true)),
            };
            let query = BikeQuery::new(args.latitude, args.longitude)
                .with_count(args.count)
                .with_bike_type(bike_type)
                .with_min_available(args.min_available);
            run_blocking(state, move |s| s.service.nearest_bikes(&query)).await
        }
        "find_nearest_dock_spaces" => {
            let args: FindNearestDockArgs = match serde_json::from_value(call.arguments) {
                Ok(args) => args,
                Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
            };
            let query = DockQuery::new(args.latitude, args.longitude)
                .with_count(args.count)
                .with_min_available(args.min_available);
            run_blocking(state, move |s| s.service.nearest_docks(&query)).await
        }
        other => {
            return JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Unknown tool: {other}"))
        }
    };

    match outcome {
        Ok(results) => match serde_json::to_string_pretty(&results) {
            Ok(text) => JsonRpcResponse::result(id, tool_result(text, false)),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        },
        Err(ApiError::Engine(e)) => {
            tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
            JsonRpcResponse::result(id, tool_result(e.to_string(), true))
        }
        Err(ApiError::Internal(message)) => JsonRpcResponse::error(id, INTERNAL_ERROR, message),
    }
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error
    })
}
