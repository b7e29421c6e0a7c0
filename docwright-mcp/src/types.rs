//! JSON-RPC 2.0 envelopes.

use rmcp::model::{ErrorCode, ErrorData};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const JSONRPC_VERSION: &str = "2.0";

/// A request whose envelope has been checked. `id == None` marks a
/// notification, which never gets a response.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    /// On failure returns the id to answer with (null when unknown) and the
    /// `-32600` error.
    pub fn from_value(value: Value) -> Result<Self, (Value, ErrorData)> {
        let Value::Object(mut object) = value else {
            return Err((Value::Null, invalid_request("request must be a JSON object")));
        };
        let id = object.remove("id");
        let reply_id = id.clone().unwrap_or(Value::Null);

        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err((reply_id, invalid_request("jsonrpc must be \"2.0\"")));
        }
        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err((reply_id, invalid_request("method must be a string"))),
        };
        let params = match object.remove("params") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(params @ (Value::Object(_) | Value::Array(_))) => params,
            Some(_) => {
                return Err((reply_id, invalid_request("params must be an object or array")));
            }
        };

        Ok(Self { id, method, params })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: ErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(&self).unwrap_or_else(|e| {
            json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": self.id,
                "error": { "code": ErrorCode::INTERNAL_ERROR.0, "message": e.to_string() }
            })
        })
    }
}

pub fn parse_error(message: impl Into<String>) -> ErrorData {
    ErrorData::new(ErrorCode::PARSE_ERROR, format!("Parse error: {}", message.into()), None)
}

pub fn invalid_request(message: impl Into<String>) -> ErrorData {
    ErrorData::new(
        ErrorCode::INVALID_REQUEST,
        format!("Invalid Request: {}", message.into()),
        None,
    )
}

pub fn method_not_found(method: &str) -> ErrorData {
    ErrorData::new(
        ErrorCode::METHOD_NOT_FOUND,
        format!("Method not found: {method}"),
        None,
    )
}

pub fn invalid_params(message: impl Into<String>) -> ErrorData {
    ErrorData::new(ErrorCode::INVALID_PARAMS, message.into(), None)
}

pub fn internal_error(message: impl Into<String>) -> ErrorData {
    ErrorData::new(ErrorCode::INTERNAL_ERROR, message.into(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_envelope() {
        let request = JsonRpcRequest::from_value(json!({
            "jsonrpc": "2.0", "method": "tools/list", "id": 7
        }))
        .unwrap();
        assert_eq!(request.id, Some(json!(7)));
        assert_eq!(request.method, "tools/list");
        assert_eq!(request.params, json!({}));
    }

    #[test]
    fn test_notification_has_no_id() {
        let request =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert_eq!(request.id, None);
    }

    #[test]
    fn test_malformed_envelopes() {
        let cases = [
            json!("string"),
            json!({"method": "ping", "id": 1}),
            json!({"jsonrpc": "1.0", "method": "ping", "id": 1}),
            json!({"jsonrpc": "2.0", "id": 1}),
            json!({"jsonrpc": "2.0", "method": 5, "id": 1}),
            json!({"jsonrpc": "2.0", "method": "ping", "params": 3, "id": 1}),
        ];
        for case in cases {
            let (_, error) = JsonRpcRequest::from_value(case).unwrap_err();
            assert_eq!(error.code, ErrorCode::INVALID_REQUEST);
        }

        let (id, _) = JsonRpcRequest::from_value(json!({"id": 9})).unwrap_err();
        assert_eq!(id, json!(9));
    }

    #[test]
    fn test_response_serialization() {
        let ok = JsonRpcResponse::success(json!(1), json!({"a": 1})).into_value();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 1, "result": {"a": 1}}));

        let err = JsonRpcResponse::error(json!("x"), method_not_found("nope")).into_value();
        assert_eq!(err["error"]["code"], json!(-32601));
        assert_eq!(err["error"]["message"], json!("Method not found: nope"));
        assert!(err.get("result").is_none());
    }
}
