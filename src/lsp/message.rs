//! JSON-RPC message model.
//!
//! Incoming payloads are classified into requests, notifications and
//! responses. Outgoing responses and notifications serialize with `jsonrpc`
//! first, followed by the fields in declaration order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tower_lsp::jsonrpc::{Error as RpcError, ErrorCode, Id};

pub const JSONRPC_VERSION: &str = "2.0";

/// Error code for requests sent before `initialize`
pub const SERVER_NOT_INITIALIZED: ErrorCode = ErrorCode::ServerError(-32002);
/// Error code for failures without a more specific code
pub const UNKNOWN_ERROR_CODE: ErrorCode = ErrorCode::ServerError(-32001);

#[derive(Debug, Error, PartialEq)]
pub enum MessageError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has neither a method nor a result")]
    Unclassified { id: Option<Id> },
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// Loose shape shared by every JSON-RPC message, used only for decoding.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Id>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// A request from the client; it must be answered with a response
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Id,
    pub method: String,
    pub params: Value,
}

/// A notification; it never carries an id and is never answered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

/// A response to an earlier request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

impl Message {
    /// Classify a decoded JSON payload.
    pub fn from_value(value: Value) -> Result<Self, MessageError> {
        if !value.is_object() {
            return Err(MessageError::NotAnObject);
        }
        let raw: RawMessage =
            serde_json::from_value(value).map_err(|e| MessageError::Malformed(e.to_string()))?;

        match (raw.method, raw.id) {
            (Some(method), Some(id)) => Ok(Message::Request(Request {
                id,
                method,
                params: raw.params.unwrap_or(Value::Null),
            })),
            (Some(method), None) => Ok(Message::Notification(Notification::new(
                method,
                raw.params.unwrap_or(Value::Null),
            ))),
            (None, Some(id)) if raw.result.is_some() || raw.error.is_some() => {
                Ok(Message::Response(Response {
                    jsonrpc: JSONRPC_VERSION,
                    id,
                    result: raw.result,
                    error: raw.error,
                }))
            }
            (None, id) => Err(MessageError::Unclassified { id }),
        }
    }

    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request(request) => Some(&request.method),
            Message::Notification(notification) => Some(&notification.method),
            Message::Response(_) => None,
        }
    }
}

impl Request {
    /// Deserialize the params into a typed structure.
    pub fn params<T: serde::de::DeserializeOwned>(&self) -> Result<T, RpcError> {
        serde_json::from_value(self.params.clone()).map_err(|e| invalid_params(&self.method, e))
    }
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Build a notification whose params are any serializable value.
    pub fn with_params<T: Serialize>(
        method: impl Into<String>,
        params: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(method, serde_json::to_value(params)?))
    }

    pub fn params<T: serde::de::DeserializeOwned>(&self) -> Result<T, RpcError> {
        serde_json::from_value(self.params.clone()).map_err(|e| invalid_params(&self.method, e))
    }
}

impl Response {
    /// Build a response from a handler outcome: `Ok` carries `result`,
    /// `Err` carries `error`.
    pub fn from_result(id: Id, outcome: Result<Value, RpcError>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(error) => Self::failure(id, error),
        }
    }

    pub fn success(id: Id, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Id, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Construct an error object with a custom message.
pub fn rpc_error(code: ErrorCode, message: impl Into<String>) -> RpcError {
    RpcError {
        code,
        message: message.into().into(),
        data: None,
    }
}

pub fn method_not_found(method: &str) -> RpcError {
    rpc_error(
        ErrorCode::MethodNotFound,
        format!("Server does not support request with method='{method}'"),
    )
}

fn invalid_params(method: &str, error: serde_json::Error) -> RpcError {
    rpc_error(
        ErrorCode::InvalidParams,
        format!("Invalid params for '{method}': {error}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_request() {
        let value = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "initialize",
            "params": {"processId": 9484, "rootPath": "path_root"}
        });
        let Message::Request(request) = Message::from_value(value).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(request.id, Id::Number(0));
        assert_eq!(request.method, "initialize");
        assert_eq!(request.params["processId"], 9484);
        assert_eq!(request.params["rootPath"], "path_root");
    }

    #[test]
    fn classifies_notification_without_params() {
        let value = json!({"jsonrpc": "2.0", "method": "exit"});
        let Message::Notification(notification) = Message::from_value(value).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(notification.method, "exit");
        assert!(notification.params.is_null());
    }

    #[test]
    fn classifies_response() {
        let value = json!({"jsonrpc": "2.0", "id": "abc", "result": null});
        // A null result is indistinguishable from an absent one after decoding.
        assert_eq!(
            Message::from_value(value),
            Err(MessageError::Unclassified {
                id: Some(Id::String("abc".to_string()))
            })
        );

        let value = json!({"jsonrpc": "2.0", "id": 4, "result": {"ok": true}});
        assert!(matches!(
            Message::from_value(value),
            Ok(Message::Response(response)) if response.is_success()
        ));
    }

    #[test]
    fn rejects_non_object_payload() {
        assert_eq!(
            Message::from_value(json!([1, 2, 3])),
            Err(MessageError::NotAnObject)
        );
    }

    #[test]
    fn success_response_serializes_result() {
        let response = Response::from_result(Id::Number(12), Ok(json!({})));
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","id":12,"result":{}}"#
        );
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let response = Response::from_result(
            Id::Number(33),
            Err(rpc_error(ErrorCode::ParseError, "ERROR")),
        );
        assert!(!response.is_success());
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"jsonrpc":"2.0","id":33,"error":{"code":-32700,"message":"ERROR"}}"#
        );
    }

    #[test]
    fn notification_never_carries_id() {
        let notification = Notification::new(
            "textDocument/publishDiagnostics",
            json!({"uri": "path_to_document", "diagnostics": []}),
        );
        let text = serde_json::to_string(&notification).unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","method":"textDocument/publishDiagnostics","params":{"diagnostics":[],"uri":"path_to_document"}}"#
        );
    }

    #[test]
    fn unserializable_params_are_an_error() {
        let params = std::collections::HashMap::from([((1, 2), "tuple keys")]);
        assert!(Notification::with_params("window/logMessage", &params).is_err());

        let notification =
            Notification::with_params("window/logMessage", &json!({"type": 3})).unwrap();
        assert_eq!(notification.params["type"], 3);
    }

    #[test]
    fn request_params_mismatch_is_invalid_params() {
        let request = Request {
            id: Id::Number(1),
            method: "initialize".to_string(),
            params: json!({"processId": "not-a-pid"}),
        };
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            #[allow(dead_code)]
            process_id: Option<u32>,
        }
        let error = request.params::<Params>().unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidParams);
        assert!(error.message.contains("initialize"));
    }

    #[test]
    fn method_not_found_uses_reserved_code() {
        let error = method_not_found("workspace/unknown");
        assert_eq!(error.code.code(), -32601);
        assert!(error.message.contains("workspace/unknown"));
    }

    #[test]
    fn server_band_codes() {
        assert_eq!(SERVER_NOT_INITIALIZED.code(), -32002);
        assert_eq!(UNKNOWN_ERROR_CODE.code(), -32001);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
    }
}
