//! JSON-RPC message transport
//!
//! Content-Length framed JSON-RPC 2.0 over any async byte stream: stdio in
//! production, in-memory duplex pipes in tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::types::{LspError, LspResult};

/// JSON-RPC request message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID
    pub id: Value,
    /// Method name
    pub method: String,
    /// Request parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID
    pub id: Value,
    /// Response result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Response error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response; a `null` result is serialized explicitly
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Result value, or the error as an `LspError`
    pub fn into_result(self) -> LspResult<Value> {
        match self.error {
            Some(error) => Err(LspError::ServerError {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Parse error (-32700)
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    /// Invalid request (-32600)
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    /// Method not found (-32601)
    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {}", method))
    }

    /// Invalid params (-32602)
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    /// Internal error (-32603)
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }
}

impl From<&LspError> for JsonRpcError {
    fn from(err: &LspError) -> Self {
        match err {
            LspError::ParseError(msg) => JsonRpcError::parse_error(msg.clone()),
            LspError::InvalidRequest(msg) => JsonRpcError::invalid_request(msg.clone()),
            LspError::MethodNotFound(method) => JsonRpcError::method_not_found(method),
            LspError::InvalidParams(msg) => JsonRpcError::invalid_params(msg.clone()),
            LspError::ServerError { code, message } => JsonRpcError::new(*code, message.clone()),
            other => {
                let mut error = JsonRpcError::internal_error("Internal server error");
                error.data = Some(Value::String(other.to_string()));
                error
            }
        }
    }
}

/// JSON-RPC notification message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Method name
    pub method: String,
    /// Notification parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// LSP message (request, response, or notification)
#[derive(Debug, Clone, PartialEq)]
pub enum LspMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

impl LspMessage {
    /// Parse a message from JSON
    pub fn from_json(json: &str) -> LspResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| LspError::ParseError(format!("Failed to parse JSON: {}", e)))?;

        if value.get("method").is_some() {
            if value.get("id").is_some() {
                let request: JsonRpcRequest = serde_json::from_value(value)
                    .map_err(|e| LspError::ParseError(format!("Failed to parse request: {}", e)))?;
                Ok(LspMessage::Request(request))
            } else {
                let notification: JsonRpcNotification = serde_json::from_value(value).map_err(|e| {
                    LspError::ParseError(format!("Failed to parse notification: {}", e))
                })?;
                Ok(LspMessage::Notification(notification))
            }
        } else if value.get("id").is_some() {
            let response: JsonRpcResponse = serde_json::from_value(value)
                .map_err(|e| LspError::ParseError(format!("Failed to parse response: {}", e)))?;
            Ok(LspMessage::Response(response))
        } else {
            Err(LspError::InvalidRequest(
                "Message must be a request, response, or notification".to_string(),
            ))
        }
    }

    /// Serialize message to JSON
    pub fn to_json(&self) -> LspResult<String> {
        let result = match self {
            LspMessage::Request(req) => serde_json::to_string(req),
            LspMessage::Response(resp) => serde_json::to_string(resp),
            LspMessage::Notification(notif) => serde_json::to_string(notif),
        };
        result.map_err(|e| LspError::SerializationError(format!("Failed to serialize message: {}", e)))
    }

    /// Method name, for logging
    pub fn method(&self) -> Option<&str> {
        match self {
            LspMessage::Request(req) => Some(&req.method),
            LspMessage::Notification(notif) => Some(&notif.method),
            LspMessage::Response(_) => None,
        }
    }
}

/// Largest message body a [`MessageReader`] will accept
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Reads framed messages from a byte stream
pub struct MessageReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next message
    ///
    /// Returns `Ok(None)` on a clean end of stream between messages.
    pub async fn read_message(&mut self) -> LspResult<Option<LspMessage>> {
        let mut headers = HashMap::new();
        let mut saw_header = false;

        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| LspError::IoError(format!("Failed to read header: {}", e)))?;

            if read == 0 {
                if saw_header {
                    return Err(LspError::IoError("Stream ended inside headers".to_string()));
                }
                return Ok(None);
            }

            let line = line.trim();
            if line.is_empty() {
                if saw_header {
                    break;
                }
                continue;
            }

            saw_header = true;
            if let Some((key, value)) = line.split_once(':') {
                headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let content_length: usize = headers
            .get("content-length")
            .ok_or_else(|| LspError::InvalidRequest("Missing Content-Length header".to_string()))?
            .parse()
            .map_err(|e| LspError::InvalidRequest(format!("Invalid Content-Length: {}", e)))?;
        if content_length > MAX_CONTENT_LENGTH {
            return Err(LspError::InvalidRequest(format!(
                "Content-Length {} exceeds limit of {} bytes",
                content_length, MAX_CONTENT_LENGTH
            )));
        }

        let mut content = vec![0u8; content_length];
        self.reader
            .read_exact(&mut content)
            .await
            .map_err(|e| LspError::IoError(format!("Failed to read content: {}", e)))?;

        let json = String::from_utf8(content)
            .map_err(|e| LspError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        LspMessage::from_json(&json).map(Some)
    }
}

/// Writes framed messages to a byte stream
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_message(&mut self, message: &LspMessage) -> LspResult<()> {
        let json = message.to_json()?;

        self.writer
            .write_all(format!("Content-Length: {}\r\n\r\n{}", json.len(), json).as_bytes())
            .await
            .map_err(|e| LspError::IoError(format!("Failed to write message: {}", e)))?;

        self.writer
            .flush()
            .await
            .map_err(|e| LspError::IoError(format!("Failed to flush output: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lsp_message_from_request_json() {
        let json_str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"processId":1234}}"#;
        match LspMessage::from_json(json_str).unwrap() {
            LspMessage::Request(req) => {
                assert_eq!(req.method, "initialize");
                assert_eq!(req.id, json!(1));
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_lsp_message_from_notification_json() {
        let json_str = r#"{"jsonrpc":"2.0","method":"$/cancelGhostText"}"#;
        assert!(matches!(
            LspMessage::from_json(json_str).unwrap(),
            LspMessage::Notification(n) if n.method == "$/cancelGhostText"
        ));
    }

    #[test]
    fn test_null_result_is_a_response() {
        let json_str = r#"{"jsonrpc":"2.0","id":4,"result":null}"#;
        match LspMessage::from_json(json_str).unwrap() {
            LspMessage::Response(resp) => assert_eq!(resp.into_result().unwrap(), Value::Null),
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_error_response_into_result() {
        let resp = JsonRpcResponse::error(json!(2), JsonRpcError::method_not_found("foo"));
        assert_eq!(
            resp.into_result(),
            Err(LspError::ServerError {
                code: -32601,
                message: "Method not found: foo".to_string()
            })
        );
    }

    #[test]
    fn test_success_serializes_null_result() {
        let msg = LspMessage::Response(JsonRpcResponse::success(json!(1), Value::Null));
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 1, "result": null}));
    }

    #[test]
    fn test_error_codes_from_lsp_error() {
        assert_eq!(JsonRpcError::from(&LspError::ParseError("x".into())).code, -32700);
        assert_eq!(JsonRpcError::from(&LspError::InvalidRequest("x".into())).code, -32600);
        assert_eq!(JsonRpcError::from(&LspError::MethodNotFound("x".into())).code, -32601);
        assert_eq!(JsonRpcError::from(&LspError::InvalidParams("x".into())).code, -32602);

        let internal = JsonRpcError::from(&LspError::InternalError("disk".into()));
        assert_eq!(internal.code, -32603);
        assert_eq!(internal.message, "Internal server error");
        assert!(internal.data.is_some());
    }

    #[test]
    fn test_garbage_message_rejected() {
        assert!(matches!(
            LspMessage::from_json("{\"jsonrpc\":\"2.0\"}"),
            Err(LspError::InvalidRequest(_))
        ));
        assert!(matches!(LspMessage::from_json("nope"), Err(LspError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_framed_round_trip_over_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = MessageWriter::new(client);
        let mut reader = MessageReader::new(server);

        let first = LspMessage::Notification(JsonRpcNotification::new(
            "ghostText/virtualText",
            Some(json!({"uri": "file:///a.py", "line": 0, "text": "é\n漢"})),
        ));
        let second = LspMessage::Request(JsonRpcRequest::new(json!(7), "shutdown", None));
        writer.write_message(&first).await.unwrap();
        writer.write_message(&second).await.unwrap();
        drop(writer);

        assert_eq!(reader.read_message().await.unwrap(), Some(first));
        assert_eq!(reader.read_message().await.unwrap(), Some(second));
        assert_eq!(reader.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_content_length() {
        let mut reader = MessageReader::new(&b"Content-Type: x\r\n\r\n{}"[..]);
        assert!(matches!(
            reader.read_message().await,
            Err(LspError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_content_length_rejected() {
        let frame = format!("Content-Length: {}\r\n\r\n{{}}", MAX_CONTENT_LENGTH + 1);
        let mut reader = MessageReader::new(frame.as_bytes());
        match reader.read_message().await {
            Err(LspError::InvalidRequest(msg)) => assert!(msg.contains("exceeds limit")),
            other => panic!("Expected InvalidRequest, got {:?}", other),
        }
    }
}
