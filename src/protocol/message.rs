//! JSON-RPC message parsing
//!
//! Two-layer parse: a lazy [`RawMessage`] borrowing from the input for
//! cheap field probing, then classification into the tagged [`McpMessage`]
//! used by the router. Request ids are unsigned 64-bit numbers; string ids
//! are rejected at classification.

use {
    crate::error::{McpError, McpResult},
    serde::Deserialize,
    serde_json::{value::RawValue, Value},
};

/// Raw JSON-RPC message with lazy parsing
///
/// Borrows from the input buffer; `params`/`result`/`error` stay unparsed
/// until classification decides they are needed.
#[derive(Debug, Deserialize)]
pub struct RawMessage<'a> {
    /// Request ID (requests and responses only)
    pub id: Option<u64>,
    /// Method name (requests and notifications only)
    #[serde(borrow)]
    pub method: Option<&'a str>,
    /// Parameters as raw JSON (lazy parsing)
    #[serde(borrow)]
    pub params: Option<&'a RawValue>,
    /// Result payload (responses only)
    #[serde(borrow)]
    pub result: Option<&'a RawValue>,
    /// Error payload (responses only)
    #[serde(borrow)]
    pub error: Option<&'a RawValue>,
}

/// Minimal pre-parse used by the shared-secret check: extracts only the id
/// and the `apiKey` field without materializing the rest of the message.
#[derive(Debug, Default, Deserialize)]
pub struct AuthProbe {
    pub id: Option<u64>,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

impl AuthProbe {
    /// Best-effort probe; `None` when the input is not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

/// A parsed message, tagged by kind. Scoped to one dispatch cycle.
#[derive(Debug)]
pub enum McpMessage {
    Request(McpRequest),
    Notification(McpNotification),
    Response(McpResponse),
}

#[derive(Debug)]
pub struct McpRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

#[derive(Debug)]
pub struct McpNotification {
    pub method: String,
    pub params: Value,
}

#[derive(Debug)]
pub struct McpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

impl McpMessage {
    /// Parse and classify a raw payload.
    ///
    /// Classification rules: a `method` with a numeric `id` is a request;
    /// a `method` without an `id` is a notification; `result` or `error`
    /// with an `id` and no `method` is a response. Anything else is
    /// malformed.
    pub fn parse(bytes: &[u8]) -> McpResult<Self> {
        let raw: RawMessage = serde_json::from_slice(bytes)?;

        if let Some(method) = raw.method {
            if method.is_empty() {
                return Err(McpError::InvalidRequest("empty method name".into()));
            }
            let params = parse_params(raw.params)?;
            return Ok(match raw.id {
                Some(id) => McpMessage::Request(McpRequest {
                    id,
                    method: method.to_string(),
                    params,
                }),
                None => McpMessage::Notification(McpNotification {
                    method: method.to_string(),
                    params,
                }),
            });
        }

        if raw.result.is_some() || raw.error.is_some() {
            let id = raw
                .id
                .ok_or_else(|| McpError::InvalidRequest("response without id".into()))?;
            return Ok(McpMessage::Response(McpResponse {
                id,
                result: raw.result.map(parse_raw).transpose()?,
                error: raw.error.map(parse_raw).transpose()?,
            }));
        }

        Err(McpError::InvalidRequest(
            "message is neither request, notification, nor response".into(),
        ))
    }
}

fn parse_raw(raw: &RawValue) -> McpResult<Value> {
    serde_json::from_str(raw.get()).map_err(McpError::Json)
}

/// Params must be an object or array when present (JSON-RPC rule).
fn parse_params(raw: Option<&RawValue>) -> McpResult<Value> {
    match raw {
        None => Ok(Value::Null),
        Some(raw) => {
            let value: Value = serde_json::from_str(raw.get())?;
            match value {
                Value::Object(_) | Value::Array(_) | Value::Null => Ok(value),
                _ => Err(McpError::InvalidRequest(
                    "params must be an object or array".into(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_classification() {
        let msg =
            McpMessage::parse(br#"{"id":1,"method":"list_tools","params":{"a":1}}"#).unwrap();
        match msg {
            McpMessage::Request(req) => {
                assert_eq!(req.id, 1);
                assert_eq!(req.method, "list_tools");
                assert_eq!(req.params["a"], 1);
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn notification_has_no_id() {
        let msg = McpMessage::parse(br#"{"method":"log","params":{}}"#).unwrap();
        assert!(matches!(msg, McpMessage::Notification(_)));
    }

    #[test]
    fn response_classification() {
        let msg = McpMessage::parse(br#"{"id":9,"result":{"ok":true}}"#).unwrap();
        match msg {
            McpMessage::Response(resp) => {
                assert_eq!(resp.id, 9);
                assert!(resp.result.is_some());
                assert!(resp.error.is_none());
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            McpMessage::parse(b"{not json"),
            Err(McpError::Json(_))
        ));
    }

    #[test]
    fn string_ids_are_rejected() {
        let result = McpMessage::parse(br#"{"id":"abc","method":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn scalar_params_are_rejected() {
        let result = McpMessage::parse(br#"{"id":1,"method":"x","params":42}"#);
        assert!(matches!(result, Err(McpError::InvalidRequest(_))));
    }

    #[test]
    fn message_with_no_kind_is_rejected() {
        let result = McpMessage::parse(br#"{"id":1}"#);
        assert!(matches!(result, Err(McpError::InvalidRequest(_))));
    }

    #[test]
    fn auth_probe_extracts_id_and_key() {
        let probe = AuthProbe::from_slice(br#"{"id":4,"method":"x","apiKey":"s3cret"}"#).unwrap();
        assert_eq!(probe.id, Some(4));
        assert_eq!(probe.api_key.as_deref(), Some("s3cret"));

        let probe = AuthProbe::from_slice(br#"{"method":"x"}"#).unwrap();
        assert_eq!(probe.id, None);
        assert_eq!(probe.api_key, None);

        assert!(AuthProbe::from_slice(b"garbage").is_none());
    }
}
