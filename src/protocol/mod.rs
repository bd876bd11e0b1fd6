//! JSON-RPC Protocol
//!
//! Message model and response envelope builders for the framed wire
//! protocol. Requests carry a numeric id, a method name, optional params,
//! and an optional `apiKey`; responses echo the id with either `result` or
//! `error`.

pub mod message;

use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Build a success response envelope.
pub fn success_response(id: u64, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// Build an error response envelope.
pub fn error_response(id: u64, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {
            "code": code,
            "message": message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let response = success_response(7, json!({"ok": true}));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["ok"], true);
        assert!(response.get("error").is_none());
    }

    #[test]
    fn error_envelope_shape() {
        let response = error_response(3, -32601, "Method not found");
        assert_eq!(response["id"], 3);
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["message"], "Method not found");
        assert!(response.get("result").is_none());
    }
}
