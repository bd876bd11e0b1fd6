//! Framed Client
//!
//! A small client for the framed wire protocol: monotonic request ids,
//! response correlation, per-request timeout, and optional shared-secret
//! attachment. The receive path shares the frame codec with the server.

use {
    crate::error::{McpError, McpResult},
    crate::framing::{self, LENGTH_PREFIX_SIZE},
    crate::limits::DEFAULT_MAX_MESSAGE_SIZE,
    serde_json::{json, Value},
    std::sync::atomic::{AtomicU64, Ordering},
    std::time::Duration,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
    tokio::net::TcpStream,
    tokio::sync::Mutex,
    tokio::time::timeout,
    tracing::debug,
};

pub struct McpClient {
    stream: Mutex<TcpStream>,
    next_id: AtomicU64,
    api_key: Option<String>,
    max_message_size: usize,
    request_timeout: Duration,
}

impl McpClient {
    pub async fn connect(addr: &str) -> McpResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        Ok(Self {
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            api_key: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            request_timeout: Duration::from_secs(30),
        })
    }

    /// Attach a shared secret sent as `apiKey` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Send a request and await its correlated response. Returns the
    /// `result` payload, or the peer's error as [`McpError::Rpc`].
    pub async fn request(&self, method: &str, params: Value) -> McpResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if let Some(key) = &self.api_key {
            envelope["apiKey"] = Value::String(key.clone());
        }

        timeout(self.request_timeout, self.round_trip(id, &envelope))
            .await
            .map_err(|_| McpError::Timeout)?
    }

    /// Send a notification; no reply is expected.
    pub async fn notify(&self, method: &str, params: Value) -> McpResult<()> {
        let mut envelope = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        if let Some(key) = &self.api_key {
            envelope["apiKey"] = Value::String(key.clone());
        }
        let payload = serde_json::to_vec(&envelope)?;
        let mut stream = self.stream.lock().await;
        stream.write_all(&framing::encode(&payload)).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn round_trip(&self, id: u64, envelope: &Value) -> McpResult<Value> {
        let payload = serde_json::to_vec(envelope)?;
        let mut stream = self.stream.lock().await;
        stream.write_all(&framing::encode(&payload)).await?;
        stream.flush().await?;

        // Read frames until the one correlated to our id arrives
        loop {
            let mut header = [0u8; LENGTH_PREFIX_SIZE];
            stream.read_exact(&mut header).await?;
            let length = framing::decode_length(header, self.max_message_size)? as usize;
            let mut body = vec![0u8; length];
            stream.read_exact(&mut body).await?;

            let response: Value = serde_json::from_slice(&body)?;
            let response_id = response.get("id").and_then(Value::as_u64);
            if response_id != Some(id) {
                debug!(
                    expected = id,
                    got = ?response_id,
                    "Skipping uncorrelated frame"
                );
                continue;
            }

            if let Some(error) = response.get("error") {
                return Err(McpError::Rpc {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603) as i32,
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                });
            }
            return Ok(response.get("result").cloned().unwrap_or(Value::Null));
        }
    }
}
