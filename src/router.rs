//! Message Router
//!
//! Turns one raw frame payload into at most one response string. Two
//! phases: an optional shared-secret check driven by a lightweight
//! pre-parse (only `id` and `apiKey` are extracted), then a full parse and
//! dispatch through the method table. Everything allocated for a dispatch
//! cycle is owned by this scope and dropped when it ends, whatever the
//! outcome.

use {
    crate::dispatcher::MessageProcessor,
    crate::error::McpError,
    crate::handlers,
    crate::logging,
    crate::protocol,
    crate::protocol::message::{AuthProbe, McpMessage},
    crate::server::ServerState,
    async_trait::async_trait,
    std::sync::Arc,
    std::time::Instant,
    tracing::{debug, warn},
};

pub struct MessageRouter {
    state: Arc<ServerState>,
}

impl MessageRouter {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    /// Handle one raw payload. Returns the serialized response for
    /// requests; `None` for notifications, responses, unparseable input,
    /// and auth rejections with no recoverable id.
    pub async fn handle(&self, raw: &[u8]) -> Option<String> {
        // Phase 1: shared-secret check, before full parsing
        if let Some(expected) = self.state.config.api_key.as_deref() {
            if !expected.is_empty() {
                let probe = AuthProbe::from_slice(raw);
                let presented = probe.as_ref().and_then(|p| p.api_key.as_deref());
                if presented != Some(expected) {
                    warn!("Invalid or missing API key in request");
                    // Reply only when an id could be recovered; otherwise
                    // drop silently, the connection stays usable
                    let id = probe.and_then(|p| p.id)?;
                    let error = McpError::InvalidApiKey;
                    return serde_json::to_string(&error.to_json_rpc_error(id)).ok();
                }
            }
        }

        // Phase 2: full parse and dispatch
        let message = match McpMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                logging::log_parse_error(&e.to_string(), &String::from_utf8_lossy(raw));
                return None;
            }
        };

        match message {
            McpMessage::Request(request) => {
                let started = Instant::now();
                let id = request.id;
                let method = request.method.clone();
                let response = match handlers::dispatch(&self.state, &request).await {
                    Ok(result) => {
                        logging::log_handler_success(&method, started.elapsed());
                        protocol::success_response(id, result)
                    }
                    Err(e) => {
                        if matches!(e, McpError::UnknownMethod(_)) {
                            logging::log_unknown_method(&method);
                        } else {
                            logging::log_handler_error(&method, &e.to_string(), started.elapsed());
                        }
                        e.to_json_rpc_error(id)
                    }
                };
                serde_json::to_string(&response).ok()
            }
            McpMessage::Notification(notification) => {
                debug!(method = %notification.method, "Notification received, no reply");
                None
            }
            McpMessage::Response(response) => {
                debug!(id = response.id, "Response message received by server, ignoring");
                None
            }
        }
    }
}

#[async_trait]
impl MessageProcessor for MessageRouter {
    async fn process(&self, payload: &[u8]) -> Option<String> {
        self.handle(payload).await
    }
}
