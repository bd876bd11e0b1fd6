//! Debug Logging Module
//!
//! Provides structured logging for the framed MCP server using the tracing
//! crate. Includes connection tracking and lifecycle event helpers.

use {
    once_cell::sync::OnceCell,
    std::time::Duration,
    tracing::{debug, error, info, warn},
    tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter},
    uuid::Uuid,
};

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize the tracing subscriber with appropriate configuration
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        // Try to get log level from environment, default to info
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("framedmcp=info"));

        // Check if JSON format is requested
        let json_format = std::env::var("LOG_FORMAT")
            .map(|v| v.to_lowercase() == "json")
            .unwrap_or(false);

        if json_format {
            // JSON format for production/structured logging
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        } else {
            // Human-readable format for development
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }

        info!("Tracing initialized");
    });
}

#[derive(Debug, Clone)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Log connection events
pub fn log_connection_established(connection_id: &ConnectionId, peer: &str) {
    info!(
        connection_id = %connection_id,
        peer = %peer,
        event = "connection_established",
        "Connection established"
    );
}

pub fn log_connection_closed(connection_id: &ConnectionId, duration: Duration) {
    info!(
        connection_id = %connection_id,
        event = "connection_closed",
        duration_ms = duration.as_millis() as u64,
        "Connection closed"
    );
}

pub fn log_idle_timeout(connection_id: &ConnectionId) {
    info!(
        connection_id = %connection_id,
        event = "idle_timeout",
        "Idle timeout exceeded, closing connection"
    );
}

/// Log message events
pub fn log_message_received(connection_id: &ConnectionId, message_size: usize) {
    debug!(
        connection_id = %connection_id,
        message_size = message_size,
        event = "message_received",
        "Received message"
    );
}

pub fn log_response_sent(connection_id: &ConnectionId, response_size: usize) {
    debug!(
        connection_id = %connection_id,
        response_size = response_size,
        event = "response_sent",
        "Sent response"
    );
}

pub fn log_response_oversized(connection_id: &ConnectionId, response_size: usize, max: usize) {
    error!(
        connection_id = %connection_id,
        response_size = response_size,
        max_message_size = max,
        event = "response_oversized",
        "Response exceeds maximum message size, dropping"
    );
}

/// Log handler events
pub fn log_handler_success(method: &str, duration: Duration) {
    info!(
        method = %method,
        duration_ms = duration.as_millis() as u64,
        event = "handler_success",
        "Successfully handled method"
    );
}

pub fn log_handler_error(method: &str, error: &str, duration: Duration) {
    error!(
        method = %method,
        error = %error,
        duration_ms = duration.as_millis() as u64,
        event = "handler_error",
        "Failed to handle method"
    );
}

/// Log error events with context
pub fn log_parse_error(error: &str, raw_message: &str) {
    error!(
        error = %error,
        raw_message = %raw_message,
        event = "parse_error",
        "Failed to parse message"
    );
}

pub fn log_unknown_method(method: &str) {
    warn!(
        method = %method,
        event = "unknown_method",
        "Unknown method requested"
    );
}

/// Server lifecycle logging
pub fn log_server_ready(addr: &str) {
    info!(
        address = %addr,
        event = "server_ready",
        "Server ready and listening"
    );
}

pub fn log_server_shutdown() {
    info!(
        event = "server_shutdown",
        "Server shutting down"
    );
}
