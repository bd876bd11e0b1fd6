//! Server Configuration
//!
//! The configuration surface consumed by the runtime: identity, timeouts,
//! resource limits, and the optional shared secret. Environment loading is
//! provided for the development binary; library users populate the struct
//! directly or through the server builder.

use {
    crate::limits::ResourceLimits,
    serde::{Deserialize, Serialize},
};

/// Configuration for a framed MCP server instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name reported in `ping` and logs
    pub name: String,

    /// Server version reported in `ping` and logs
    pub version: String,

    /// Idle timeout per connection in milliseconds; 0 disables the idle
    /// timeout (connections then poll at a default interval so shutdown
    /// is still observed)
    pub idle_timeout_ms: u64,

    /// Graceful-shutdown drain timeout in milliseconds
    pub shutdown_timeout_ms: u64,

    /// Optional shared secret; when set, every request must carry a
    /// matching `apiKey` field
    pub api_key: Option<String>,

    /// Resource limits (message size, pool, queue, workers, cache)
    pub limits: ResourceLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "framedmcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            idle_timeout_ms: 0,
            shutdown_timeout_ms: 5_000,
            api_key: None,
            limits: ResourceLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `FRAMEDMCP_IDLE_TIMEOUT_MS`,
    /// `FRAMEDMCP_SHUTDOWN_TIMEOUT_MS`, `FRAMEDMCP_MAX_MESSAGE_SIZE`,
    /// `FRAMEDMCP_WORKERS`, `FRAMEDMCP_QUEUE_CAPACITY`, `FRAMEDMCP_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_env::<u64>("FRAMEDMCP_IDLE_TIMEOUT_MS") {
            config.idle_timeout_ms = v;
        }
        if let Some(v) = parse_env::<u64>("FRAMEDMCP_SHUTDOWN_TIMEOUT_MS") {
            config.shutdown_timeout_ms = v;
        }
        if let Some(v) = parse_env::<usize>("FRAMEDMCP_MAX_MESSAGE_SIZE") {
            config.limits.max_message_size = v;
        }
        if let Some(v) = parse_env::<usize>("FRAMEDMCP_WORKERS") {
            config.limits.worker_count = v;
        }
        if let Some(v) = parse_env::<usize>("FRAMEDMCP_QUEUE_CAPACITY") {
            config.limits.task_queue_capacity = v;
        }
        if let Ok(key) = std::env::var("FRAMEDMCP_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }

        config
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_limits() {
        let config = ServerConfig::default();
        assert!(config.limits.max_message_size > 0);
        assert!(config.limits.worker_count > 0);
        assert!(config.limits.task_queue_capacity > 0);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("FRAMEDMCP_WORKERS", "7");
        std::env::set_var("FRAMEDMCP_API_KEY", "sekrit");
        let config = ServerConfig::from_env();
        assert_eq!(config.limits.worker_count, 7);
        assert_eq!(config.api_key.as_deref(), Some("sekrit"));
        std::env::remove_var("FRAMEDMCP_WORKERS");
        std::env::remove_var("FRAMEDMCP_API_KEY");
    }
}
