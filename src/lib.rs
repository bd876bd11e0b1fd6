//! Framed MCP Server Runtime
//!
//! A length-framed JSON-RPC/MCP protocol runtime: framed stream transports
//! (TCP, stdio), a bounded concurrent dispatcher with graceful-shutdown
//! draining, a method router with shared-secret checking, and a URI
//! template engine for resource addressing.

// Re-export the main modules
pub mod buffer_pool;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod handler;
pub mod handlers;
pub mod limits;
pub mod logging;
pub mod protocol;
pub mod router;
pub mod server;
pub mod shutdown;
pub mod template;
pub mod template_cache;
pub mod transport;

// Test modules
#[cfg(test)]
pub mod tests;

// Re-export key types
pub use client::McpClient;
pub use config::ServerConfig;
pub use error::{McpError, McpResult};
pub use handler::{
    Content, ResourceContent, ResourceHandler, ResourceInfo, ResourceTemplateInfo, ToolDefinition,
    ToolHandler, ToolResponse,
};
pub use server::{McpServer, McpServerBuilder};
pub use template::{CompiledTemplate, ParamMap};
pub use template_cache::TemplateCache;
