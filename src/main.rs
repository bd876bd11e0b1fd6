//! Development server binary
//!
//! A small framed MCP server with an echo tool and a template-routed
//! greeting resource, for exercising the runtime end to end.

use {
    anyhow::Result,
    async_trait::async_trait,
    framedmcp::handler::{ResourceContent, ResourceHandler, ToolDefinition, ToolHandler, ToolResponse},
    framedmcp::template::ParamMap,
    framedmcp::{McpServer, ServerConfig},
    schemars::JsonSchema,
    serde::Deserialize,
    serde_json::Value,
    std::sync::Arc,
};

#[derive(Debug, Deserialize, JsonSchema)]
struct EchoParams {
    /// The message to echo back
    message: String,
}

struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, arguments: Value) -> Result<ToolResponse> {
        let params: EchoParams = serde_json::from_value(arguments)?;
        Ok(ToolResponse::text(format!("Echo: {}", params.message)))
    }
}

struct GreetingResource;

#[async_trait]
impl ResourceHandler for GreetingResource {
    async fn read(&self, uri: &str, params: ParamMap) -> Result<Vec<ResourceContent>> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("world");
        Ok(vec![ResourceContent::text(uri, format!("Hello, {name}!"))])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    framedmcp::logging::init_tracing();

    let server = McpServer::builder()
        .with_config(ServerConfig::from_env())
        .with_tool(
            ToolDefinition::with_schema::<EchoParams>("echo", "Echo a message back"),
            Arc::new(EchoTool),
        )
        .with_template_route("greeting://{name}", "greeting", Arc::new(GreetingResource))?
        .build();

    let addr = std::env::var("FRAMEDMCP_ADDR").unwrap_or_else(|_| "127.0.0.1:8700".to_string());
    let local_addr = server.serve_tcp(&addr).await?;
    println!("framedmcp server listening on {local_addr}");

    tokio::signal::ctrl_c().await?;
    server.stop().await;

    Ok(())
}
