//! Server Integration Tests
//!
//! End-to-end over real TCP: client request/response, template-routed
//! resource reads, shared-secret enforcement, parse-error resilience, and
//! graceful shutdown.

#[cfg(test)]
mod tests {
    use {
        crate::client::McpClient,
        crate::config::ServerConfig,
        crate::framing,
        crate::handler::{
            ResourceContent, ResourceHandler, ResourceInfo, ToolDefinition, ToolHandler,
            ToolResponse,
        },
        crate::server::{McpServer, McpServerBuilder},
        crate::template::ParamMap,
        anyhow::Result,
        async_trait::async_trait,
        serde_json::{json, Value},
        std::sync::Arc,
        std::time::Duration,
        tokio::io::{AsyncReadExt, AsyncWriteExt},
        tokio::net::TcpStream,
    };

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, arguments: Value) -> Result<ToolResponse> {
            let message = arguments
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(ToolResponse::text(format!("Echo: {message}")))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl ToolHandler for SlowTool {
        async fn call(&self, _arguments: Value) -> Result<ToolResponse> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(ToolResponse::text("done"))
        }
    }

    struct SettingsResource;

    #[async_trait]
    impl ResourceHandler for SettingsResource {
        async fn read(&self, uri: &str, params: ParamMap) -> Result<Vec<ResourceContent>> {
            let user = params.get("user").and_then(Value::as_str).unwrap_or("?");
            let theme = params
                .get("theme")
                .and_then(Value::as_str)
                .unwrap_or("default");
            Ok(vec![ResourceContent::text(
                uri,
                format!("{user} uses {theme}"),
            )])
        }
    }

    async fn start_server(api_key: Option<&str>) -> (McpServer, String) {
        let mut config = ServerConfig::default();
        config.api_key = api_key.map(str::to_string);
        let server = McpServerBuilder::new()
            .with_config(config)
            .with_tool(
                ToolDefinition::new("echo", "Echo a message", json!({"type": "object"})),
                Arc::new(EchoTool),
            )
            .with_tool(
                ToolDefinition::new("slow", "Sleep then reply", json!({"type": "object"})),
                Arc::new(SlowTool),
            )
            .with_resource(ResourceInfo {
                uri: "static://readme".to_string(),
                name: "readme".to_string(),
                description: Some("A static resource".to_string()),
                mime_type: Some("text/plain".to_string()),
            })
            .with_template_route(
                "example://{user}/settings/{theme=light}",
                "settings",
                Arc::new(SettingsResource),
            )
            .unwrap()
            .build();
        let addr = server.serve_tcp("127.0.0.1:0").await.unwrap();
        (server, addr.to_string())
    }

    #[tokio::test]
    async fn ping_round_trips() {
        let (server, addr) = start_server(None).await;
        let client = McpClient::connect(&addr).await.unwrap();

        let result = client.request("ping", json!({})).await.unwrap();
        assert_eq!(result["message"], "pong");
        assert_eq!(result["server"]["name"], "framedmcp-server");

        server.stop().await;
    }

    #[tokio::test]
    async fn tool_calls_round_trip() {
        let (server, addr) = start_server(None).await;
        let client = McpClient::connect(&addr).await.unwrap();

        let result = client
            .request(
                "call_tool",
                json!({"name": "echo", "arguments": {"message": "over tcp"}}),
            )
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "Echo: over tcp");
        assert_eq!(result["isError"], false);

        server.stop().await;
    }

    #[tokio::test]
    async fn template_route_serves_reads_with_defaults() {
        let (server, addr) = start_server(None).await;
        let client = McpClient::connect(&addr).await.unwrap();

        let result = client
            .request(
                "read_resource",
                json!({"uri": "example://john/settings/dark"}),
            )
            .await
            .unwrap();
        assert_eq!(result["contents"][0]["text"], "john uses dark");

        // Defaulted parameter: empty capture extracts as "light"
        let result = client
            .request("read_resource", json!({"uri": "example://john/settings/"}))
            .await
            .unwrap();
        assert_eq!(result["contents"][0]["text"], "john uses light");

        server.stop().await;
    }

    #[tokio::test]
    async fn list_resources_reports_static_entries() {
        let (server, addr) = start_server(None).await;
        let client = McpClient::connect(&addr).await.unwrap();

        let result = client.request("list_resources", json!({})).await.unwrap();
        let resources = result["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["uri"], "static://readme");
        assert_eq!(resources[0]["mimeType"], "text/plain");

        server.stop().await;
    }

    #[tokio::test]
    async fn unknown_method_surfaces_as_rpc_error() {
        let (server, addr) = start_server(None).await;
        let client = McpClient::connect(&addr).await.unwrap();

        let err = client.request("bogus", json!({})).await.unwrap_err();
        match err {
            crate::error::McpError::Rpc { code, .. } => assert_eq!(code, -32601),
            other => panic!("expected rpc error, got {other}"),
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn shared_secret_is_enforced() {
        let (server, addr) = start_server(Some("hunter2")).await;

        let unauthorized = McpClient::connect(&addr).await.unwrap();
        let err = unauthorized.request("ping", json!({})).await.unwrap_err();
        match err {
            crate::error::McpError::Rpc { code, .. } => assert_eq!(code, -32600),
            other => panic!("expected auth error, got {other}"),
        }

        let authorized = McpClient::connect(&addr)
            .await
            .unwrap()
            .with_api_key("hunter2");
        let result = authorized.request("ping", json!({})).await.unwrap();
        assert!(result.get("server").is_some());

        server.stop().await;
    }

    #[tokio::test]
    async fn malformed_frame_leaves_connection_usable() {
        let (server, addr) = start_server(None).await;

        let mut stream = TcpStream::connect(&addr).await.unwrap();

        // A frame of valid length carrying invalid JSON: no response, no
        // connection teardown
        stream
            .write_all(&framing::encode(b"{definitely not json"))
            .await
            .unwrap();

        // A well-formed request on the same connection still answers
        stream
            .write_all(&framing::encode(br#"{"id":1,"method":"ping"}"#))
            .await
            .unwrap();

        let mut header = [0u8; 4];
        stream.read_exact(&mut header).await.unwrap();
        let length = u32::from_be_bytes(header) as usize;
        let mut body = vec![0u8; length];
        stream.read_exact(&mut body).await.unwrap();

        let response: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(response["id"], 1);
        assert!(response.get("result").is_some());

        server.stop().await;
    }

    #[tokio::test]
    async fn graceful_stop_drains_in_flight_requests() {
        let (server, addr) = start_server(None).await;
        let client = Arc::new(McpClient::connect(&addr).await.unwrap());

        let in_flight = {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .request("call_tool", json!({"name": "slow", "arguments": {}}))
                    .await
            })
        };

        // Let the slow call reach the worker before stopping
        tokio::time::sleep(Duration::from_millis(30)).await;
        let drained = server.stop().await;
        assert!(drained, "stop should drain the in-flight slow call");

        let result = in_flight.await.unwrap().unwrap();
        assert_eq!(result["content"][0]["text"], "done");
    }

    #[tokio::test]
    async fn concurrent_connections_interleave() {
        let (server, addr) = start_server(None).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let addr = addr.clone();
            handles.push(tokio::spawn(async move {
                let client = McpClient::connect(&addr).await.unwrap();
                let result = client
                    .request(
                        "call_tool",
                        json!({"name": "echo", "arguments": {"message": format!("client-{i}")}}),
                    )
                    .await
                    .unwrap();
                result["content"][0]["text"]
                    .as_str()
                    .unwrap()
                    .to_string()
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), format!("Echo: client-{i}"));
        }

        server.stop().await;
    }
}
