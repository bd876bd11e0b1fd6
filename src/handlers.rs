//! Method Handlers
//!
//! Implementations behind the router's method table. Each handler produces
//! the `result` payload for a success envelope or an `McpError` that the
//! router turns into an error envelope carrying the request id.

use {
    crate::error::{McpError, McpResult},
    crate::protocol::message::McpRequest,
    crate::server::ServerState,
    crate::template::ParamMap,
    serde_json::{json, Value},
    tracing::debug,
};

/// Dispatch a request to its method handler.
pub async fn dispatch(state: &ServerState, request: &McpRequest) -> McpResult<Value> {
    match request.method.as_str() {
        "ping" => handle_ping(state),
        "list_resources" => handle_list_resources(state),
        "list_resource_templates" => handle_list_resource_templates(state),
        "read_resource" => handle_read_resource(state, request).await,
        "list_tools" => handle_list_tools(state),
        "call_tool" => handle_call_tool(state, request).await,
        other => Err(McpError::UnknownMethod(other.to_string())),
    }
}

fn handle_ping(state: &ServerState) -> McpResult<Value> {
    Ok(json!({
        "message": "pong",
        "server": {
            "name": state.config.name,
            "version": state.config.version,
        },
    }))
}

fn handle_list_resources(state: &ServerState) -> McpResult<Value> {
    if !state.capabilities.resources {
        return Err(McpError::UnknownMethod("list_resources".to_string()));
    }
    let resources: Vec<Value> = state
        .resources
        .iter()
        .map(|entry| serde_json::to_value(entry.value()).unwrap_or(Value::Null))
        .collect();
    Ok(json!({ "resources": resources }))
}

fn handle_list_resource_templates(state: &ServerState) -> McpResult<Value> {
    if !state.capabilities.resources {
        return Err(McpError::UnknownMethod(
            "list_resource_templates".to_string(),
        ));
    }
    let templates: Vec<Value> = state
        .resource_templates
        .iter()
        .map(|entry| serde_json::to_value(entry.value()).unwrap_or(Value::Null))
        .collect();
    Ok(json!({ "resourceTemplates": templates }))
}

async fn handle_read_resource(state: &ServerState, request: &McpRequest) -> McpResult<Value> {
    if !state.capabilities.resources {
        return Err(McpError::UnknownMethod("read_resource".to_string()));
    }
    let uri = request
        .params
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("Missing or invalid 'uri' parameter".to_string()))?;

    // Template routes first: the first registered template that matches
    // the URI serves the read, with its extracted parameters.
    for route in &state.template_routes {
        if let Some(params) = state.template_cache.extract(uri, &route.template) {
            debug!(uri = %uri, template = %route.template, "Template route matched");
            let contents = route
                .handler
                .read(uri, params)
                .await
                .map_err(into_mcp_error)?;
            return contents_result(contents);
        }
    }

    // Fall back to the default resource handler.
    if let Some(handler) = &state.default_resource_handler {
        let contents = handler
            .read(uri, ParamMap::new())
            .await
            .map_err(into_mcp_error)?;
        return contents_result(contents);
    }

    // A statically-listed resource with no handler cannot produce content.
    if state.resources.contains_key(uri) {
        return Err(McpError::Internal(format!(
            "no handler configured for resource '{uri}'"
        )));
    }

    Err(McpError::UnknownResource(uri.to_string()))
}

fn contents_result(contents: Vec<crate::handler::ResourceContent>) -> McpResult<Value> {
    if contents.is_empty() {
        return Err(McpError::Internal(
            "resource handler returned no content".to_string(),
        ));
    }
    Ok(json!({ "contents": contents }))
}

fn handle_list_tools(state: &ServerState) -> McpResult<Value> {
    if !state.capabilities.tools {
        return Err(McpError::UnknownMethod("list_tools".to_string()));
    }
    let tools: Vec<Value> = state
        .tools
        .iter()
        .map(|entry| serde_json::to_value(&entry.value().definition).unwrap_or(Value::Null))
        .collect();
    Ok(json!({ "tools": tools }))
}

async fn handle_call_tool(state: &ServerState, request: &McpRequest) -> McpResult<Value> {
    if !state.capabilities.tools {
        return Err(McpError::UnknownMethod("call_tool".to_string()));
    }
    let name = request
        .params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("Missing or invalid 'name' parameter".to_string()))?;
    let arguments = request
        .params
        .get("arguments")
        .cloned()
        .unwrap_or(Value::Null);

    let handler = {
        let entry = state
            .tools
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;
        std::sync::Arc::clone(&entry.handler)
    };

    let response = handler.call(arguments).await.map_err(into_mcp_error)?;
    serde_json::to_value(&response).map_err(McpError::Json)
}

/// Handler errors that are already `McpError`s keep their code; anything
/// else becomes an internal error.
fn into_mcp_error(err: anyhow::Error) -> McpError {
    match err.downcast::<McpError>() {
        Ok(mcp) => mcp,
        Err(other) => McpError::Internal(other.to_string()),
    }
}
