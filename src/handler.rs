//! Handler Traits
//!
//! The integration point for business logic: implement [`ResourceHandler`]
//! to serve resource reads and [`ToolHandler`] to execute tools. Handlers
//! receive owned/borrowed inputs scoped to one dispatch cycle and must not
//! retain them past the call.

use {
    crate::template::ParamMap,
    anyhow::Result,
    async_trait::async_trait,
    schemars::JsonSchema,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// A single content item, tagged by type (MCP wire shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text content
    #[serde(rename = "text")]
    Text { text: String },

    /// Resource reference
    #[serde(rename = "resource")]
    Resource {
        uri: String,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of a tool invocation: a content array plus a soft-error flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    /// A successful text response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    /// A tool-level failure, reported in-band rather than as a JSON-RPC
    /// error
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }
}

/// Resource metadata for `list_resources` responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource template metadata for `list_resource_templates` responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplateInfo {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource content for `read_resource` responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

impl ResourceContent {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: text.into(),
        }
    }
}

/// Tool definition for `list_tools` responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Derive the input schema from a `JsonSchema` parameter type.
    pub fn with_schema<P: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let schema = schemars::schema_for!(P);
        Self::new(
            name,
            description,
            serde_json::to_value(schema).unwrap_or(Value::Null),
        )
    }
}

/// Serves resource reads. Invoked with the concrete URI and any parameters
/// extracted by the URI template engine (empty for direct reads).
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, uri: &str, params: ParamMap) -> Result<Vec<ResourceContent>>;
}

/// Executes a tool call with its JSON arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> Result<ToolResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_response_serializes_to_mcp_shape() {
        let response = ToolResponse::text("hello");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "hello");
        assert_eq!(value["isError"], false);
    }

    #[test]
    fn resource_info_uses_camel_case_mime_type() {
        let info = ResourceInfo {
            uri: "example://a".into(),
            name: "a".into(),
            description: None,
            mime_type: Some("text/plain".into()),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["mimeType"], "text/plain");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn schema_derivation_produces_object_schema() {
        #[derive(JsonSchema)]
        #[allow(dead_code)]
        struct EchoParams {
            message: String,
        }

        let def = ToolDefinition::with_schema::<EchoParams>("echo", "Echo a message");
        assert_eq!(def.name, "echo");
        assert_eq!(def.input_schema["properties"]["message"]["type"], "string");
        let value = serde_json::to_value(&def).unwrap();
        assert!(value.get("inputSchema").is_some());
    }
}
