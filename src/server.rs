//! Server Core
//!
//! `McpServer` owns the shared state (route tables, buffer pool, template
//! cache), the dispatcher, and the shutdown coordinator, and wires them to
//! the framed transports. State is populated through the builder before
//! serving starts and treated as read-mostly afterwards.

use {
    crate::buffer_pool::BufferPool,
    crate::config::ServerConfig,
    crate::connection::ConnectionContext,
    crate::dispatcher::Dispatcher,
    crate::error::McpResult,
    crate::handler::{
        ResourceHandler, ResourceInfo, ResourceTemplateInfo, ToolDefinition, ToolHandler,
    },
    crate::logging,
    crate::router::MessageRouter,
    crate::shutdown::ShutdownCoordinator,
    crate::template::CompiledTemplate,
    crate::template_cache::TemplateCache,
    crate::transport::{stdio::StdioTransport, tcp::TcpTransport},
    dashmap::DashMap,
    std::net::SocketAddr,
    std::sync::Arc,
    std::time::Duration,
    tracing::{debug, info},
};

/// Capability flags gating the resource and tool method families.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub resources: bool,
    pub tools: bool,
}

/// A URI template bound to a resource handler. Routes are consulted in
/// registration order; the first matching template wins.
pub struct TemplateRoute {
    pub template: String,
    pub handler: Arc<dyn ResourceHandler>,
}

/// A registered tool: its definition plus the handler that executes it.
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

/// Shared server state, passed by handle to every worker and connection.
pub struct ServerState {
    pub config: ServerConfig,
    pub capabilities: Capabilities,
    pub resources: DashMap<String, ResourceInfo>,
    pub resource_templates: DashMap<String, ResourceTemplateInfo>,
    pub template_routes: Vec<TemplateRoute>,
    pub default_resource_handler: Option<Arc<dyn ResourceHandler>>,
    pub tools: DashMap<String, RegisteredTool>,
    pub template_cache: TemplateCache,
}

pub struct McpServer {
    state: Arc<ServerState>,
    coordinator: Arc<ShutdownCoordinator>,
    dispatcher: Dispatcher,
    pool: Arc<BufferPool>,
}

impl McpServer {
    pub fn builder() -> McpServerBuilder {
        McpServerBuilder::new()
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.coordinator
    }

    fn connection_context(&self) -> ConnectionContext {
        let limits = &self.state.config.limits;
        let idle_timeout = match self.state.config.idle_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        ConnectionContext {
            pool: Arc::clone(&self.pool),
            dispatcher: self.dispatcher.clone(),
            stop: self.coordinator.stop_signal(),
            idle_timeout,
            max_message_size: limits.max_message_size,
        }
    }

    /// Bind a TCP listener and serve connections in the background.
    /// Returns the bound address (useful with port 0).
    pub async fn serve_tcp(&self, addr: &str) -> McpResult<SocketAddr> {
        let transport = TcpTransport::bind(addr).await?;
        let local_addr = transport.local_addr()?;
        let ctx = self.connection_context();
        let stop = self.coordinator.stop_signal();
        tokio::spawn(transport.serve(ctx, stop));
        logging::log_server_ready(&local_addr.to_string());
        Ok(local_addr)
    }

    /// Serve a single framed connection over stdin/stdout. Blocks until
    /// EOF or shutdown.
    pub async fn serve_stdio(&self) {
        info!("Serving framed connection on stdio");
        StdioTransport::serve(self.connection_context()).await;
    }

    /// Request shutdown: stop accepting, signal every connection loop, and
    /// wait for in-flight requests to drain (bounded by the configured
    /// shutdown timeout). Returns `true` when the server drained fully.
    pub async fn stop(&self) -> bool {
        logging::log_server_shutdown();
        self.coordinator.request_shutdown();
        let timeout = Duration::from_millis(self.state.config.shutdown_timeout_ms);
        let drained = self.coordinator.wait_for_drain(timeout).await;
        if drained {
            debug!("All in-flight requests drained");
        }
        drained
    }
}

/// Builder populating the route tables before the server starts.
pub struct McpServerBuilder {
    config: ServerConfig,
    resources: DashMap<String, ResourceInfo>,
    resource_templates: DashMap<String, ResourceTemplateInfo>,
    template_routes: Vec<TemplateRoute>,
    default_resource_handler: Option<Arc<dyn ResourceHandler>>,
    tools: DashMap<String, RegisteredTool>,
}

impl McpServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            resources: DashMap::new(),
            resource_templates: DashMap::new(),
            template_routes: Vec::new(),
            default_resource_handler: None,
            tools: DashMap::new(),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a static resource (metadata for `list_resources`).
    pub fn with_resource(self, info: ResourceInfo) -> Self {
        self.resources.insert(info.uri.clone(), info);
        self
    }

    /// Advertise a resource template in `list_resource_templates`.
    pub fn with_resource_template(self, info: ResourceTemplateInfo) -> Self {
        self.resource_templates.insert(info.uri_template.clone(), info);
        self
    }

    /// Route reads of URIs matching `template` to `handler`. The template
    /// is compiled eagerly so malformed templates fail at build time, and
    /// it is advertised in `list_resource_templates` under `name`.
    pub fn with_template_route(
        mut self,
        template: impl Into<String>,
        name: impl Into<String>,
        handler: Arc<dyn ResourceHandler>,
    ) -> McpResult<Self> {
        let template = template.into();
        CompiledTemplate::compile(&template)?;
        self.resource_templates.insert(
            template.clone(),
            ResourceTemplateInfo {
                uri_template: template.clone(),
                name: name.into(),
                description: None,
                mime_type: None,
            },
        );
        self.template_routes.push(TemplateRoute { template, handler });
        Ok(self)
    }

    /// Fallback handler for reads no template route matched.
    pub fn with_resource_handler(mut self, handler: Arc<dyn ResourceHandler>) -> Self {
        self.default_resource_handler = Some(handler);
        self
    }

    /// Register a tool.
    pub fn with_tool(self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) -> Self {
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler,
            },
        );
        self
    }

    pub fn build(self) -> McpServer {
        let capabilities = Capabilities {
            resources: !self.resources.is_empty()
                || !self.resource_templates.is_empty()
                || !self.template_routes.is_empty()
                || self.default_resource_handler.is_some(),
            tools: !self.tools.is_empty(),
        };

        let limits = self.config.limits.clone();
        let state = Arc::new(ServerState {
            template_cache: TemplateCache::new(limits.template_cache_capacity),
            config: self.config,
            capabilities,
            resources: self.resources,
            resource_templates: self.resource_templates,
            template_routes: self.template_routes,
            default_resource_handler: self.default_resource_handler,
            tools: self.tools,
        });

        let coordinator = ShutdownCoordinator::new();
        let router = Arc::new(MessageRouter::new(Arc::clone(&state)));
        let dispatcher = Dispatcher::start(
            limits.worker_count,
            limits.task_queue_capacity,
            router,
            Arc::clone(&coordinator),
        );
        let pool = BufferPool::new(limits.pool_buffer_size, limits.pool_buffer_count);

        debug!(
            resources = state.resources.len(),
            templates = state.template_routes.len(),
            tools = state.tools.len(),
            "Server built"
        );

        McpServer {
            state,
            coordinator,
            dispatcher,
            pool,
        }
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
