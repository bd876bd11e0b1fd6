//! Stdio Transport
//!
//! A single framed connection over stdin/stdout, sharing the connection
//! loop (and so the framing, dispatch, and shutdown behavior) with TCP.

use {
    crate::connection::{run_connection, ConnectionContext},
    tokio::io::{stdin, stdout},
};

pub struct StdioTransport;

impl StdioTransport {
    /// Serve frames on stdin/stdout until EOF or shutdown.
    pub async fn serve(ctx: ConnectionContext) {
        let stream = tokio::io::join(stdin(), stdout());
        run_connection(stream, ctx, "stdio".to_string()).await;
    }
}
