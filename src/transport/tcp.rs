//! TCP Transport
//!
//! Listener plus accept loop: one spawned task per accepted connection
//! running the connection loop. Stopping the accept loop does not tear
//! down live connections; they observe the same stop signal themselves.

use {
    crate::connection::{run_connection, ConnectionContext},
    crate::error::McpResult,
    futures_util::StreamExt,
    std::net::SocketAddr,
    tokio::net::TcpListener,
    tokio::sync::watch,
    tokio_stream::wrappers::TcpListenerStream,
    tracing::{debug, warn},
};

pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    pub async fn bind(addr: &str) -> McpResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> McpResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the stop signal fires, spawning a
    /// connection loop per client.
    pub async fn serve(self, ctx: ConnectionContext, mut stop: watch::Receiver<bool>) {
        let mut incoming = TcpListenerStream::new(self.listener);
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                accepted = incoming.next() => match accepted {
                    Some(Ok(stream)) => {
                        let peer = stream
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        // Frames are small and latency-sensitive
                        let _ = stream.set_nodelay(true);
                        tokio::spawn(run_connection(stream, ctx.clone(), peer));
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Accept failed");
                    }
                    None => break,
                }
            }
        }
        debug!("TCP accept loop stopped");
    }
}
