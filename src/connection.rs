//! Connection Loop
//!
//! Per-connection receive/send state machine: wait for data (bounded by
//! the idle timeout), read the 4-byte length prefix, read exactly that
//! many payload bytes into a pooled buffer, hand a copy to the dispatcher,
//! release the buffer, and write back the framed response. The shutdown
//! signal is observed at the wait and read boundaries, so cancellation
//! latency is bounded by the readability-wait interval, never instant;
//! a request already handed to the dispatcher still gets its response
//! written before the loop closes.
//!
//! Any transport error, framing violation, EOF, idle timeout, or
//! cancellation closes the connection; none of them are fatal to the
//! process.

use {
    crate::buffer_pool::BufferPool,
    crate::dispatcher::Dispatcher,
    crate::error::McpError,
    crate::framing::{self, LENGTH_PREFIX_SIZE},
    crate::limits::DEFAULT_POLL_INTERVAL_MS,
    crate::logging::{self, ConnectionId},
    std::sync::Arc,
    std::time::Duration,
    tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    tokio::sync::watch,
    tokio::time::{timeout, Instant},
    tracing::{debug, warn},
};

/// Everything a connection loop needs from the server, cloneable per
/// accepted connection.
#[derive(Clone)]
pub struct ConnectionContext {
    pub pool: Arc<BufferPool>,
    pub dispatcher: Dispatcher,
    pub stop: watch::Receiver<bool>,
    pub idle_timeout: Option<Duration>,
    pub max_message_size: usize,
}

/// Run the receive/send loop on `stream` until the connection closes.
pub async fn run_connection<S>(mut stream: S, mut ctx: ConnectionContext, peer: String)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let connection_id = ConnectionId::new();
    logging::log_connection_established(&connection_id, &peer);
    let opened = std::time::Instant::now();
    let mut last_activity = Instant::now();

    loop {
        if *ctx.stop.borrow() {
            break;
        }

        // WaitReadable: block until the first byte of the next frame
        // arrives, the idle deadline passes, or shutdown is requested.
        let wait = match ctx.idle_timeout {
            Some(idle) => (last_activity + idle).saturating_duration_since(Instant::now()),
            None => Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        };

        let mut header = [0u8; LENGTH_PREFIX_SIZE];
        tokio::select! {
            _ = ctx.stop.changed() => break,
            result = timeout(wait, stream.read(&mut header[..1])) => match result {
                Err(_elapsed) => {
                    if let Some(idle) = ctx.idle_timeout {
                        if Instant::now().saturating_duration_since(last_activity) >= idle {
                            logging::log_idle_timeout(&connection_id);
                            break;
                        }
                    }
                    continue;
                }
                Ok(Ok(0)) => {
                    debug!(connection_id = %connection_id, "Peer closed connection");
                    break;
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    debug!(connection_id = %connection_id, error = %e, "Read failed waiting for frame");
                    break;
                }
            }
        }

        // ReadLength: the remaining three prefix bytes, exactly.
        tokio::select! {
            _ = ctx.stop.changed() => break,
            result = stream.read_exact(&mut header[1..]) => {
                if let Err(e) = result {
                    debug!(connection_id = %connection_id, error = %e, "Short read on length prefix");
                    break;
                }
            }
        }
        last_activity = Instant::now();

        let length = match framing::decode_length(header, ctx.max_message_size) {
            Ok(length) => length as usize,
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "Invalid frame length, closing connection");
                break;
            }
        };

        // ReadBody: exactly `length` bytes into a pooled buffer.
        let mut buffer = ctx.pool.acquire(length + 1);
        buffer.resize(length, 0);
        tokio::select! {
            _ = ctx.stop.changed() => break,
            result = stream.read_exact(&mut buffer[..]) => {
                if let Err(e) = result {
                    debug!(connection_id = %connection_id, error = %e, "Short read on frame body");
                    break;
                }
            }
        }
        last_activity = Instant::now();
        logging::log_message_received(&connection_id, length);

        // Dispatch: the task owns a copy; the receive buffer goes back to
        // the pool before the response is awaited.
        let submitted = ctx.dispatcher.submit(buffer.to_vec());
        drop(buffer);

        let reply = match submitted {
            Ok(reply) => reply,
            Err(McpError::QueueFull) => {
                // Message dropped under backpressure; the peer perceives
                // a timeout. The connection stays open.
                warn!(connection_id = %connection_id, "Dispatcher backpressure, message dropped");
                continue;
            }
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "Dispatch rejected, closing connection");
                break;
            }
        };

        // An accepted request is processed to completion even during
        // shutdown; draining means the peer still gets its answer. The
        // loop observes the stop signal again before the next frame.
        let response = reply.await.unwrap_or(None);

        // WriteResponse: frame and write fully; oversized responses are
        // logged and dropped without closing the connection.
        if let Some(response) = response {
            if response.is_empty() {
                continue;
            }
            if response.len() > ctx.max_message_size {
                logging::log_response_oversized(&connection_id, response.len(), ctx.max_message_size);
                continue;
            }
            let framed = framing::encode(response.as_bytes());
            let write_result = async {
                stream.write_all(&framed).await?;
                stream.flush().await
            }
            .await;
            if let Err(e) = write_result {
                debug!(connection_id = %connection_id, error = %e, "Write failed, closing connection");
                break;
            }
            last_activity = Instant::now();
            logging::log_response_sent(&connection_id, response.len());
        }
    }

    logging::log_connection_closed(&connection_id, opened.elapsed());
}
