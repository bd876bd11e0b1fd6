//! Resource limits configuration for framed MCP servers
//!
//! Provides configurable bounds to prevent resource exhaustion and DoS attacks
//! from malicious peers (oversized frames, queue flooding, cache growth).

use serde::{Deserialize, Serialize};

/// Default maximum frame payload size accepted on the wire (4 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Default fixed size of each pooled receive buffer (64 KiB).
pub const DEFAULT_POOL_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of preallocated pooled buffers.
pub const DEFAULT_POOL_BUFFER_COUNT: usize = 16;

/// Default number of dispatcher worker tasks.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default dispatcher queue capacity.
pub const DEFAULT_TASK_QUEUE_CAPACITY: usize = 64;

/// Default compiled-template cache capacity.
pub const DEFAULT_TEMPLATE_CACHE_CAPACITY: usize = 128;

/// Readability-wait interval used when no idle timeout is configured,
/// purely so cooperative cancellation is observed within a bounded delay.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

/// Configuration for various resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum frame payload size in bytes
    pub max_message_size: usize,

    /// Fixed size of each pooled receive buffer
    pub pool_buffer_size: usize,

    /// Number of preallocated pooled buffers
    pub pool_buffer_count: usize,

    /// Dispatcher queue capacity (backpressure bound)
    pub task_queue_capacity: usize,

    /// Number of dispatcher worker tasks
    pub worker_count: usize,

    /// Compiled-template cache capacity
    pub template_cache_capacity: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            pool_buffer_size: DEFAULT_POOL_BUFFER_SIZE,
            pool_buffer_count: DEFAULT_POOL_BUFFER_COUNT,
            task_queue_capacity: DEFAULT_TASK_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            template_cache_capacity: DEFAULT_TEMPLATE_CACHE_CAPACITY,
        }
    }
}

impl ResourceLimits {
    /// Create strict limits for testing or restricted environments
    pub fn strict() -> Self {
        Self {
            max_message_size: 256 * 1024, // 256KB
            pool_buffer_size: 4 * 1024,
            pool_buffer_count: 4,
            task_queue_capacity: 8,
            worker_count: 2,
            template_cache_capacity: 16,
        }
    }
}
