//! Buffer Pool
//!
//! Fixed-size reusable byte buffers for the receive path, avoiding a fresh
//! allocation per message. Frames larger than the pool's fixed buffer size
//! get a one-off allocation instead; the returned [`PooledBuffer`] carries
//! its origin so its drop path routes correctly without call-site branching.

use {
    std::ops::{Deref, DerefMut},
    std::sync::atomic::{AtomicUsize, Ordering},
    std::sync::{Arc, Mutex},
    tracing::debug,
};

/// Where a buffer came from; determines its release path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOrigin {
    /// Drawn from (or returned to) the preallocated pool
    Pooled,
    /// One-off allocation for a frame larger than the pool buffer size
    Adhoc,
}

/// A pool of fixed-size reusable buffers behind a short-held lock.
pub struct BufferPool {
    buffer_size: usize,
    free: Mutex<Vec<Vec<u8>>>,
    total_buffers: AtomicUsize,
}

impl BufferPool {
    /// Create a pool of `count` preallocated buffers of `buffer_size` bytes.
    pub fn new(buffer_size: usize, count: usize) -> Arc<Self> {
        let free = (0..count)
            .map(|_| Vec::with_capacity(buffer_size))
            .collect::<Vec<_>>();
        debug!(
            buffer_size = buffer_size,
            count = count,
            "Buffer pool created"
        );
        Arc::new(Self {
            buffer_size,
            free: Mutex::new(free),
            total_buffers: AtomicUsize::new(count),
        })
    }

    /// The fixed size of each pooled buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Acquire a buffer able to hold `required` bytes.
    ///
    /// Frames that fit the pool's fixed buffer size draw from the pool
    /// (growing it when empty rather than failing); larger frames get a
    /// one-off allocation tagged [`BufferOrigin::Adhoc`].
    pub fn acquire(self: &Arc<Self>, required: usize) -> PooledBuffer {
        if required <= self.buffer_size {
            let data = {
                let mut free = self.free.lock().unwrap();
                free.pop()
            };
            let data = match data {
                Some(buf) => buf,
                None => {
                    // Pool empty: grow rather than fail the request
                    self.total_buffers.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        total = self.total_buffers.load(Ordering::Relaxed),
                        "Buffer pool empty, allocating additional buffer"
                    );
                    Vec::with_capacity(self.buffer_size)
                }
            };
            PooledBuffer {
                data,
                origin: BufferOrigin::Pooled,
                pool: Arc::clone(self),
            }
        } else {
            PooledBuffer {
                data: Vec::with_capacity(required),
                origin: BufferOrigin::Adhoc,
                pool: Arc::clone(self),
            }
        }
    }

    /// (total buffers ever pooled, buffers currently available)
    pub fn stats(&self) -> (usize, usize) {
        let available = self.free.lock().unwrap().len();
        (self.total_buffers.load(Ordering::Relaxed), available)
    }

    fn release(&self, mut data: Vec<u8>) {
        data.clear();
        let mut free = self.free.lock().unwrap();
        free.push(data);
    }
}

/// An owned byte buffer whose release path is determined by its origin tag:
/// pooled buffers return to the pool on drop, ad-hoc ones are simply freed.
pub struct PooledBuffer {
    data: Vec<u8>,
    origin: BufferOrigin,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    pub fn origin(&self) -> BufferOrigin {
        self.origin
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if self.origin == BufferOrigin::Pooled {
            self.pool.release(std::mem::take(&mut self.data));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_frames_draw_from_pool() {
        let pool = BufferPool::new(1024, 2);
        let buf = pool.acquire(100);
        assert_eq!(buf.origin(), BufferOrigin::Pooled);
        assert!(buf.capacity() >= 1024);
        let (_, available) = pool.stats();
        assert_eq!(available, 1);
    }

    #[test]
    fn large_frames_get_adhoc_allocation() {
        let pool = BufferPool::new(1024, 2);
        let buf = pool.acquire(4096);
        assert_eq!(buf.origin(), BufferOrigin::Adhoc);
        assert!(buf.capacity() >= 4096);
        // ad-hoc buffers never enter the free list
        drop(buf);
        let (total, available) = pool.stats();
        assert_eq!(total, 2);
        assert_eq!(available, 2);
    }

    #[test]
    fn pooled_buffer_returns_on_drop() {
        let pool = BufferPool::new(1024, 1);
        {
            let mut buf = pool.acquire(10);
            buf.extend_from_slice(b"payload");
            let (_, available) = pool.stats();
            assert_eq!(available, 0);
        }
        let (_, available) = pool.stats();
        assert_eq!(available, 1);
        // returned buffer is cleared for the next user
        let buf = pool.acquire(10);
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_pool_grows_instead_of_failing() {
        let pool = BufferPool::new(1024, 1);
        let a = pool.acquire(10);
        let b = pool.acquire(10);
        assert_eq!(a.origin(), BufferOrigin::Pooled);
        assert_eq!(b.origin(), BufferOrigin::Pooled);
        drop(a);
        drop(b);
        let (total, available) = pool.stats();
        assert_eq!(total, 2);
        assert_eq!(available, 2);
    }
}
