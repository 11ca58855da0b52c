//! Buffer pool implementation for efficient buffer reuse
//!
//! Copy tasks borrow a fixed-size buffer for their whole lifetime and hand it
//! back when they finish. A released buffer is zero-filled before it goes back
//! on the free list, so the next borrower never sees a previous tunnel's bytes.

use bytes::BytesMut;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// A pool of reusable byte buffers
///
/// Cloning the pool is cheap; all clones share the same free list.
/// Borrowing never waits: when no idle buffer is available a new one is
/// allocated.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    /// Idle buffers, each exactly `buffer_size` bytes long
    free: Mutex<Vec<BytesMut>>,
    /// Length of every buffer handed out
    buffer_size: usize,
    /// Upper bound on idle buffers kept around
    max_idle: usize,
}

/// A buffer borrowed from the pool
///
/// When dropped, the buffer is wiped and returned to the pool.
pub struct PooledBuffer {
    buffer: Option<BytesMut>,
    pool: BufferPool,
}

impl BufferPool {
    /// Create a new buffer pool
    ///
    /// # Parameters
    ///
    /// * `buffer_size` - Length of each buffer in bytes
    /// * `max_idle` - Maximum number of idle buffers retained for reuse
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                free: Mutex::new(Vec::new()),
                buffer_size,
                max_idle,
            }),
        }
    }

    /// Borrow a buffer from the pool
    ///
    /// The returned buffer is `buffer_size` bytes long and all zeroes.
    pub fn get_buffer(&self) -> PooledBuffer {
        let reused = self.inner.free.lock().ok().and_then(|mut free| free.pop());
        let buffer = reused.unwrap_or_else(|| BytesMut::zeroed(self.inner.buffer_size));

        PooledBuffer {
            buffer: Some(buffer),
            pool: self.clone(),
        }
    }

    /// Length of the buffers this pool hands out
    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Number of idle buffers currently held by the pool
    pub fn idle_count(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }

    fn release(&self, mut buffer: BytesMut) {
        // Overwrite the whole block, not just the bytes the last copy touched.
        buffer.fill(0);

        if let Ok(mut free) = self.inner.free.lock() {
            if free.len() < self.inner.max_idle {
                free.push(buffer);
            }
        }
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_reuse() {
        let pool = BufferPool::new(1024, 2);

        let mut buffer1 = pool.get_buffer();
        let mut buffer2 = pool.get_buffer();
        assert_eq!(buffer1.len(), 1024);
        assert_eq!(buffer2.len(), 1024);

        buffer1[..5].copy_from_slice(b"hello");
        buffer2[..5].copy_from_slice(b"world");
        assert_eq!(&buffer1[..5], b"hello");
        assert_eq!(&buffer2[..5], b"world");
        assert_eq!(pool.idle_count(), 0);

        drop(buffer1);
        drop(buffer2);
        assert_eq!(pool.idle_count(), 2);

        // Reused buffers come back fully wiped
        let buffer3 = pool.get_buffer();
        assert_eq!(pool.idle_count(), 1);
        assert!(buffer3.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_released_buffer_is_wiped_end_to_end() {
        let pool = BufferPool::new(64, 1);

        let mut buffer = pool.get_buffer();
        buffer.fill(0xAB);
        drop(buffer);

        let buffer = pool.get_buffer();
        assert_eq!(buffer.len(), 64);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_idle_cap() {
        let pool = BufferPool::new(16, 1);

        let a = pool.get_buffer();
        let b = pool.get_buffer();
        let c = pool.get_buffer();
        drop(a);
        drop(b);
        drop(c);

        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_clones_share_free_list() {
        let pool = BufferPool::new(16, 4);
        let other = pool.clone();

        drop(other.get_buffer());
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.buffer_size(), 16);
    }
}
