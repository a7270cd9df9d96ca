//! Buffer pool implementation for efficient buffer reuse
//!
//! This module provides a thread-safe free-list of fixed-size buffers.
//! A buffer is allocated on first use and handed back to the free-list when
//! the borrower drops it, so every borrow is paired with exactly one release.

use bytes::BytesMut;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A pool of reusable fixed-size byte buffers
///
/// Cloning the pool is cheap; all clones share the same free-list.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    /// Buffers waiting to be borrowed again
    free: Mutex<Vec<BytesMut>>,
    /// Length of every buffer handed out
    buffer_size: usize,
    allocated: AtomicUsize,
    borrowed: AtomicUsize,
    released: AtomicUsize,
}

/// Counters describing pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers allocated over the pool's lifetime
    pub allocated: usize,
    /// Total borrows
    pub borrowed: usize,
    /// Total releases
    pub released: usize,
    /// Buffers currently sitting in the free-list
    pub idle: usize,
}

impl PoolStats {
    /// Buffers currently checked out
    pub fn in_use(&self) -> usize {
        self.borrowed.saturating_sub(self.released)
    }
}

/// A buffer borrowed from the pool
///
/// Derefs to a byte slice of the pool's buffer size. When dropped, the
/// buffer goes back to the pool.
pub struct PooledBuffer {
    buffer: BytesMut,
    pool: Arc<BufferPoolInner>,
}

impl BufferPool {
    /// Create a pool whose buffers are `buffer_size_kb` kilobytes long
    ///
    /// Sizes whose byte count does not fit in `usize` are clamped to
    /// `usize::MAX`, which fails on first allocation instead of wrapping to an
    /// empty buffer.
    pub fn new(buffer_size_kb: usize) -> Self {
        let bytes = buffer_size_kb.checked_mul(1024).unwrap_or(usize::MAX);
        Self::with_capacity_bytes(bytes)
    }

    /// Create a pool whose buffers are exactly `buffer_size` bytes long
    pub fn with_capacity_bytes(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                free: Mutex::new(Vec::new()),
                buffer_size,
                allocated: AtomicUsize::new(0),
                borrowed: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    /// Size in bytes of each buffer
    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Borrow a buffer, reusing an idle one when available
    pub fn borrow(&self) -> PooledBuffer {
        let reused = self.inner.free_list().pop();
        let buffer = match reused {
            Some(buffer) => buffer,
            None => {
                self.inner.allocated.fetch_add(1, Ordering::Relaxed);
                BytesMut::zeroed(self.inner.buffer_size)
            }
        };
        self.inner.borrowed.fetch_add(1, Ordering::AcqRel);

        PooledBuffer {
            buffer,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        let idle = self.inner.free_list().len();
        PoolStats {
            allocated: self.inner.allocated.load(Ordering::Relaxed),
            borrowed: self.inner.borrowed.load(Ordering::Acquire),
            released: self.inner.released.load(Ordering::Acquire),
            idle,
        }
    }
}

impl BufferPoolInner {
    fn free_list(&self) -> MutexGuard<'_, Vec<BytesMut>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.free.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.pool.free_list().push(buffer);
        self.pool.released.fetch_add(1, Ordering::AcqRel);
    }
}
