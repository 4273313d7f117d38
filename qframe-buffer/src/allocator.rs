//! # Buffer Allocators
//!
//! A [`BufferAllocator`] hands out [`Block`]s and takes them back. The owner
//! of a block is always a [`UniqueBuffer`] (or the `MemSlice` it was frozen
//! into), so every block is released exactly once, by `Drop`.
//!
//! Allocators are injected explicitly (`Arc<dyn BufferAllocator>`); there is
//! no process-wide default instance.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use buffer_pool::{ConsumeBuffer, Pool, Pooled};
use tracing::{debug, trace};

use crate::error::{BufferError, Result};

/// Single-shard pool: one allocator serves one connection or worker.
pub type BlockPool = Pool<1, ConsumeBuffer>;

/// Whether a request may be served from (and returned to) a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationMode {
    #[default]
    Pooled,
    /// Bypass any pooling and allocate straight from the heap.
    Direct,
}

/// Storage handed out by an allocator.
///
/// A pooled block goes back to its pool when dropped; a heap block is freed.
pub enum Block {
    Pooled(Pooled<ConsumeBuffer>),
    Heap(Box<[u8]>),
}

impl Block {
    pub fn heap(size: usize) -> Self {
        Block::Heap(vec![0u8; size].into_boxed_slice())
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self, Block::Pooled(_))
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::Heap(Box::default())
    }
}

impl Deref for Block {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            Block::Pooled(buf) => buf,
            Block::Heap(buf) => buf,
        }
    }
}

impl DerefMut for Block {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Block::Pooled(buf) => buf,
            Block::Heap(buf) => buf,
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("pooled", &self.is_pooled())
            .field("len", &self.len())
            .finish()
    }
}

/// Source of raw buffers.
pub trait BufferAllocator: Send + Sync + fmt::Debug {
    /// A block of at least `size` bytes.
    fn allocate(&self, size: usize) -> Block {
        self.allocate_with(size, AllocationMode::Pooled)
    }

    fn allocate_with(&self, size: usize, mode: AllocationMode) -> Block;

    /// Give back a block obtained from this allocator.
    fn release(&self, block: Block);

    /// Hint that the owner is idle and pooled memory may be dropped.
    fn mark_idle(&self) {}

    fn stats(&self) -> AllocatorSnapshot;
}

/// Point-in-time copy of [`AllocatorStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorSnapshot {
    pub allocations: u64,
    pub releases: u64,
    pub pool_hits: u64,
    pub outstanding: u64,
}

/// Lock-free counters shared by the allocator implementations.
#[derive(Debug, Default)]
pub struct AllocatorStats {
    allocations: AtomicU64,
    releases: AtomicU64,
    pool_hits: AtomicU64,
}

impl AllocatorStats {
    pub fn record_allocation(&self, pool_hit: bool) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        if pool_hit {
            self.pool_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AllocatorSnapshot {
        let allocations = self.allocations.load(Ordering::Relaxed);
        let releases = self.releases.load(Ordering::Relaxed);
        AllocatorSnapshot {
            allocations,
            releases,
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            outstanding: allocations.saturating_sub(releases),
        }
    }
}

// ============================================================================
// Simple heap allocator
// ============================================================================

/// One heap allocation per request.
#[derive(Debug, Default)]
pub struct SimpleBufferAllocator {
    stats: AllocatorStats,
}

impl SimpleBufferAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn BufferAllocator> {
        Arc::new(Self::new())
    }
}

impl BufferAllocator for SimpleBufferAllocator {
    fn allocate_with(&self, size: usize, _mode: AllocationMode) -> Block {
        self.stats.record_allocation(false);
        Block::heap(size)
    }

    fn release(&self, block: Block) {
        self.stats.record_release();
        drop(block);
    }

    fn stats(&self) -> AllocatorSnapshot {
        self.stats.snapshot()
    }
}

// ============================================================================
// Pooled allocator
// ============================================================================

/// Fixed-size blocks recycled through a [`BlockPool`].
///
/// Requests up to `block_size` bytes are served from the pool. Larger
/// requests and [`AllocationMode::Direct`] requests go to the heap. The pool
/// keeps at most `max_pooled` idle blocks.
///
/// The pool is leaked on construction: pooled blocks point back at it, so it
/// must outlive every block, and it lives as long as the connection or worker
/// that owns the allocator.
pub struct PooledBufferAllocator {
    block_size: usize,
    max_pooled: usize,
    pool: &'static BlockPool,
    /// Mirror of the pool's idle count, used for hit accounting.
    idle: AtomicUsize,
    stats: AllocatorStats,
}

impl PooledBufferAllocator {
    pub fn new(block_size: usize, max_pooled: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(BufferError::ZeroBlockSize);
        }
        let pool: &'static BlockPool = Box::leak(Box::new(BlockPool::new(max_pooled, block_size)));
        Ok(Self {
            block_size,
            max_pooled,
            pool,
            idle: AtomicUsize::new(0),
            stats: AllocatorStats::default(),
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Idle blocks currently held by the pool.
    pub fn pooled(&self) -> usize {
        self.idle.load(Ordering::Relaxed)
    }

    fn take_idle(&self) -> bool {
        self.idle
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl BufferAllocator for PooledBufferAllocator {
    fn allocate_with(&self, size: usize, mode: AllocationMode) -> Block {
        if mode == AllocationMode::Direct || size > self.block_size {
            self.stats.record_allocation(false);
            return Block::heap(size);
        }
        self.stats.record_allocation(self.take_idle());

        let mut buf = self.pool.get_empty();
        buf.truncate(0);
        buf.expand(self.block_size);
        Block::Pooled(buf)
    }

    fn release(&self, block: Block) {
        self.stats.record_release();
        if block.is_pooled() {
            // The pool takes the block back on drop unless it is full.
            let _ = self
                .idle
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    (n < self.max_pooled).then_some(n + 1)
                });
        }
        drop(block);
    }

    fn mark_idle(&self) {
        // Pooled blocks are trimmed to `block_size` as they come back; the
        // pool itself is bounded, so there is nothing further to drop.
        debug!(
            idle = self.pooled(),
            block_size = self.block_size,
            "allocator marked idle"
        );
    }

    fn stats(&self) -> AllocatorSnapshot {
        self.stats.snapshot()
    }
}

impl fmt::Debug for PooledBufferAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBufferAllocator")
            .field("block_size", &self.block_size)
            .field("max_pooled", &self.max_pooled)
            .field("idle", &self.pooled())
            .finish()
    }
}

// ============================================================================
// UniqueBuffer
// ============================================================================

/// Mutable, exclusively owned block that returns itself to its allocator on
/// drop.
pub struct UniqueBuffer {
    data: Block,
    len: usize,
    allocator: Arc<dyn BufferAllocator>,
}

impl UniqueBuffer {
    pub fn new(allocator: &Arc<dyn BufferAllocator>, len: usize) -> Self {
        Self::with_mode(allocator, len, AllocationMode::Pooled)
    }

    pub fn with_mode(allocator: &Arc<dyn BufferAllocator>, len: usize, mode: AllocationMode) -> Self {
        let data = allocator.allocate_with(len, mode);
        assert!(data.len() >= len, "allocator returned {} bytes for a {}-byte request", data.len(), len);
        trace!(len, capacity = data.len(), "UniqueBuffer allocated");
        Self {
            data,
            len,
            allocator: Arc::clone(allocator),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the underlying block, which may exceed `len`.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Shorten the visible length; never grows.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }
}

impl Deref for UniqueBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

impl DerefMut for UniqueBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }
}

impl AsRef<[u8]> for UniqueBuffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl fmt::Debug for UniqueBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniqueBuffer")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

impl Drop for UniqueBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.allocator.release(data);
    }
}
