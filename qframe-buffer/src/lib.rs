//! qframe-buffer: Buffer Ownership for the Send Path
//!
//! Application data leaves a connection through two kinds of buffers:
//!
//! - [`MemSlice`]: a move-only, reference-counted handle to bytes obtained
//!   from a [`BufferAllocator`]. Send buffers keep shares of slices instead of
//!   copying, and the allocator gets the storage back when the last share is
//!   dropped.
//! - [`BatchWriterBuffer`]: a fixed arena where datagrams are accumulated,
//!   either built in place or copied in, and flushed in FIFO order.
//!
//! [`MemSliceSpan`] is the borrowed view used to hand several slices to a
//! consumer (a [`StreamSendBuffer`] or a vectored socket write) at once.

#![forbid(unsafe_code)]

pub mod allocator;
pub mod batch;
pub mod error;
pub mod mem_slice;
pub mod send_buffer;
pub mod span;

pub use allocator::{
    AllocationMode, AllocatorSnapshot, AllocatorStats, Block, BlockPool, BufferAllocator, PooledBufferAllocator,
    SimpleBufferAllocator, UniqueBuffer,
};
pub use batch::{
    BatchWriterBuffer, BufferedWrite, PacketSource, PerPacketOptions, PopResult, PushResult, WriteLocation,
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_PACKET_SIZE,
};
pub use error::{BufferError, Result};
pub use mem_slice::MemSlice;
pub use send_buffer::{merge_ranges, DataRange, StreamSendBuffer};
pub use span::MemSliceSpan;
