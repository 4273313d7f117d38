//! Ownership and release accounting across allocators, slices, spans and
//! send buffers.

use std::sync::Arc;

use bytes::BytesMut;
use qframe_buffer::{
    BufferAllocator, MemSlice, MemSliceSpan, PooledBufferAllocator, SimpleBufferAllocator, StreamSendBuffer,
};

fn pooled(block_size: usize) -> (Arc<PooledBufferAllocator>, Arc<dyn BufferAllocator>) {
    let pool = Arc::new(PooledBufferAllocator::new(block_size, 8).unwrap());
    let allocator: Arc<dyn BufferAllocator> = pool.clone();
    (pool, allocator)
}

#[test]
fn test_move_transfers_ownership() {
    let (pool, allocator) = pooled(256);
    let mut a = MemSlice::copy_from(&allocator, &[7u8; 100]);
    let original_len = a.len();

    let b = a.take();
    assert!(a.is_empty());
    assert_eq!(b.len(), original_len);

    // Plain Rust moves need no bookkeeping either.
    let c = b;
    assert_eq!(c.len(), original_len);

    drop(a);
    drop(c);
    assert_eq!(pool.stats().releases, 1);
    assert_eq!(pool.pooled(), 1);
}

#[test]
fn test_one_release_per_allocation() {
    let (pool, allocator) = pooled(64);
    for len in [1usize, 10, 64, 65, 1000] {
        let slice = MemSlice::allocate(&allocator, len);
        assert_eq!(slice.len(), len);
        drop(slice);
    }
    let stats = pool.stats();
    assert_eq!(stats.allocations, 5);
    assert_eq!(stats.releases, 5);
    assert_eq!(stats.outstanding, 0);
}

#[test]
fn test_pooled_block_reused_after_release() {
    let (pool, allocator) = pooled(128);
    drop(MemSlice::allocate(&allocator, 50));
    drop(MemSlice::allocate(&allocator, 60));
    assert_eq!(pool.stats().pool_hits, 1);
}

#[test]
fn test_send_buffer_holds_shares_until_acked() {
    let simple = Arc::new(SimpleBufferAllocator::new());
    let allocator: Arc<dyn BufferAllocator> = simple.clone();

    let parts: [&[u8]; 3] = [b"GET / ", b"HTTP/1.1", b"\r\n"];
    let slices: Vec<MemSlice> = parts
        .iter()
        .map(|part| MemSlice::copy_from(&allocator, part))
        .collect();

    let mut send_buffer = StreamSendBuffer::new();
    let saved = send_buffer.save_mem_slice_span(MemSliceSpan::new(&slices));
    assert_eq!(saved, 16);
    drop(slices);
    assert_eq!(simple.stats().outstanding, 3);

    let mut packet = BytesMut::new();
    assert!(send_buffer.write_stream_data(0, 16, &mut packet));
    assert_eq!(&packet[..], b"GET / HTTP/1.1\r\n");

    send_buffer.on_stream_data_acked(0, 14).unwrap();
    assert_eq!(simple.stats().outstanding, 1);
    send_buffer.on_stream_data_acked(14, 2).unwrap();
    assert_eq!(simple.stats().outstanding, 0);
}

#[test]
fn test_released_slices_refill_the_pool() {
    let (pool, allocator) = pooled(32);
    let slices: Vec<_> = (0..4).map(|_| MemSlice::allocate(&allocator, 32)).collect();
    drop(slices);
    assert_eq!(pool.pooled(), 4);

    allocator.mark_idle();
    let again = MemSlice::allocate(&allocator, 16);
    assert_eq!(again.len(), 16);
    assert_eq!(pool.stats().pool_hits, 1);
    assert_eq!(pool.pooled(), 3);
}
