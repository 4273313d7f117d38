//! Sending datagrams built from allocator-backed MemSlices.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use qframe_buffer::{
    AllocatorSnapshot, BufferAllocator, MemSlice, MemSliceSpan, PooledBufferAllocator, SimpleBufferAllocator,
    UniqueBuffer,
};
use tracing::{debug, info};

use crate::config::{AllocatorConfig, AppConfig};
use crate::netio::{bind_address_for, create_udp_socket, UdpBatchWriter, WriteResult};

/// Build the allocator described by `config`.
pub fn build_allocator(config: &AllocatorConfig) -> Result<Arc<dyn BufferAllocator>> {
    if !config.pooled {
        return Ok(SimpleBufferAllocator::shared());
    }
    let pool = PooledBufferAllocator::new(config.block_size, config.max_pooled_buffers)
        .context("creating pooled allocator")?;
    Ok(Arc::new(pool))
}

#[derive(Debug, Clone, Copy)]
pub struct SendReport {
    pub packets_sent: usize,
    pub bytes_sent: usize,
    /// Allocator counters after every datagram was released.
    pub allocator: AllocatorSnapshot,
}

/// Send `count` datagrams of `size` bytes to `peer` through the batch writer.
///
/// Datagram `i` is filled with the byte `i as u8`.
pub fn send_datagrams(config: &AppConfig, peer: SocketAddr, count: usize, size: usize) -> Result<SendReport> {
    let batch = &config.netio.batch;
    anyhow::ensure!(size > 0, "datagram size must be > 0");
    anyhow::ensure!(
        size <= batch.max_packet_size,
        "datagram size {} exceeds netio.batch.max_packet_size {}",
        size,
        batch.max_packet_size
    );

    let allocator = build_allocator(&config.allocator)?;
    let bind_addr = bind_address_for(&config.netio.bind_host, peer)?;
    let socket = create_udp_socket(bind_addr, &config.netio)?;
    let mut writer = UdpBatchWriter::new(socket, batch)?;
    info!(%peer, local = %bind_addr, count, size, "sending datagrams");

    let slices: Vec<MemSlice> = (0..count)
        .map(|i| {
            let mut buffer = UniqueBuffer::new(&allocator, size);
            buffer.fill(i as u8);
            MemSlice::from_unique(buffer)
        })
        .collect();

    let mut total = WriteResult::default();
    let span = MemSliceSpan::new(&slices);
    debug!(slices = span.num_slices(), bytes = span.total_length(), "datagrams built");
    for data in span.iter() {
        loop {
            let result = write_one(&mut writer, data, peer)?;
            total.packets_sent += result.packets_sent;
            total.bytes_sent += result.bytes_sent;
            if !result.is_blocked() {
                break;
            }
            std::thread::yield_now();
        }
    }

    while writer.buffered_packets() > 0 {
        let result = writer.flush()?;
        total.packets_sent += result.packets_sent;
        total.bytes_sent += result.bytes_sent;
        if result.is_blocked() {
            std::thread::yield_now();
        }
    }

    drop(slices);
    let report = SendReport {
        packets_sent: total.packets_sent,
        bytes_sent: total.bytes_sent,
        allocator: allocator.stats(),
    };
    info!(
        packets = report.packets_sent,
        bytes = report.bytes_sent,
        pool_hits = report.allocator.pool_hits,
        "send complete"
    );
    Ok(report)
}

/// Copy `data` into the arena's write location, falling back to a copy-in
/// push when the arena has no free slot.
fn write_one(writer: &mut UdpBatchWriter, data: &[u8], peer: SocketAddr) -> Result<WriteResult> {
    let Some(location) = writer.next_write_location() else {
        return writer.write_packet(data, peer, None);
    };
    if let Some(slot) = writer.location_mut(&location) {
        slot[..data.len()].copy_from_slice(data);
        return writer.write_in_place(location, data.len(), peer, None);
    }
    writer.write_packet(data, peer, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, UdpSocket};
    use std::time::Duration;

    #[test]
    fn test_build_allocator_modes() {
        let pooled = build_allocator(&AllocatorConfig::default()).unwrap();
        let buffer = UniqueBuffer::new(&pooled, 100);
        assert_eq!(buffer.capacity(), 1500);

        let simple = build_allocator(&AllocatorConfig {
            pooled: false,
            ..AllocatorConfig::default()
        })
        .unwrap();
        assert_eq!(UniqueBuffer::new(&simple, 100).capacity(), 100);
    }

    #[test]
    fn test_build_allocator_rejects_zero_block() {
        let config = AllocatorConfig {
            block_size: 0,
            ..AllocatorConfig::default()
        };
        assert!(build_allocator(&config).is_err());
    }

    #[test]
    fn test_send_datagrams_over_loopback() {
        let rx = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let peer = rx.local_addr().unwrap();

        let mut config = AppConfig::default();
        config.netio.bind_host = "127.0.0.1".to_string();
        config.netio.batch.max_batch_packets = 2;

        let report = send_datagrams(&config, peer, 5, 200).unwrap();
        assert_eq!(report.packets_sent, 5);
        assert_eq!(report.bytes_sent, 1000);
        assert_eq!(report.allocator.allocations, 5);
        assert_eq!(report.allocator.outstanding, 0);

        let mut buf = [0u8; 512];
        for i in 0..5u8 {
            let n = rx.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], &[i; 200][..]);
        }
    }

    #[test]
    fn test_send_rejects_oversized_datagram() {
        let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
        assert!(send_datagrams(&AppConfig::default(), peer, 1, 1501).is_err());
    }
}
