//! Batched UDP writer.
//!
//! Datagrams are accumulated in a [`BatchWriterBuffer`] and handed to the
//! socket in FIFO order when the batch reaches its packet limit, the arena
//! runs out of room, or the destination changes. Callers can build a datagram
//! directly in the arena ([`UdpBatchWriter::next_write_location`] +
//! [`UdpBatchWriter::write_in_place`]) or pass their own bytes
//! ([`UdpBatchWriter::write_packet`]).

use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use qframe_buffer::{BatchWriterBuffer, PacketSource, PerPacketOptions, WriteLocation};

use super::config::BatchConfig;
use crate::telemetry::{record_metric, MetricsEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteStatus {
    #[default]
    Ok,
    /// The socket would block. Unsent datagrams stay buffered.
    Blocked,
}

/// Outcome of a write or flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteResult {
    pub status: WriteStatus,
    /// Datagrams handed to the socket by this call.
    pub packets_sent: usize,
    pub bytes_sent: usize,
}

impl WriteResult {
    fn merge(&mut self, other: WriteResult) {
        self.status = other.status;
        self.packets_sent += other.packets_sent;
        self.bytes_sent += other.bytes_sent;
    }

    pub fn is_blocked(&self) -> bool {
        self.status == WriteStatus::Blocked
    }
}

pub struct UdpBatchWriter {
    socket: UdpSocket,
    buffer: BatchWriterBuffer,
    self_address: IpAddr,
    max_batch_packets: usize,
}

impl UdpBatchWriter {
    pub fn new(socket: UdpSocket, config: &BatchConfig) -> Result<Self> {
        let buffer = BatchWriterBuffer::with_capacity(config.buffer_size, config.max_packet_size)
            .context("creating batch arena")?;
        let self_address = socket.local_addr().context("reading local address")?.ip();

        Ok(Self {
            socket,
            buffer,
            self_address,
            max_batch_packets: config.max_batch_packets.max(1),
        })
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    pub fn buffered_packets(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.size_in_use()
    }

    pub fn max_packet_size(&self) -> usize {
        self.buffer.max_packet_size()
    }

    /// Where the next datagram can be built in place, if the arena has room.
    pub fn next_write_location(&self) -> Option<WriteLocation> {
        self.buffer.next_write_location()
    }

    pub fn location_mut(&mut self, location: &WriteLocation) -> Option<&mut [u8]> {
        self.buffer.location_mut(location)
    }

    /// Buffer `data` for `peer`, copying it into the arena.
    pub fn write_packet(
        &mut self,
        data: &[u8],
        peer: SocketAddr,
        options: Option<PerPacketOptions>,
    ) -> Result<WriteResult> {
        self.buffer_packet(PacketSource::External(data), peer, options)
    }

    /// Buffer `len` bytes already written at `location`.
    ///
    /// A location made stale by an intervening flush is still accepted and
    /// the bytes are copied to the current write position. A location that a
    /// later datagram was buffered over is an error.
    pub fn write_in_place(
        &mut self,
        location: WriteLocation,
        len: usize,
        peer: SocketAddr,
        options: Option<PerPacketOptions>,
    ) -> Result<WriteResult> {
        self.buffer_packet(PacketSource::InPlace { location, len }, peer, options)
    }

    /// Blocked results mean the datagram was not buffered.
    fn buffer_packet(
        &mut self,
        source: PacketSource<'_>,
        peer: SocketAddr,
        options: Option<PerPacketOptions>,
    ) -> Result<WriteResult> {
        let len = source.len();
        if len > self.buffer.max_packet_size() {
            anyhow::bail!(
                "datagram of {} bytes exceeds max packet size {}",
                len,
                self.buffer.max_packet_size()
            );
        }

        if let PacketSource::InPlace { location, len } = source {
            if !self.buffer.location_intact(&location, len) {
                anyhow::bail!(
                    "write location at offset {} was overwritten before the datagram was buffered",
                    location.offset()
                );
            }
        }

        let mut result = WriteResult::default();

        // A batch has a single destination and a bounded length.
        let joins_batch = self.buffer.front().map_or(true, |front| {
            front.peer_address == peer && front.self_address == self.self_address
        });
        if !joins_batch || self.buffer.len() >= self.max_batch_packets {
            result.merge(self.flush()?);
            if result.is_blocked() {
                return Ok(result);
            }
        }

        let mut push = self.buffer.push_buffered_write(source, self.self_address, peer, options, 0);
        if !push.succeeded {
            record_metric(MetricsEvent::ArenaExhausted);
            result.merge(self.flush()?);
            if result.is_blocked() {
                return Ok(result);
            }
            push = self.buffer.push_buffered_write(source, self.self_address, peer, options, 0);
            if !push.succeeded {
                anyhow::bail!("batch arena rejected a {} byte datagram after flushing", len);
            }
        }
        record_metric(MetricsEvent::PacketBuffered {
            bytes: len,
            copied: push.buffer_copied,
        });

        if self.buffer.next_write_location().is_none() {
            result.merge(self.flush()?);
            // The datagram is buffered either way.
            result.status = WriteStatus::Ok;
        }

        Ok(result)
    }

    /// Send buffered datagrams, oldest first.
    ///
    /// Stops at the first `WouldBlock`; datagrams not yet sent stay buffered.
    pub fn flush(&mut self) -> Result<WriteResult> {
        let mut result = WriteResult::default();
        let mut send_error = None;

        for write in self.buffer.buffered_writes() {
            match self.socket.send_to(self.buffer.data_of(write), write.peer_address) {
                Ok(sent) => {
                    result.packets_sent += 1;
                    result.bytes_sent += sent;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    result.status = WriteStatus::Blocked;
                    break;
                }
                Err(e) => {
                    send_error = Some((e, write.peer_address));
                    break;
                }
            }
        }

        if result.packets_sent > 0 {
            self.buffer.pop_buffered_write(result.packets_sent);
            record_metric(MetricsEvent::BatchFlushed {
                packets: result.packets_sent,
                bytes: result.bytes_sent,
            });
        }
        if result.is_blocked() {
            record_metric(MetricsEvent::SendBlocked);
        }
        tracing::trace!(
            packets = result.packets_sent,
            bytes = result.bytes_sent,
            remaining = self.buffer.len(),
            blocked = result.is_blocked(),
            "flushed batch"
        );

        if let Some((e, peer)) = send_error {
            return Err(e).with_context(|| format!("sending datagram to {}", peer));
        }
        Ok(result)
    }
}
