//! # Batch Writer Arena
//!
//! A fixed-capacity arena that accumulates outgoing datagrams so they can be
//! flushed together. Packets either get built directly in the arena
//! (in-place, zero copy) or are copied in from caller memory.
//!
//! ```text
//! arena: [ W1 | W2 | W3 |        free         ]
//!          ^ front             ^ next write location
//! ```
//!
//! Writes occupy a contiguous prefix of the arena in push order. Popping
//! removes writes from the front and relocates the survivors to offset zero,
//! so the free space is always a single tail region.
//!
//! Not synchronized; one owner drives it.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{BufferError, Result};

/// Largest datagram the default arena is sized for.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1500;

/// Default arena size: enough for a full batch of maximum-size packets.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Per-packet socket options carried alongside a buffered write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerPacketOptions {
    /// ECN codepoint for the IP header (0 = Not-ECT).
    pub ecn_codepoint: u8,
    /// Delay before the packet may leave, relative to the batch release time.
    pub release_time_delay: Duration,
}

/// Token for the free space returned by
/// [`BatchWriterBuffer::next_write_location`].
///
/// Current until the next push or pop. A location made stale by a pop still
/// holds the caller's bytes; one made stale by a push may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteLocation {
    offset: usize,
    generation: u64,
}

impl WriteLocation {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Where the bytes of a pushed packet come from.
#[derive(Debug, Clone, Copy)]
pub enum PacketSource<'a> {
    /// `len` bytes already written at a location inside the arena.
    InPlace { location: WriteLocation, len: usize },
    /// Caller-owned bytes to copy in.
    External(&'a [u8]),
}

impl PacketSource<'_> {
    pub fn len(&self) -> usize {
        match self {
            PacketSource::InPlace { len, .. } => *len,
            PacketSource::External(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One buffered datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedWrite {
    offset: usize,
    pub buf_len: usize,
    pub self_address: IpAddr,
    pub peer_address: SocketAddr,
    pub options: Option<PerPacketOptions>,
    /// Earliest send time in microseconds; zero means now.
    pub release_time: u64,
}

impl BufferedWrite {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushResult {
    pub succeeded: bool,
    /// The packet was not built at the current write location.
    pub buffer_copied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PopResult {
    pub num_buffers_popped: usize,
    /// Remaining writes were relocated to the front of the arena.
    pub moved_remaining_buffers: bool,
}

#[derive(Debug)]
pub struct BatchWriterBuffer {
    arena: Box<[u8]>,
    max_packet_size: usize,
    buffered_writes: VecDeque<BufferedWrite>,
    size_in_use: usize,
    generation: u64,
    /// Generation right after the most recent push.
    last_push_generation: u64,
}

impl Default for BatchWriterBuffer {
    fn default() -> Self {
        Self {
            arena: vec![0u8; DEFAULT_BUFFER_SIZE].into_boxed_slice(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            buffered_writes: VecDeque::new(),
            size_in_use: 0,
            generation: 0,
            last_push_generation: 0,
        }
    }
}

impl BatchWriterBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize, max_packet_size: usize) -> Result<Self> {
        if max_packet_size == 0 {
            return Err(BufferError::ZeroPacketSize);
        }
        if capacity < max_packet_size {
            return Err(BufferError::ArenaTooSmall {
                capacity,
                max_packet_size,
            });
        }
        Ok(Self {
            arena: vec![0u8; capacity].into_boxed_slice(),
            max_packet_size,
            ..Self::default()
        })
    }

    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    pub fn size_in_use(&self) -> usize {
        self.size_in_use
    }

    pub fn len(&self) -> usize {
        self.buffered_writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered_writes.is_empty()
    }

    /// Buffered writes, oldest first.
    pub fn buffered_writes(&self) -> impl Iterator<Item = &BufferedWrite> + '_ {
        self.buffered_writes.iter()
    }

    pub fn front(&self) -> Option<&BufferedWrite> {
        self.buffered_writes.front()
    }

    /// Payload of a buffered write.
    pub fn data_of(&self, write: &BufferedWrite) -> &[u8] {
        &self.arena[write.offset..write.offset + write.buf_len]
    }

    /// The free space for the next in-place packet, or `None` when less than
    /// one maximum-size packet fits.
    pub fn next_write_location(&self) -> Option<WriteLocation> {
        if self.capacity() - self.size_in_use < self.max_packet_size {
            return None;
        }
        Some(WriteLocation {
            offset: self.size_in_use,
            generation: self.generation,
        })
    }

    /// The `max_packet_size` bytes behind `location`, if it is still current.
    pub fn location_mut(&mut self, location: &WriteLocation) -> Option<&mut [u8]> {
        if !self.is_current(location) || self.next_write_location().is_none() {
            return None;
        }
        let start = location.offset;
        Some(&mut self.arena[start..start + self.max_packet_size])
    }

    fn is_current(&self, location: &WriteLocation) -> bool {
        location.generation == self.generation && location.offset == self.size_in_use
    }

    /// Whether `len` bytes written at `location` are still there.
    ///
    /// Pops never write past the used region, so only a push made after the
    /// location was handed out can have overwritten them.
    pub fn location_intact(&self, location: &WriteLocation, len: usize) -> bool {
        let in_bounds = location
            .offset
            .checked_add(len)
            .is_some_and(|end| end <= self.capacity());
        in_bounds && location.generation >= self.last_push_generation && location.offset >= self.size_in_use
    }

    /// Append a packet.
    ///
    /// An in-place packet at the current write location just extends the
    /// used region. Anything else is copied to the current write location.
    /// Fails without side effects when the arena has no room for a
    /// maximum-size packet, the packet exceeds that size, or a stale in-place
    /// location has been overwritten.
    pub fn push_buffered_write(
        &mut self,
        source: PacketSource<'_>,
        self_address: IpAddr,
        peer_address: SocketAddr,
        options: Option<PerPacketOptions>,
        release_time: u64,
    ) -> PushResult {
        let buf_len = source.len();
        if buf_len > self.max_packet_size {
            debug!(buf_len, max_packet_size = self.max_packet_size, "packet larger than arena slot");
            return PushResult::default();
        }
        let Some(next) = self.next_write_location() else {
            trace!(size_in_use = self.size_in_use, "arena full");
            return PushResult::default();
        };

        let buffer_copied = match source {
            PacketSource::InPlace { location, .. } if location == next => false,
            PacketSource::InPlace { location, len } => {
                if !self.location_intact(&location, len) {
                    debug!(offset = location.offset, len, "stale write location was overwritten");
                    return PushResult::default();
                }
                self.arena.copy_within(location.offset..location.offset + len, next.offset);
                true
            }
            PacketSource::External(data) => {
                self.arena[next.offset..next.offset + buf_len].copy_from_slice(data);
                true
            }
        };

        self.buffered_writes.push_back(BufferedWrite {
            offset: next.offset,
            buf_len,
            self_address,
            peer_address,
            options,
            release_time,
        });
        self.size_in_use += buf_len;
        self.generation += 1;
        self.last_push_generation = self.generation;
        trace!(buf_len, buffer_copied, size_in_use = self.size_in_use, "pushed buffered write");

        PushResult {
            succeeded: true,
            buffer_copied,
        }
    }

    /// Remove up to `n` writes from the front, oldest first.
    pub fn pop_buffered_write(&mut self, n: usize) -> PopResult {
        let num_buffers_popped = n.min(self.buffered_writes.len());
        if num_buffers_popped == 0 {
            return PopResult::default();
        }
        self.buffered_writes.drain(..num_buffers_popped);
        self.generation += 1;

        let Some(first) = self.buffered_writes.front() else {
            self.size_in_use = 0;
            return PopResult {
                num_buffers_popped,
                moved_remaining_buffers: false,
            };
        };

        let shift = first.offset;
        let moved_remaining_buffers = shift > 0;
        if moved_remaining_buffers {
            self.arena.copy_within(shift..self.size_in_use, 0);
            for write in self.buffered_writes.iter_mut() {
                write.offset -= shift;
            }
            self.size_in_use -= shift;
            debug!(
                shift,
                remaining = self.buffered_writes.len(),
                size_in_use = self.size_in_use,
                "moved remaining buffered writes"
            );
        }

        PopResult {
            num_buffers_popped,
            moved_remaining_buffers,
        }
    }
}
