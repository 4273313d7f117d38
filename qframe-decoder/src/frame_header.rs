//! # HTTP/2 Frame Header (RFC 9113 Section 4.1)
//!
//! ```text
//! +-----------------------------------------------+
//! |                 Length (24)                   |
//! +---------------+---------------+---------------+
//! |   Type (8)    |   Flags (8)   |
//! +-+-------------+---------------+-------------------------------+
//! |R|                 Stream Identifier (31)                      |
//! +=+=============================================================+
//! ```

#![forbid(unsafe_code)]

use bytes::{BufMut, BytesMut};
use core::fmt;

use crate::decode_buffer::DecodeBuffer;
use crate::structure::DecodeStructure;

/// Frame flag bits (RFC 9113 Section 6).
///
/// Several flags share a bit; which one applies depends on the frame type.
pub mod flags {
    pub const END_STREAM: u8 = 0x01;
    pub const ACK: u8 = 0x01;
    pub const END_HEADERS: u8 = 0x04;
    pub const PADDED: u8 = 0x08;
    pub const PRIORITY: u8 = 0x20;
}

/// Frame type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    AltSvc,
    PriorityUpdate,
    /// Any type this crate has no name for; must be ignored by receivers.
    Unknown(u8),
}

impl FrameType {
    /// Flags defined for this frame type. Other bits are ignored on receipt.
    pub fn valid_flags(&self) -> u8 {
        match self {
            FrameType::Data => flags::END_STREAM | flags::PADDED,
            FrameType::Headers => {
                flags::END_STREAM | flags::END_HEADERS | flags::PADDED | flags::PRIORITY
            }
            FrameType::Settings | FrameType::Ping => flags::ACK,
            FrameType::PushPromise => flags::END_HEADERS | flags::PADDED,
            FrameType::Continuation => flags::END_HEADERS,
            FrameType::Unknown(_) => 0xff,
            _ => 0,
        }
    }
}

impl From<u8> for FrameType {
    fn from(v: u8) -> Self {
        match v {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::GoAway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            0xa => FrameType::AltSvc,
            0x10 => FrameType::PriorityUpdate,
            other => FrameType::Unknown(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(t: FrameType) -> Self {
        match t {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::GoAway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::AltSvc => 0xa,
            FrameType::PriorityUpdate => 0x10,
            FrameType::Unknown(v) => v,
        }
    }
}

/// The common 9-byte header preceding every frame payload.
///
/// Immutable once decoded for the current frame, apart from
/// [`FrameHeader::retain_flags`] which the frame decoder applies before
/// dispatching to a payload decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    /// Declared payload length (24 bits on the wire).
    pub payload_length: u32,
    pub frame_type: FrameType,
    pub flags: u8,
    /// Stream identifier, reserved bit cleared.
    pub stream_id: u32,
}

impl FrameHeader {
    /// Largest value the 24-bit length field can carry.
    pub const MAX_PAYLOAD_LENGTH: u32 = (1 << 24) - 1;

    pub fn new(payload_length: u32, frame_type: FrameType, flags: u8, stream_id: u32) -> Self {
        debug_assert!(payload_length <= Self::MAX_PAYLOAD_LENGTH);
        Self {
            payload_length,
            frame_type,
            flags,
            stream_id: stream_id & 0x7fff_ffff,
        }
    }

    #[inline]
    pub fn has_any_flags(&self, mask: u8) -> bool {
        self.flags & mask != 0
    }

    /// Clear every flag not in `mask`.
    #[inline]
    pub fn retain_flags(&mut self, mask: u8) {
        self.flags &= mask;
    }

    pub fn is_end_stream(&self) -> bool {
        matches!(self.frame_type, FrameType::Data | FrameType::Headers)
            && self.has_any_flags(flags::END_STREAM)
    }

    pub fn is_padded(&self) -> bool {
        matches!(
            self.frame_type,
            FrameType::Data | FrameType::Headers | FrameType::PushPromise
        ) && self.has_any_flags(flags::PADDED)
    }

    /// Append the 9-byte wire encoding.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(Self::ENCODED_SIZE);
        let len = self.payload_length.to_be_bytes();
        buf.put_slice(&len[1..]);
        buf.put_u8(self.frame_type.into());
        buf.put_u8(self.flags);
        buf.put_u32(self.stream_id & 0x7fff_ffff);
    }
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self::new(0, FrameType::Data, 0, 0)
    }
}

impl DecodeStructure for FrameHeader {
    const ENCODED_SIZE: usize = 9;

    fn decode_from(db: &mut DecodeBuffer<'_>) -> Self {
        let payload_length = db.decode_u24();
        let frame_type = FrameType::from(db.decode_u8());
        let flags = db.decode_u8();
        let stream_id = db.decode_u31();
        Self {
            payload_length,
            frame_type,
            flags,
            stream_id,
        }
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "length={}, type={:?}, flags=0x{:02x}, stream={}",
            self.payload_length, self.frame_type, self.flags, self.stream_id
        )
    }
}
