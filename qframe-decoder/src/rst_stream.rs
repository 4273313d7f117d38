//! RST_STREAM payload (RFC 9113 Section 6.4).
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                        Error Code (32)                        |
//! +---------------------------------------------------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::decode_buffer::DecodeBuffer;
use crate::error::Http2ErrorCode;
use crate::frame_header::{FrameHeader, FrameType};
use crate::structure::DecodeStructure;

/// The entire RST_STREAM payload. RST_STREAM carries no flags and no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RstStreamFields {
    pub error_code: Http2ErrorCode,
}

impl Default for RstStreamFields {
    fn default() -> Self {
        Self {
            error_code: Http2ErrorCode::NO_ERROR,
        }
    }
}

impl RstStreamFields {
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.error_code.0);
    }
}

impl DecodeStructure for RstStreamFields {
    const ENCODED_SIZE: usize = 4;

    fn decode_from(db: &mut DecodeBuffer<'_>) -> Self {
        Self {
            error_code: Http2ErrorCode(db.decode_u32()),
        }
    }
}

/// A complete RST_STREAM frame, header included.
pub fn encode_rst_stream_frame(stream_id: u32, error_code: Http2ErrorCode) -> Bytes {
    let mut buf = BytesMut::with_capacity(FrameHeader::ENCODED_SIZE + RstStreamFields::ENCODED_SIZE);
    FrameHeader::new(
        RstStreamFields::ENCODED_SIZE as u32,
        FrameType::RstStream,
        0,
        stream_id,
    )
    .encode(&mut buf);
    RstStreamFields { error_code }.encode(&mut buf);
    buf.freeze()
}
