//! Decode status and error types.
//!
//! Decoding reports progress through the three-valued [`DecodeStatus`]; the
//! reason a frame failed is kept separately as a [`DecodeError`] so the hot
//! path never allocates or unwinds.

use core::fmt;
use thiserror::Error;

use crate::frame_header::FrameType;

/// Result type for operations that can fail with a [`DecodeError`].
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Outcome of a single decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStatus {
    /// The frame (or structure) was fully decoded.
    Done,
    /// More input is required; call the matching `resume` method later.
    InProgress,
    /// The frame is malformed. The listener has already been notified.
    Error,
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStatus::Done => write!(f, "DecodeDone"),
            DecodeStatus::InProgress => write!(f, "DecodeInProgress"),
            DecodeStatus::Error => write!(f, "DecodeError"),
        }
    }
}

/// Why the most recent frame failed to decode.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Declared payload length does not fit the frame type, or exceeds the
    /// maximum payload size.
    ///
    /// Maps to HTTP/2 error code `FRAME_SIZE_ERROR` (0x6).
    #[error("frame size error: {frame_type:?} frame on stream {stream_id} declared {payload_length} bytes")]
    FrameSize {
        frame_type: FrameType,
        stream_id: u32,
        payload_length: u32,
    },

    /// The listener refused the frame header.
    #[error("frame header rejected by listener: {frame_type:?} on stream {stream_id}")]
    HeaderRejected { frame_type: FrameType, stream_id: u32 },
}

impl DecodeError {
    /// The HTTP/2 error code a connection should be closed with.
    pub fn error_code(&self) -> Http2ErrorCode {
        match self {
            DecodeError::FrameSize { .. } => Http2ErrorCode::FRAME_SIZE_ERROR,
            DecodeError::HeaderRejected { .. } => Http2ErrorCode::PROTOCOL_ERROR,
        }
    }
}

/// HTTP/2 error code (RFC 9113 Section 7).
///
/// Unknown values are preserved verbatim: RFC 9113 requires that unknown
/// error codes be treated like `INTERNAL_ERROR` by the *consumer*, not that
/// the decoder rewrite them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Http2ErrorCode(pub u32);

impl Http2ErrorCode {
    pub const NO_ERROR: Self = Self(0x0);
    pub const PROTOCOL_ERROR: Self = Self(0x1);
    pub const INTERNAL_ERROR: Self = Self(0x2);
    pub const FLOW_CONTROL_ERROR: Self = Self(0x3);
    pub const SETTINGS_TIMEOUT: Self = Self(0x4);
    pub const STREAM_CLOSED: Self = Self(0x5);
    pub const FRAME_SIZE_ERROR: Self = Self(0x6);
    pub const REFUSED_STREAM: Self = Self(0x7);
    pub const CANCEL: Self = Self(0x8);
    pub const COMPRESSION_ERROR: Self = Self(0x9);
    pub const CONNECT_ERROR: Self = Self(0xa);
    pub const ENHANCE_YOUR_CALM: Self = Self(0xb);
    pub const INADEQUATE_SECURITY: Self = Self(0xc);
    pub const HTTP_1_1_REQUIRED: Self = Self(0xd);

    /// RFC name of the code, if it is one of the registered values.
    pub fn name(&self) -> Option<&'static str> {
        let name = match self.0 {
            0x0 => "NO_ERROR",
            0x1 => "PROTOCOL_ERROR",
            0x2 => "INTERNAL_ERROR",
            0x3 => "FLOW_CONTROL_ERROR",
            0x4 => "SETTINGS_TIMEOUT",
            0x5 => "STREAM_CLOSED",
            0x6 => "FRAME_SIZE_ERROR",
            0x7 => "REFUSED_STREAM",
            0x8 => "CANCEL",
            0x9 => "COMPRESSION_ERROR",
            0xa => "CONNECT_ERROR",
            0xb => "ENHANCE_YOUR_CALM",
            0xc => "INADEQUATE_SECURITY",
            0xd => "HTTP_1_1_REQUIRED",
            _ => return None,
        };
        Some(name)
    }

    /// Whether the value is one of the registered error codes.
    pub fn is_known(&self) -> bool {
        self.name().is_some()
    }
}

impl From<u32> for Http2ErrorCode {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<Http2ErrorCode> for u32 {
    fn from(code: Http2ErrorCode) -> Self {
        code.0
    }
}

impl fmt::Display for Http2ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "UnknownErrorCode(0x{:x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_names() {
        assert_eq!(Http2ErrorCode::NO_ERROR.name(), Some("NO_ERROR"));
        assert_eq!(Http2ErrorCode::HTTP_1_1_REQUIRED.name(), Some("HTTP_1_1_REQUIRED"));
        assert_eq!(Http2ErrorCode(0xdeadbeef).name(), None);
        assert!(!Http2ErrorCode(0xe).is_known());
    }

    #[test]
    fn test_unknown_error_code_display_keeps_value() {
        assert_eq!(Http2ErrorCode(0x1234).to_string(), "UnknownErrorCode(0x1234)");
        assert_eq!(Http2ErrorCode::CANCEL.to_string(), "CANCEL");
    }

    #[test]
    fn test_decode_error_maps_to_connection_error_code() {
        let err = DecodeError::FrameSize {
            frame_type: FrameType::RstStream,
            stream_id: 1,
            payload_length: 6,
        };
        assert_eq!(err.error_code(), Http2ErrorCode::FRAME_SIZE_ERROR);
        assert!(err.to_string().contains("declared 6 bytes"));
    }
}
