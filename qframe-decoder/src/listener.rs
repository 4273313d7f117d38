//! Frame decoder callbacks.
//!
//! The listener is the only way decoded frames and frame-level errors leave the
//! decoder. It carries one method per frame kind this crate decodes, plus the
//! generic hooks for frames it only skips.

use crate::error::Http2ErrorCode;
use crate::frame_header::FrameHeader;

/// Receives decoded frames.
pub trait FrameDecoderListener {
    /// Called once the 9-byte header is decoded, before any payload work.
    ///
    /// Returning `false` rejects the frame: its payload is discarded and the
    /// decode call returns `Error`.
    fn on_frame_header(&mut self, header: &FrameHeader) -> bool {
        let _ = header;
        true
    }

    /// A complete, well-formed RST_STREAM frame.
    fn on_rst_stream(&mut self, header: &FrameHeader, error_code: Http2ErrorCode);

    /// The declared payload length is wrong for the frame type, or larger than
    /// the maximum payload size.
    fn on_frame_size_error(&mut self, header: &FrameHeader);

    /// Start of a frame whose type has no payload decoder here.
    fn on_unknown_start(&mut self, header: &FrameHeader) {
        let _ = header;
    }

    /// Some (possibly all) of the payload of a skipped frame.
    fn on_unknown_payload(&mut self, header: &FrameHeader, data: &[u8]) {
        let _ = (header, data);
    }

    /// End of a skipped frame.
    fn on_unknown_end(&mut self, header: &FrameHeader) {
        let _ = header;
    }
}

/// A recorded listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    FrameHeader(FrameHeader),
    RstStream {
        header: FrameHeader,
        error_code: Http2ErrorCode,
    },
    FrameSizeError(FrameHeader),
    UnknownStart(FrameHeader),
    UnknownPayload(FrameHeader, Vec<u8>),
    UnknownEnd(FrameHeader),
}

/// Records every callback in arrival order.
impl FrameDecoderListener for Vec<FrameEvent> {
    fn on_frame_header(&mut self, header: &FrameHeader) -> bool {
        self.push(FrameEvent::FrameHeader(*header));
        true
    }

    fn on_rst_stream(&mut self, header: &FrameHeader, error_code: Http2ErrorCode) {
        self.push(FrameEvent::RstStream {
            header: *header,
            error_code,
        });
    }

    fn on_frame_size_error(&mut self, header: &FrameHeader) {
        self.push(FrameEvent::FrameSizeError(*header));
    }

    fn on_unknown_start(&mut self, header: &FrameHeader) {
        self.push(FrameEvent::UnknownStart(*header));
    }

    fn on_unknown_payload(&mut self, header: &FrameHeader, data: &[u8]) {
        self.push(FrameEvent::UnknownPayload(*header, data.to_vec()));
    }

    fn on_unknown_end(&mut self, header: &FrameHeader) {
        self.push(FrameEvent::UnknownEnd(*header));
    }
}
