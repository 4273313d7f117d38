//! Decoding a capture of concatenated HTTP/2 frames.

use std::io::Read;

use anyhow::{Context, Result};
use qframe_decoder::{
    DecodeBuffer, DecodeError, DecodeStatus, DecoderState, FrameDecoder, FrameDecoderListener, FrameHeader,
    Http2ErrorCode,
};
use tracing::{debug, info, trace, warn};

use crate::telemetry::{record_metric, MetricsEvent};

/// Listener that logs every frame and records metrics.
#[derive(Debug, Default)]
pub struct TracingListener {
    pub rst_streams: Vec<(u32, Http2ErrorCode)>,
    pub frame_size_errors: u64,
    pub unknown_frames: u64,
    pub unknown_bytes: u64,
    current_unknown_bytes: usize,
}

impl FrameDecoderListener for TracingListener {
    fn on_frame_header(&mut self, header: &FrameHeader) -> bool {
        trace!(%header, "frame header");
        true
    }

    fn on_rst_stream(&mut self, header: &FrameHeader, error_code: Http2ErrorCode) {
        info!(stream_id = header.stream_id, error_code = %error_code, "RST_STREAM");
        self.rst_streams.push((header.stream_id, error_code));
        record_metric(MetricsEvent::FrameDecoded);
    }

    fn on_frame_size_error(&mut self, header: &FrameHeader) {
        warn!(
            stream_id = header.stream_id,
            frame_type = ?header.frame_type,
            payload_length = header.payload_length,
            "frame size error"
        );
        self.frame_size_errors += 1;
        record_metric(MetricsEvent::FrameSizeError);
    }

    fn on_unknown_start(&mut self, header: &FrameHeader) {
        debug!(%header, "skipping frame");
        self.current_unknown_bytes = 0;
    }

    fn on_unknown_payload(&mut self, _header: &FrameHeader, data: &[u8]) {
        self.current_unknown_bytes += data.len();
    }

    fn on_unknown_end(&mut self, header: &FrameHeader) {
        trace!(stream_id = header.stream_id, bytes = self.current_unknown_bytes, "skipped frame");
        self.unknown_frames += 1;
        self.unknown_bytes += self.current_unknown_bytes as u64;
        record_metric(MetricsEvent::UnknownFrameSkipped {
            bytes: self.current_unknown_bytes,
        });
    }
}

/// What a decode run saw.
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub frames_decoded: u64,
    pub rst_streams: Vec<(u32, Http2ErrorCode)>,
    pub unknown_frames: u64,
    pub unknown_bytes: u64,
    pub bytes_read: u64,
    /// Failed frames abandoned with their payload.
    pub frames_discarded: u64,
    /// The error that stopped decoding.
    pub error: Option<DecodeError>,
    /// Input ended inside a frame.
    pub truncated: bool,
}

impl DecodeReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.truncated
    }
}

/// Feed `reader` through a [`FrameDecoder`] `chunk_size` bytes at a time.
///
/// Stops at the first frame error, which terminates an HTTP/2 connection.
pub fn decode_stream<R: Read>(mut reader: R, chunk_size: usize, max_frame_size: u32) -> Result<DecodeReport> {
    anyhow::ensure!(chunk_size > 0, "chunk size must be > 0");

    let mut decoder = FrameDecoder::with_maximum_payload_size(max_frame_size);
    let mut listener = TracingListener::default();
    let mut report = DecodeReport::default();
    let mut chunk = vec![0u8; chunk_size];

    'read: loop {
        let n = reader.read(&mut chunk).context("reading frame input")?;
        if n == 0 {
            break;
        }
        report.bytes_read += n as u64;

        let mut db = DecodeBuffer::new(&chunk[..n]);
        while db.has_data() {
            if decoder.decode_frame(&mut db, &mut listener) == DecodeStatus::Error {
                let error = decoder.last_error();
                if let Some(e) = &error {
                    warn!(error = %e, error_code = %e.error_code(), "decoding stopped");
                }
                record_metric(MetricsEvent::FrameDiscarded);
                report.frames_discarded += 1;
                report.error = error;
                break 'read;
            }
        }
    }

    if report.error.is_none() && decoder.state() != DecoderState::StartDecodingHeader {
        warn!(
            state = ?decoder.state(),
            remaining_payload = decoder.remaining_payload(),
            "input ended inside a frame"
        );
        report.truncated = true;
    }

    report.frames_decoded = decoder.frames_decoded();
    report.rst_streams = listener.rst_streams;
    report.unknown_frames = listener.unknown_frames;
    report.unknown_bytes = listener.unknown_bytes;
    Ok(report)
}
