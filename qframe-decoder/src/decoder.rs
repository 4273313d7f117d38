//! # Frame Decoder
//!
//! Top-level driver that sequences header decoding, payload dispatch and the
//! discarding of frames that failed.
//!
//! ## State Machine
//!
//! ```text
//!                  header complete
//! StartDecodingHeader ──────────────┬──> payload Done ──> StartDecodingHeader
//!        │ partial                  ├──> payload InProgress ──> ResumeDecodingPayload
//!        v                          └──> Error ──> DiscardPayload
//! ResumeDecodingHeader ─────────────┘
//! ```
//!
//! Each call to [`FrameDecoder::decode_frame`] makes progress on at most one
//! frame. Callers loop while the chunk still has data.

#![forbid(unsafe_code)]

use tracing::{debug, trace};

use crate::decode_buffer::DecodeBuffer;
use crate::error::{DecodeError, DecodeStatus};
use crate::frame_header::FrameType;
use crate::listener::FrameDecoderListener;
use crate::payload::{PayloadDecoder, RstStreamPayloadDecoder, UnknownPayloadDecoder};
use crate::state::FrameDecoderState;

/// SETTINGS_MAX_FRAME_SIZE initial value (RFC 9113 Section 6.5.2).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderState {
    StartDecodingHeader,
    ResumeDecodingHeader,
    ResumeDecodingPayload,
    DiscardPayload,
}

#[derive(Debug)]
pub struct FrameDecoder {
    state: FrameDecoderState,
    decoder_state: DecoderState,
    maximum_payload_size: u32,
    rst_stream: RstStreamPayloadDecoder,
    unknown: UnknownPayloadDecoder,
    last_error: Option<DecodeError>,
    frames_decoded: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_maximum_payload_size(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    pub fn with_maximum_payload_size(maximum_payload_size: u32) -> Self {
        Self {
            state: FrameDecoderState::new(),
            decoder_state: DecoderState::StartDecodingHeader,
            maximum_payload_size,
            rst_stream: RstStreamPayloadDecoder::new(),
            unknown: UnknownPayloadDecoder::new(),
            last_error: None,
            frames_decoded: 0,
        }
    }

    pub fn maximum_payload_size(&self) -> u32 {
        self.maximum_payload_size
    }

    /// Takes effect from the next frame header.
    pub fn set_maximum_payload_size(&mut self, size: u32) {
        self.maximum_payload_size = size;
    }

    pub fn state(&self) -> DecoderState {
        self.decoder_state
    }

    pub fn frame_decoder_state(&self) -> &FrameDecoderState {
        &self.state
    }

    /// Payload bytes of the current frame not yet seen.
    pub fn remaining_payload(&self) -> u32 {
        self.state.remaining_payload()
    }

    /// Why the most recent frame failed, if it did.
    pub fn last_error(&self) -> Option<DecodeError> {
        self.last_error
    }

    /// Frames whose payload decoder finished with `Done`.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Make progress on the current frame using bytes from `db`.
    ///
    /// Returns `Done` when a frame (or the discard of a failed frame)
    /// completed, `InProgress` when `db` ran out first, and `Error` when the
    /// frame is malformed; in the latter case the listener has been told and
    /// the rest of the frame will be skipped by later calls.
    pub fn decode_frame(
        &mut self,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        trace!(state = ?self.decoder_state, db_remaining = db.remaining(), "FrameDecoder::decode_frame");
        match self.decoder_state {
            DecoderState::StartDecodingHeader => {
                self.last_error = None;
                if self.state.start_decoding_frame_header(db) {
                    return self.start_decoding_payload(db, listener);
                }
                self.decoder_state = DecoderState::ResumeDecodingHeader;
                DecodeStatus::InProgress
            }
            DecoderState::ResumeDecodingHeader => {
                if self.state.resume_decoding_frame_header(db) {
                    return self.start_decoding_payload(db, listener);
                }
                DecodeStatus::InProgress
            }
            DecoderState::ResumeDecodingPayload => self.resume_decoding_payload(db, listener),
            DecoderState::DiscardPayload => self.discard_payload(db),
        }
    }

    fn start_decoding_payload(
        &mut self,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        let header = *self.state.frame_header();
        trace!(%header, "FrameDecoder::start_decoding_payload");

        if !listener.on_frame_header(&header) {
            debug!(stream_id = header.stream_id, frame_type = ?header.frame_type, "frame header rejected");
            self.last_error = Some(DecodeError::HeaderRejected {
                frame_type: header.frame_type,
                stream_id: header.stream_id,
            });
            self.state.initialize_remainders();
            self.decoder_state = DecoderState::DiscardPayload;
            return DecodeStatus::Error;
        }

        if header.payload_length > self.maximum_payload_size {
            debug!(
                stream_id = header.stream_id,
                payload_length = header.payload_length,
                maximum_payload_size = self.maximum_payload_size,
                "payload exceeds maximum size"
            );
            self.record_frame_size_error();
            self.state.initialize_remainders();
            self.decoder_state = DecoderState::DiscardPayload;
            listener.on_frame_size_error(&header);
            return DecodeStatus::Error;
        }

        let mut subset = db.subset(header.payload_length as usize);
        let status = match header.frame_type {
            FrameType::RstStream => {
                self.state
                    .frame_header_mut()
                    .retain_flags(FrameType::RstStream.valid_flags());
                self.rst_stream
                    .start_decoding_payload(&mut self.state, &mut subset, listener)
            }
            _ => self
                .unknown
                .start_decoding_payload(&mut self.state, &mut subset, listener),
        };
        db.advance_cursor(subset.offset());
        self.after_payload(status)
    }

    fn resume_decoding_payload(
        &mut self,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        let mut subset = db.subset(self.state.remaining_total_payload() as usize);
        let status = match self.state.frame_header().frame_type {
            FrameType::RstStream => {
                self.rst_stream
                    .resume_decoding_payload(&mut self.state, &mut subset, listener)
            }
            _ => self
                .unknown
                .resume_decoding_payload(&mut self.state, &mut subset, listener),
        };
        db.advance_cursor(subset.offset());
        self.after_payload(status)
    }

    fn after_payload(&mut self, status: DecodeStatus) -> DecodeStatus {
        self.decoder_state = match status {
            DecodeStatus::Done => {
                self.frames_decoded += 1;
                DecoderState::StartDecodingHeader
            }
            DecodeStatus::InProgress => DecoderState::ResumeDecodingPayload,
            DecodeStatus::Error => {
                self.record_frame_size_error();
                DecoderState::DiscardPayload
            }
        };
        status
    }

    fn record_frame_size_error(&mut self) {
        let header = self.state.frame_header();
        self.last_error = Some(DecodeError::FrameSize {
            frame_type: header.frame_type,
            stream_id: header.stream_id,
            payload_length: header.payload_length,
        });
    }

    /// Skip what is left of a failed frame.
    fn discard_payload(&mut self, db: &mut DecodeBuffer<'_>) -> DecodeStatus {
        self.state.fold_padding_into_payload();
        let avail = self.state.available_payload(db);
        trace!(avail, remaining_payload = self.state.remaining_payload(), "FrameDecoder::discard_payload");
        if avail > 0 {
            self.state.consume_payload(avail);
            db.advance_cursor(avail);
        }
        if self.state.remaining_payload() == 0 {
            self.decoder_state = DecoderState::StartDecodingHeader;
            return DecodeStatus::Done;
        }
        DecodeStatus::InProgress
    }
}
