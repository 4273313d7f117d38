//! RST_STREAM payload decoder.
//!
//! The payload is a single 4-byte error code, so the declared length must be
//! exactly 4. Shorter payloads fail inside the structure decoder; longer ones
//! fail here once the structure completes with payload left over.

use tracing::trace;

use super::PayloadDecoder;
use crate::decode_buffer::DecodeBuffer;
use crate::error::DecodeStatus;
use crate::frame_header::FrameType;
use crate::listener::FrameDecoderListener;
use crate::rst_stream::RstStreamFields;
use crate::state::FrameDecoderState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    InProgress,
    Finished,
}

#[derive(Debug, Clone)]
pub struct RstStreamPayloadDecoder {
    fields: RstStreamFields,
    phase: Phase,
}

impl Default for RstStreamPayloadDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RstStreamPayloadDecoder {
    pub fn new() -> Self {
        Self {
            fields: RstStreamFields::default(),
            phase: Phase::NotStarted,
        }
    }

    /// Fields decoded so far (complete once a call returned `Done`).
    pub fn fields(&self) -> &RstStreamFields {
        &self.fields
    }

    /// The single place where terminal decisions are made.
    fn handle_status(
        &mut self,
        state: &mut FrameDecoderState,
        status: DecodeStatus,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        trace!(%status, remaining_payload = state.remaining_payload(), "RstStreamPayloadDecoder::handle_status");
        let status = match status {
            DecodeStatus::Done if state.remaining_payload() == 0 => {
                listener.on_rst_stream(state.frame_header(), self.fields.error_code);
                DecodeStatus::Done
            }
            // Payload is longer than the structure.
            DecodeStatus::Done => state.report_frame_size_error(listener),
            DecodeStatus::InProgress => {
                debug_assert!(state.remaining_payload() > 0);
                DecodeStatus::InProgress
            }
            DecodeStatus::Error => {
                debug_assert_eq!(state.remaining_payload(), 0);
                DecodeStatus::Error
            }
        };
        self.phase = match status {
            DecodeStatus::InProgress => Phase::InProgress,
            _ => Phase::Finished,
        };
        status
    }
}

impl PayloadDecoder for RstStreamPayloadDecoder {
    fn start_decoding_payload(
        &mut self,
        state: &mut FrameDecoderState,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        let header = *state.frame_header();
        trace!(%header, "RstStreamPayloadDecoder::start_decoding_payload");
        debug_assert_eq!(header.frame_type, FrameType::RstStream);
        debug_assert!(db.remaining() <= header.payload_length as usize);
        // RST_STREAM has no flags.
        debug_assert_eq!(header.flags, 0);

        self.phase = Phase::NotStarted;
        state.initialize_remainders();
        let status = state.start_decoding_structure_in_payload(&mut self.fields, db, listener);
        self.handle_status(state, status, listener)
    }

    fn resume_decoding_payload(
        &mut self,
        state: &mut FrameDecoderState,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        trace!(
            remaining_payload = state.remaining_payload(),
            db_remaining = db.remaining(),
            "RstStreamPayloadDecoder::resume_decoding_payload"
        );
        debug_assert_eq!(self.phase, Phase::InProgress, "resume without a prior start");
        debug_assert_eq!(state.frame_header().frame_type, FrameType::RstStream);
        debug_assert!(db.remaining() <= state.remaining_payload() as usize);

        let status = state.resume_decoding_structure_in_payload(&mut self.fields, db, listener);
        self.handle_status(state, status, listener)
    }
}
