//! Payload decoder for frame types without a dedicated decoder.
//!
//! RFC 9113 Section 4.1: implementations must ignore and discard frames of
//! unknown types. The payload is handed to the listener unparsed, in whatever
//! pieces it arrives.

use tracing::trace;

use super::PayloadDecoder;
use crate::decode_buffer::DecodeBuffer;
use crate::error::DecodeStatus;
use crate::listener::FrameDecoderListener;
use crate::state::FrameDecoderState;

#[derive(Debug, Clone, Default)]
pub struct UnknownPayloadDecoder;

impl UnknownPayloadDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadDecoder for UnknownPayloadDecoder {
    fn start_decoding_payload(
        &mut self,
        state: &mut FrameDecoderState,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        trace!(header = %state.frame_header(), "UnknownPayloadDecoder::start_decoding_payload");
        state.initialize_remainders();
        listener.on_unknown_start(state.frame_header());
        self.resume_decoding_payload(state, db, listener)
    }

    fn resume_decoding_payload(
        &mut self,
        state: &mut FrameDecoderState,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        let avail = state.available_payload(db);
        if avail > 0 {
            listener.on_unknown_payload(state.frame_header(), &db.cursor()[..avail]);
            db.advance_cursor(avail);
            state.consume_payload(avail);
        }
        if state.remaining_payload() == 0 {
            listener.on_unknown_end(state.frame_header());
            return DecodeStatus::Done;
        }
        DecodeStatus::InProgress
    }
}
