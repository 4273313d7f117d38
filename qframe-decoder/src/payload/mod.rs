//! # Payload Decoders
//!
//! One decoder per frame type. Every decoder follows the same protocol:
//!
//! ```text
//! NotStarted --start--> InProgress --resume--> ... --> Done | Error
//!      |                                                  ^
//!      +--------------------start-------------------------+
//! ```
//!
//! - `start_decoding_payload` is the only legal entry for a new frame
//! - `resume_decoding_payload` is only legal after `InProgress`
//! - The `DecodeBuffer` never holds more than the frame's remaining payload
//!
//! Decoders keep only the partially decoded fields; all per-frame progress
//! lives in [`FrameDecoderState`].

use crate::decode_buffer::DecodeBuffer;
use crate::error::DecodeStatus;
use crate::listener::FrameDecoderListener;
use crate::state::FrameDecoderState;

mod rst_stream;
mod unknown;

pub use rst_stream::RstStreamPayloadDecoder;
pub use unknown::UnknownPayloadDecoder;

/// Resumable decoder for the payload of a single frame type.
pub trait PayloadDecoder {
    /// Begin decoding the payload of the frame whose header is in `state`.
    fn start_decoding_payload(
        &mut self,
        state: &mut FrameDecoderState,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus;

    /// Continue after `start_decoding_payload` returned `InProgress`.
    fn resume_decoding_payload(
        &mut self,
        state: &mut FrameDecoderState,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus;
}
