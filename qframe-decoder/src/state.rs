//! # Frame Decoder State
//!
//! Per-frame progress shared by the frame decoder and whichever payload decoder
//! is active: the current header, how many declared payload bytes are still
//! unseen, and the scratch state for a structure split across chunks.
//!
//! ## Invariants
//!
//! - `remaining_payload <= frame_header.payload_length`
//! - `remaining_payload` only decreases while a frame is being decoded
//! - A new header is decoded only after the previous payload is consumed

#![forbid(unsafe_code)]

use tracing::debug;

use crate::decode_buffer::DecodeBuffer;
use crate::error::DecodeStatus;
use crate::frame_header::FrameHeader;
use crate::listener::FrameDecoderListener;
use crate::structure::{DecodeStructure, StructureDecoder};

#[derive(Debug, Clone, Default)]
pub struct FrameDecoderState {
    frame_header: FrameHeader,
    remaining_payload: u32,
    // Always zero for the frame types decoded here; reserved for PADDED types.
    remaining_padding: u32,
    structure_decoder: StructureDecoder,
}

impl FrameDecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State positioned at the start of the payload of a frame with `header`.
    pub fn for_frame(header: FrameHeader) -> Self {
        let mut state = Self {
            frame_header: header,
            ..Self::default()
        };
        state.initialize_remainders();
        state
    }

    pub fn frame_header(&self) -> &FrameHeader {
        &self.frame_header
    }

    pub(crate) fn frame_header_mut(&mut self) -> &mut FrameHeader {
        &mut self.frame_header
    }

    /// Reset the remainders for a new, unpadded frame.
    pub fn initialize_remainders(&mut self) {
        self.remaining_payload = self.frame_header.payload_length;
        self.remaining_padding = 0;
    }

    pub fn remaining_payload(&self) -> u32 {
        self.remaining_payload
    }

    pub fn remaining_padding(&self) -> u32 {
        self.remaining_padding
    }

    pub fn remaining_total_payload(&self) -> u32 {
        self.remaining_payload + self.remaining_padding
    }

    /// Bytes of the current payload that are present in `db`.
    pub fn available_payload(&self, db: &DecodeBuffer<'_>) -> usize {
        db.min_length_remaining(self.remaining_payload as usize)
    }

    /// Record that `amount` payload bytes were handled outside a structure.
    pub fn consume_payload(&mut self, amount: usize) {
        debug_assert!(amount <= self.remaining_payload as usize);
        self.remaining_payload -= amount as u32;
    }

    /// Fold any padding into the payload so a discard skips both.
    pub(crate) fn fold_padding_into_payload(&mut self) {
        self.remaining_payload += self.remaining_padding;
        self.remaining_padding = 0;
    }

    /// Begin decoding the frame header; `true` once it is complete.
    pub fn start_decoding_frame_header(&mut self, db: &mut DecodeBuffer<'_>) -> bool {
        self.structure_decoder.start(&mut self.frame_header, db)
    }

    pub fn resume_decoding_frame_header(&mut self, db: &mut DecodeBuffer<'_>) -> bool {
        self.structure_decoder.resume(&mut self.frame_header, db)
    }

    /// Decode a fixed structure from as much of the payload as `db` holds.
    ///
    /// `Done` means the structure is complete and `remaining_payload` has been
    /// reduced by its encoded size. `InProgress` means the tail is buffered.
    /// If the payload ends before the structure, the listener is told about a
    /// frame size error and `Error` is returned.
    pub fn start_decoding_structure_in_payload<S: DecodeStructure>(
        &mut self,
        out: &mut S,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        let status = self
            .structure_decoder
            .start_in_payload(out, db, &mut self.remaining_payload);
        if status != DecodeStatus::Error {
            return status;
        }
        self.report_frame_size_error(listener)
    }

    /// Continue a decode that returned `InProgress`.
    pub fn resume_decoding_structure_in_payload<S: DecodeStructure>(
        &mut self,
        out: &mut S,
        db: &mut DecodeBuffer<'_>,
        listener: &mut dyn FrameDecoderListener,
    ) -> DecodeStatus {
        let status = self
            .structure_decoder
            .resume_in_payload(out, db, &mut self.remaining_payload);
        if status != DecodeStatus::Error {
            return status;
        }
        self.report_frame_size_error(listener)
    }

    /// Notify the listener that the declared length is wrong for this frame.
    pub fn report_frame_size_error(&mut self, listener: &mut dyn FrameDecoderListener) -> DecodeStatus {
        debug!(
            stream_id = self.frame_header.stream_id,
            frame_type = ?self.frame_header.frame_type,
            payload_length = self.frame_header.payload_length,
            "frame size error"
        );
        listener.on_frame_size_error(&self.frame_header);
        DecodeStatus::Error
    }
}
