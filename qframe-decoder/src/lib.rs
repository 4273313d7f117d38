//! qframe-decoder: Incremental HTTP/2 Frame Decoding (RFC 9113 Section 4)
//!
//! This crate decodes length-delimited HTTP/2 frames from input that arrives in
//! arbitrarily sized chunks. No call ever blocks or waits for more data: each
//! decoder consumes whatever bytes are available, buffers the tail of a
//! partially received fixed-size structure, and reports one of three statuses.
//!
//! # Decode Protocol
//!
//! - `Start` exactly once per frame, then zero or more `Resume` calls
//! - Each call returns [`DecodeStatus::Done`], [`DecodeStatus::InProgress`]
//!   or [`DecodeStatus::Error`]
//! - Decoded frames and frame-level errors are surfaced through the
//!   [`FrameDecoderListener`] callbacks, exactly once per frame
//!
//! # Module Organization
//!
//! - `decode_buffer`: bounds-checked read cursor over a borrowed chunk
//! - `frame_header`: the 9-byte common frame header and frame type tags
//! - `structure`: resumable decoding of fixed-width wire structures
//! - `state`: per-frame progress shared by all payload decoders
//! - `payload`: payload decoders (RST_STREAM, unhandled frame types)
//! - `decoder`: the top-level driver that sequences header and payload
//!
//! # Example
//!
//! ```rust
//! use qframe_decoder::{encode_rst_stream_frame, DecodeBuffer, FrameDecoder, FrameEvent, Http2ErrorCode};
//!
//! let wire = encode_rst_stream_frame(3, Http2ErrorCode::CANCEL);
//! let mut decoder = FrameDecoder::new();
//! let mut events: Vec<FrameEvent> = Vec::new();
//!
//! let mut db = DecodeBuffer::new(&wire);
//! decoder.decode_frame(&mut db, &mut events);
//! assert!(matches!(events.last(), Some(FrameEvent::RstStream { error_code, .. }) if *error_code == Http2ErrorCode::CANCEL));
//! ```

pub mod decode_buffer;
pub mod decoder;
pub mod error;
pub mod frame_header;
pub mod listener;
pub mod payload;
pub mod rst_stream;
pub mod state;
pub mod structure;

pub use decode_buffer::DecodeBuffer;
pub use decoder::{DecoderState, FrameDecoder, DEFAULT_MAX_PAYLOAD_SIZE};
pub use error::{DecodeError, DecodeStatus, Http2ErrorCode, Result};
pub use frame_header::{flags, FrameHeader, FrameType};
pub use listener::{FrameDecoderListener, FrameEvent};
pub use payload::{PayloadDecoder, RstStreamPayloadDecoder, UnknownPayloadDecoder};
pub use rst_stream::{encode_rst_stream_frame, RstStreamFields};
pub use state::FrameDecoderState;
pub use structure::{DecodeStructure, StructureDecoder};
