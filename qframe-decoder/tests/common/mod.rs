//! Shared helpers for the decoder integration tests.

#![allow(dead_code)]

use bytes::BytesMut;
use qframe_decoder::{DecodeBuffer, DecodeStatus, FrameDecoder, FrameEvent, FrameHeader, FrameType};

/// Wire bytes for a frame with an arbitrary (possibly wrong) payload.
pub fn raw_frame(frame_type: FrameType, flags: u8, stream_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    FrameHeader::new(payload.len() as u32, frame_type, flags, stream_id).encode(&mut buf);
    buf.extend_from_slice(payload);
    buf.to_vec()
}

/// Feed `wire` split at `cuts` (sorted offsets, duplicates give empty chunks).
///
/// Every chunk is offered to the decoder until it is drained; an empty chunk
/// gets exactly one call.
pub fn decode_with_cuts(decoder: &mut FrameDecoder, wire: &[u8], cuts: &[usize]) -> (Vec<FrameEvent>, Vec<DecodeStatus>) {
    let mut events: Vec<FrameEvent> = Vec::new();
    let mut statuses = Vec::new();
    let mut start = 0;
    for &end in cuts.iter().chain(std::iter::once(&wire.len())) {
        let end = end.clamp(start, wire.len());
        let mut db = DecodeBuffer::new(&wire[start..end]);
        loop {
            statuses.push(decoder.decode_frame(&mut db, &mut events));
            if db.is_empty() {
                break;
            }
        }
        start = end;
    }
    (events, statuses)
}

pub fn decode_all(wire: &[u8]) -> Vec<FrameEvent> {
    decode_with_cuts(&mut FrameDecoder::new(), wire, &[]).0
}

/// Merge consecutive payload pieces of the same skipped frame.
pub fn normalize(events: Vec<FrameEvent>) -> Vec<FrameEvent> {
    let mut out: Vec<FrameEvent> = Vec::new();
    for event in events {
        if let FrameEvent::UnknownPayload(header, data) = &event {
            if let Some(FrameEvent::UnknownPayload(prev_header, prev)) = out.last_mut() {
                if prev_header == header {
                    prev.extend_from_slice(data);
                    continue;
                }
            }
        }
        out.push(event);
    }
    out
}
