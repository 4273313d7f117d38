//! # Resumable Structure Decoding
//!
//! Fixed-width wire structures (the frame header, RST_STREAM fields) are decoded
//! directly from the input when it holds the whole structure. Otherwise the
//! available prefix is copied into a small scratch buffer and the decode is
//! finished by later `resume` calls, so the structure may straddle any number
//! of chunk boundaries.

#![forbid(unsafe_code)]

use tracing::trace;

use crate::decode_buffer::DecodeBuffer;
use crate::error::DecodeStatus;

/// Largest structure the scratch buffer can hold.
pub const MAX_STRUCTURE_SIZE: usize = 16;

/// A fixed-width structure that can be decoded from a [`DecodeBuffer`].
pub trait DecodeStructure: Sized {
    /// Exact encoded size in bytes.
    const ENCODED_SIZE: usize;

    /// Decode from `db`. Caller guarantees `db.remaining() >= ENCODED_SIZE`.
    fn decode_from(db: &mut DecodeBuffer<'_>) -> Self;
}

/// Scratch state for one structure that is being decoded across chunks.
#[derive(Debug, Clone)]
pub struct StructureDecoder {
    buffer: [u8; MAX_STRUCTURE_SIZE],
    offset: usize,
}

impl Default for StructureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureDecoder {
    pub const fn new() -> Self {
        Self {
            buffer: [0; MAX_STRUCTURE_SIZE],
            offset: 0,
        }
    }

    /// Bytes of the current structure buffered so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Begin decoding a structure that is not bounded by a payload length.
    ///
    /// Returns `true` once `out` holds the decoded value.
    pub fn start<S: DecodeStructure>(&mut self, out: &mut S, db: &mut DecodeBuffer<'_>) -> bool {
        if db.remaining() >= S::ENCODED_SIZE {
            *out = S::decode_from(db);
            return true;
        }
        self.incomplete_start(db, S::ENCODED_SIZE);
        false
    }

    /// Continue a decode begun by [`StructureDecoder::start`].
    pub fn resume<S: DecodeStructure>(&mut self, out: &mut S, db: &mut DecodeBuffer<'_>) -> bool {
        if self.resume_filling_buffer(db, S::ENCODED_SIZE) {
            *out = self.decode_buffered();
            return true;
        }
        false
    }

    /// Begin decoding a structure that sits inside a frame payload.
    ///
    /// `remaining_payload` is decremented by every byte consumed. The decode
    /// fails (status `Error`) if the payload ends before the structure does.
    pub fn start_in_payload<S: DecodeStructure>(
        &mut self,
        out: &mut S,
        db: &mut DecodeBuffer<'_>,
        remaining_payload: &mut u32,
    ) -> DecodeStatus {
        debug_assert!(db.remaining() <= *remaining_payload as usize);
        if db.remaining() >= S::ENCODED_SIZE {
            *out = S::decode_from(db);
            *remaining_payload -= S::ENCODED_SIZE as u32;
            return DecodeStatus::Done;
        }
        self.incomplete_start_in_payload(db, remaining_payload, S::ENCODED_SIZE)
    }

    /// Continue a decode begun by [`StructureDecoder::start_in_payload`].
    pub fn resume_in_payload<S: DecodeStructure>(
        &mut self,
        out: &mut S,
        db: &mut DecodeBuffer<'_>,
        remaining_payload: &mut u32,
    ) -> DecodeStatus {
        if self.resume_filling_buffer_in_payload(db, remaining_payload, S::ENCODED_SIZE) {
            *out = self.decode_buffered();
            return DecodeStatus::Done;
        }
        if *remaining_payload == 0 {
            DecodeStatus::Error
        } else {
            DecodeStatus::InProgress
        }
    }

    fn decode_buffered<S: DecodeStructure>(&self) -> S {
        let mut inner = DecodeBuffer::new(&self.buffer[..S::ENCODED_SIZE]);
        S::decode_from(&mut inner)
    }

    fn incomplete_start(&mut self, db: &mut DecodeBuffer<'_>, target_size: usize) -> usize {
        assert!(
            target_size <= MAX_STRUCTURE_SIZE,
            "structure of {} bytes exceeds scratch buffer",
            target_size
        );
        let num_to_copy = db.min_length_remaining(target_size);
        db.copy_to(&mut self.buffer[..num_to_copy]);
        self.offset = num_to_copy;
        trace!(num_to_copy, target_size, "structure decode incomplete");
        num_to_copy
    }

    fn incomplete_start_in_payload(
        &mut self,
        db: &mut DecodeBuffer<'_>,
        remaining_payload: &mut u32,
        target_size: usize,
    ) -> DecodeStatus {
        let num_copied = self.incomplete_start(db, target_size);
        *remaining_payload -= num_copied as u32;
        if *remaining_payload == 0 {
            // Payload ended before the structure did.
            DecodeStatus::Error
        } else {
            DecodeStatus::InProgress
        }
    }

    fn resume_filling_buffer(&mut self, db: &mut DecodeBuffer<'_>, target_size: usize) -> bool {
        debug_assert!(self.offset <= target_size, "resume after structure completed");
        let needed = target_size - self.offset;
        let num_to_copy = db.min_length_remaining(needed);
        db.copy_to(&mut self.buffer[self.offset..self.offset + num_to_copy]);
        self.offset += num_to_copy;
        needed == num_to_copy
    }

    fn resume_filling_buffer_in_payload(
        &mut self,
        db: &mut DecodeBuffer<'_>,
        remaining_payload: &mut u32,
        target_size: usize,
    ) -> bool {
        debug_assert!(self.offset <= target_size, "resume after structure completed");
        let needed = target_size - self.offset;
        let num_to_copy = db
            .min_length_remaining(needed)
            .min(*remaining_payload as usize);
        db.copy_to(&mut self.buffer[self.offset..self.offset + num_to_copy]);
        self.offset += num_to_copy;
        *remaining_payload -= num_to_copy as u32;
        needed == num_to_copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        a: u16,
        b: u32,
    }

    impl DecodeStructure for Pair {
        const ENCODED_SIZE: usize = 6;

        fn decode_from(db: &mut DecodeBuffer<'_>) -> Self {
            Pair {
                a: db.decode_u16(),
                b: db.decode_u32(),
            }
        }
    }

    const WIRE: [u8; 6] = [0xab, 0xcd, 0x01, 0x02, 0x03, 0x04];

    #[test]
    fn test_start_decodes_directly_when_complete() {
        let mut decoder = StructureDecoder::new();
        let mut out = Pair::default();
        let mut db = DecodeBuffer::new(&WIRE);

        assert!(decoder.start(&mut out, &mut db));
        assert_eq!(out, Pair { a: 0xabcd, b: 0x01020304 });
        assert_eq!(decoder.offset(), 0);
    }

    #[test]
    fn test_resume_across_every_split() {
        for split in 0..WIRE.len() {
            let mut decoder = StructureDecoder::new();
            let mut out = Pair::default();

            let mut first = DecodeBuffer::new(&WIRE[..split]);
            assert!(!decoder.start(&mut out, &mut first));
            assert!(first.is_empty());
            assert_eq!(decoder.offset(), split);

            let mut second = DecodeBuffer::new(&WIRE[split..]);
            assert!(decoder.resume(&mut out, &mut second));
            assert_eq!(out, Pair { a: 0xabcd, b: 0x01020304 });
        }
    }

    #[test]
    fn test_resume_byte_at_a_time() {
        let mut decoder = StructureDecoder::new();
        let mut out = Pair::default();
        assert!(!decoder.start(&mut out, &mut DecodeBuffer::new(&[])));

        for (i, byte) in WIRE.iter().enumerate() {
            let chunk = [*byte];
            let done = decoder.resume(&mut out, &mut DecodeBuffer::new(&chunk));
            assert_eq!(done, i == WIRE.len() - 1);
        }
        assert_eq!(out.b, 0x01020304);
    }

    #[test]
    fn test_payload_shorter_than_structure_is_error() {
        let mut decoder = StructureDecoder::new();
        let mut out = Pair::default();
        let mut remaining = 4u32;
        let mut db = DecodeBuffer::new(&WIRE[..4]);

        let status = decoder.start_in_payload(&mut out, &mut db, &mut remaining);
        assert_eq!(status, DecodeStatus::Error);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_payload_resume_decrements_remaining() {
        let mut decoder = StructureDecoder::new();
        let mut out = Pair::default();
        let mut remaining = 8u32;

        let status = decoder.start_in_payload(&mut out, &mut DecodeBuffer::new(&WIRE[..2]), &mut remaining);
        assert_eq!(status, DecodeStatus::InProgress);
        assert_eq!(remaining, 6);

        let status = decoder.resume_in_payload(&mut out, &mut DecodeBuffer::new(&WIRE[2..]), &mut remaining);
        assert_eq!(status, DecodeStatus::Done);
        assert_eq!(remaining, 2);
    }
}
