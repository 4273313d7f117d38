//! # Decode Buffer
//!
//! A bounds-checked read cursor over a borrowed chunk of input. The buffer never
//! owns bytes and never outlives the slice it was built from.
//!
//! Reading past the end is a programming error: callers consult
//! [`DecodeBuffer::remaining`] first and leave undecodable tails for the next
//! chunk. The fixed-width readers therefore panic (via slice indexing) instead
//! of returning an error.

#![forbid(unsafe_code)]

/// Read cursor over a borrowed byte slice.
///
/// Invariant: `0 <= cursor <= buffer.len()`.
#[derive(Debug)]
pub struct DecodeBuffer<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> DecodeBuffer<'a> {
    /// Wrap a caller-owned chunk.
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        self.remaining() > 0
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Length of the whole underlying chunk.
    #[inline]
    pub fn full_size(&self) -> usize {
        self.buffer.len()
    }

    /// The unconsumed tail.
    #[inline]
    pub fn cursor(&self) -> &'a [u8] {
        &self.buffer[self.cursor..]
    }

    /// `min(remaining, length)`
    #[inline]
    pub fn min_length_remaining(&self, length: usize) -> usize {
        self.remaining().min(length)
    }

    /// Skip `amount` bytes.
    #[inline]
    pub fn advance_cursor(&mut self, amount: usize) {
        assert!(
            amount <= self.remaining(),
            "advance_cursor({}) past end, remaining {}",
            amount,
            self.remaining()
        );
        self.cursor += amount;
    }

    /// A new buffer over at most `limit` bytes of the unconsumed tail.
    ///
    /// The subset reads the same bytes; after working with it the caller
    /// advances this buffer by `subset.offset()`.
    pub fn subset(&self, limit: usize) -> DecodeBuffer<'a> {
        let len = self.min_length_remaining(limit);
        DecodeBuffer::new(&self.buffer[self.cursor..self.cursor + len])
    }

    /// Copy `out.len()` bytes and advance.
    pub fn copy_to(&mut self, out: &mut [u8]) {
        let end = self.cursor + out.len();
        out.copy_from_slice(&self.buffer[self.cursor..end]);
        self.cursor = end;
    }

    #[inline]
    pub fn decode_u8(&mut self) -> u8 {
        debug_assert!(self.remaining() >= 1);
        let v = self.buffer[self.cursor];
        self.cursor += 1;
        v
    }

    #[inline]
    pub fn decode_u16(&mut self) -> u16 {
        let mut b = [0u8; 2];
        self.copy_to(&mut b);
        u16::from_be_bytes(b)
    }

    /// 24-bit big-endian unsigned integer, as used by the frame length field.
    #[inline]
    pub fn decode_u24(&mut self) -> u32 {
        let mut b = [0u8; 4];
        self.copy_to(&mut b[1..]);
        u32::from_be_bytes(b)
    }

    /// 32-bit field with the high (reserved) bit masked off.
    #[inline]
    pub fn decode_u31(&mut self) -> u32 {
        self.decode_u32() & 0x7fff_ffff
    }

    #[inline]
    pub fn decode_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        self.copy_to(&mut b);
        u32::from_be_bytes(b)
    }
}
