//! # Stream Send Buffer
//!
//! Holds application data for one stream as a queue of [`MemSlice`]s at
//! increasing stream offsets. Data is copied out per packet with
//! [`StreamSendBuffer::write_stream_data`] and dropped once acknowledged.
//!
//! ## Invariants
//!
//! - Buffered slices are contiguous and non-empty
//! - Acked ranges are sorted, disjoint and non-adjacent
//! - A slice is dropped only when every byte of it is inside the acked prefix

use std::collections::VecDeque;
use std::ops::Range;

use bytes::BytesMut;
use tracing::trace;

use crate::error::{BufferError, Result};
use crate::mem_slice::MemSlice;
use crate::span::MemSliceSpan;

/// A range of stream data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRange {
    pub offset: u64,
    pub length: u64,
}

impl DataRange {
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn as_range(&self) -> Range<u64> {
        self.offset..self.end()
    }

    /// Adjacent or overlapping.
    pub fn is_contiguous_with(&self, other: &DataRange) -> bool {
        self.end() >= other.offset && other.end() >= self.offset
    }
}

/// Sort and coalesce contiguous ranges in place.
pub fn merge_ranges(ranges: &mut Vec<DataRange>) {
    if ranges.len() <= 1 {
        return;
    }
    ranges.sort_by_key(|r| r.offset);

    let mut merged = Vec::with_capacity(ranges.len());
    let mut current = ranges[0];
    for range in &ranges[1..] {
        if current.is_contiguous_with(range) {
            let end = current.end().max(range.end());
            current.length = end - current.offset;
        } else {
            merged.push(current);
            current = *range;
        }
    }
    merged.push(current);
    *ranges = merged;
}

#[derive(Debug)]
struct BufferedSlice {
    offset: u64,
    slice: MemSlice,
}

impl BufferedSlice {
    fn end(&self) -> u64 {
        self.offset + self.slice.len() as u64
    }
}

#[derive(Debug, Default)]
pub struct StreamSendBuffer {
    slices: VecDeque<BufferedSlice>,
    stream_offset: u64,
    acked: Vec<DataRange>,
}

impl StreamSendBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `slice` at the current end of the stream. Empty slices are
    /// ignored.
    pub fn save_mem_slice(&mut self, slice: MemSlice) {
        if slice.is_empty() {
            return;
        }
        let offset = self.stream_offset;
        self.stream_offset += slice.len() as u64;
        trace!(offset, len = slice.len(), "saved mem slice");
        self.slices.push_back(BufferedSlice { offset, slice });
    }

    /// Append every slice the span refers to. Returns the bytes saved.
    pub fn save_mem_slice_span(&mut self, span: MemSliceSpan<'_>) -> usize {
        span.save_mem_slices(|slice| self.save_mem_slice(slice))
    }

    /// Offset one past the last byte written to the stream.
    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }

    /// Bytes still held (not yet released by acknowledgement).
    pub fn buffered_bytes(&self) -> u64 {
        self.slices.iter().map(|s| s.slice.len() as u64).sum()
    }

    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    pub fn stream_bytes_acked(&self) -> u64 {
        self.acked.iter().map(|r| r.length).sum()
    }

    pub fn acked_ranges(&self) -> &[DataRange] {
        &self.acked
    }

    pub fn is_fully_acked(&self) -> bool {
        self.stream_bytes_acked() == self.stream_offset
    }

    /// Copy `[offset, offset + len)` into `out`.
    ///
    /// Returns `false` without writing anything if part of the range was
    /// never written or has already been released.
    pub fn write_stream_data(&self, offset: u64, len: u64, out: &mut BytesMut) -> bool {
        let end = match offset.checked_add(len) {
            Some(end) if end <= self.stream_offset => end,
            _ => return false,
        };
        if len == 0 {
            return true;
        }
        match self.slices.front() {
            Some(first) if first.offset <= offset => {}
            _ => return false,
        }

        out.reserve(len as usize);
        for buffered in self.slices.iter() {
            if buffered.end() <= offset {
                continue;
            }
            if buffered.offset >= end {
                break;
            }
            let from = offset.max(buffered.offset) - buffered.offset;
            let to = end.min(buffered.end()) - buffered.offset;
            out.extend_from_slice(&buffered.slice[from as usize..to as usize]);
        }
        true
    }

    /// Record an acknowledgement and release fully acked slices.
    ///
    /// Returns the number of newly acked bytes (duplicates count once).
    pub fn on_stream_data_acked(&mut self, offset: u64, len: u64) -> Result<u64> {
        match offset.checked_add(len) {
            Some(end) if end <= self.stream_offset => {}
            _ => {
                return Err(BufferError::AckBeyondWritten {
                    offset,
                    end: offset.saturating_add(len),
                    written: self.stream_offset,
                })
            }
        }
        if len == 0 {
            return Ok(0);
        }

        let before = self.stream_bytes_acked();
        self.acked.push(DataRange::new(offset, len));
        merge_ranges(&mut self.acked);
        let newly_acked = self.stream_bytes_acked() - before;

        let acked_prefix = match self.acked.first() {
            Some(first) if first.offset == 0 => first.end(),
            _ => 0,
        };
        while let Some(front) = self.slices.front() {
            if front.end() > acked_prefix {
                break;
            }
            self.slices.pop_front();
        }
        trace!(offset, len, newly_acked, acked_prefix, "stream data acked");
        Ok(newly_acked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(parts: &[&[u8]]) -> StreamSendBuffer {
        let slices: Vec<MemSlice> = parts.iter().map(|p| MemSlice::from(p.to_vec())).collect();
        let mut buf = StreamSendBuffer::new();
        buf.save_mem_slice_span(MemSliceSpan::new(&slices));
        buf
    }

    #[test]
    fn test_merge_ranges() {
        let mut ranges = vec![
            DataRange::new(20, 5),
            DataRange::new(0, 10),
            DataRange::new(10, 3),
            DataRange::new(5, 2),
        ];
        merge_ranges(&mut ranges);
        assert_eq!(ranges, vec![DataRange::new(0, 13), DataRange::new(20, 5)]);
    }

    #[test]
    fn test_write_across_slices() {
        let buf = buffer_with(&[b"hello ", b"", b"world"]);
        assert_eq!(buf.num_slices(), 2);
        assert_eq!(buf.stream_offset(), 11);

        let mut out = BytesMut::new();
        assert!(buf.write_stream_data(3, 6, &mut out));
        assert_eq!(&out[..], b"lo wor");

        assert!(!buf.write_stream_data(8, 4, &mut out));
    }

    #[test]
    fn test_ack_releases_prefix_only() {
        let mut buf = buffer_with(&[b"aaaa", b"bbbb", b"cccc"]);

        assert_eq!(buf.on_stream_data_acked(4, 4).unwrap(), 4);
        assert_eq!(buf.num_slices(), 3);

        assert_eq!(buf.on_stream_data_acked(0, 6).unwrap(), 4);
        assert_eq!(buf.num_slices(), 1);
        assert_eq!(buf.buffered_bytes(), 4);

        let mut out = BytesMut::new();
        assert!(!buf.write_stream_data(0, 4, &mut out));
        assert!(buf.write_stream_data(8, 4, &mut out));
        assert_eq!(&out[..], b"cccc");

        assert_eq!(buf.on_stream_data_acked(8, 4).unwrap(), 4);
        assert!(buf.is_fully_acked());
        assert_eq!(buf.num_slices(), 0);
    }

    #[test]
    fn test_ack_past_end_is_rejected() {
        let mut buf = buffer_with(&[b"xy"]);
        assert_eq!(
            buf.on_stream_data_acked(1, 5),
            Err(BufferError::AckBeyondWritten {
                offset: 1,
                end: 6,
                written: 2
            })
        );
    }

    #[test]
    fn test_overflowing_ranges_are_rejected() {
        let mut buf = buffer_with(&[b"xy"]);

        let mut out = BytesMut::new();
        assert!(!buf.write_stream_data(u64::MAX, 2, &mut out));
        assert!(out.is_empty());

        assert_eq!(
            buf.on_stream_data_acked(u64::MAX, 2),
            Err(BufferError::AckBeyondWritten {
                offset: u64::MAX,
                end: u64::MAX,
                written: 2
            })
        );
        assert_eq!(buf.num_slices(), 1);
        assert_eq!(buf.stream_bytes_acked(), 0);
    }
}
