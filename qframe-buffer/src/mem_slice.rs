//! # MemSlice
//!
//! Move-only handle to an immutable, reference-counted byte buffer. Slices
//! derived from one allocation (`slice`, `split_to`, or a send buffer taking
//! a share) keep the allocation alive; the allocator gets it back once the
//! last of them is dropped.
//!
//! `MemSlice` deliberately does not implement `Clone`. Moving one transfers
//! the reference; [`MemSlice::take`] moves out and leaves an empty slice.

use std::fmt;
use std::ops::{Deref, RangeBounds};
use std::sync::Arc;

use bytes::Bytes;

use crate::allocator::{AllocationMode, BufferAllocator, UniqueBuffer};

#[derive(Default, PartialEq, Eq)]
pub struct MemSlice {
    bytes: Bytes,
}

impl MemSlice {
    /// Allocate `len` zeroed bytes from `allocator`.
    ///
    /// # Panics
    ///
    /// If `len` is zero; use [`MemSlice::default`] for an empty slice.
    pub fn allocate(allocator: &Arc<dyn BufferAllocator>, len: usize) -> Self {
        assert!(len > 0, "allocating MemSlice requires a nonzero length");
        Self::from_unique(UniqueBuffer::new(allocator, len))
    }

    /// Like [`MemSlice::allocate`], but never served from a pool.
    pub fn allocate_direct(allocator: &Arc<dyn BufferAllocator>, len: usize) -> Self {
        assert!(len > 0, "allocating MemSlice requires a nonzero length");
        Self::from_unique(UniqueBuffer::with_mode(allocator, len, AllocationMode::Direct))
    }

    /// Freeze a filled buffer. Releasing it becomes the duty of the last
    /// slice that references it.
    pub fn from_unique(buffer: UniqueBuffer) -> Self {
        if buffer.is_empty() {
            return Self::default();
        }
        Self {
            bytes: Bytes::from_owner(buffer),
        }
    }

    /// Copy `data` into a fresh allocation.
    pub fn copy_from(allocator: &Arc<dyn BufferAllocator>, data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        let mut buffer = UniqueBuffer::new(allocator, data.len());
        buffer.copy_from_slice(data);
        Self::from_unique(buffer)
    }

    /// Wrap storage that is already reference counted.
    pub fn from_bytes(bytes: Bytes) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The bytes, or `None` for an empty slice.
    pub fn data(&self) -> Option<&[u8]> {
        if self.bytes.is_empty() {
            None
        } else {
            Some(&self.bytes[..])
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Drop this reference now; the slice becomes empty.
    pub fn reset(&mut self) {
        self.bytes = Bytes::new();
    }

    /// Move the reference out, leaving this slice empty.
    pub fn take(&mut self) -> MemSlice {
        std::mem::take(self)
    }

    /// A new slice over part of this one, sharing the allocation.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> MemSlice {
        MemSlice {
            bytes: self.bytes.slice(range),
        }
    }

    /// Split off `[0, at)`; this slice keeps `[at, len)`.
    pub fn split_to(&mut self, at: usize) -> MemSlice {
        MemSlice {
            bytes: self.bytes.split_to(at),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Another reference to the same bytes. Only the buffer layer's own
    /// consumers (send buffers) hold shares.
    pub(crate) fn share(&self) -> MemSlice {
        MemSlice {
            bytes: self.bytes.clone(),
        }
    }
}

impl Deref for MemSlice {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for MemSlice {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for MemSlice {
    fn from(v: Vec<u8>) -> Self {
        Self { bytes: Bytes::from(v) }
    }
}

impl From<Bytes> for MemSlice {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl fmt::Debug for MemSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemSlice").field("len", &self.bytes.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SimpleBufferAllocator;

    fn counting() -> (Arc<SimpleBufferAllocator>, Arc<dyn BufferAllocator>) {
        let simple = Arc::new(SimpleBufferAllocator::new());
        let allocator: Arc<dyn BufferAllocator> = simple.clone();
        (simple, allocator)
    }

    #[test]
    fn test_default_is_empty() {
        let slice = MemSlice::default();
        assert!(slice.is_empty());
        assert_eq!(slice.len(), 0);
        assert!(slice.data().is_none());
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let (_, allocator) = counting();
        let mut a = MemSlice::copy_from(&allocator, b"payload");

        let b = a.take();
        assert!(a.is_empty());
        assert!(a.data().is_none());
        assert_eq!(b.len(), 7);
        assert_eq!(b.data(), Some(&b"payload"[..]));
    }

    #[test]
    fn test_exactly_one_release() {
        let (simple, allocator) = counting();
        let mut slice = MemSlice::allocate(&allocator, 32);
        let moved = slice.take();
        drop(slice);
        assert_eq!(simple.stats().releases, 0);
        drop(moved);
        assert_eq!(simple.stats().releases, 1);
    }

    #[test]
    fn test_derived_slices_keep_allocation_alive() {
        let (simple, allocator) = counting();
        let mut whole = MemSlice::copy_from(&allocator, b"0123456789");

        let head = whole.split_to(4);
        let middle = whole.slice(1..3);
        assert_eq!(head.as_slice(), b"0123");
        assert_eq!(whole.as_slice(), b"456789");
        assert_eq!(middle.as_slice(), b"56");

        drop(whole);
        drop(head);
        assert_eq!(simple.stats().releases, 0);
        drop(middle);
        assert_eq!(simple.stats().releases, 1);
    }

    #[test]
    fn test_reset_releases() {
        let (simple, allocator) = counting();
        let mut slice = MemSlice::allocate_direct(&allocator, 3);
        slice.reset();
        assert!(slice.is_empty());
        assert_eq!(simple.stats().outstanding, 0);
    }

    #[test]
    #[should_panic(expected = "nonzero length")]
    fn test_zero_length_allocation_panics() {
        let (_, allocator) = counting();
        let _ = MemSlice::allocate(&allocator, 0);
    }

    #[test]
    fn test_wrap_existing_storage() {
        let from_vec = MemSlice::from(vec![1u8, 2, 3]);
        assert_eq!(&*from_vec, &[1, 2, 3]);
        let from_bytes = MemSlice::from_bytes(Bytes::from_static(b"static"));
        assert_eq!(from_bytes.into_bytes(), Bytes::from_static(b"static"));
    }
}
