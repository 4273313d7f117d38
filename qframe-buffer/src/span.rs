//! Non-owning view over a run of [`MemSlice`]s.

use std::io::IoSlice;

use crate::mem_slice::MemSlice;

/// Borrowed view over one or more slices. Owns nothing, so it is `Copy`.
///
/// Invariant: `num_slices() == 0` iff `is_empty()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemSliceSpan<'a> {
    slices: &'a [MemSlice],
}

impl<'a> MemSliceSpan<'a> {
    pub fn new(slices: &'a [MemSlice]) -> Self {
        Self { slices }
    }

    pub fn from_slice(slice: &'a MemSlice) -> Self {
        Self {
            slices: std::slice::from_ref(slice),
        }
    }

    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Sum of the constituent lengths.
    pub fn total_length(&self) -> usize {
        self.slices.iter().map(MemSlice::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.slices.iter().map(MemSlice::as_slice)
    }

    /// (pointer, length) pairs for a vectored socket write.
    pub fn io_slices(&self) -> Vec<IoSlice<'a>> {
        self.slices
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| IoSlice::new(s.as_slice()))
            .collect()
    }

    /// Hand a reference to every non-empty slice to `consumer`.
    ///
    /// The span keeps nothing; the consumer's references keep the storage
    /// alive after the caller drops the original slices. Returns the number
    /// of bytes handed over.
    pub fn save_mem_slices<F>(&self, mut consumer: F) -> usize
    where
        F: FnMut(MemSlice),
    {
        let mut saved = 0;
        for slice in self.slices.iter().filter(|s| !s.is_empty()) {
            saved += slice.len();
            consumer(slice.share());
        }
        saved
    }
}

impl<'a> From<&'a MemSlice> for MemSliceSpan<'a> {
    fn from(slice: &'a MemSlice) -> Self {
        Self::from_slice(slice)
    }
}

impl<'a> From<&'a [MemSlice]> for MemSliceSpan<'a> {
    fn from(slices: &'a [MemSlice]) -> Self {
        Self::new(slices)
    }
}

impl<'a> IntoIterator for MemSliceSpan<'a> {
    type Item = &'a MemSlice;
    type IntoIter = std::slice::Iter<'a, MemSlice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}
