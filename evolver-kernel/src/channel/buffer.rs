//! Pattern buffer with incremental tail search.
//!
//! Output is accumulated until a prompt matches. Re-scanning the whole
//! buffer after every chunk would be quadratic for long simulation runs, so
//! each search only looks at bytes that arrived since the previous search,
//! plus `search_depth` bytes of overlap so a prompt split across two reads
//! is still found.

use std::ops::Range;

use bytes::{Bytes, BytesMut};

use super::patterns::PromptMatcher;

/// Buffer for accumulating output and searching it for prompts.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated, not yet consumed output.
    buffer: BytesMut,

    /// How many already-scanned bytes to search again after new data arrives.
    search_depth: usize,

    /// Length of the buffer at the last unsuccessful search.
    scanned: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    ///
    /// `search_depth` must exceed the longest prompt that can be split
    /// across reads; 1000 bytes is plenty for Evolver.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            scanned: 0,
        }
    }

    /// Append raw output.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Find the first match of `pattern` that has not been ruled out by an
    /// earlier search. Returned offsets are relative to the whole buffer.
    pub fn find(&mut self, pattern: &dyn PromptMatcher) -> Option<Range<usize>> {
        let start = self.scanned.saturating_sub(self.search_depth);
        match pattern.find_match(&self.buffer[start..]) {
            Some(m) => Some(m.start + start..m.end + start),
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Forget previous searches so the next `find` scans from the start.
    ///
    /// Must be called whenever the pattern being searched for changes.
    pub fn rescan(&mut self) {
        self.scanned = 0;
    }

    /// Consume the buffer through `range.end` and return the bytes before
    /// `range.start`. Anything after the match stays buffered.
    pub fn take_through(&mut self, range: Range<usize>) -> Bytes {
        let mut consumed = self.buffer.split_to(range.end);
        consumed.truncate(range.start);
        self.scanned = 0;
        consumed.freeze()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Bytes {
        self.scanned = 0;
        self.buffer.split().freeze()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
