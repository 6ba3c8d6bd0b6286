//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt and
//! trigger patterns, rather than the entire output. For large outputs
//! (e.g., a full running-config) this keeps every read O(search_depth).

use std::ops::Range;

use memchr::memchr;
use regex::bytes::Regex;

/// Buffer for accumulating unprocessed output and searching its tail.
#[derive(Debug)]
pub struct PatternBuffer {
    /// Output not yet consumed by a reaction or a prompt match.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// The returned range is in absolute buffer offsets.
    pub fn find_in_tail(&self, pattern: &Regex) -> Option<Range<usize>> {
        let start = self.tail_start();
        pattern
            .find(&self.buffer[start..])
            .map(|m| (start + m.start())..(start + m.end()))
    }

    /// Offset just past the line feed ending the line that contains `pos`,
    /// or the buffer length if that line is still incomplete.
    pub fn line_end(&self, pos: usize) -> usize {
        let pos = pos.min(self.buffer.len());
        memchr(b'\n', &self.buffer[pos..]).map_or(self.buffer.len(), |i| pos + i + 1)
    }

    /// Remove and return everything up to `end`.
    pub fn drain_to(&mut self, end: usize) -> Vec<u8> {
        let end = end.min(self.buffer.len());
        self.buffer.drain(..end).collect()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Get the search depth setting.
    pub fn search_depth(&self) -> usize {
        self.search_depth
    }

    fn tail_start(&self) -> usize {
        self.buffer.len().saturating_sub(self.search_depth)
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_str_lossy(), "Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mswitch#\x1b[0m");
        assert_eq!(buffer.as_str_lossy(), "switch#");
    }

    #[test]
    fn test_tail_search_offsets_are_absolute() {
        let mut buffer = PatternBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nswitch#");

        let pattern = Regex::new(r"switch#").unwrap();
        assert_eq!(buffer.find_in_tail(&pattern), Some(101..108));
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"switch#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"switch#").unwrap();
        assert!(buffer.find_in_tail(&pattern).is_none());
    }

    #[test]
    fn test_drain_to_keeps_remainder() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Continue? (y/n)\nswitch#");
        assert_eq!(buffer.drain_to(15), b"Continue? (y/n)");
        assert_eq!(buffer.as_str_lossy(), "\nswitch#");
        assert_eq!(buffer.take(), b"\nswitch#");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_line_end() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"overwrite (y/n)?[n]\nswitch#");
        assert_eq!(buffer.line_end(10), 20);
        assert_eq!(buffer.line_end(21), buffer.len());
    }
}
