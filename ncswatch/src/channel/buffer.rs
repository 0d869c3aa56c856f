//! Output accumulation with tail-only prompt search.
//!
//! Diagnostic commands such as `show controllers fia diagshell` produce
//! hundreds of kilobytes. Prompt detection only ever looks at the last
//! `search_depth` bytes so each chunk costs the same regardless of how much
//! output has piled up.

use regex::bytes::Regex;

/// Default number of trailing bytes searched for a prompt.
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

/// Buffer for accumulating output and searching its tail for patterns.
#[derive(Debug)]
pub struct PatternBuffer {
    buffer: Vec<u8>,
    search_depth: usize,
}

impl PatternBuffer {
    /// Create a new pattern buffer that searches the last `search_depth` bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
        }
    }

    /// Append a chunk, stripping ANSI escape sequences.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        pattern.is_match(&self.buffer[self.tail_start()..])
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn tail_start(&self) -> usize {
        // Snap to a line start so anchored prompt patterns still see `^`
        let floor = self.buffer.len().saturating_sub(self.search_depth);
        if floor == 0 {
            return 0;
        }
        memchr::memrchr(b'\n', &self.buffer[..floor])
            .map(|nl| nl + 1)
            .unwrap_or(floor)
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[1mRP/0/RP0/CPU0:r1#\x1b[0m");
        assert_eq!(buffer.take(), b"RP/0/RP0/CPU0:r1#");
    }

    #[test]
    fn test_prompt_found_after_large_output() {
        let mut buffer = PatternBuffer::new(64);
        for _ in 0..500 {
            buffer.extend(b"Hu0/0/0/1  10.0.0.1  Up  Up  default\n");
        }
        buffer.extend(b"RP/0/RP0/CPU0:r1#");

        let pattern = Regex::new(r"(?m)^[\w./:\-]+#\z").unwrap();
        assert!(buffer.tail_contains(&pattern));
        assert_eq!(buffer.len(), 500 * 37 + 17);
    }

    #[test]
    fn test_match_outside_tail_ignored() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"[xr-vm_node0_1_CPU0:~]$\n");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"\$").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_tail_snaps_to_line_start() {
        let mut buffer = PatternBuffer::new(5);
        buffer.extend(b"output\nRP/0/RP0/CPU0:r1#");

        let pattern = Regex::new(r"(?m)^RP/0/RP0/CPU0:r1#").unwrap();
        assert!(buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::default();
        buffer.extend(b"show version");
        assert_eq!(buffer.take(), b"show version");
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }
}
