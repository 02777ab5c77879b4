//! Bounded output retention.

use std::collections::VecDeque;

use super::OutputKind;

/// Default number of bytes retained while no sink is attached.
pub const DEFAULT_BUFFER_LIMIT: usize = 64 * 1024;

/// FIFO of output chunks capped at a byte budget.
///
/// When the budget is exceeded the oldest chunks are dropped. A single chunk
/// larger than the whole budget keeps only its tail.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    chunks: VecDeque<(String, OutputKind)>,
    len: usize,
    limit: usize,
    dropped: usize,
}

impl OutputBuffer {
    /// Create an empty buffer with the given byte limit.
    pub fn new(limit: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            len: 0,
            limit,
            dropped: 0,
        }
    }

    /// Append a chunk, evicting old output if over budget.
    pub fn push(&mut self, text: &str, kind: OutputKind) {
        if text.is_empty() || self.limit == 0 {
            self.dropped += text.len();
            return;
        }

        let text = if text.len() > self.limit {
            let mut start = text.len() - self.limit;
            while !text.is_char_boundary(start) {
                start += 1;
            }
            self.dropped += start;
            &text[start..]
        } else {
            text
        };

        self.len += text.len();
        self.chunks.push_back((text.to_string(), kind));

        while self.len > self.limit {
            match self.chunks.pop_front() {
                Some((old, _)) => {
                    self.len -= old.len();
                    self.dropped += old.len();
                }
                None => break,
            }
        }
    }

    /// Take all buffered chunks, oldest first, and reset the eviction count.
    pub fn drain(&mut self) -> Vec<(String, OutputKind)> {
        self.len = 0;
        self.dropped = 0;
        self.chunks.drain(..).collect()
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// Buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Bytes evicted since the last drain.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LIMIT)
    }
}
