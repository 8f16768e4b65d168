use std::mem;

/// Turns raw blocks into units that hold whole lines only.
///
/// The bytes after the last `\n` of a block are kept back and prefixed onto
/// the next unit. Concatenating every unit returned by [`push`](Self::push)
/// and [`finish`](Self::finish) reproduces the input stream exactly.
#[derive(Debug, Default)]
pub struct LineSplitter {
    remainder: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next block in stream order, returning a unit when the block
    /// completes at least one line.
    pub fn push(&mut self, mut block: Vec<u8>) -> Option<Vec<u8>> {
        let Some(last) = memchr::memrchr(b'\n', &block) else {
            self.remainder.extend_from_slice(&block);
            return None;
        };
        let tail = block.split_off(last + 1);
        let unit = if self.remainder.is_empty() {
            block
        } else {
            let mut unit = mem::take(&mut self.remainder);
            unit.extend_from_slice(&block);
            unit
        };
        self.remainder = tail;
        Some(unit)
    }

    /// Flushes a trailing line that never got its terminator.
    pub fn finish(self) -> Option<Vec<u8>> {
        if self.remainder.is_empty() {
            None
        } else {
            Some(self.remainder)
        }
    }
}
