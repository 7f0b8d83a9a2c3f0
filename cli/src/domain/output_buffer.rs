//! Bounded text buffer for a component's recent output.

/// Most characters a buffer retains.
pub const MAX_OUTPUT_CHARS: usize = 64_000;

/// Characters dropped from the front per trim step.
pub const TRIM_CHARS: usize = 2048;

/// Append-only text that never exceeds its character bound.
///
/// Before a chunk that would overflow is appended, fixed-size prefixes are
/// dropped until it fits. A chunk at least as large as the bound replaces the
/// contents with its own tail.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    text: String,
    chars: usize,
    max: usize,
    trim: usize,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::with_limits(MAX_OUTPUT_CHARS, TRIM_CHARS)
    }
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer holding at most `max` characters, trimming `trim` at a time.
    #[must_use]
    pub fn with_limits(max: usize, trim: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            max,
            trim: trim.max(1),
        }
    }

    pub fn push(&mut self, chunk: &str) {
        let n = chunk.chars().count();
        if n >= self.max {
            let start = byte_offset(chunk, n - self.max);
            self.text.clear();
            self.text.push_str(&chunk[start..]);
            self.chars = self.max;
            return;
        }
        while self.chars + n > self.max {
            let cut = self.trim.min(self.chars);
            let end = byte_offset(&self.text, cut);
            self.text.drain(..end);
            self.chars -= cut;
        }
        self.text.push_str(chunk);
        self.chars += n;
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// The last `n` lines.
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let lines: Vec<&str> = self.text.lines().collect();
        lines[lines.len().saturating_sub(n)..].to_vec()
    }
}

/// Byte index of the `nth` character of `s`, or its length.
fn byte_offset(s: &str, nth: usize) -> usize {
    s.char_indices().nth(nth).map_or(s.len(), |(i, _)| i)
}
