//! Accumulation buffer for a single command's response.
//!
//! Substring searches only cover the region that new chunks could have
//! completed a match in, so waiting for a marker stays linear in the
//! size of the output even for very large responses.

use super::prompt;

/// Accumulates response chunks and answers completion checks.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    /// The accumulated output.
    text: String,

    /// Length of `text` at the last substring search.
    searched: usize,
}

impl ResponseBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    pub fn extend(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    /// Check whether `needle` occurs in the output.
    ///
    /// Only text appended since the previous call (plus enough overlap to
    /// catch a match straddling two chunks) is searched.
    pub fn contains_new(&mut self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }

        let mut start = self.searched.saturating_sub(needle.len() - 1);
        while !self.text.is_char_boundary(start) {
            start -= 1;
        }
        self.searched = self.text.len();

        self.text[start..].contains(needle)
    }

    /// Search the entire buffer for `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Check whether the output currently ends at a prompt line.
    pub fn ends_with_prompt(&self) -> bool {
        prompt::ends_with_prompt(&self.text)
    }

    /// The last line of output, ignoring trailing whitespace.
    pub fn last_line(&self) -> &str {
        prompt::last_line(&self.text)
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> String {
        self.searched = 0;
        std::mem::take(&mut self.text)
    }

    /// Get the buffer contents.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
