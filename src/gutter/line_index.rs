use std::ops::Range;

/// Ordered line ranges of a document.
///
/// Every range is half-open and includes its terminating `'\n'`. The ranges
/// are contiguous and together cover `0..text_len`. A document that ends with
/// `'\n'` gets one extra zero-length line at `text_len`, and an empty document
/// has exactly one zero-length line, so a caret resting at the very end of
/// the text always sits on a numbered line.
///
/// The index is rebuilt from scratch on every change. Notes are small enough
/// that a full rescan is cheaper than tracking edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    lines: Vec<Range<usize>>,
    text_len: usize,
}

impl LineIndex {
    pub fn build(text: &str) -> Self {
        let mut lines = Vec::with_capacity(text.len() / 32 + 1);
        let mut start = 0;

        for (newline, _) in text.match_indices('\n') {
            lines.push(start..newline + 1);
            start = newline + 1;
        }
        lines.push(start..text.len());

        Self {
            lines,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[Range<usize>] {
        &self.lines
    }

    /// Zero-based lookup.
    pub fn line(&self, index: usize) -> Option<Range<usize>> {
        self.lines.get(index).cloned()
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    /// True for the zero-length line produced by a trailing `'\n'` (or the
    /// only line of an empty document).
    pub fn is_trailing_synthetic(&self, index: usize) -> bool {
        index + 1 == self.lines.len() && self.lines[index].is_empty()
    }

    /// Zero-based index of the line containing `offset`. Offsets past the end
    /// resolve to the last line.
    pub fn line_at_offset(&self, offset: usize) -> usize {
        let offset = offset.min(self.text_len);
        match self.lines.binary_search_by(|line| {
            if offset < line.start {
                std::cmp::Ordering::Greater
            } else if offset >= line.end {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        }) {
            Ok(index) => index,
            // Only `offset == text_len` misses, which belongs to the last line.
            Err(_) => self.lines.len() - 1,
        }
    }

    /// End of the line's text, excluding its line break.
    pub fn content_end(&self, index: usize, text: &str) -> usize {
        let Some(line) = self.lines.get(index) else {
            return self.text_len;
        };
        if line.end > line.start && text.as_bytes().get(line.end - 1) == Some(&b'\n') {
            line.end - 1
        } else {
            line.end
        }
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::build("")
    }
}
