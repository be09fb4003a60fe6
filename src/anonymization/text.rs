//! Character offset bookkeeping
//!
//! Detections carry character (Unicode scalar) offsets so document adapters
//! can map them onto their own structures. Regex engines report byte offsets;
//! [`TextIndex`] translates between the two.

/// Byte/character offset index over a single text
#[derive(Debug, Clone)]
pub struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of every character boundary, including the final one
    boundaries: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    /// Build an index over `text`
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Indexed text
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Convert a byte offset on a character boundary to a character offset
    pub fn char_offset(&self, byte_offset: usize) -> usize {
        match self.boundaries.binary_search(&byte_offset) {
            Ok(idx) => idx,
            // Offsets inside a multi-byte character snap to the next boundary
            Err(idx) => idx,
        }
    }

    /// Convert a character offset to a byte offset, clamped to the text end
    pub fn byte_offset(&self, char_offset: usize) -> usize {
        let idx = char_offset.min(self.char_len());
        self.boundaries[idx]
    }

    /// Slice by half-open character range
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end).max(start);
        &self.text[start..end]
    }

    /// Convert a half-open byte range to a character range
    pub fn char_range(&self, byte_start: usize, byte_end: usize) -> (usize, usize) {
        (self.char_offset(byte_start), self.char_offset(byte_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets_are_identity() {
        let index = TextIndex::new("Contact john@test.com");
        assert_eq!(index.char_len(), 21);
        assert_eq!(index.char_offset(8), 8);
        assert_eq!(index.byte_offset(8), 8);
        assert_eq!(index.slice(8, 21), "john@test.com");
    }

    #[test]
    fn test_multibyte_offsets() {
        let text = "Città: Roma";
        let index = TextIndex::new(text);
        assert_eq!(index.char_len(), 11);
        // "à" is two bytes, so "Roma" starts at byte 8 but character 7
        let byte_start = text.find("Roma").unwrap();
        assert_eq!(byte_start, 8);
        assert_eq!(index.char_offset(byte_start), 7);
        assert_eq!(index.slice(7, 11), "Roma");
    }

    #[test]
    fn test_slice_clamps_to_end() {
        let index = TextIndex::new("abc");
        assert_eq!(index.slice(1, 10), "bc");
        assert_eq!(index.slice(5, 10), "");
    }
}
