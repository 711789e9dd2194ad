//! Offset to line/column conversion for diagnostics.

use text_size::TextSize;

/// A 1-based line and column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineCol {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
}

impl LineCol {
    /// Creates a new position.
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line start table for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    text: &'src str,
    line_starts: Vec<TextSize>,
}

impl<'src> LineIndex<'src> {
    /// Builds the index.
    pub fn new(text: &'src str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::try_from(offset + 1).unwrap_or_default());
            }
        }
        Self { text, line_starts }
    }

    /// Returns the number of lines.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset to a position. Offsets past the end clamp to
    /// the last position.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(TextSize::of(self.text));
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let start = usize::from(self.line_starts[line]);
        let end = usize::from(offset);
        let column = self
            .text
            .get(start..end)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(end - start);

        LineCol::new(line as u32 + 1, column as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("div hello");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(1, 1));
        assert_eq!(index.line_col(TextSize::from(4)), LineCol::new(1, 5));
    }

    #[test]
    fn test_multiple_lines() {
        let index = LineIndex::new("div\n  p\n  span");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(TextSize::from(6)), LineCol::new(2, 3));
        assert_eq!(index.line_col(TextSize::from(10)), LineCol::new(3, 3));
    }

    #[test]
    fn test_columns_count_characters() {
        let index = LineIndex::new("p é x");
        assert_eq!(index.line_col(TextSize::from(5)), LineCol::new(1, 5));
    }

    #[test]
    fn test_out_of_bounds_clamps() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_col(TextSize::from(99)), LineCol::new(1, 3));
    }
}
