//! Source span and location types for error reporting
//!
//! Spans carry byte offsets plus resolved line/column information so that
//! diagnostics can be printed as `file:line:column`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range in the source, with the 1-indexed line and column
/// of its start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Span {
    /// Create a span from a byte range using a line index
    pub fn from_range(range: std::ops::Range<usize>, index: &LineIndex) -> Self {
        let (line, column) = index.line_col(range.start);
        Self {
            start: range.start,
            end: range.end,
            line,
            column,
        }
    }

    /// Extend this span to cover another one
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Default for Span {
    /// The start of the source
    fn default() -> Self {
        Span {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// Maps byte offsets to 1-indexed line/column pairs
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset at which each line starts
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Resolve a byte offset to a (line, column) pair
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_resolution() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(1), (1, 2));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(6), (3, 1));
        assert_eq!(index.line_col(7), (4, 1));
    }

    #[test]
    fn span_display() {
        let index = LineIndex::new("foo\nbar");
        let span = Span::from_range(4..7, &index);
        assert_eq!(span.to_string(), "2:1");
    }
}
