//! Source spans.
//!
//! A [`SourceSpan`] names the file and 1-based line/column range a piece of
//! syntax came from. Spans are carried on every AST node and surfaced on
//! diagnostics and trace events.

use std::fmt;
use std::sync::Arc;

/// A 1-based line/column range within a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceSpan {
    pub file: Arc<str>,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(file: Arc<str>, start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        SourceSpan {
            file,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A span covering a single point, used for synthetic/zero-width spans.
    pub fn point(file: Arc<str>, line: u32, col: u32) -> Self {
        SourceSpan::new(file, line, col, line, col)
    }

    /// Merge two spans into the smallest span that covers both.
    ///
    /// Assumes both spans share the same file; the earlier span's file wins.
    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        let (start_line, start_col) = if (self.start_line, self.start_col)
            <= (other.start_line, other.start_col)
        {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col)
        {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        SourceSpan {
            file: self.file.clone(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line && self.start_col == self.end_col {
            write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
        } else {
            write!(
                f,
                "{}:{}:{}-{}:{}",
                self.file, self.start_line, self.start_col, self.end_line, self.end_col
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Arc<str> {
        Arc::from("main.a0")
    }

    #[test]
    fn merge_picks_widest_bounds() {
        let a = SourceSpan::new(file(), 2, 5, 2, 10);
        let b = SourceSpan::new(file(), 1, 1, 2, 3);
        let merged = a.merge(&b);
        assert_eq!(merged, SourceSpan::new(file(), 1, 1, 2, 10));
    }

    #[test]
    fn display_point_omits_range() {
        let p = SourceSpan::point(file(), 3, 4);
        assert_eq!(p.to_string(), "main.a0:3:4");
    }
}
