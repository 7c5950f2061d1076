// Copyright 2023 - 2026 The Gauntlet Authors

//! Locations (line/column) and spans between them in source text.
//!
//! Spans name regions both in original target-language sources and in the
//! rendered instrumented output; compiler diagnostics are mapped back to
//! placements by span containment.

use std::fmt;

use serde::Serialize;

/// A (line, column) position in a source file.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub struct LineColumn {
    /// 1-based line number.
    pub line: usize,

    /// 1-based column, measured in chars.
    pub column: usize,
}

impl LineColumn {
    pub fn new(line: usize, column: usize) -> LineColumn {
        LineColumn { line, column }
    }
}

impl fmt::Debug for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LineColumn({}, {})", self.line, self.column)
    }
}

/// A contiguous text span in a file.
#[derive(Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Span {
    /// The *inclusive* position where the span starts.
    pub start: LineColumn,
    /// The *exclusive* position where the span ends.
    pub end: LineColumn,
}

impl Span {
    pub fn quad(
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    ) -> Self {
        Span {
            start: LineColumn {
                line: start_line,
                column: start_column,
            },
            end: LineColumn {
                line: end_line,
                column: end_column,
            },
        }
    }

    /// A zero-width span at one position.
    pub fn point(line: usize, column: usize) -> Self {
        Span::quad(line, column, line, column)
    }

    /// True if `pos` falls inside this span.
    pub fn contains(&self, pos: LineColumn) -> bool {
        pos >= self.start && pos < self.end
    }

    /// True if `other` is entirely inside this span.
    pub fn encloses(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True if this span is strictly tighter than `other`.
    ///
    /// Used to pick the innermost of several placements that all enclose a
    /// diagnostic position: a later start (or, at equal starts, an earlier
    /// end) means a more deeply nested region.
    pub fn tighter_than(&self, other: &Span) -> bool {
        self.start > other.start || (self.start == other.start && self.end < other.end)
    }

    /// Return the region of a multi-line string that this span covers.
    pub fn extract(&self, s: &str) -> String {
        let mut r = String::new();
        let mut line_no = 1;
        let mut col_no = 1;
        let start = self.start;
        let end = self.end;
        for c in s.chars() {
            if ((line_no == start.line && col_no >= start.column) || line_no > start.line)
                && (line_no < end.line || (line_no == end.line && col_no < end.column))
            {
                r.push(c);
            }
            if c == '\n' {
                line_no += 1;
                if line_no > end.line {
                    break;
                }
                col_no = 1;
            } else if c == '\r' {
                // counts as part of the last column, not a separate column
            } else {
                col_no += 1;
            }
            if line_no == end.line && col_no >= end.column {
                break;
            }
        }
        r
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A concise form, similar to ::quad
        write!(
            f,
            "Span({}, {}, {}, {})",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn debug_forms() {
        let lc = LineColumn { line: 1, column: 2 };
        assert_eq!(format!("{lc:?}"), "LineColumn(1, 2)");
        let span = Span::quad(1, 2, 3, 4);
        assert_eq!(format!("{span:?}"), "Span(1, 2, 3, 4)");
    }

    #[test]
    fn containment() {
        let outer = Span::quad(2, 1, 5, 10);
        let inner = Span::quad(3, 4, 3, 9);
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
        assert!(outer.contains(LineColumn::new(2, 1)));
        assert!(!outer.contains(LineColumn::new(5, 10)));
        assert!(inner.tighter_than(&outer));
        assert!(!outer.tighter_than(&inner));
    }

    #[test]
    fn tighter_at_equal_start() {
        let wide = Span::quad(1, 1, 9, 1);
        let narrow = Span::quad(1, 1, 2, 1);
        assert!(narrow.tighter_than(&wide));
        assert!(!wide.tighter_than(&narrow));
    }

    #[test]
    fn extract_multiline() {
        let source = "fn foo() {\n    wibble();\n}\n//hey!\n";
        let span = Span::quad(1, 10, 3, 2);
        assert_eq!(span.extract(source), "{\n    wibble();\n}");
    }

    #[test]
    fn extract_single_line() {
        let source = "static int BAR = 32;\n";
        let span = Span::quad(1, 18, 1, 20);
        assert_eq!(span.extract(source), "32");
    }

    #[test]
    fn extract_empty_span() {
        let span = Span::quad(1, 1, 1, 1);
        assert_eq!(span.extract("hello"), "");
    }
}
