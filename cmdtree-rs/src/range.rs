//! Byte ranges into a command line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte range `[start, end)` into the input text.
///
/// Positions produced by the reader always fall on character boundaries.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// An empty range at `pos`.
    pub const fn at(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn between(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {start} is after end {end}");
        Self { start, end }
    }

    /// The smallest range covering both `a` and `b`.
    pub fn encompassing(a: TextRange, b: TextRange) -> Self {
        Self {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }

    /// Slice `text` by this range, yielding `""` when the range does not fit.
    pub fn get<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encompassing() {
        let range = TextRange::encompassing(TextRange::between(3, 5), TextRange::between(1, 4));
        assert_eq!(range, TextRange::between(1, 5));
    }

    #[test]
    fn test_get_out_of_bounds_is_empty() {
        assert_eq!(TextRange::between(2, 4).get("hello"), "ll");
        assert_eq!(TextRange::between(2, 40).get("hello"), "");
        assert!(TextRange::at(7).is_empty());
    }

    #[test]
    fn test_contains_is_inclusive_of_end() {
        let range = TextRange::between(0, 10);
        assert!(range.contains(0));
        assert!(range.contains(10));
        assert!(!range.contains(11));
    }
}
