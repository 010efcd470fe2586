use std::fmt;

use serde::{Deserialize, Serialize};

/// A simple type for integer ranges
///
/// All ranges follow the bed file range convention: 0-indexed, half-closed, [start,end)
///
/// This struct is used instead of the native rust Range type to focus on the operations needed
/// for genomic intervals and the sweep geometry built on top of them.
///
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn from_pair(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn from_start_size(start: i64, size: i64) -> Self {
        Self {
            start,
            end: start + size,
        }
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    pub fn center(&self) -> i64 {
        self.start + self.size() / 2
    }

    /// Last position covered by the range
    ///
    /// For an empty range this is the start position, so that degenerate ranges still map to a
    /// single sweep coordinate.
    ///
    pub fn last(&self) -> i64 {
        std::cmp::max(self.start, self.end - 1)
    }

    /// Return true if pos intersects range (adjacency does not count)
    ///
    pub fn intersect_pos(&self, pos: i64) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Return true if the ranges share at least one position (adjacency does not count)
    ///
    pub fn intersect_range(&self, other: &IntRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Extend this range to the union bounds of both ranges
    ///
    pub fn merge(&mut self, other: &IntRange) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }

    /// Expand the range by `fuzziness` on both sides, without letting start fall below zero
    ///
    pub fn expand_by(&mut self, fuzziness: i64) {
        self.start = std::cmp::max(self.start - fuzziness, 0);
        self.end += fuzziness;
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_range() {
        let r1 = IntRange::from_pair(10, 20);
        assert!(r1.intersect_range(&IntRange::from_pair(19, 25)));
        assert!(r1.intersect_range(&IntRange::from_pair(12, 14)));
        assert!(!r1.intersect_range(&IntRange::from_pair(20, 25)));
        assert!(!r1.intersect_range(&IntRange::from_pair(0, 10)));
    }

    #[test]
    fn test_merge() {
        let mut r1 = IntRange::from_pair(100, 110);
        r1.merge(&IntRange::from_pair(105, 118));
        assert_eq!(r1, IntRange::from_pair(100, 118));

        r1.merge(&IntRange::from_pair(50, 60));
        assert_eq!(r1, IntRange::from_pair(50, 118));
    }

    #[test]
    fn test_expand_by() {
        let mut r1 = IntRange::from_pair(10, 20);
        r1.expand_by(5);
        assert_eq!(r1, IntRange::from_pair(5, 25));

        r1.expand_by(10);
        assert_eq!(r1, IntRange::from_pair(0, 35));
    }

    #[test]
    fn test_center_and_last() {
        let r1 = IntRange::from_pair(100, 120);
        assert_eq!(r1.center(), 110);
        assert_eq!(r1.last(), 119);

        let empty = IntRange::from_start_size(50, 0);
        assert_eq!(empty.last(), 50);
    }
}
