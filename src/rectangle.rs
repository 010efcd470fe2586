use std::fmt;

use crate::int_range::IntRange;

/// Axis-aligned rectangle on the jump plane
///
/// The x axis is the 'from' side of a jump and the y axis the 'to' side. Both axes follow the
/// half-open convention of [IntRange].
///
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct Rectangle {
    pub x: IntRange,
    pub y: IntRange,
}

impl Rectangle {
    pub fn new(x: IntRange, y: IntRange) -> Self {
        Self { x, y }
    }

    /// Grow the rectangle by `fuzziness` in every direction
    pub fn expand_by(&mut self, fuzziness: i64) {
        self.x.expand_by(fuzziness);
        self.y.expand_by(fuzziness);
    }

    /// Return true if the rectangles share at least one position on both axes
    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.x.intersect_range(&other.x) && self.y.intersect_range(&other.y)
    }

    pub fn center(&self) -> (i64, i64) {
        (self.x.center(), self.y.center())
    }

    /// Extend to the bounding box of both rectangles
    pub fn merge(&mut self, other: &Rectangle) {
        self.x.merge(&other.x);
        self.y.merge(&other.y);
    }
}

impl fmt::Debug for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}x{:?}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: i64, x1: i64, y0: i64, y1: i64) -> Rectangle {
        Rectangle::new(IntRange::from_pair(x0, x1), IntRange::from_pair(y0, y1))
    }

    #[test]
    fn test_expand_by() {
        let mut r1 = rect(100, 110, 3, 10);
        r1.expand_by(5);
        assert_eq!(r1, rect(95, 115, 0, 15));
    }

    #[test]
    fn test_overlaps() {
        let r1 = rect(100, 110, 500, 510);
        assert!(r1.overlaps(&rect(105, 118, 503, 516)));
        assert!(rect(105, 118, 503, 516).overlaps(&r1));

        // Sharing only one axis, or only an edge, is not an overlap
        assert!(!r1.overlaps(&rect(105, 118, 510, 520)));
        assert!(!r1.overlaps(&rect(110, 120, 500, 510)));
        assert!(!r1.overlaps(&rect(0, 50, 0, 50)));
    }

    #[test]
    fn test_center() {
        assert_eq!(rect(100, 120, 500, 510).center(), (110, 505));
        assert_eq!(rect(0, 1, 7, 8).center(), (0, 7));
    }

    #[test]
    fn test_merge() {
        let mut r1 = rect(100, 110, 500, 510);
        r1.merge(&rect(105, 118, 503, 516));
        assert_eq!(r1, rect(100, 118, 500, 516));
    }
}
