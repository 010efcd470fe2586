//! A bounded physical array over the full jump plane
//!
//! Cells are addressed by the diagonal offset `y - x` of a jump plane coordinate. Offsets close
//! to the diagonal, where nearly all SV evidence is found, get full resolution. All other offsets
//! are compressed by the squeeze factor, so the array size scales with genome size divided by the
//! squeeze factor instead of with the genome size itself.
//!

pub struct SqueezedVector<T> {
    squeeze_factor: i64,
    center_strip_up: i64,
    center_strip_down: i64,

    /// Physical index of diagonal offset `-center_strip_down`
    center_start: i64,

    data: Vec<T>,
}

impl<T: Clone + PartialEq> SqueezedVector<T> {
    /// # Arguments
    /// * `genome_size` - forward strand size of the reference, bounds the diagonal offset
    /// * `empty` - value of unassigned cells
    ///
    pub fn new(
        genome_size: i64,
        squeeze_factor: i64,
        center_strip_up: i64,
        center_strip_down: i64,
        empty: T,
    ) -> Self {
        assert!(squeeze_factor > 0);
        assert!(center_strip_up >= 0 && center_strip_down >= 0);
        let squeezed_cells = (genome_size.max(0) + squeeze_factor - 1) / squeeze_factor + 1;
        let len = 2 * squeezed_cells + center_strip_up + center_strip_down + 1;
        Self {
            squeeze_factor,
            center_strip_up,
            center_strip_down,
            center_start: squeezed_cells,
            data: vec![empty; len as usize],
        }
    }

    /// Translate a jump plane coordinate into a physical index
    ///
    /// For a fixed `x` the index is non-decreasing in `y`, and for a fixed `y` it is
    /// non-increasing in `x`. Coordinates past the genome bounds are clamped to the outermost
    /// cells.
    ///
    pub fn to_physical_coord(&self, x: i64, y: i64) -> usize {
        let d = y.saturating_sub(x);
        let index = if d > self.center_strip_up {
            let strip_end = self.center_start + self.center_strip_down + self.center_strip_up;
            strip_end + 1 + (d - self.center_strip_up - 1) / self.squeeze_factor
        } else if d >= -self.center_strip_down {
            self.center_start + self.center_strip_down + d
        } else {
            self.center_start - 1 - (-self.center_strip_down - 1 - d) / self.squeeze_factor
        };
        index.clamp(0, self.data.len() as i64 - 1) as usize
    }

    pub fn get(&self, index: usize) -> &T {
        &self.data[index]
    }

    /// Assign `value` to the inclusive physical index range `[start, end]`
    pub fn fill(&mut self, start: usize, end: usize, value: T) {
        self.data[start..=end].fill(value);
    }

    /// True if every cell equals `empty`
    pub fn is_clear(&self, empty: &T) -> bool {
        self.data.iter().all(|x| x == empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_vector() -> SqueezedVector<u32> {
        SqueezedVector::new(1_000_000, 100, 500, 200, 0)
    }

    #[test]
    fn test_center_strip_is_exact() {
        let sv = get_test_vector();
        let x = 50_000;
        let base = sv.to_physical_coord(x, x);
        for d in -200..=500 {
            assert_eq!(sv.to_physical_coord(x, x + d) as i64, base as i64 + d);
        }

        // The same diagonal offset maps to the same cell regardless of x
        assert_eq!(sv.to_physical_coord(10, 60), sv.to_physical_coord(900_000, 900_050));
    }

    #[test]
    fn test_squeezed_outside_strip() {
        let sv = get_test_vector();
        let x = 50_000;
        let strip_top = sv.to_physical_coord(x, x + 500);
        assert_eq!(sv.to_physical_coord(x, x + 501), strip_top + 1);
        assert_eq!(sv.to_physical_coord(x, x + 600), strip_top + 1);
        assert_eq!(sv.to_physical_coord(x, x + 601), strip_top + 2);

        let strip_bottom = sv.to_physical_coord(x, x - 200);
        assert_eq!(sv.to_physical_coord(x, x - 201), strip_bottom - 1);
        assert_eq!(sv.to_physical_coord(x, x - 300), strip_bottom - 1);
        assert_eq!(sv.to_physical_coord(x, x - 301), strip_bottom - 2);
    }

    #[test]
    fn test_monotone_and_bounded() {
        let sv = get_test_vector();
        let mut last = 0;
        for y in (0..1_000_000).step_by(997) {
            let p = sv.to_physical_coord(400_000, y);
            assert!(p >= last);
            last = p;
        }
        assert!(sv.to_physical_coord(0, 1_000_000) < sv.data.len() - 1);
        assert!(sv.to_physical_coord(1_000_000, 0) > 0);

        // Out of genome coordinates are clamped
        assert_eq!(sv.to_physical_coord(0, i64::MAX / 2), sv.data.len() - 1);
        assert_eq!(sv.to_physical_coord(i64::MAX / 2, 0), 0);
    }

    #[test]
    fn test_fill_and_clear() {
        let mut sv = get_test_vector();
        assert!(sv.is_clear(&0));
        sv.fill(10, 20, 7);
        assert_eq!(*sv.get(15), 7);
        assert!(!sv.is_clear(&0));
        sv.fill(10, 20, 0);
        assert!(sv.is_clear(&0));
    }
}
