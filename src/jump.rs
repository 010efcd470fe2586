//! Jump evidence edges between two reference loci
//!

use std::fmt;

use crate::int_range::IntRange;
use crate::rectangle::Rectangle;

/// Offset of the reverse strand in the doubled sweep coordinate space
///
/// Sweep coordinates in `[0, STRAND_OFFSET)` are on the forward strand, and those in
/// `[STRAND_OFFSET, i64::MAX)` on the reverse strand, so that both strands can be swept as one
/// linear domain.
pub const STRAND_OFFSET: i64 = i64::MAX / 2;

/// Reported 'to' size of a tail jump, whose far end is unknown
pub const TAIL_TO_SIZE: i64 = i64::MAX / 4;

/// A jump connects an interval on the 'from' locus with an interval on the 'to' locus
///
/// Jumps are created upstream from read alignment gaps and are read-only through clustering.
/// Clusters refer to jumps by reference and never copy them.
///
#[derive(Clone, PartialEq)]
pub struct Jump {
    pub id: i64,
    pub read_id: i64,
    pub from_start: i64,
    pub from_size: i64,
    pub to_start: i64,
    to_size: i64,
    pub from_forward: bool,
    pub to_forward: bool,
    pub query_from: i64,
    pub query_to: i64,
    pub supporting_nt: u64,

    /// False for tail jumps, whose 'to' end is unknown
    pub from_is_seed_boundary: bool,
}

impl Jump {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        read_id: i64,
        from: IntRange,
        to: IntRange,
        from_forward: bool,
        to_forward: bool,
        query_from: i64,
        query_to: i64,
        supporting_nt: u64,
    ) -> Self {
        Self {
            id,
            read_id,
            from_start: from.start,
            from_size: from.size(),
            to_start: to.start,
            to_size: to.size(),
            from_forward,
            to_forward,
            query_from,
            query_to,
            supporting_nt,
            from_is_seed_boundary: true,
        }
    }

    /// Create a jump from a known 'from' interval into the unknown remainder of the read
    ///
    /// `query_from`..`query_to` spans the part of the read left unaligned past the 'from' locus.
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn new_tail(
        id: i64,
        read_id: i64,
        from: IntRange,
        to_start: i64,
        from_forward: bool,
        to_forward: bool,
        query_from: i64,
        query_to: i64,
        supporting_nt: u64,
    ) -> Self {
        Self {
            id,
            read_id,
            from_start: from.start,
            from_size: from.size(),
            to_start,
            to_size: TAIL_TO_SIZE,
            from_forward,
            to_forward,
            query_from,
            query_to,
            supporting_nt,
            from_is_seed_boundary: false,
        }
    }

    pub fn is_tail(&self) -> bool {
        !self.from_is_seed_boundary
    }

    #[cfg(test)]
    pub fn to_size(&self) -> i64 {
        self.to_size
    }

    pub fn switch_strand(&self) -> bool {
        self.from_forward != self.to_forward
    }

    /// Rectangle used by the coarse and exact sweeps
    ///
    /// Tail jumps have no usable 'to' size, so their 'to' extent is set to their own 'from' size,
    /// turning the line into a square. Degenerate tail axes are widened to a single position.
    ///
    pub fn sweep_rect(&self) -> Rectangle {
        if self.is_tail() {
            let size = std::cmp::max(self.from_size, 1);
            Rectangle::new(
                IntRange::from_start_size(self.from_start, size),
                IntRange::from_start_size(self.to_start, size),
            )
        } else {
            Rectangle::new(
                IntRange::from_start_size(self.from_start, self.from_size),
                IntRange::from_start_size(self.to_start, self.to_size),
            )
        }
    }

    /// Grow both intervals of a normal jump by `fuzziness` to tolerate breakend position noise
    ///
    /// Tail jumps are unchanged.
    ///
    pub fn expand_by(&mut self, fuzziness: i64) {
        if self.is_tail() || fuzziness <= 0 {
            return;
        }
        let mut rect = self.sweep_rect();
        rect.expand_by(fuzziness);
        self.from_start = rect.x.start;
        self.from_size = rect.x.size();
        self.to_start = rect.y.start;
        self.to_size = rect.y.size();
    }

    pub fn strand_offset(&self) -> i64 {
        if self.from_forward { 0 } else { STRAND_OFFSET }
    }

    /// Start event key of the coarse sweep in the doubled coordinate space
    pub fn sort_pos_start(&self) -> i64 {
        self.sweep_rect().x.start + self.strand_offset()
    }

    /// End event key of the coarse sweep in the doubled coordinate space
    pub fn sort_pos_end(&self) -> i64 {
        self.sweep_rect().x.last() + self.strand_offset()
    }

    pub fn from_pos(&self) -> i64 {
        self.sweep_rect().x.center()
    }

    pub fn to_pos(&self) -> i64 {
        self.sweep_rect().y.center()
    }

    /// Distance covered on the read between the two ends of the jump
    ///
    /// For tail jumps this is the distance remaining to the end of the read.
    ///
    pub fn query_distance(&self) -> i64 {
        self.query_to - self.query_from
    }

    /// Approximate inserted (positive) or deleted (negative) sequence length implied by this jump
    ///
    /// Tail jumps sort after all other jumps.
    ///
    pub fn insert_ratio(&self) -> i64 {
        if self.is_tail() {
            i64::MAX
        } else {
            self.query_distance() - (self.to_pos() - self.from_pos())
        }
    }
}

impl fmt::Debug for Jump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Jump {} read {}: {:?}{} -> {}{} q[{}-{}) nt {}{}",
            self.id,
            self.read_id,
            self.sweep_rect().x,
            if self.from_forward { '+' } else { '-' },
            self.to_start,
            if self.to_forward { '+' } else { '-' },
            self.query_from,
            self.query_to,
            self.supporting_nt,
            if self.is_tail() { " tail" } else { "" },
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::get_test_jump;
    use super::*;

    #[test]
    fn test_sort_pos() {
        let mut jump = get_test_jump(0, (100, 120), (500, 520));
        assert_eq!(jump.sort_pos_start(), 100);
        assert_eq!(jump.sort_pos_end(), 119);

        jump.from_forward = false;
        assert_eq!(jump.sort_pos_start(), STRAND_OFFSET + 100);
        assert_eq!(jump.sort_pos_end(), STRAND_OFFSET + 119);
        assert!(jump.switch_strand());
    }

    #[test]
    fn test_insert_ratio() {
        // A 400 base deletion with no inserted sequence
        let deletion = get_test_jump(0, (100, 120), (500, 520));
        assert_eq!(deletion.query_distance(), 0);
        assert_eq!(deletion.insert_ratio(), -400);

        // An insertion of 300 bases with no deleted sequence
        let insertion = Jump::new(
            1,
            1,
            IntRange::from_pair(100, 120),
            IntRange::from_pair(100, 120),
            true,
            true,
            50,
            350,
            20,
        );
        assert_eq!(insertion.insert_ratio(), 300);
    }

    #[test]
    fn test_tail_jump() {
        let tail = Jump::new_tail(
            2,
            2,
            IntRange::from_pair(100, 100),
            100,
            true,
            true,
            900,
            1000,
            15,
        );
        assert!(tail.is_tail());
        assert_eq!(tail.to_size(), TAIL_TO_SIZE);
        assert_eq!(tail.insert_ratio(), i64::MAX);
        assert_eq!(tail.query_distance(), 100);

        let rect = tail.sweep_rect();
        assert_eq!(rect.x, IntRange::from_pair(100, 101));
        assert_eq!(rect.y, IntRange::from_pair(100, 101));
        assert_eq!(tail.sort_pos_start(), tail.sort_pos_end());
    }

    #[test]
    fn test_expand_by() {
        let mut jump = get_test_jump(0, (3, 20), (500, 520));
        jump.expand_by(5);
        assert_eq!(jump.sweep_rect().x, IntRange::from_pair(0, 25));
        assert_eq!(jump.sweep_rect().y, IntRange::from_pair(495, 525));
        assert_eq!(jump.to_size(), 30);
    }
}
