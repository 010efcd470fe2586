//! SV call clusters built from jump evidence
//!

use std::fmt;

use itertools::Itertools;

use crate::int_range::IntRange;
use crate::jump::Jump;
use crate::rectangle::Rectangle;

/// A cluster of jumps believed to support one structural variant
///
/// While the cluster is open in a sweep it is owned by that sweep. After closure it is handed on
/// to refinement, filtering and output.
///
#[derive(Clone)]
pub struct SvCall<'a> {
    /// Bounds of the 'from' side of all supporting jumps
    pub x_axis: IntRange,

    /// Bounds of the 'to' side of all supporting jumps
    pub y_axis: IntRange,

    pub switch_strand: bool,

    /// Number of supporting jumps whose end event has not been processed yet
    pub open_edges: usize,

    pub supporting_jumps: Vec<&'a Jump>,

    pub supporting_read_count: usize,
    pub supporting_nt: u64,

    /// Estimated length of sequence inserted between the two breakends
    pub inserted_size: i64,

    pub coverage: u32,
    pub reference_ambiguity: u32,
}

impl<'a> SvCall<'a> {
    /// Create a single jump cluster with one open edge
    pub fn from_jump(jump: &'a Jump) -> Self {
        let rect = jump.sweep_rect();
        Self {
            x_axis: rect.x,
            y_axis: rect.y,
            switch_strand: jump.switch_strand(),
            open_edges: 1,
            supporting_jumps: vec![jump],
            supporting_read_count: 1,
            supporting_nt: jump.supporting_nt,
            inserted_size: get_jump_inserted_size(jump).unwrap_or(0),
            coverage: 0,
            reference_ambiguity: 1,
        }
    }

    /// Absorb `other` into this cluster
    ///
    /// Bounds become the union of both clusters, supporting jumps are concatenated and open edge
    /// counts are summed.
    ///
    pub fn join(&mut self, other: SvCall<'a>) {
        self.x_axis.merge(&other.x_axis);
        self.y_axis.merge(&other.y_axis);
        self.open_edges += other.open_edges;
        self.supporting_read_count += other.supporting_read_count;
        self.supporting_nt += other.supporting_nt;
        self.supporting_jumps.extend(other.supporting_jumps);
    }

    /// Recompute all summary values from the current supporting jump list
    ///
    /// Bounds are taken from the normal jumps only, unless the cluster is made entirely of tail
    /// jumps, which don't have a reliable 'to' position.
    ///
    pub fn reestimate(&mut self) {
        if self.supporting_jumps.is_empty() {
            return;
        }

        let has_normal_jump = self.supporting_jumps.iter().any(|x| !x.is_tail());
        let mut bounds = self
            .supporting_jumps
            .iter()
            .filter(|x| !has_normal_jump || !x.is_tail())
            .map(|x| x.sweep_rect());
        if let Some(mut rect) = bounds.next() {
            for r in bounds {
                rect.merge(&r);
            }
            self.x_axis = rect.x;
            self.y_axis = rect.y;
        }

        self.supporting_nt = self.supporting_jumps.iter().map(|x| x.supporting_nt).sum();
        self.supporting_read_count = self
            .supporting_jumps
            .iter()
            .map(|x| x.read_id)
            .unique()
            .count();

        let switch_count = self
            .supporting_jumps
            .iter()
            .filter(|x| x.switch_strand())
            .count();
        self.switch_strand = switch_count * 2 > self.supporting_jumps.len();

        let mut inserted_sizes = self
            .supporting_jumps
            .iter()
            .filter_map(|x| get_jump_inserted_size(x))
            .collect::<Vec<_>>();
        self.inserted_size = if inserted_sizes.is_empty() {
            0
        } else {
            inserted_sizes.sort_unstable();
            inserted_sizes[inserted_sizes.len() / 2]
        };
    }

    /// Approximate SV size, either the breakend distance or the inserted sequence size
    pub fn size(&self) -> i64 {
        std::cmp::max(
            (self.x_axis.center() - self.y_axis.center()).abs(),
            self.inserted_size,
        )
    }

    /// Supporting sequence adjusted for the repetitiveness of the reference at the breakends
    pub fn score(&self) -> f64 {
        self.supporting_nt as f64 / std::cmp::max(self.reference_ambiguity, 1) as f64
    }

    /// Bounding rectangle of all supporting jumps
    pub fn rect(&self) -> Rectangle {
        Rectangle::new(self.x_axis, self.y_axis)
    }

    /// Representative breakend positions on the 'from' and 'to' side
    pub fn breakend_positions(&self) -> (i64, i64) {
        self.rect().center()
    }
}

/// Sequence length inserted between the two ends of a normal jump
///
/// Tail jumps have no second end, so they don't contribute.
///
fn get_jump_inserted_size(jump: &Jump) -> Option<i64> {
    if jump.is_tail() {
        None
    } else {
        Some(std::cmp::max(jump.query_distance(), 0))
    }
}

impl fmt::Debug for SvCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SvCall {:?}x{:?}{} jumps: {} reads: {} nt: {} open: {}",
            self.x_axis,
            self.y_axis,
            if self.switch_strand { " switch" } else { "" },
            self.supporting_jumps.len(),
            self.supporting_read_count,
            self.supporting_nt,
            self.open_edges,
        )
    }
}
