//! Exact re-clustering of coarse clusters
//!
//! Coordinate squeezing in the coarse sweep can merge unrelated SVs which share a physical cell.
//! Each coarse cluster is first split into groups of similar insert ratio, and each group is then
//! swept again without any loss of y-axis resolution.
//!

use super::ClusterSettings;
use super::coarse_sweep::{ActiveCluster, ClusterArena, ClusterHandle, NO_CLUSTER};
use crate::jump::Jump;
use crate::sv_call::SvCall;

#[derive(Default)]
pub struct RefineStats {
    pub refined_call_count: usize,

    /// Jumps removed because another jump from the same read supports the same call
    pub duplicate_read_jumps_removed: usize,
}

/// Lossless map of all y-axis boundaries in a jump group onto consecutive cells
struct SquashedIndex {
    values: Vec<i64>,
}

impl SquashedIndex {
    fn new(jumps: &[&Jump]) -> Self {
        let mut values = jumps
            .iter()
            .flat_map(|x| {
                let y = x.sweep_rect().y;
                [y.start, y.end]
            })
            .collect::<Vec<_>>();
        values.sort_unstable();
        values.dedup();
        Self { values }
    }

    /// Cell count, including one trailing cell for degenerate ranges at the last boundary
    fn cell_count(&self) -> usize {
        self.values.len() + 1
    }

    fn index(&self, value: i64) -> usize {
        match self.values.binary_search(&value) {
            Ok(x) => x,
            Err(_) => panic!("Value {value} missing from squashed index"),
        }
    }

    /// Half-open cell range covered by the jump's y-axis
    fn jump_cells(&self, jump: &Jump) -> (usize, usize) {
        let y = jump.sweep_rect().y;
        let start = self.index(y.start);
        let end = self.index(y.end);
        (start, std::cmp::max(end, start + 1))
    }
}

#[derive(Clone, Copy)]
struct Cell {
    handle: ClusterHandle,
    open_jumps: usize,
}

/// Keep only one jump per read, preferring the jump with the smallest query distance
///
/// Returns the number of jumps removed.
///
fn dedup_jumps_by_read(call: &mut SvCall) -> usize {
    let before = call.supporting_jumps.len();
    call.supporting_jumps
        .sort_by_key(|x| (x.read_id, x.query_distance(), x.id));
    call.supporting_jumps.dedup_by_key(|x| x.read_id);
    before - call.supporting_jumps.len()
}

/// Run the exact sweep over one insert ratio group
///
fn exact_sweep<'a>(jumps: &[&'a Jump], calls: &mut Vec<SvCall<'a>>, stats: &mut RefineStats) {
    let squashed = SquashedIndex::new(jumps);
    let mut cells = vec![
        Cell {
            handle: NO_CLUSTER,
            open_jumps: 0,
        };
        squashed.cell_count()
    ];
    let mut arena = ClusterArena::new();

    let mut start_order = jumps.to_vec();
    start_order.sort_by_key(|x| (x.sweep_rect().x.start, x.id));
    let mut end_order = jumps.to_vec();
    end_order.sort_by_key(|x| (x.sweep_rect().x.last(), x.id));

    let mut start_iter = start_order.into_iter().peekable();
    for end_jump in end_order {
        // Ties go to the start event
        while let Some(start_jump) =
            start_iter.next_if(|x| x.sweep_rect().x.start <= end_jump.sweep_rect().x.last())
        {
            let (c0, c1) = squashed.jump_cells(start_jump);
            let mut merged = ActiveCluster {
                call: SvCall::from_jump(start_jump),
                cells: (c0, c1),
            };
            for cell in cells[c0..c1].iter() {
                if cell.open_jumps > 0 && arena.is_active(cell.handle) {
                    let absorbed = arena.take(cell.handle);
                    debug_assert!(merged.call.rect().overlaps(&absorbed.call.rect()));
                    merged.cells.0 = std::cmp::min(merged.cells.0, absorbed.cells.0);
                    merged.cells.1 = std::cmp::max(merged.cells.1, absorbed.cells.1);
                    merged.call.join(absorbed.call);
                }
            }

            let (m0, m1) = merged.cells;
            let handle = arena.insert(merged);
            for cell in cells[c0..c1].iter_mut() {
                cell.open_jumps += 1;
                cell.handle = handle;
            }

            // Open cells of absorbed clusters now belong to the merged cluster
            for cell in cells[m0..m1].iter_mut() {
                if cell.open_jumps > 0 && !arena.is_active(cell.handle) {
                    cell.handle = handle;
                }
            }
        }

        let (c0, c1) = squashed.jump_cells(end_jump);
        let handle = cells[c0].handle;
        assert!(
            cells[c0].open_jumps > 0 && arena.is_active(handle),
            "No open cluster found for end of jump: {end_jump:?}"
        );
        for cell in cells[c0..c1].iter_mut() {
            cell.open_jumps -= 1;
        }

        let cluster = arena.get_mut(handle);
        cluster.call.open_edges -= 1;
        if cluster.call.open_edges == 0 {
            let mut call = arena.take(handle).call;
            stats.duplicate_read_jumps_removed += dedup_jumps_by_read(&mut call);
            call.reestimate();
            stats.refined_call_count += 1;
            calls.push(call);
        }
    }

    assert_eq!(arena.active_count(), 0);
}

/// Split a coarse cluster into refined calls
///
/// The cluster's jumps are grouped by complete linkage on insert ratio. Tail jumps, which sort
/// last, join the final group if its insert ratio covers their remaining query distance.
///
pub fn refine_coarse_cluster<'a>(
    settings: &ClusterSettings,
    coarse_cluster: SvCall<'a>,
    stats: &mut RefineStats,
) -> Vec<SvCall<'a>> {
    let mut jumps = coarse_cluster.supporting_jumps;
    jumps.sort_by_key(|x| (x.insert_ratio(), x.query_distance(), x.id));

    let is_in_group = |first: &Jump, next: &Jump| {
        if next.is_tail() {
            first.insert_ratio() >= next.query_distance()
        } else {
            first.insert_ratio()
                >= next
                    .insert_ratio()
                    .saturating_sub(settings.max_insert_ratio_diff)
        }
    };

    let mut calls = Vec::new();
    let mut i = 0;
    while i < jumps.len() {
        let mut j = i + 1;
        while j < jumps.len() && is_in_group(jumps[i], jumps[j]) {
            j += 1;
        }
        exact_sweep(&jumps[i..j], &mut calls, stats);
        i = j;
    }
    calls
}
