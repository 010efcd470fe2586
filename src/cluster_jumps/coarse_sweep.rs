//! Coarse clustering of overlapping jump rectangles in one genome section
//!

use simple_error::SimpleResult;

use super::ClusterSettings;
use crate::genome_section::GenomeSection;
use crate::jump::Jump;
use crate::jump_source::{JumpCursor, SortedJumpSource, SweepWindow};
use crate::log_utils::debug_msg;
use crate::squeezed_vector::SqueezedVector;
use crate::sv_call::SvCall;

/// Index of an open cluster in the sweep arena
pub type ClusterHandle = u32;

/// Marks a physical cell without an open cluster
pub const NO_CLUSTER: ClusterHandle = ClusterHandle::MAX;

/// An open cluster and the range of sweep cells it owns
pub(super) struct ActiveCluster<'a> {
    pub call: SvCall<'a>,
    pub cells: (usize, usize),
}

/// Owner of all open clusters in a sweep
///
/// Cells refer to clusters by handle. A cluster absorbed in a join is retired, and any later use
/// of its handle is an error.
///
pub(super) struct ClusterArena<'a> {
    slots: Vec<Option<ActiveCluster<'a>>>,
}

impl<'a> ClusterArena<'a> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn insert(&mut self, cluster: ActiveCluster<'a>) -> ClusterHandle {
        let handle = self.slots.len() as ClusterHandle;
        assert!(handle != NO_CLUSTER, "Cluster arena is full");
        self.slots.push(Some(cluster));
        handle
    }

    pub fn is_active(&self, handle: ClusterHandle) -> bool {
        handle != NO_CLUSTER && self.slots[handle as usize].is_some()
    }

    pub fn get_mut(&mut self, handle: ClusterHandle) -> &mut ActiveCluster<'a> {
        match self.slots[handle as usize].as_mut() {
            Some(x) => x,
            None => panic!("Access to retired cluster handle {handle}"),
        }
    }

    /// Remove the cluster from the arena and retire its handle
    pub fn take(&mut self, handle: ClusterHandle) -> ActiveCluster<'a> {
        match self.slots[handle as usize].take() {
            Some(x) => x,
            None => panic!("Cluster handle {handle} retired twice"),
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|x| x.is_some()).count()
    }
}

#[derive(Default)]
pub struct CoarseSweepStats {
    pub swept_jump_count: usize,
    pub coarse_cluster_count: usize,

    /// Jumps starting in the window but ending past it, left to the next section
    pub deferred_jump_count: usize,
}

/// Inclusive physical cell range of a jump rectangle
///
/// The squeezed index grows with y and shrinks with x, so the lower right corner of the
/// rectangle gives the first cell and the upper left corner the last.
///
fn get_jump_cells(squeezed: &SqueezedVector<ClusterHandle>, jump: &Jump) -> (usize, usize) {
    let rect = jump.sweep_rect();
    let p0 = squeezed.to_physical_coord(rect.x.last(), rect.y.start);
    let p1 = squeezed.to_physical_coord(rect.x.start, rect.y.last());
    (p0, p1)
}

/// The sweep state for one section
struct CoarseSweep<'a> {
    squeezed: SqueezedVector<ClusterHandle>,
    arena: ClusterArena<'a>,
    section: GenomeSection,
    window: SweepWindow,
    clusters: Vec<SvCall<'a>>,
    stats: CoarseSweepStats,
}

impl<'a> CoarseSweep<'a> {
    fn start_jump(&mut self, jump: &'a Jump) {
        // Jumps ending past the window belong to the next section
        if !self.window.contains(jump.sort_pos_end()) {
            self.stats.deferred_jump_count += 1;
            return;
        }
        self.stats.swept_jump_count += 1;

        let (p0, p1) = get_jump_cells(&self.squeezed, jump);
        let mut merged = ActiveCluster {
            call: SvCall::from_jump(jump),
            cells: (p0, p1),
        };

        // Each absorbed cluster is retired on first contact, so the retired check skips any
        // further cells pointing to it
        for p in p0..=p1 {
            let handle = *self.squeezed.get(p);
            if self.arena.is_active(handle) {
                let absorbed = self.arena.take(handle);
                merged.cells.0 = std::cmp::min(merged.cells.0, absorbed.cells.0);
                merged.cells.1 = std::cmp::max(merged.cells.1, absorbed.cells.1);
                merged.call.join(absorbed.call);
            }
        }

        let (c0, c1) = merged.cells;
        let handle = self.arena.insert(merged);
        self.squeezed.fill(c0, c1, handle);
    }

    fn end_jump(&mut self, jump: &'a Jump) {
        // Jumps starting before the window were never opened
        if !self.window.contains(jump.sort_pos_start()) {
            return;
        }

        let (p0, _) = get_jump_cells(&self.squeezed, jump);
        let handle = *self.squeezed.get(p0);
        assert!(
            self.arena.is_active(handle),
            "No open cluster found for end of jump: {jump:?}"
        );

        let cluster = self.arena.get_mut(handle);
        assert!(cluster.call.open_edges > 0);
        cluster.call.open_edges -= 1;
        if cluster.call.open_edges > 0 {
            return;
        }

        let cluster = self.arena.take(handle);
        let (c0, c1) = cluster.cells;
        self.squeezed.fill(c0, c1, NO_CLUSTER);

        if self
            .section
            .owned_forward_range()
            .intersect_pos(cluster.call.x_axis.start)
        {
            self.stats.coarse_cluster_count += 1;
            self.clusters.push(cluster.call);
        }
    }
}

/// Merge all overlapping jump rectangles of one section into coarse clusters
///
/// Jumps are read from `[section.start - window_margin, section.end + window_margin]`. A cluster
/// is reported only by the section owning its x-axis start.
///
/// # Arguments
/// * `genome_size` - forward strand size of the reference
/// * `window_margin` - must be at least the largest jump 'from' extent
///
pub fn coarse_sweep<'a, S: SortedJumpSource>(
    settings: &ClusterSettings,
    source: &'a S,
    run_id: i64,
    genome_size: i64,
    section: &GenomeSection,
    window_margin: i64,
) -> SimpleResult<(Vec<SvCall<'a>>, CoarseSweepStats)> {
    let window = SweepWindow::new(
        std::cmp::max(section.start() - window_margin, 0),
        section.end().saturating_add(window_margin),
    );
    let mut start_cursor = source.start_sorted(run_id, Some(window))?;
    let mut end_cursor = source.end_sorted(run_id, Some(window))?;

    let mut sweep = CoarseSweep {
        squeezed: SqueezedVector::new(
            genome_size,
            settings.squeeze_factor,
            settings.center_strip_up,
            settings.center_strip_down,
            NO_CLUSTER,
        ),
        arena: ClusterArena::new(),
        section: *section,
        window,
        clusters: Vec::new(),
        stats: CoarseSweepStats::default(),
    };

    while let Some(end_jump) = end_cursor.peek() {
        // Ties go to the start event, so single position rectangles open before they close
        match start_cursor.peek() {
            Some(start_jump) if start_jump.sort_pos_start() <= end_jump.sort_pos_end() => {
                sweep.start_jump(start_jump);
                start_cursor.advance();
            }
            _ => {
                sweep.end_jump(end_jump);
                end_cursor.advance();
            }
        }
    }

    // Remaining start events all end past the window
    while start_cursor.has_next() {
        sweep.stats.deferred_jump_count += 1;
        start_cursor.advance();
    }

    assert_eq!(
        sweep.arena.active_count(),
        0,
        "Open clusters left at the end of {section:?}"
    );
    debug_assert!(sweep.squeezed.is_clear(&NO_CLUSTER));

    debug_msg!(
        false,
        "{:?}: swept {} jumps into {} coarse clusters, deferred {} jumps",
        section,
        sweep.stats.swept_jump_count,
        sweep.stats.coarse_cluster_count,
        sweep.stats.deferred_jump_count
    );

    Ok((sweep.clusters, sweep.stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int_range::IntRange;
    use crate::jump::STRAND_OFFSET;
    use crate::jump::test_utils::get_test_jump;
    use crate::jump_source::JumpTable;

    const GENOME_SIZE: i64 = 1_000_000;

    fn get_test_table(jumps: Vec<Jump>) -> JumpTable {
        let mut table = JumpTable::default();
        table.insert_run(0, jumps);
        table
    }

    fn sweep_whole_genome(table: &JumpTable) -> Vec<SvCall<'_>> {
        let section = GenomeSection::new(0, GENOME_SIZE);
        let (clusters, _) = coarse_sweep(
            &ClusterSettings::default(),
            table,
            0,
            GENOME_SIZE,
            &section,
            1000,
        )
        .unwrap();
        clusters
    }

    #[test]
    fn test_single_jump() {
        let table = get_test_table(vec![get_test_jump(0, (100, 120), (500, 520))]);
        let clusters = sweep_whole_genome(&table);
        assert_eq!(clusters.len(), 1);
        let call = &clusters[0];
        assert_eq!(call.x_axis, IntRange::from_pair(100, 120));
        assert_eq!(call.y_axis, IntRange::from_pair(500, 520));
        assert_eq!(call.open_edges, 0);
        assert_eq!(call.supporting_jumps.len(), 1);
    }

    #[test]
    fn test_overlapping_jumps_merge() {
        let table = get_test_table(vec![
            get_test_jump(0, (100, 110), (500, 510)),
            get_test_jump(1, (105, 118), (503, 516)),
        ]);
        let clusters = sweep_whole_genome(&table);
        assert_eq!(clusters.len(), 1);
        let call = &clusters[0];
        assert_eq!(call.x_axis, IntRange::from_pair(100, 118));
        assert_eq!(call.y_axis, IntRange::from_pair(500, 516));
        assert_eq!(call.supporting_jumps.len(), 2);
        assert_eq!(call.open_edges, 0);
    }

    #[test]
    fn test_distant_jumps_stay_apart() {
        let table = get_test_table(vec![
            get_test_jump(0, (100, 120), (500, 520)),
            get_test_jump(1, (100, 120), (50_000, 50_020)),
            get_test_jump(2, (200_000, 200_020), (200_400, 200_420)),
        ]);
        let clusters = sweep_whole_genome(&table);
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(|x| x.supporting_jumps.len() == 1));
    }

    #[test]
    fn test_transitive_merge() {
        // Jumps 0 and 2 don't overlap, but are connected through jump 1
        let table = get_test_table(vec![
            get_test_jump(0, (100, 110), (500, 510)),
            get_test_jump(1, (105, 125), (505, 525)),
            get_test_jump(2, (120, 130), (520, 530)),
        ]);
        let clusters = sweep_whole_genome(&table);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].supporting_jumps.len(), 3);
    }

    #[test]
    fn test_adjacent_jumps_stay_apart() {
        let table = get_test_table(vec![
            get_test_jump(0, (100, 110), (500, 510)),
            get_test_jump(1, (110, 120), (510, 520)),
        ]);
        let clusters = sweep_whole_genome(&table);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_single_position_jump() {
        let tail = Jump::new_tail(
            0,
            0,
            IntRange::from_pair(300, 300),
            300,
            true,
            true,
            0,
            50,
            10,
        );
        let table = get_test_table(vec![tail]);
        let clusters = sweep_whole_genome(&table);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].open_edges, 0);
    }

    #[test]
    fn test_empty_section() {
        let table = get_test_table(vec![get_test_jump(0, (100, 120), (500, 520))]);
        let section = GenomeSection::new(500_000, 1000);
        let (clusters, stats) = coarse_sweep(
            &ClusterSettings::default(),
            &table,
            0,
            GENOME_SIZE,
            &section,
            1000,
        )
        .unwrap();
        assert!(clusters.is_empty());
        assert_eq!(stats.swept_jump_count, 0);
    }

    #[test]
    fn test_deferred_jumps() {
        // The second jump starts in the window but ends past it
        let table = get_test_table(vec![
            get_test_jump(0, (100, 120), (500, 520)),
            get_test_jump(1, (1050, 1200), (1500, 1520)),
        ]);
        let section = GenomeSection::new(0, 1000);
        let (clusters, stats) = coarse_sweep(
            &ClusterSettings::default(),
            &table,
            0,
            GENOME_SIZE,
            &section,
            100,
        )
        .unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(stats.swept_jump_count, 1);
        assert_eq!(stats.deferred_jump_count, 1);
    }

    #[test]
    fn test_no_duplicates_across_sections() {
        // A cluster straddling the boundary between two sections
        let jumps = vec![
            get_test_jump(0, (995, 1005), (1500, 1510)),
            get_test_jump(1, (1000, 1010), (1503, 1513)),
            get_test_jump(2, (1400, 1410), (1800, 1810)),
        ];
        let table = get_test_table(jumps);
        let settings = ClusterSettings::default();

        let mut all_clusters = Vec::new();
        for section in [GenomeSection::new(0, 1000), GenomeSection::new(1000, 1000)] {
            let (clusters, _) =
                coarse_sweep(&settings, &table, 0, GENOME_SIZE, &section, 100).unwrap();
            all_clusters.extend(clusters);
        }
        assert_eq!(all_clusters.len(), 2);

        let mut ids = all_clusters
            .iter()
            .flat_map(|x| x.supporting_jumps.iter().map(|j| j.id))
            .collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_reverse_strand_section() {
        let mut jump = get_test_jump(0, (100, 120), (500, 520));
        jump.from_forward = false;
        let table = get_test_table(vec![jump]);
        let settings = ClusterSettings::default();

        let forward = GenomeSection::new(0, 1000);
        let (clusters, _) =
            coarse_sweep(&settings, &table, 0, GENOME_SIZE, &forward, 100).unwrap();
        assert!(clusters.is_empty());

        let reverse = GenomeSection::new(STRAND_OFFSET, 1000);
        let (clusters, _) =
            coarse_sweep(&settings, &table, 0, GENOME_SIZE, &reverse, 100).unwrap();
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].switch_strand);
    }

    #[test]
    fn test_all_jumps_covered() {
        // Groups of overlapping jumps, some straddling section boundaries
        let mut jumps = Vec::new();
        for g in 0..24 {
            let base = g * 250 + 490;
            let to = base + 400 + g * 37;
            for (k, (offset, size)) in [(0, 20), (10, 20), (15, 10)].into_iter().enumerate() {
                let from = base + offset;
                jumps.push(get_test_jump(
                    g * 3 + k as i64,
                    (from, from + size),
                    (to + offset, to + offset + size),
                ));
            }
        }
        let table = get_test_table(jumps);
        let settings = ClusterSettings::default();

        let mut ids = Vec::new();
        let mut cluster_count = 0;
        for start in (0..7000).step_by(500) {
            let section = GenomeSection::new(start, 500);
            let (clusters, _) =
                coarse_sweep(&settings, &table, 0, GENOME_SIZE, &section, 100).unwrap();
            for call in clusters.iter() {
                assert_eq!(call.open_edges, 0);
                ids.extend(call.supporting_jumps.iter().map(|j| j.id));
            }
            cluster_count += clusters.len();
        }
        assert_eq!(cluster_count, 24);
        ids.sort();
        assert_eq!(ids, (0..72).collect::<Vec<_>>());
    }

    #[test]
    fn test_arena_retire() {
        let jump = get_test_jump(0, (100, 120), (500, 520));
        let mut arena = ClusterArena::new();
        let h = arena.insert(ActiveCluster {
            call: SvCall::from_jump(&jump),
            cells: (0, 1),
        });
        assert!(arena.is_active(h));
        assert!(!arena.is_active(NO_CLUSTER));
        arena.take(h);
        assert!(!arena.is_active(h));
        assert_eq!(arena.active_count(), 0);
    }
}
