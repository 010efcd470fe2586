mod coarse_sweep;
mod exact_sweep;

use simple_error::SimpleResult;

pub use self::coarse_sweep::coarse_sweep;
pub use self::exact_sweep::refine_coarse_cluster;
use self::exact_sweep::RefineStats;
use crate::cli::{self, defaults};
use crate::genome_section::GenomeSection;
use crate::jump_source::SortedJumpSource;
use crate::run_stats::ClusterStats;
use crate::sv_call::SvCall;

/// Parameters of the coarse and exact sweeps
pub struct ClusterSettings {
    /// Minimum margin added around each section when reading jumps
    pub max_sweep_fuzziness: i64,

    pub squeeze_factor: i64,
    pub center_strip_up: i64,
    pub center_strip_down: i64,

    /// Jumps whose insert ratio differs by more than this are never refined into the same call
    pub max_insert_ratio_diff: i64,
}

impl ClusterSettings {
    pub fn new(settings: &cli::CallSettings) -> Self {
        Self {
            max_sweep_fuzziness: settings.max_sweep_fuzziness,
            squeeze_factor: settings.squeeze_factor,
            center_strip_up: settings.center_strip_up,
            center_strip_down: settings.center_strip_down,
            max_insert_ratio_diff: settings.max_insert_ratio_diff,
        }
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            max_sweep_fuzziness: defaults::MAX_SWEEP_FUZZINESS,
            squeeze_factor: defaults::SQUEEZE_FACTOR,
            center_strip_up: defaults::CENTER_STRIP_UP,
            center_strip_down: defaults::CENTER_STRIP_DOWN,
            max_insert_ratio_diff: defaults::MAX_INSERT_RATIO_DIFF,
        }
    }
}

/// Find all refined SV calls owned by one genome section
///
/// The sweep window extends twice the largest jump extent past the section, so that the far end
/// of every jump overlapping a jump that starts in the owned range is visible.
///
/// # Arguments
/// * `max_from_size` - largest 'from' extent of any jump in the run
///
pub fn cluster_section<'a, S: SortedJumpSource>(
    settings: &ClusterSettings,
    source: &'a S,
    run_id: i64,
    genome_size: i64,
    section: &GenomeSection,
    max_from_size: i64,
) -> SimpleResult<(Vec<SvCall<'a>>, ClusterStats)> {
    let window_margin =
        std::cmp::max(settings.max_sweep_fuzziness, max_from_size).saturating_mul(2);
    let (coarse_clusters, coarse_stats) = coarse_sweep(
        settings,
        source,
        run_id,
        genome_size,
        section,
        window_margin,
    )?;

    let mut refine_stats = RefineStats::default();
    let calls = coarse_clusters
        .into_iter()
        .flat_map(|x| refine_coarse_cluster(settings, x, &mut refine_stats))
        .collect::<Vec<_>>();

    let stats = ClusterStats {
        section_count: 1,
        swept_jump_count: coarse_stats.swept_jump_count,
        coarse_cluster_count: coarse_stats.coarse_cluster_count,
        refined_call_count: refine_stats.refined_call_count,
        duplicate_read_jumps_removed: refine_stats.duplicate_read_jumps_removed,
    };
    Ok((calls, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int_range::IntRange;
    use crate::jump::Jump;
    use crate::jump::test_utils::get_test_jump;
    use crate::jump_source::JumpTable;

    #[test]
    fn test_cluster_section() {
        // Two SVs sharing a squeezed cell: a 30kb deletion and a 30kb deletion with 2kb inserted
        let mut jumps = vec![
            get_test_jump(0, (1000, 1010), (31_000, 31_010)),
            get_test_jump(1, (1005, 1015), (31_005, 31_015)),
        ];
        for id in 2..4 {
            jumps.push(Jump::new(
                id,
                id,
                IntRange::from_pair(1002, 1012),
                IntRange::from_pair(31_200, 31_210),
                true,
                true,
                0,
                2000,
                20,
            ));
        }
        let mut table = JumpTable::default();
        table.insert_run(0, jumps);

        let section = GenomeSection::new(0, 10_000);
        let (calls, stats) = cluster_section(
            &ClusterSettings::default(),
            &table,
            0,
            100_000,
            &section,
            table.max_from_size(0).unwrap(),
        )
        .unwrap();

        assert_eq!(stats.swept_jump_count, 4);
        assert_eq!(stats.coarse_cluster_count, 1);
        assert_eq!(stats.refined_call_count, 2);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|x| x.supporting_jumps.len() == 2));
    }

    #[test]
    fn test_overlap_across_section_boundary() {
        // The first jump starts in section 0 and overlaps the second, which starts in section 1
        // and ends in section 2
        let mut table = JumpTable::default();
        table.insert_run(
            0,
            vec![
                get_test_jump(0, (500, 1500), (3000, 3100)),
                get_test_jump(1, (1400, 2400), (3050, 3150)),
            ],
        );
        let max_from_size = table.max_from_size(0).unwrap();
        assert_eq!(max_from_size, 1000);

        let mut jump_ids = Vec::new();
        for section_index in 0..3 {
            let section = GenomeSection::new(section_index * 1000, 1000);
            let (calls, _) = cluster_section(
                &ClusterSettings::default(),
                &table,
                0,
                100_000,
                &section,
                max_from_size,
            )
            .unwrap();
            if section_index > 0 {
                assert!(calls.is_empty());
            }
            jump_ids.extend(
                calls
                    .iter()
                    .flat_map(|x| x.supporting_jumps.iter().map(|j| j.id)),
            );
        }
        jump_ids.sort();
        assert_eq!(jump_ids, vec![0, 1]);
    }
}
