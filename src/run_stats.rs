//! Track stats for the whole svsweep run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::call_filters::FilterStats;
use crate::call_svs::RUN_STATS_FILENAME;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ClusterStats {
    pub section_count: usize,

    /// Jumps processed by the coarse sweep of all sections
    ///
    /// Jumps near section boundaries are swept by more than one section, so this can exceed the
    /// jump count of the run.
    pub swept_jump_count: usize,

    pub coarse_cluster_count: usize,
    pub refined_call_count: usize,

    /// Jumps dropped from a call because another jump of the same read supports it
    pub duplicate_read_jumps_removed: usize,
}

impl ClusterStats {
    pub fn merge(&mut self, other: &Self) {
        self.section_count += other.section_count;
        self.swept_jump_count += other.swept_jump_count;
        self.coarse_cluster_count += other.coarse_cluster_count;
        self.refined_call_count += other.refined_call_count;
        self.duplicate_read_jumps_removed += other.duplicate_read_jumps_removed;
    }
}

/// Stats from one section task, or from the merge of many
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct SectionStats {
    pub cluster_stats: ClusterStats,
    pub filter_stats: FilterStats,
    pub output_call_count: usize,
}

impl SectionStats {
    pub fn merge(&mut self, other: &Self) {
        self.cluster_stats.merge(&other.cluster_stats);
        self.filter_stats.merge(&other.filter_stats);
        self.output_call_count += other.output_call_count;
    }
}

#[derive(Deserialize, Serialize)]
pub struct CallRunStats {
    pub run_id: i64,

    #[serde(flatten)]
    pub section_stats: SectionStats,

    pub total_sweep_time_secs: f64,
}

/// Write run_stats structure out in json format
pub fn write_call_run_stats(output_dir: &Utf8Path, run_stats: &CallRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
