//! Statistical filters and annotation stages applied to refined SV calls
//!

mod ambiguity;

use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use self::ambiguity::get_call_reference_ambiguity;
use crate::cli::{self, defaults};
use crate::reference::GenomePack;
use crate::sv_call::SvCall;

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    EnumCount,
    EnumIter,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    clap::ValueEnum,
    strum::Display,
)]
pub enum FilterStage {
    LowSupportShortCall,
    FuzzyCall,
    DiagonalLine,
    Ambiguity,
    LowScore,
}

/// Call counts before and after one filter stage
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FilterCounts {
    pub kept: usize,
    pub total: usize,
}

impl FilterCounts {
    pub fn eliminated(&self) -> usize {
        self.total - self.kept
    }

    pub fn merge(&mut self, other: &Self) {
        self.kept += other.kept;
        self.total += other.total;
    }
}

#[derive(Clone, Default, Deserialize, Serialize)]
pub struct FilterStats {
    pub low_support_short_call: FilterCounts,
    pub fuzzy_call: FilterCounts,
    pub diagonal_line: FilterCounts,
    pub ambiguity: FilterCounts,
    pub low_score: FilterCounts,
}

impl FilterStats {
    pub fn get(&self, stage: FilterStage) -> &FilterCounts {
        match stage {
            FilterStage::LowSupportShortCall => &self.low_support_short_call,
            FilterStage::FuzzyCall => &self.fuzzy_call,
            FilterStage::DiagonalLine => &self.diagonal_line,
            FilterStage::Ambiguity => &self.ambiguity,
            FilterStage::LowScore => &self.low_score,
        }
    }

    fn get_mut(&mut self, stage: FilterStage) -> &mut FilterCounts {
        match stage {
            FilterStage::LowSupportShortCall => &mut self.low_support_short_call,
            FilterStage::FuzzyCall => &mut self.fuzzy_call,
            FilterStage::DiagonalLine => &mut self.diagonal_line,
            FilterStage::Ambiguity => &mut self.ambiguity,
            FilterStage::LowScore => &mut self.low_score,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        for stage in FilterStage::iter() {
            self.get_mut(stage).merge(other.get(stage));
        }
    }

    pub fn log(&self) {
        for stage in FilterStage::iter() {
            let counts = self.get(stage);
            info!(
                "{}: kept {} and eliminated {} elements",
                stage,
                counts.kept,
                counts.eliminated()
            );
        }
    }
}

pub struct FilterSettings {
    /// Short calls are kept only if their score reaches this value
    pub max_supp_nt_short_call: u64,

    /// Calls of at least this size are not subject to the low-support filter. This is also the
    /// breakend distance and flank size used for reference ambiguity sampling.
    pub max_short_call_size: i64,

    pub max_fuzziness: i64,
    pub diagonal_line_ratio: i64,
    pub min_score: f64,
}

impl FilterSettings {
    pub fn new(settings: &cli::CallSettings) -> Self {
        Self {
            max_supp_nt_short_call: settings.max_supp_nt_short_call,
            max_short_call_size: settings.max_short_call_size,
            max_fuzziness: settings.max_fuzziness,
            diagonal_line_ratio: settings.diagonal_line_ratio,
            min_score: settings.min_score,
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            max_supp_nt_short_call: defaults::MAX_SUPP_NT_SHORT_CALL,
            max_short_call_size: defaults::MAX_SHORT_CALL_SIZE,
            max_fuzziness: defaults::MAX_FUZZINESS,
            diagonal_line_ratio: defaults::DIAGONAL_LINE_RATIO,
            min_score: defaults::MIN_SCORE,
        }
    }
}

/// Retain calls matching `keep` and report the counts
fn apply_filter<'a>(
    mut calls: Vec<SvCall<'a>>,
    keep: impl Fn(&SvCall<'a>) -> bool,
) -> (Vec<SvCall<'a>>, FilterCounts) {
    let total = calls.len();
    calls.retain(|x| keep(x));
    let counts = FilterCounts {
        kept: calls.len(),
        total,
    };
    (calls, counts)
}

/// Population variance of `values` around their median
///
/// For an even number of values the median is the mean of the two central values, rounded towards
/// zero. The result is truncated to an integer.
///
fn get_median_variance(mut values: Vec<i128>) -> i128 {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let n = values.len();
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2
    };
    values.iter().map(|x| (median - x) * (median - x)).sum::<i128>() / n as i128
}

/// True if the supporting jumps of `call` are spread along a line parallel to the diagonal
///
/// Jump positions are projected onto both diagonals. Real SVs have support which is tight along
/// `to - from` regardless of its spread along `to + from`.
///
fn is_diagonal_line_call(call: &SvCall, diagonal_line_ratio: i64) -> bool {
    let (diff, sum): (Vec<_>, Vec<_>) = call
        .supporting_jumps
        .iter()
        .map(|x| {
            let from = x.from_pos() as i128;
            let to = x.to_pos() as i128;
            (to - from, to + from)
        })
        .unzip();
    let var_diff = get_median_variance(diff);
    let var_sum = std::cmp::max(get_median_variance(sum), 1);
    var_diff / var_sum >= diagonal_line_ratio as i128
}

/// Check a custom filter stage order
///
/// Stages may be omitted, but not repeated, and the low-score filter requires an earlier
/// ambiguity stage.
///
pub fn check_filter_stage_order(stages: &[FilterStage]) -> SimpleResult<()> {
    if !stages.iter().all_unique() {
        bail!("Filter stage order repeats a stage: {:?}", stages);
    }
    let position = |stage| stages.iter().position(|x| *x == stage);
    if let Some(low_score_pos) = position(FilterStage::LowScore) {
        match position(FilterStage::Ambiguity) {
            Some(ambiguity_pos) if ambiguity_pos < low_score_pos => {}
            _ => {
                bail!(
                    "Filter stage {} must follow stage {}",
                    FilterStage::LowScore,
                    FilterStage::Ambiguity
                );
            }
        }
    }
    Ok(())
}

/// Ordered list of filter and annotation stages applied to each section's refined calls
pub struct CallFilterPipeline {
    settings: FilterSettings,
    stages: Vec<FilterStage>,
}

impl CallFilterPipeline {
    /// Pipeline with all stages in their standard order
    pub fn new(settings: FilterSettings) -> Self {
        Self {
            settings,
            stages: FilterStage::iter().collect(),
        }
    }

    /// Pipeline with a custom stage order, checked by [check_filter_stage_order]
    pub fn with_stages(settings: FilterSettings, stages: Vec<FilterStage>) -> SimpleResult<Self> {
        check_filter_stage_order(&stages)?;
        Ok(Self { settings, stages })
    }

    fn run_stage<'a>(
        &self,
        stage: FilterStage,
        calls: Vec<SvCall<'a>>,
        genome: &GenomePack,
    ) -> (Vec<SvCall<'a>>, FilterCounts) {
        let s = &self.settings;
        match stage {
            FilterStage::LowSupportShortCall => apply_filter(calls, |x| {
                x.score() >= s.max_supp_nt_short_call as f64 || x.size() >= s.max_short_call_size
            }),
            FilterStage::FuzzyCall => apply_filter(calls, |x| {
                x.x_axis.size() <= s.max_fuzziness && x.y_axis.size() <= s.max_fuzziness
            }),
            FilterStage::DiagonalLine => apply_filter(calls, |x| {
                !is_diagonal_line_call(x, s.diagonal_line_ratio)
            }),
            FilterStage::Ambiguity => {
                let mut calls = calls;
                for call in calls.iter_mut() {
                    call.reference_ambiguity =
                        get_call_reference_ambiguity(call, genome, s.max_short_call_size);
                }
                let counts = FilterCounts {
                    kept: calls.len(),
                    total: calls.len(),
                };
                (calls, counts)
            }
            FilterStage::LowScore => apply_filter(calls, |x| {
                x.score() / std::cmp::max(x.coverage, 1) as f64 > s.min_score
            }),
        }
    }

    /// Run all stages over `calls`
    ///
    /// Returns the surviving calls and the counts of every stage.
    ///
    pub fn run<'a>(
        &self,
        mut calls: Vec<SvCall<'a>>,
        genome: &GenomePack,
    ) -> (Vec<SvCall<'a>>, FilterStats) {
        let mut stats = FilterStats::default();
        for &stage in self.stages.iter() {
            let counts;
            (calls, counts) = self.run_stage(stage, calls, genome);
            stats.get_mut(stage).merge(&counts);
        }
        (calls, stats)
    }
}
