use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::defaults::*;
use super::utils::check_required_filename;
use crate::call_filters::{FilterStage, check_filter_stage_order};
use crate::call_svs::SETTINGS_FILENAME;

#[derive(Args, Clone, Deserialize, Serialize)]
pub struct CallSettings {
    /// Directory for all call command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_call_output"))]
    pub output_dir: Utf8PathBuf,

    /// Jump evidence file, in tab-separated format, optionally gzip compressed
    ///
    /// Columns are: run_id, id, read_id, from_start, from_size, to_start, to_size, from_strand,
    /// to_strand, query_from, query_to, supporting_nt and from_is_seed_boundary. Coordinates
    /// refer to the concatenated reference contigs in FASTA order. Lines starting with '#' are
    /// skipped.
    ///
    #[arg(long = "jumps", value_name = "FILE")]
    pub jumps_filename: String,

    /// Genome reference in FASTA format
    #[arg(long = "ref", value_name = "FILE")]
    pub ref_filename: String,

    /// Run id of the jumps to call SVs from. Required if the jump file contains more than one run.
    #[arg(long, value_name = "ID")]
    pub run_id: Option<i64>,

    /// Expected mean sequencing coverage of the sample, used to normalize call scores.
    ///
    /// A value of 0 indicates that coverage is unknown, in which case scores are not normalized.
    ///
    #[arg(long, default_value_t = 0)]
    pub mean_coverage: u32,

    /// Expand every jump rectangle by this amount when loading jumps
    #[arg(hide = true, long, default_value_t = 0)]
    pub min_jump_fuzziness: i64,

    /// Minimum extension of each genome section when reading jumps for the coarse sweep
    #[arg(hide = true, long, default_value_t = MAX_SWEEP_FUZZINESS)]
    pub max_sweep_fuzziness: i64,

    /// Resolution loss factor of the coarse sweep for jumps far from the diagonal
    #[arg(hide = true, long, default_value_t = SQUEEZE_FACTOR)]
    pub squeeze_factor: i64,

    /// Distance above the diagonal swept at full resolution in the coarse sweep
    #[arg(hide = true, long, default_value_t = CENTER_STRIP_UP)]
    pub center_strip_up: i64,

    /// Distance below the diagonal swept at full resolution in the coarse sweep
    #[arg(hide = true, long, default_value_t = CENTER_STRIP_DOWN)]
    pub center_strip_down: i64,

    /// Maximum insert ratio difference of jumps refined into the same call
    #[arg(hide = true, long, default_value_t = MAX_INSERT_RATIO_DIFF)]
    pub max_insert_ratio_diff: i64,

    /// Short calls need at least this much supporting sequence to be kept
    #[arg(hide = true, long, default_value_t = MAX_SUPP_NT_SHORT_CALL)]
    pub max_supp_nt_short_call: u64,

    /// Calls at least this large are never filtered as low-support short calls. This is also the
    /// minimum breakend distance and flank size for reference ambiguity sampling.
    #[arg(hide = true, long, default_value_t = MAX_SHORT_CALL_SIZE)]
    pub max_short_call_size: i64,

    /// Maximum size of either call breakend interval
    #[arg(hide = true, long, default_value_t = MAX_FUZZINESS)]
    pub max_fuzziness: i64,

    /// Calls with supporting jumps spread along a diagonal line at this variance ratio or higher
    /// are filtered
    #[arg(hide = true, long, default_value_t = DIAGONAL_LINE_RATIO)]
    pub diagonal_line_ratio: i64,

    /// Minimum coverage normalized score for a call to be kept
    #[arg(hide = true, long, default_value_t = MIN_SCORE)]
    pub min_score: f64,

    /// Target number of genome sections per strand and thread
    #[arg(hide = true, long, default_value_t = SECTIONS_PER_THREAD)]
    pub sections_per_thread: usize,

    /// Minimum genome section size
    #[arg(hide = true, long, default_value_t = MIN_SECTION_SIZE)]
    pub min_section_size: i64,

    /// Number of calls buffered in each worker before they are written
    #[arg(hide = true, long, default_value_t = SINK_BATCH_SIZE)]
    pub sink_batch_size: usize,

    /// Only process the genome section with this index, printing debug details for it
    #[arg(hide = true, long)]
    pub target_section: Option<usize>,

    /// Comma-separated filter stages to run instead of the standard stage order
    #[arg(hide = true, long, value_enum, value_delimiter = ',')]
    pub filter_stages: Vec<FilterStage>,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from(concatcp!(env!("CARGO_PKG_NAME"), "_call_output")),
            jumps_filename: String::new(),
            ref_filename: String::new(),
            run_id: None,
            mean_coverage: 0,
            min_jump_fuzziness: 0,
            max_sweep_fuzziness: MAX_SWEEP_FUZZINESS,
            squeeze_factor: SQUEEZE_FACTOR,
            center_strip_up: CENTER_STRIP_UP,
            center_strip_down: CENTER_STRIP_DOWN,
            max_insert_ratio_diff: MAX_INSERT_RATIO_DIFF,
            max_supp_nt_short_call: MAX_SUPP_NT_SHORT_CALL,
            max_short_call_size: MAX_SHORT_CALL_SIZE,
            max_fuzziness: MAX_FUZZINESS,
            diagonal_line_ratio: DIAGONAL_LINE_RATIO,
            min_score: MIN_SCORE,
            sections_per_thread: SECTIONS_PER_THREAD,
            min_section_size: MIN_SECTION_SIZE,
            sink_batch_size: SINK_BATCH_SIZE,
            target_section: None,
            filter_stages: Vec::new(),
        }
    }
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_call_settings(settings: CallSettings) -> SimpleResult<CallSettings> {
    check_required_filename(&settings.jumps_filename, "jump evidence")?;

    check_required_filename(&settings.ref_filename, "reference")?;

    if settings.min_jump_fuzziness < 0 {
        bail!("--min-jump-fuzziness argument must not be negative");
    }

    if settings.max_sweep_fuzziness < 0 {
        bail!("--max-sweep-fuzziness argument must not be negative");
    }

    if settings.squeeze_factor <= 0 {
        bail!("--squeeze-factor argument must be greater than 0");
    }

    if settings.center_strip_up < 0 || settings.center_strip_down < 0 {
        bail!("--center-strip-up and --center-strip-down arguments must not be negative");
    }

    if settings.max_insert_ratio_diff < 0 {
        bail!("--max-insert-ratio-diff argument must not be negative");
    }

    if settings.max_short_call_size < 0 || settings.max_fuzziness < 0 {
        bail!("--max-short-call-size and --max-fuzziness arguments must not be negative");
    }

    if !settings.min_score.is_finite() {
        bail!("--min-score argument must be a finite number");
    }

    if settings.sections_per_thread == 0 {
        bail!("--sections-per-thread argument must be greater than 0");
    }

    if settings.min_section_size <= 0 {
        bail!("--min-section-size argument must be greater than 0");
    }

    if settings.sink_batch_size == 0 {
        bail!("--sink-batch-size argument must be greater than 0");
    }

    if !settings.filter_stages.is_empty() {
        check_filter_stage_order(&settings.filter_stages)?;
    }

    Ok(settings)
}

/// Write call settings out in json format
pub fn write_call_settings(output_dir: &Utf8Path, settings: &CallSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing call settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create call settings json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write call settings json file: '{filename}'"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_settings(dir: &Utf8Path) -> CallSettings {
        let jumps_filename = dir.join("jumps.tsv");
        let ref_filename = dir.join("ref.fa");
        std::fs::write(&jumps_filename, "").unwrap();
        std::fs::write(&ref_filename, ">chr1\nACGT\n").unwrap();
        CallSettings {
            jumps_filename: jumps_filename.to_string(),
            ref_filename: ref_filename.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_call_settings() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();

        assert!(validate_and_fix_call_settings(get_test_settings(dir)).is_ok());

        let mut settings = get_test_settings(dir);
        settings.squeeze_factor = 0;
        assert!(validate_and_fix_call_settings(settings).is_err());

        let mut settings = get_test_settings(dir);
        settings.ref_filename = dir.join("not_there.fa").to_string();
        assert!(validate_and_fix_call_settings(settings).is_err());

        let mut settings = get_test_settings(dir);
        settings.min_score = f64::NAN;
        assert!(validate_and_fix_call_settings(settings).is_err());

        let mut settings = get_test_settings(dir);
        settings.filter_stages = vec![FilterStage::LowScore, FilterStage::Ambiguity];
        assert!(validate_and_fix_call_settings(settings).is_err());

        let mut settings = get_test_settings(dir);
        settings.filter_stages = vec![FilterStage::Ambiguity, FilterStage::LowScore];
        assert!(validate_and_fix_call_settings(settings).is_ok());
    }

    #[test]
    fn test_write_call_settings() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let settings = get_test_settings(dir);
        write_call_settings(dir, &settings);

        let json = std::fs::read_to_string(dir.join(SETTINGS_FILENAME)).unwrap();
        let read_back: CallSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(read_back.squeeze_factor, SQUEEZE_FACTOR);
        assert_eq!(read_back.jumps_filename, settings.jumps_filename);
    }
}
