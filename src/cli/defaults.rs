//! Default values of the sweep and filter parameters
//!

pub const MAX_SWEEP_FUZZINESS: i64 = 1000;
pub const SQUEEZE_FACTOR: i64 = 5000;
pub const CENTER_STRIP_UP: i64 = 5000;
pub const CENTER_STRIP_DOWN: i64 = 1000;
pub const MAX_INSERT_RATIO_DIFF: i64 = 150;

pub const MAX_SUPP_NT_SHORT_CALL: u64 = 40;
pub const MAX_SHORT_CALL_SIZE: i64 = 100;
pub const MAX_FUZZINESS: i64 = 250;
pub const DIAGONAL_LINE_RATIO: i64 = 300;
pub const MIN_SCORE: f64 = 2.0;

pub const SECTIONS_PER_THREAD: usize = 50;
pub const MIN_SECTION_SIZE: i64 = 500_000;
pub const SINK_BATCH_SIZE: usize = 10_000;
