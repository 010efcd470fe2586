//! Sorted jump evidence access for the sweep passes
//!
//! Both sweeps consume jumps through two forward-only cursors over the same jump set, one ordered
//! by the start sort key and one by the end sort key.
//!

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use log::info;
use simple_error::{SimpleResult, bail, try_with};

use crate::int_range::IntRange;
use crate::jump::{Jump, STRAND_OFFSET};

/// Closed range of sweep sort keys in the doubled coordinate space
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SweepWindow {
    pub start: i64,
    pub end: i64,
}

impl SweepWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }
}

/// Forward-only cursor over jumps in non-decreasing sort key order
pub trait JumpCursor<'a> {
    fn peek(&self) -> Option<&'a Jump>;

    fn advance(&mut self);

    fn has_next(&self) -> bool {
        self.peek().is_some()
    }
}

/// Source of jumps for one run, ordered for the sweep passes
///
/// A windowed start cursor returns all jumps with `sort_pos_start` in the window, and a windowed
/// end cursor all jumps with `sort_pos_end` in the window. With no window all jumps of the run are
/// returned.
///
pub trait SortedJumpSource: Sync {
    type Cursor<'a>: JumpCursor<'a>
    where
        Self: 'a;

    fn start_sorted(
        &self,
        run_id: i64,
        window: Option<SweepWindow>,
    ) -> SimpleResult<Self::Cursor<'_>>;

    fn end_sorted(&self, run_id: i64, window: Option<SweepWindow>)
    -> SimpleResult<Self::Cursor<'_>>;

    /// Largest 'from' side extent of any jump in the run
    ///
    /// A section sweep window must extend past the section by at least this much for every jump
    /// starting in the section to be fully visible.
    ///
    fn max_from_size(&self, run_id: i64) -> SimpleResult<i64>;
}

/// All jumps of one run with both sweep orders
struct JumpRun {
    jumps: Vec<Jump>,
    start_order: Vec<u32>,
    end_order: Vec<u32>,
}

impl JumpRun {
    fn new(jumps: Vec<Jump>) -> Self {
        let mut start_order = (0..jumps.len() as u32).collect::<Vec<_>>();
        start_order.sort_by_key(|&i| (jumps[i as usize].sort_pos_start(), jumps[i as usize].id));
        let mut end_order = (0..jumps.len() as u32).collect::<Vec<_>>();
        end_order.sort_by_key(|&i| (jumps[i as usize].sort_pos_end(), jumps[i as usize].id));
        Self {
            jumps,
            start_order,
            end_order,
        }
    }

    /// Restrict `order` to the entries whose sort key falls in `window`
    fn window_slice<'a>(
        &'a self,
        order: &'a [u32],
        window: Option<SweepWindow>,
        sort_key: impl Fn(&Jump) -> i64,
    ) -> &'a [u32] {
        match window {
            Some(window) => {
                let key = |i: &u32| sort_key(&self.jumps[*i as usize]);
                let begin = order.partition_point(|i| key(i) < window.start);
                let end = order.partition_point(|i| key(i) <= window.end);
                &order[begin..std::cmp::max(begin, end)]
            }
            None => order,
        }
    }
}

pub struct JumpTableCursor<'a> {
    jumps: &'a [Jump],
    order: &'a [u32],
    pos: usize,
}

impl<'a> JumpCursor<'a> for JumpTableCursor<'a> {
    fn peek(&self) -> Option<&'a Jump> {
        self.order.get(self.pos).map(|&i| &self.jumps[i as usize])
    }

    fn advance(&mut self) {
        if self.pos < self.order.len() {
            self.pos += 1;
        }
    }
}

/// In-memory jump store, grouped by run id
#[derive(Default)]
pub struct JumpTable {
    runs: BTreeMap<i64, JumpRun>,
}

impl JumpTable {
    /// Add all jumps of a run, replacing any previous jumps for the same run id
    pub fn insert_run(&mut self, run_id: i64, jumps: Vec<Jump>) {
        self.runs.insert(run_id, JumpRun::new(jumps));
    }

    pub fn run_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.runs.keys().copied()
    }

    pub fn jumps(&self, run_id: i64) -> SimpleResult<&[Jump]> {
        Ok(&self.get_run(run_id)?.jumps)
    }

    fn get_run(&self, run_id: i64) -> SimpleResult<&JumpRun> {
        match self.runs.get(&run_id) {
            Some(x) => Ok(x),
            None => bail!("No jumps found for run id {}", run_id),
        }
    }
}

impl SortedJumpSource for JumpTable {
    type Cursor<'a> = JumpTableCursor<'a>;

    fn start_sorted(
        &self,
        run_id: i64,
        window: Option<SweepWindow>,
    ) -> SimpleResult<JumpTableCursor<'_>> {
        let run = self.get_run(run_id)?;
        Ok(JumpTableCursor {
            jumps: &run.jumps,
            order: run.window_slice(&run.start_order, window, Jump::sort_pos_start),
            pos: 0,
        })
    }

    fn end_sorted(
        &self,
        run_id: i64,
        window: Option<SweepWindow>,
    ) -> SimpleResult<JumpTableCursor<'_>> {
        let run = self.get_run(run_id)?;
        Ok(JumpTableCursor {
            jumps: &run.jumps,
            order: run.window_slice(&run.end_order, window, Jump::sort_pos_end),
            pos: 0,
        })
    }

    fn max_from_size(&self, run_id: i64) -> SimpleResult<i64> {
        Ok(self
            .get_run(run_id)?
            .jumps
            .iter()
            .map(|x| x.sweep_rect().x.size())
            .max()
            .unwrap_or(0))
    }
}

const JUMP_FILE_COLUMN_COUNT: usize = 13;

fn parse_strand(word: &str) -> SimpleResult<bool> {
    match word {
        "+" => Ok(true),
        "-" => Ok(false),
        _ => bail!("Unexpected strand value '{}'", word),
    }
}

fn parse_flag(word: &str) -> SimpleResult<bool> {
    match word {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => bail!("Unexpected boolean value '{}'", word),
    }
}

fn parse_int(word: &str, label: &str) -> SimpleResult<i64> {
    Ok(try_with!(
        word.parse::<i64>(),
        "Can't parse {} value '{}'",
        label,
        word
    ))
}

/// Check that a jump range ends within the forward strand coordinate space
fn check_range_end(start: i64, size: i64, label: &str) -> SimpleResult<()> {
    match start.checked_add(size) {
        Some(end) if end <= STRAND_OFFSET => Ok(()),
        _ => bail!(
            "Jump {} range starting at {} with size {} exceeds the maximum coordinate",
            label,
            start,
            size
        ),
    }
}

/// Parse one jump file line into its run id and jump
///
fn parse_jump_line(line: &str) -> SimpleResult<(i64, Jump)> {
    let words = line.split('\t').collect::<Vec<_>>();
    if words.len() != JUMP_FILE_COLUMN_COUNT {
        bail!(
            "Expected {JUMP_FILE_COLUMN_COUNT} tab-separated columns but found {}",
            words.len()
        );
    }

    let run_id = parse_int(words[0], "run_id")?;
    let id = parse_int(words[1], "id")?;
    let read_id = parse_int(words[2], "read_id")?;
    let from_start = parse_int(words[3], "from_start")?;
    let from_size = parse_int(words[4], "from_size")?;
    let to_start = parse_int(words[5], "to_start")?;
    let from_forward = parse_strand(words[7])?;
    let to_forward = parse_strand(words[8])?;
    let query_from = parse_int(words[9], "query_from")?;
    let query_to = parse_int(words[10], "query_to")?;
    let supporting_nt = parse_int(words[11], "supporting_nt")?;
    let from_is_seed_boundary = parse_flag(words[12])?;

    if from_start < 0 || from_size < 0 || to_start < 0 {
        bail!("Negative jump coordinate");
    }
    if supporting_nt < 0 {
        bail!("Negative supporting_nt value");
    }

    check_range_end(from_start, from_size, "from")?;
    let from = IntRange::from_start_size(from_start, from_size);
    let jump = if from_is_seed_boundary {
        let to_size = parse_int(words[6], "to_size")?;
        if from_size == 0 || to_size <= 0 {
            bail!("Zero or negative size jump rectangle");
        }
        check_range_end(to_start, to_size, "to")?;
        Jump::new(
            id,
            read_id,
            from,
            IntRange::from_start_size(to_start, to_size),
            from_forward,
            to_forward,
            query_from,
            query_to,
            supporting_nt as u64,
        )
    } else {
        check_range_end(to_start, std::cmp::max(from_size, 1), "to")?;
        Jump::new_tail(
            id,
            read_id,
            from,
            to_start,
            from_forward,
            to_forward,
            query_from,
            query_to,
            supporting_nt as u64,
        )
    };
    Ok((run_id, jump))
}

/// Read jumps from a buffered tab-separated stream
///
/// # Arguments
/// * `label` - source name used in error messages
/// * `min_jump_fuzziness` - expansion applied to every normal jump rectangle on load
///
fn read_jump_table_stream(
    reader: impl BufRead,
    label: &str,
    min_jump_fuzziness: i64,
) -> SimpleResult<JumpTable> {
    let mut run_jumps: BTreeMap<i64, Vec<Jump>> = BTreeMap::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line = try_with!(
            line,
            "Failed to read line {} of jump file '{}'",
            line_number,
            label
        );
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (run_id, mut jump) = try_with!(
            parse_jump_line(line),
            "Invalid record on line {} of jump file '{}'",
            line_number,
            label
        );
        jump.expand_by(min_jump_fuzziness);
        run_jumps.entry(run_id).or_default().push(jump);
    }

    let mut table = JumpTable::default();
    for (run_id, jumps) in run_jumps {
        table.insert_run(run_id, jumps);
    }
    Ok(table)
}

/// Read a jump table from a tab-separated file, gzip compressed if the filename ends in '.gz'
///
pub fn read_jump_table(filename: &Utf8Path, min_jump_fuzziness: i64) -> SimpleResult<JumpTable> {
    info!("Reading jump evidence from file '{filename}'");

    let file = try_with!(
        File::open(filename),
        "Unable to open jump file '{}'",
        filename
    );
    let is_gzipped = filename.extension() == Some("gz");
    let table = if is_gzipped {
        read_jump_table_stream(
            BufReader::new(MultiGzDecoder::new(file)),
            filename.as_str(),
            min_jump_fuzziness,
        )?
    } else {
        read_jump_table_stream(BufReader::new(file), filename.as_str(), min_jump_fuzziness)?
    };

    for run_id in table.run_ids() {
        info!(
            "Read {} jumps for run id {run_id}",
            thousands::Separable::separate_with_commas(&table.jumps(run_id)?.len())
        );
    }
    Ok(table)
}
