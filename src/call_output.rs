//! Output of SV calls and their supporting jumps
//!
//! Calls are handed from each section task to a shared [CallStore] through a [BufferedCallSink],
//! so that the store lock is only taken once per batch.
//!

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use simple_error::{SimpleResult, try_with};

use crate::call_svs::{CALLS_FILENAME, SUPPORT_FILENAME};
use crate::reference::GenomePack;
use crate::sv_call::SvCall;

/// One end of an output call in contig coordinates
///
/// The end is clipped to the contig holding the start.
///
#[derive(Clone, Debug, PartialEq)]
pub struct CallBreakend {
    pub contig_index: usize,
    pub start: i64,
    pub end: i64,
}

impl CallBreakend {
    fn new(genome: &GenomePack, start: i64, end: i64) -> Self {
        let (contig_index, contig_start) = genome.to_contig_pos(start);
        Self {
            contig_index,
            start: contig_start,
            end: std::cmp::min(
                contig_start + (end - start),
                genome.contig_length(contig_index),
            ),
        }
    }
}

/// Finalized call detached from the jump table, ready for output
#[derive(Clone, Debug)]
pub struct CallRecord {
    pub from: CallBreakend,
    pub to: CallBreakend,
    pub switch_strand: bool,
    pub supporting_read_count: usize,
    pub supporting_nt: u64,
    pub inserted_size: i64,
    pub reference_ambiguity: u32,
    pub score: f64,
    pub supporting_jump_ids: Vec<i64>,
}

impl CallRecord {
    pub fn new(call: &SvCall, genome: &GenomePack) -> Self {
        Self {
            from: CallBreakend::new(genome, call.x_axis.start, call.x_axis.end),
            to: CallBreakend::new(genome, call.y_axis.start, call.y_axis.end),
            switch_strand: call.switch_strand,
            supporting_read_count: call.supporting_read_count,
            supporting_nt: call.supporting_nt,
            inserted_size: call.inserted_size,
            reference_ambiguity: call.reference_ambiguity,
            score: call.score(),
            supporting_jump_ids: call.supporting_jumps.iter().map(|x| x.id).collect(),
        }
    }
}

/// Destination for finalized calls
pub trait CallStore: Send {
    /// Add a call and return its id in the store
    fn insert_call(&mut self, record: &CallRecord) -> SimpleResult<u64>;

    fn insert_support_links(&mut self, call_id: u64, jump_ids: &[i64]) -> SimpleResult<()>;

    /// Make all inserted calls durable
    fn commit(&mut self) -> SimpleResult<()>;
}

/// Call store writing tab-separated call and call support files
pub struct TsvCallStore {
    contig_labels: Vec<String>,
    calls_filename: Utf8PathBuf,
    calls: BufWriter<File>,
    support_filename: Utf8PathBuf,
    support: BufWriter<File>,
    next_call_id: u64,
}

fn create_tsv_file(filename: &Utf8Path, header: &str) -> SimpleResult<BufWriter<File>> {
    let f = try_with!(
        File::create(filename),
        "Unable to create output file: '{}'",
        filename
    );
    let mut f = BufWriter::new(f);
    try_with!(
        writeln!(f, "{}", header),
        "Unable to write output file: '{}'",
        filename
    );
    Ok(f)
}

impl TsvCallStore {
    pub fn new(output_dir: &Utf8Path, genome: &GenomePack) -> SimpleResult<Self> {
        let calls_filename = output_dir.join(CALLS_FILENAME);
        let support_filename = output_dir.join(SUPPORT_FILENAME);

        info!("Writing SV calls to file: '{calls_filename}'");

        let calls = create_tsv_file(
            &calls_filename,
            "#call_id\tfrom_contig\tfrom_start\tfrom_end\tto_contig\tto_start\tto_end\t\
             switch_strand\tsupporting_reads\tsupporting_nt\tinserted_size\treference_ambiguity\tscore",
        )?;
        let support = create_tsv_file(&support_filename, "#call_id\tjump_id")?;

        let contig_labels = (0..genome.contig_count())
            .map(|x| genome.contig_label(x).to_string())
            .collect();

        Ok(Self {
            contig_labels,
            calls_filename,
            calls,
            support_filename,
            support,
            next_call_id: 0,
        })
    }
}

impl CallStore for TsvCallStore {
    fn insert_call(&mut self, record: &CallRecord) -> SimpleResult<u64> {
        let call_id = self.next_call_id;
        self.next_call_id += 1;
        try_with!(
            writeln!(
                self.calls,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.3}",
                call_id,
                self.contig_labels[record.from.contig_index],
                record.from.start,
                record.from.end,
                self.contig_labels[record.to.contig_index],
                record.to.start,
                record.to.end,
                if record.switch_strand { 1 } else { 0 },
                record.supporting_read_count,
                record.supporting_nt,
                record.inserted_size,
                record.reference_ambiguity,
                record.score,
            ),
            "Unable to write SV call file: '{}'",
            self.calls_filename
        );
        Ok(call_id)
    }

    fn insert_support_links(&mut self, call_id: u64, jump_ids: &[i64]) -> SimpleResult<()> {
        for jump_id in jump_ids.iter() {
            try_with!(
                writeln!(self.support, "{}\t{}", call_id, jump_id),
                "Unable to write SV call support file: '{}'",
                self.support_filename
            );
        }
        Ok(())
    }

    fn commit(&mut self) -> SimpleResult<()> {
        try_with!(
            self.calls.flush(),
            "Unable to write SV call file: '{}'",
            self.calls_filename
        );
        try_with!(
            self.support.flush(),
            "Unable to write SV call support file: '{}'",
            self.support_filename
        );
        Ok(())
    }
}

/// Per-task buffer in front of a shared call store
///
/// Buffered calls are written to the store once the batch size is reached, and on [flush](Self::flush).
/// Calls still buffered when the sink is dropped are lost, so each task must finish with a flush.
///
pub struct BufferedCallSink<'s, S: CallStore> {
    store: &'s Mutex<S>,
    batch: Vec<CallRecord>,
    batch_size: usize,
}

impl<'s, S: CallStore> BufferedCallSink<'s, S> {
    pub fn new(store: &'s Mutex<S>, batch_size: usize) -> Self {
        Self {
            store,
            batch: Vec::new(),
            batch_size,
        }
    }

    pub fn push(&mut self, record: CallRecord) -> SimpleResult<()> {
        self.batch.push(record);
        if self.batch.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> SimpleResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let mut store = self.store.lock().unwrap();
        for record in self.batch.drain(..) {
            let call_id = store.insert_call(&record)?;
            store.insert_support_links(call_id, &record.supporting_jump_ids)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::VecCallStore;
    use super::*;
    use crate::jump::test_utils::get_test_jump;
    use crate::reference::test_utils::get_test_pack;

    fn get_test_record(genome: &GenomePack) -> CallRecord {
        let jumps = vec![
            get_test_jump(4, (12, 14), (25, 27)),
            get_test_jump(5, (13, 15), (25, 28)),
        ];
        let mut call = SvCall::from_jump(&jumps[0]);
        call.join(SvCall::from_jump(&jumps[1]));
        call.reestimate();
        CallRecord::new(&call, genome)
    }

    #[test]
    fn test_call_record() {
        let genome = get_test_pack(&[("chr1", "ACGTACGTAC"), ("chr2", "G".repeat(30).as_str())]);
        let record = get_test_record(&genome);
        assert_eq!(
            record.from,
            CallBreakend {
                contig_index: 1,
                start: 2,
                end: 5
            }
        );
        assert_eq!(record.to.start, 15);
        assert_eq!(record.to.end, 18);
        assert_eq!(record.supporting_jump_ids, vec![4, 5]);

        let jump = get_test_jump(6, (8, 14), (36, 45));
        let record = CallRecord::new(&SvCall::from_jump(&jump), &genome);
        assert_eq!(record.from.end, 10);
        assert_eq!(record.to.end, 30);
    }

    #[test]
    fn test_buffered_sink() {
        let genome = get_test_pack(&[("chr1", "ACGTACGTAC"), ("chr2", "G".repeat(30).as_str())]);
        let store = Mutex::new(VecCallStore::default());
        let mut sink = BufferedCallSink::new(&store, 2);

        sink.push(get_test_record(&genome)).unwrap();
        assert!(store.lock().unwrap().calls.is_empty());

        sink.push(get_test_record(&genome)).unwrap();
        assert_eq!(store.lock().unwrap().calls.len(), 2);

        sink.push(get_test_record(&genome)).unwrap();
        sink.flush().unwrap();
        sink.flush().unwrap();

        let store = store.into_inner().unwrap();
        assert_eq!(store.calls.len(), 3);
        assert_eq!(store.support_links.len(), 6);
        assert_eq!(store.support_links[5], (2, 5));
    }

    #[test]
    fn test_tsv_call_store() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();
        let genome = get_test_pack(&[("chr1", "ACGTACGTAC"), ("chr2", "G".repeat(30).as_str())]);

        let mut store = TsvCallStore::new(dir, &genome).unwrap();
        let record = get_test_record(&genome);
        let call_id = store.insert_call(&record).unwrap();
        store
            .insert_support_links(call_id, &record.supporting_jump_ids)
            .unwrap();
        store.commit().unwrap();

        let calls = std::fs::read_to_string(dir.join(CALLS_FILENAME)).unwrap();
        let lines = calls.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#call_id"));
        assert!(lines[1].starts_with("0\tchr2\t2\t5\tchr2\t15\t18\t0\t2\t40\t"));

        let support = std::fs::read_to_string(dir.join(SUPPORT_FILENAME)).unwrap();
        assert_eq!(support, "#call_id\tjump_id\n0\t4\n0\t5\n");
    }
}
