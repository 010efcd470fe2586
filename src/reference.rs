//! Reference genome access in concatenated 'pack' coordinates
//!
//! All contigs are laid end to end in FASTA order, so that any reference position is a single
//! integer. Jump evidence and the sweep passes use these coordinates throughout, and they are
//! only translated back to contig coordinates for output.
//!

use std::fs::File;
use std::io::Read;

use bio::io::fasta;
use log::info;
use unwrap::unwrap;

use crate::int_range::IntRange;
use crate::jump::STRAND_OFFSET;

pub struct ContigInfo {
    pub label: String,

    /// Start of the contig in pack coordinates
    pub offset: i64,

    pub length: i64,
}

#[derive(Default)]
pub struct GenomePack {
    contigs: Vec<ContigInfo>,

    /// Concatenated sequence of all contigs
    seq: Vec<u8>,
}

/// Convert any base other than "ACGTN" to "N"
///
/// Input is expected to be upper-case already.
///
fn simplify_ambiguous_dna_bases(seq: &mut [u8]) {
    let allowed_lut = {
        const TYPE_WIDTH: usize = (u8::MAX as usize) + 1;
        let mut x = [false; TYPE_WIDTH];
        for &c in b"ACGTN".iter() {
            x[c as usize] = true;
        }
        x
    };
    for c in seq.iter_mut().filter(|x| !allowed_lut[**x as usize]) {
        *c = b'N';
    }
}

/// Reverse complement of a simplified DNA sequence
pub fn rev_comp(dna: &[u8]) -> Vec<u8> {
    let comp_base = |x: &u8| -> u8 {
        match *x {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            _ => b'N',
        }
    };

    dna.iter().rev().map(comp_base).collect::<Vec<_>>()
}

impl GenomePack {
    /// Build the pack from (label, sequence) pairs in order
    ///
    /// Sequences are converted to upper-case and simplified to "ACGTN".
    ///
    pub fn from_contigs(contigs: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        let mut pack = GenomePack::default();
        for (label, seq) in contigs {
            let mut seq = seq.to_ascii_uppercase();
            simplify_ambiguous_dna_bases(&mut seq);
            pack.contigs.push(ContigInfo {
                label,
                offset: pack.seq.len() as i64,
                length: seq.len() as i64,
            });
            pack.seq.extend(seq);
        }
        pack
    }

    fn from_fasta_reader(reader: impl Read) -> Self {
        let reader = fasta::Reader::new(reader);
        let contigs = reader.records().map(|result| {
            let record = unwrap!(result, "Error during fasta record parsing");
            (record.id().to_string(), record.seq().to_vec())
        });
        Self::from_contigs(contigs)
    }

    /// Read the reference pack from a FASTA file
    pub fn from_fasta(filename: &str) -> Self {
        info!("Reading reference genome from file '{filename}'");

        let file = unwrap!(
            File::open(filename),
            "Unable to open reference fasta file: '{}'",
            filename,
        );

        let pack = Self::from_fasta_reader(file);
        info!(
            "Read {} reference contigs with total length {}",
            pack.contigs.len(),
            thousands::Separable::separate_with_commas(&pack.forward_strand_size())
        );
        pack
    }

    pub fn forward_strand_size(&self) -> i64 {
        self.seq.len() as i64
    }

    /// Translate a position in the doubled (forward + reverse strand) sweep space to the forward
    /// strand
    pub fn forward_strand_coord(&self, pos: i64) -> i64 {
        if pos >= STRAND_OFFSET {
            pos - STRAND_OFFSET
        } else {
            pos
        }
    }

    pub fn contig_count(&self) -> usize {
        self.contigs.len()
    }

    /// Index of the contig containing `pos`, positions outside of the pack are clamped
    pub fn contig_index(&self, pos: i64) -> usize {
        let count = self.contigs.partition_point(|x| x.offset <= pos);
        count.saturating_sub(1)
    }

    /// Pack coordinate range of the contig containing `pos`
    pub fn contig_bounds(&self, pos: i64) -> IntRange {
        let contig = &self.contigs[self.contig_index(pos)];
        IntRange::from_start_size(contig.offset, contig.length)
    }

    pub fn contig_length(&self, contig_index: usize) -> i64 {
        self.contigs[contig_index].length
    }

    pub fn contig_label(&self, contig_index: usize) -> &str {
        self.contigs[contig_index].label.as_str()
    }

    /// Sequence of `range`, clipped to the pack
    pub fn extract(&self, range: &IntRange) -> &[u8] {
        let size = self.forward_strand_size();
        let start = range.start.clamp(0, size) as usize;
        let end = range.end.clamp(0, size) as usize;
        &self.seq[start..std::cmp::max(start, end)]
    }

    /// Translate a pack coordinate into (contig index, contig position)
    pub fn to_contig_pos(&self, pos: i64) -> (usize, i64) {
        let contig_index = self.contig_index(pos);
        (contig_index, pos - self.contigs[contig_index].offset)
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::get_test_pack;
    use super::*;
    use std::io::{Seek, SeekFrom, Write};

    #[test]
    fn test_from_fasta_reader() {
        let mut file = tempfile::tempfile().unwrap();
        writeln!(file, ">foo desc").unwrap();
        writeln!(file, "ACGTAC").unwrap();
        writeln!(file, "gt").unwrap();
        writeln!(file, ">bar").unwrap();
        writeln!(file, "NNRY").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let pack = GenomePack::from_fasta_reader(file);

        assert_eq!(pack.contig_count(), 2);
        assert_eq!(pack.contig_label(0), "foo");
        assert_eq!(pack.contig_length(0), 8);
        assert_eq!(pack.contig_length(1), 4);
        assert_eq!(pack.forward_strand_size(), 12);
        assert_eq!(pack.extract(&IntRange::from_pair(6, 12)), b"GTNNNN");
    }

    #[test]
    fn test_coordinate_translation() {
        let pack = get_test_pack(&[("chr1", "ACGTACGTAC"), ("chr2", "GGGGG")]);
        assert_eq!(pack.contig_index(0), 0);
        assert_eq!(pack.contig_index(9), 0);
        assert_eq!(pack.contig_index(10), 1);
        assert_eq!(pack.contig_index(100), 1);
        assert_eq!(pack.contig_bounds(12), IntRange::from_pair(10, 15));
        assert_eq!(pack.to_contig_pos(12), (1, 2));
        assert_eq!(pack.forward_strand_coord(STRAND_OFFSET + 12), 12);
        assert_eq!(pack.forward_strand_coord(12), 12);
    }

    #[test]
    fn test_extract_clipping() {
        let pack = get_test_pack(&[("chr1", "ACGTACGTAC")]);
        assert_eq!(pack.extract(&IntRange::from_pair(-5, 2)), b"AC");
        assert_eq!(pack.extract(&IntRange::from_pair(8, 20)), b"AC");
        assert!(pack.extract(&IntRange::from_pair(20, 30)).is_empty());
    }

    #[test]
    fn test_rev_comp() {
        assert_eq!(rev_comp(b"NNATGCG"), b"CGCATNN".to_vec());
    }
}
