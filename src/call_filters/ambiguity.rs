//! Reference ambiguity sampling around call breakends
//!
//! Ambiguity measures how far the k-mer size needed to make all k-mers around a call unique
//! exceeds the size expected for random sequence. Calls in repetitive sequence get high values,
//! which reduce their score.
//!

use std::collections::HashSet;

use crate::int_range::IntRange;
use crate::reference::{GenomePack, rev_comp};
use crate::sv_call::SvCall;

/// Probability of a random k-mer collision used to find the expected unique k-mer size
const KMER_COLLISION_PROB: f64 = 0.001;

fn are_all_kmers_unique(seqs: &[&[u8]], k: usize) -> bool {
    let mut kmers = HashSet::new();
    for seq in seqs.iter() {
        for kmer in seq.windows(k).filter(|x| !x.contains(&b'N')) {
            if !kmers.insert(kmer) {
                return false;
            }
        }
    }
    true
}

/// Smallest k at which all k-mers of all sequences are unique
///
/// If no such k exists, this is one more than the longest sequence.
///
fn get_min_unique_kmer_size(seqs: &[&[u8]]) -> usize {
    let max_len = seqs.iter().map(|x| x.len()).max().unwrap_or(0);

    // Uniqueness is monotone in k, so binary search for the first unique size
    let mut low = 1;
    let mut high = max_len + 1;
    while low < high {
        let mid = low + (high - low) / 2;
        if are_all_kmers_unique(seqs, mid) {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    low
}

/// Smallest k-mer size at which `kmer_count` random k-mers are expected to be unique with
/// collision probability `collision_prob`
fn get_expected_unique_kmer_size(kmer_count: usize, collision_prob: f64) -> usize {
    let n = kmer_count as f64;
    ((n * n / collision_prob).ln() / 4f64.ln()).ceil() as usize
}

/// Ambiguity of the sequence pair `a` and `b`, this is at least 1
///
pub fn sample_sequence_ambiguity(a: &[u8], b: &[u8], collision_prob: f64) -> u32 {
    if a.is_empty() || b.is_empty() {
        return 1;
    }
    let needed = get_min_unique_kmer_size(&[a, b]) as i64;
    let expected = get_expected_unique_kmer_size(a.len() + b.len(), collision_prob) as i64;
    std::cmp::max(1, needed - expected) as u32
}

/// Get up to `distance` bases of reference sequence directly left or right of `pos`
///
/// Regions never extend past the contig containing `pos`.
///
fn get_region(pack: &GenomePack, pos: i64, left: bool, distance: i64) -> Vec<u8> {
    let size = pack.forward_strand_size();
    if size == 0 {
        return Vec::new();
    }

    // Call bounds can reach past the end of the genome
    let pos = pos.clamp(0, size - 1);
    let contig = pack.contig_bounds(pos);
    let range = if left {
        IntRange::from_pair(std::cmp::max(pos - distance, contig.start), pos)
    } else {
        IntRange::from_pair(pos, std::cmp::min(pos + distance, contig.end))
    };
    pack.extract(&range).to_vec()
}

/// Reference ambiguity of a call
///
/// Sequence is sampled on both sides of both breakends. The 'from' and 'to' samples are paired
/// according to the call's strand orientation, and the ambiguity of the worse pairing is returned.
/// Calls with breakends closer than `distance` get an ambiguity of 1.
///
pub fn get_call_reference_ambiguity(call: &SvCall, pack: &GenomePack, distance: i64) -> u32 {
    let (f, t) = call.breakend_positions();
    if (f - t).abs() <= distance {
        return 1;
    }

    let left_from = get_region(pack, call.x_axis.end, true, distance);
    let right_from = get_region(pack, call.x_axis.start, false, distance);
    let mut left_to = get_region(pack, call.y_axis.end, true, distance);
    let mut right_to = get_region(pack, call.y_axis.start, false, distance);

    let (a, b) = if call.switch_strand {
        left_to = rev_comp(&left_to);
        right_to = rev_comp(&right_to);
        (
            sample_sequence_ambiguity(&left_from, &right_to, KMER_COLLISION_PROB),
            sample_sequence_ambiguity(&right_from, &left_to, KMER_COLLISION_PROB),
        )
    } else {
        (
            sample_sequence_ambiguity(&left_from, &left_to, KMER_COLLISION_PROB),
            sample_sequence_ambiguity(&right_from, &right_to, KMER_COLLISION_PROB),
        )
    };
    std::cmp::max(a, b)
}
