use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::int_range::IntRange;
use crate::jump::STRAND_OFFSET;

/// A unit of parallel sweep work in the doubled (forward + reverse strand) coordinate space
///
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct GenomeSection {
    pub range: IntRange,
}

impl GenomeSection {
    pub fn new(start: i64, size: i64) -> Self {
        Self {
            range: IntRange::from_start_size(start, size),
        }
    }

    pub fn start(&self) -> i64 {
        self.range.start
    }

    pub fn end(&self) -> i64 {
        self.range.end
    }

    pub fn is_reverse_strand(&self) -> bool {
        self.range.start >= STRAND_OFFSET
    }

    /// The section range without its strand offset
    ///
    /// Clusters are only reported by the section whose owned range contains the cluster's
    /// x-axis start, so that clusters seen from two overlapping sections are reported once.
    ///
    pub fn owned_forward_range(&self) -> IntRange {
        if self.is_reverse_strand() {
            IntRange::from_pair(
                self.range.start - STRAND_OFFSET,
                self.range.end - STRAND_OFFSET,
            )
        } else {
            self.range
        }
    }
}

impl fmt::Debug for GenomeSection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let strand = if self.is_reverse_strand() { '-' } else { '+' };
        write!(f, "Section{}{:?}", strand, self.owned_forward_range())
    }
}

/// Partition both strands of the genome into sections of equal size
///
/// Sections alternate between the forward and reverse strand. Section `i` is a pure function of
/// `i`, so sections can be handed out to any number of workers in any order.
///
pub struct GenomeSectionPlanner {
    ref_size: i64,
    section_size: i64,
    next_index: AtomicUsize,
}

impl GenomeSectionPlanner {
    /// # Arguments
    /// * `ref_size` - forward strand length of the reference
    /// * `sections_per_thread` - target number of sections per strand per thread
    /// * `min_section_size` - sections shorter than this are not worth the overlap overhead
    ///
    pub fn new(
        ref_size: i64,
        thread_count: usize,
        sections_per_thread: usize,
        min_section_size: i64,
    ) -> Self {
        let divisor = std::cmp::max(thread_count * sections_per_thread, 1) as i64;
        let section_size = std::cmp::max(std::cmp::max(ref_size / divisor, min_section_size), 1);
        Self {
            ref_size,
            section_size,
            next_index: AtomicUsize::new(0),
        }
    }

    pub fn section_size(&self) -> i64 {
        self.section_size
    }

    /// Total number of sections covering both strands
    pub fn section_count(&self) -> usize {
        if self.ref_size <= 0 {
            0
        } else {
            2 * ((self.ref_size + self.section_size - 1) / self.section_size) as usize
        }
    }

    pub fn section(&self, index: usize) -> GenomeSection {
        let start = (index / 2) as i64 * self.section_size;
        if index % 2 == 0 {
            GenomeSection::new(start, self.section_size)
        } else {
            GenomeSection::new(start + STRAND_OFFSET, self.section_size)
        }
    }

    /// Hand out the next unclaimed section with its index, or None once both strands are covered
    ///
    /// This can be called concurrently from any number of workers.
    ///
    pub fn next_section(&self) -> Option<(usize, GenomeSection)> {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        if index < self.section_count() {
            Some((index, self.section(index)))
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn sections(&self) -> impl Iterator<Item = GenomeSection> + '_ {
        (0..self.section_count()).map(|i| self.section(i))
    }
}
