//! Observation hooks for classification.
//!
//! The classifier reports what it does to a [`ClassifyObserver`]. The
//! default methods do nothing, so the no-op observer adds no cost to the
//! query loop.

use crate::feature::AnnotationFeature;
use crate::table::Verdict;

pub trait ClassifyObserver {
    /// Alignment excluded by the mate policy.
    fn alignment_skipped(&mut self, _alignment: usize, _mate: u8) {}

    /// Query point chosen for an alignment.
    fn endpoint(&mut self, _alignment: usize, _chr_id: usize, _pos: u32) {}

    /// Outcome for one candidate row returned by the stabbing query.
    fn candidate(&mut self, _alignment: usize, _row: usize, _verdict: Verdict) {}

    /// Read fully classified.
    fn read_done(&mut self, _feature: &AnnotationFeature) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ClassifyObserver for NoopObserver {}

/// Totals collected over one or more reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub reads: u64,
    pub assigned_reads: u64,
    pub alignments: u64,
    pub skipped_alignments: u64,
    pub candidates: u64,
    pub strand_rejected: u64,
    pub range_rejected: u64,
    pub intronic: u64,
    pub exonic: u64,
}

impl Counters {
    pub fn merge(&mut self, other: &Counters) {
        self.reads += other.reads;
        self.assigned_reads += other.assigned_reads;
        self.alignments += other.alignments;
        self.skipped_alignments += other.skipped_alignments;
        self.candidates += other.candidates;
        self.strand_rejected += other.strand_rejected;
        self.range_rejected += other.range_rejected;
        self.intronic += other.intronic;
        self.exonic += other.exonic;
    }
}

/// Counts events per worker. Merge the per-worker totals afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountingObserver {
    pub counters: Counters,
}

impl ClassifyObserver for CountingObserver {
    fn alignment_skipped(&mut self, _alignment: usize, _mate: u8) {
        self.counters.skipped_alignments += 1;
    }

    fn endpoint(&mut self, _alignment: usize, _chr_id: usize, _pos: u32) {
        self.counters.alignments += 1;
    }

    fn candidate(&mut self, _alignment: usize, _row: usize, verdict: Verdict) {
        self.counters.candidates += 1;
        match verdict {
            Verdict::StrandMismatch => self.counters.strand_rejected += 1,
            Verdict::OutOfRange => self.counters.range_rejected += 1,
            Verdict::Intronic => self.counters.intronic += 1,
            Verdict::Exonic(_) => self.counters.exonic += 1,
        }
    }

    fn read_done(&mut self, feature: &AnnotationFeature) {
        self.counters.reads += 1;
        if feature.is_assigned() {
            self.counters.assigned_reads += 1;
        }
    }
}

/// Emits every event as a `log::trace!` record tagged with `label`
/// (usually the read id).
#[derive(Debug, Clone, Copy)]
pub struct LogObserver<'a> {
    label: &'a str,
}

impl<'a> LogObserver<'a> {
    pub fn new(label: &'a str) -> Self {
        Self { label }
    }
}

impl ClassifyObserver for LogObserver<'_> {
    fn alignment_skipped(&mut self, alignment: usize, mate: u8) {
        log::trace!("{}: alignment {alignment}: mate {mate} excluded by mate policy", self.label);
    }

    fn endpoint(&mut self, alignment: usize, chr_id: usize, pos: u32) {
        log::trace!("{}: alignment {alignment}: endpoint chr#{chr_id}:{pos}", self.label);
    }

    fn candidate(&mut self, alignment: usize, row: usize, verdict: Verdict) {
        log::trace!("{}: alignment {alignment}: row {row} -> {verdict:?}", self.label);
    }

    fn read_done(&mut self, feature: &AnnotationFeature) {
        log::trace!(
            "{}: {} genes, overlap {}",
            self.label,
            feature.genes().len(),
            feature.overlap_type()
        );
    }
}

impl<T: ClassifyObserver + ?Sized> ClassifyObserver for &mut T {
    fn alignment_skipped(&mut self, alignment: usize, mate: u8) {
        (**self).alignment_skipped(alignment, mate)
    }

    fn endpoint(&mut self, alignment: usize, chr_id: usize, pos: u32) {
        (**self).endpoint(alignment, chr_id, pos)
    }

    fn candidate(&mut self, alignment: usize, row: usize, verdict: Verdict) {
        (**self).candidate(alignment, row, verdict)
    }

    fn read_done(&mut self, feature: &AnnotationFeature) {
        (**self).read_done(feature)
    }
}

/// Feeds every event to both observers.
impl<A: ClassifyObserver, B: ClassifyObserver> ClassifyObserver for (A, B) {
    fn alignment_skipped(&mut self, alignment: usize, mate: u8) {
        self.0.alignment_skipped(alignment, mate);
        self.1.alignment_skipped(alignment, mate);
    }

    fn endpoint(&mut self, alignment: usize, chr_id: usize, pos: u32) {
        self.0.endpoint(alignment, chr_id, pos);
        self.1.endpoint(alignment, chr_id, pos);
    }

    fn candidate(&mut self, alignment: usize, row: usize, verdict: Verdict) {
        self.0.candidate(alignment, row, verdict);
        self.1.candidate(alignment, row, verdict);
    }

    fn read_done(&mut self, feature: &AnnotationFeature) {
        self.0.read_done(feature);
        self.1.read_done(feature);
    }
}
