//! Endpoint classification of reads.
//!
//! For every alignment of a read the configured endpoint is looked up in
//! the transcript table of its chromosome; every transcript that passes the
//! strand and range checks and has an exon containing the endpoint adds its
//! gene to the read's [`AnnotationFeature`].

use crate::error::ClassifyError;
use crate::feature::AnnotationFeature;
use crate::index::EndpointIndex;
use crate::model::types::{ClassifyOptions, EndpointMode, MatePolicy};
use crate::observe::{ClassifyObserver, NoopObserver};
use crate::table::Verdict;
use crate::types::Alignment;

/// Query coordinate of an alignment.
///
/// Returns `Ok(None)` when the mate policy excludes the alignment. An
/// alignment without blocks is rejected before the policy is consulted.
///
/// | mode | forward strand          | reverse strand          |
/// |------|-------------------------|-------------------------|
/// | 5'   | first base of first block | last base of last block |
/// | 3'   | last base of last block | first base of first block |
pub fn select_endpoint(
    aln: &Alignment,
    mode: EndpointMode,
    mates: MatePolicy,
) -> Result<Option<u32>, ClassifyError> {
    let (Some(first), Some(last)) = (aln.blocks.first(), aln.blocks.last()) else {
        return Err(ClassifyError::InvalidAlignment {
            mate: aln.mate,
            chr_id: aln.chr_id,
        });
    };

    if !mates.includes(aln.mate) {
        return Ok(None);
    }

    let pos = match (mode, aln.strand.is_reverse()) {
        (EndpointMode::FivePrime, false) | (EndpointMode::ThreePrime, true) => first.start,
        (EndpointMode::FivePrime, true) | (EndpointMode::ThreePrime, false) => last.last(),
    };
    Ok(Some(pos))
}

/// Classifies reads against a shared index with fixed options.
///
/// Cheap to copy; create one per worker or share it, the index is only read.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    index: &'a EndpointIndex,
    opts: ClassifyOptions,
}

impl<'a> Classifier<'a> {
    pub fn new(index: &'a EndpointIndex, opts: ClassifyOptions) -> Self {
        Self { index, opts }
    }

    /// Classify all alignments of one read.
    pub fn classify(&self, alignments: &[Alignment]) -> Result<AnnotationFeature, ClassifyError> {
        self.classify_with(alignments, &mut NoopObserver)
    }

    /// Same as [`Classifier::classify`], reporting each step to `observer`.
    pub fn classify_with<O>(
        &self,
        alignments: &[Alignment],
        observer: &mut O,
    ) -> Result<AnnotationFeature, ClassifyError>
    where
        O: ClassifyObserver + ?Sized,
    {
        let mut feature = AnnotationFeature::new(alignments.len());

        for (i, aln) in alignments.iter().enumerate() {
            let Some(pos) = select_endpoint(aln, self.opts.endpoint, self.opts.mates)? else {
                observer.alignment_skipped(i, aln.mate);
                continue;
            };
            observer.endpoint(i, aln.chr_id, pos);

            // chromosome without annotation
            let Some(table) = self.index.table(aln.chr_id) else {
                continue;
            };

            for row in table.stab(pos) {
                let verdict = table.evaluate(row, pos, aln.strand, self.opts.strand);
                observer.candidate(i, row, verdict);
                if let Verdict::Exonic(gene) = verdict {
                    feature.record(i, gene);
                }
            }
        }

        feature.finalize();
        observer.read_done(&feature);
        Ok(feature)
    }
}
