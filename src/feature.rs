use std::collections::BTreeSet;

use crate::model::types::{GeneId, OverlapType};

/// Gene hits of one read for the endpoint feature.
///
/// Holds the genes hit by any alignment of the read, the genes hit by each
/// alignment separately, and the resulting overlap type. Genes are only
/// ever added; the read-level set is the union of the per-alignment sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFeature {
    genes: BTreeSet<GeneId>,
    per_alignment: Vec<BTreeSet<GeneId>>,
    overlap: OverlapType,
}

impl AnnotationFeature {
    /// Empty feature with one slot per alignment of the read.
    pub fn new(n_alignments: usize) -> Self {
        Self {
            genes: BTreeSet::new(),
            per_alignment: vec![BTreeSet::new(); n_alignments],
            overlap: OverlapType::Unassigned,
        }
    }

    /// Record that alignment `alignment` hit `gene`. Repeated calls are no-ops.
    ///
    /// Panics if `alignment` is not below the slot count given to `new`.
    pub fn record(&mut self, alignment: usize, gene: GeneId) {
        self.per_alignment[alignment].insert(gene);
        self.genes.insert(gene);
    }

    /// Set the overlap type from the collected genes.
    pub fn finalize(&mut self) {
        if !self.genes.is_empty() {
            self.overlap = OverlapType::Exonic;
        }
    }

    pub fn genes(&self) -> &BTreeSet<GeneId> {
        &self.genes
    }

    pub fn alignment_genes(&self, alignment: usize) -> Option<&BTreeSet<GeneId>> {
        self.per_alignment.get(alignment)
    }

    pub fn n_alignments(&self) -> usize {
        self.per_alignment.len()
    }

    pub fn overlap_type(&self) -> OverlapType {
        self.overlap
    }

    pub fn is_assigned(&self) -> bool {
        self.overlap == OverlapType::Exonic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fills_both_levels() {
        let mut feat = AnnotationFeature::new(3);
        feat.record(0, 7);
        feat.record(2, 7);
        feat.record(2, 9);
        feat.finalize();

        assert_eq!(feat.genes().iter().copied().collect::<Vec<_>>(), vec![7, 9]);
        assert_eq!(feat.alignment_genes(1).map(|s| s.len()), Some(0));
        assert_eq!(feat.alignment_genes(2).map(|s| s.len()), Some(2));
        assert_eq!(feat.overlap_type(), OverlapType::Exonic);
    }

    #[test]
    fn record_is_idempotent() {
        let mut a = AnnotationFeature::new(1);
        a.record(0, 1);
        let mut b = a.clone();
        b.record(0, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_feature_stays_unassigned() {
        let mut feat = AnnotationFeature::new(2);
        feat.finalize();
        assert!(!feat.is_assigned());
        assert!(feat.genes().is_empty());
        assert_eq!(feat.n_alignments(), 2);
        assert_eq!(feat.alignment_genes(5), None);
    }
}
