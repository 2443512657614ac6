use crate::model::types::{GeneId, TranscriptId};
use crate::types::{RefBlock, Strand};
use serde::{Serialize, Deserialize};

/// Build-time transcript model with absolute exon blocks.
///
/// The query-time representation lives in `TranscriptTable`; this type is
/// what the annotation loader fills in before the table is packed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: TranscriptId,
    pub gene_id: GeneId,
    pub names: Vec<String>,
    pub chr_id: usize,
    pub strand: Strand,
    exons: Vec<RefBlock>,
}

impl Transcript {
    pub fn new(
        id: TranscriptId,
        gene_id: GeneId,
        primary_name: impl Into<String>,
        chr_id: usize,
        strand: Strand,
    ) -> Self {
        Self {
            id,
            gene_id,
            names: vec![primary_name.into()],
            chr_id,
            strand,
            exons: Vec::new(),
        }
    }

    pub fn add_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn primary_name(&self) -> Option<&str> {
        self.names.first().map(|s| s.as_str())
    }

    pub fn add_exon(&mut self, block: RefBlock) {
        self.exons.push(block);
    }

    pub fn exons(&self) -> &[RefBlock] {
        &self.exons
    }

    /// Sort exons by position and drop exact duplicates.
    ///
    /// Overlapping exons are kept as given; the endpoint test stops at the
    /// first exon containing the point so overlaps are harmless.
    pub fn finalize(&mut self) {
        self.exons.sort_by_key(|b| (b.start, b.end));
        self.exons.dedup();
    }

    /// Transcript extent as (first base, last base), both inclusive.
    pub fn span(&self) -> Option<(u32, u32)> {
        let start = self.exons.iter().map(|e| e.start).min()?;
        let last = self.exons.iter().map(|e| e.last()).max()?;
        Some((start, last))
    }

    /// Exons as inclusive `(start, end)` offsets from the transcript start.
    pub fn relative_exons(&self) -> Vec<(u32, u32)> {
        let Some((t0, _)) = self.span() else {
            return Vec::new();
        };
        self.exons
            .iter()
            .map(|e| (e.start - t0, e.last() - t0))
            .collect()
    }
}
