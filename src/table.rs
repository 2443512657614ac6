//! Per-chromosome transcript table and the point query over it.
//!
//! Rows are sorted by transcript start. Next to the start and end columns
//! the table keeps a running maximum of the ends, which is what lets a
//! point query walk backwards from the last row starting at or before the
//! point and stop as soon as no earlier row can reach it.
//!
//! Exon coordinates are stored relative to the transcript start and are
//! inclusive on both sides: exon `k` of row `r` covers
//! `[start[r] + rel.0, start[r] + rel.1]`.

use serde::{Serialize, Deserialize};

use crate::error::IndexError;
use crate::model::transcript::Transcript;
use crate::model::types::{GeneId, StrandFilter, TranscriptId};
use crate::types::Strand;

/// One transcript ready to be packed into a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRow {
    pub transcript_id: TranscriptId,
    pub gene_id: GeneId,
    pub strand: Strand,
    /// First base, inclusive.
    pub start: u32,
    /// Last base, inclusive.
    pub end: u32,
    /// Exons relative to `start`, inclusive, in transcript order.
    pub exons: Vec<(u32, u32)>,
}

impl TranscriptRow {
    /// Row for a finalized build-time transcript. `None` if it has no exons.
    pub fn from_transcript(tx: &Transcript) -> Option<Self> {
        let (start, end) = tx.span()?;
        Some(Self {
            transcript_id: tx.id,
            gene_id: tx.gene_id,
            strand: tx.strand,
            start,
            end,
            exons: tx.relative_exons(),
        })
    }
}

/// What happened to one candidate row of a point query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Read orientation does not satisfy the strand filter.
    StrandMismatch,
    /// The point lies outside `[start, end]`.
    OutOfRange,
    /// Inside the transcript span but in none of its exons.
    Intronic,
    /// The point lies in an exon of a transcript of this gene.
    Exonic(GeneId),
}

/// Column-oriented transcript table for one chromosome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTable {
    starts: Vec<u32>,
    ends: Vec<u32>,
    max_ends: Vec<u32>,
    strands: Vec<Strand>,
    gene_ids: Vec<GeneId>,
    transcript_ids: Vec<TranscriptId>,
    exon_offsets: Vec<usize>,
    exon_counts: Vec<usize>,
    exons: Vec<(u32, u32)>,
}

impl TranscriptTable {
    /// Pack rows into a table: sort by start, build the exon table and the
    /// running maximum end, then check the invariants once.
    pub fn from_rows(mut rows: Vec<TranscriptRow>) -> Result<Self, IndexError> {
        rows.sort_by_key(|r| (r.start, r.end, r.transcript_id));

        let n = rows.len();
        let mut table = TranscriptTable {
            starts: Vec::with_capacity(n),
            ends: Vec::with_capacity(n),
            max_ends: Vec::with_capacity(n),
            strands: Vec::with_capacity(n),
            gene_ids: Vec::with_capacity(n),
            transcript_ids: Vec::with_capacity(n),
            exon_offsets: Vec::with_capacity(n),
            exon_counts: Vec::with_capacity(n),
            exons: Vec::new(),
        };

        let mut running_max = 0u32;
        for (row, r) in rows.into_iter().enumerate() {
            if r.end < r.start {
                return Err(IndexError::EndBeforeStart { row, start: r.start, end: r.end });
            }
            running_max = if row == 0 { r.end } else { running_max.max(r.end) };

            table.starts.push(r.start);
            table.ends.push(r.end);
            table.max_ends.push(running_max);
            table.strands.push(r.strand);
            table.gene_ids.push(r.gene_id);
            table.transcript_ids.push(r.transcript_id);
            table.exon_offsets.push(table.exons.len());
            table.exon_counts.push(r.exons.len());
            table.exons.extend(r.exons);
        }

        table.validate()?;
        Ok(table)
    }

    /// Table for all transcripts of one chromosome. Transcripts without
    /// exons are left out.
    pub fn from_transcripts<'a, I>(transcripts: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = &'a Transcript>,
    {
        let rows = transcripts
            .into_iter()
            .filter_map(TranscriptRow::from_transcript)
            .collect();
        Self::from_rows(rows)
    }

    /// Check the sort order, the running maximum end and the exon ranges.
    pub fn validate(&self) -> Result<(), IndexError> {
        let n = self.starts.len();
        if [
            self.ends.len(),
            self.max_ends.len(),
            self.strands.len(),
            self.gene_ids.len(),
            self.transcript_ids.len(),
            self.exon_offsets.len(),
            self.exon_counts.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(IndexError::ColumnLengthMismatch);
        }

        let mut expected = 0u32;
        for row in 0..n {
            let (start, end) = (self.starts[row], self.ends[row]);
            if end < start {
                return Err(IndexError::EndBeforeStart { row, start, end });
            }
            if row > 0 {
                let prev = self.starts[row - 1];
                if prev > start {
                    return Err(IndexError::UnsortedStarts { row, prev, start });
                }
                if self.max_ends[row] < self.max_ends[row - 1] {
                    return Err(IndexError::MaxEndNotMonotone { row });
                }
            }
            expected = if row == 0 { end } else { expected.max(end) };
            if self.max_ends[row] != expected {
                return Err(IndexError::MaxEndMismatch { row, found: self.max_ends[row], expected });
            }

            let (offset, count) = (self.exon_offsets[row], self.exon_counts[row]);
            if offset + count > self.exons.len() {
                return Err(IndexError::ExonOutOfRange { row, offset, count, len: self.exons.len() });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn start(&self, row: usize) -> u32 {
        self.starts[row]
    }

    pub fn end(&self, row: usize) -> u32 {
        self.ends[row]
    }

    pub fn strand(&self, row: usize) -> Strand {
        self.strands[row]
    }

    pub fn gene_id(&self, row: usize) -> GeneId {
        self.gene_ids[row]
    }

    pub fn transcript_id(&self, row: usize) -> TranscriptId {
        self.transcript_ids[row]
    }

    /// Number of exon entries over all rows.
    pub fn exon_len(&self) -> usize {
        self.exons.len()
    }

    /// Genomic (absolute, inclusive) exons of a row, in stored order.
    pub fn exons(&self, row: usize) -> impl Iterator<Item = (u32, u32)> + '_ {
        let base = self.starts[row];
        self.exon_slice(row)
            .iter()
            .map(move |&(s, e)| (base + s, base + e))
    }

    fn exon_slice(&self, row: usize) -> &[(u32, u32)] {
        let offset = self.exon_offsets[row];
        &self.exons[offset..offset + self.exon_counts[row]]
    }

    /// Candidate rows that may contain `pos`, in descending start order.
    ///
    /// Starts at the last row with `start <= pos` and walks backwards while
    /// the running maximum end of the remaining rows still reaches `pos`.
    pub fn stab(&self, pos: u32) -> Stab<'_> {
        let first = self
            .starts
            .partition_point(|&s| s <= pos)
            .checked_sub(1)
            .filter(|&row| self.max_ends[row] >= pos);
        Stab {
            table: self,
            pos,
            next: first,
        }
    }

    /// Strand check for a read with orientation `read_strand` against a row.
    ///
    /// On plus-strand transcripts the read orientation is taken as is, on
    /// any other transcript it is flipped before comparing with the filter.
    #[inline]
    pub fn strand_eligible(&self, row: usize, read_strand: Strand, filter: StrandFilter) -> bool {
        let wanted = match filter {
            StrandFilter::Unspecified => return true,
            StrandFilter::Forward => Strand::Plus,
            StrandFilter::Reverse => Strand::Minus,
        };
        let effective = if self.strands[row] == Strand::Plus {
            read_strand
        } else {
            read_strand.flip()
        };
        effective == wanted
    }

    #[inline]
    pub fn in_range(&self, row: usize, pos: u32) -> bool {
        self.starts[row] <= pos && pos <= self.ends[row]
    }

    /// Gene of `row` if `pos` falls into one of its exons. Stops at the
    /// first exon that contains the point.
    #[inline]
    pub fn exon_hit(&self, row: usize, pos: u32) -> Option<GeneId> {
        let rel = pos.checked_sub(self.starts[row])?;
        self.exon_slice(row)
            .iter()
            .any(|&(s, e)| s <= rel && rel <= e)
            .then(|| self.gene_ids[row])
    }

    /// Full check of one candidate row.
    #[inline]
    pub fn evaluate(&self, row: usize, pos: u32, read_strand: Strand, filter: StrandFilter) -> Verdict {
        if !self.strand_eligible(row, read_strand, filter) {
            return Verdict::StrandMismatch;
        }
        if !self.in_range(row, pos) {
            return Verdict::OutOfRange;
        }
        match self.exon_hit(row, pos) {
            Some(gene) => Verdict::Exonic(gene),
            None => Verdict::Intronic,
        }
    }
}

/// Iterator returned by [`TranscriptTable::stab`].
#[derive(Debug, Clone)]
pub struct Stab<'a> {
    table: &'a TranscriptTable,
    pos: u32,
    next: Option<usize>,
}

impl Iterator for Stab<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let row = self.next?;
        self.next = match row.checked_sub(1) {
            Some(prev) if self.table.max_ends[prev] >= self.pos => Some(prev),
            _ => None,
        };
        Some(row)
    }
}
