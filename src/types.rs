use serde::{Serialize, Deserialize};

/// Genomic strand/orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    /// Opposite orientation. `Unknown` stays `Unknown`.
    #[inline]
    pub fn flip(self) -> Strand {
        match self {
            Strand::Plus => Strand::Minus,
            Strand::Minus => Strand::Plus,
            Strand::Unknown => Strand::Unknown,
        }
    }

    #[inline]
    pub fn is_reverse(self) -> bool {
        self == Strand::Minus
    }

    pub fn from_symbol(s: &str) -> Option<Strand> {
        match s {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            "." | "?" => Some(Strand::Unknown),
            _ => None,
        }
    }
}

/// A contiguous genomic interval.
/// Coordinates are 0-based, half-open: [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefBlock {
    pub start: u32,
    pub end: u32,
}

impl RefBlock {
    /// Create a new block. Panics if start >= end.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start < end, "RefBlock requires start < end");
        Self { start, end }
    }

    /// Block from an aligner's `(genomic start, length)` pair.
    pub fn from_start_len(start: u32, len: u32) -> Self {
        Self::new(start, start + len)
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end - self.start
    }

    /// Last covered base (inclusive), i.e. `start + len - 1`.
    #[inline]
    pub fn last(self) -> u32 {
        self.end - 1
    }
}

/// One alignment of a read, as produced by a spliced aligner.
///
/// - `chr_id` is the chromosome index used by the `EndpointIndex`.
/// - `strand` is the orientation the read aligned in (`Plus` or `Minus`).
/// - `mate` is 0 for the primary mate, >0 for the other fragments of a pair.
/// - `blocks` are the mapped segments, 0-based half-open, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub chr_id: usize,
    pub strand: Strand,
    pub mate: u8,
    pub blocks: Vec<RefBlock>,
}

impl Alignment {
    pub fn new(chr_id: usize, strand: Strand, mate: u8, blocks: Vec<RefBlock>) -> Self {
        Self {
            chr_id,
            strand,
            mate,
            blocks,
        }
    }

    /// Sort blocks by start and merge overlapping or adjacent ones.
    ///
    /// Run on every alignment read from text input, so endpoint selection
    /// can rely on `first()`/`last()`.
    pub fn normalize(&mut self) {
        if self.blocks.len() < 2 {
            return;
        }

        self.blocks.sort_by_key(|b| (b.start, b.end));

        let mut merged: Vec<RefBlock> = Vec::with_capacity(self.blocks.len());
        let mut cur = self.blocks[0];

        for &b in &self.blocks[1..] {
            if b.start <= cur.end {
                cur.end = cur.end.max(b.end);
            } else {
                merged.push(cur);
                cur = b;
            }
        }
        merged.push(cur);

        self.blocks = merged;
    }

    /// Span of the alignment as (first start, last covered base).
    pub fn span(&self) -> Option<(u32, u32)> {
        let first = self.blocks.first()?;
        let last = self.blocks.last()?;
        Some((first.start, last.last()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_from_start_len_is_half_open() {
        let b = RefBlock::from_start_len(100, 50);
        assert_eq!(b, RefBlock::new(100, 150));
        assert_eq!(b.len(), 50);
        assert_eq!(b.last(), 149);
    }

    #[test]
    fn strand_flip_and_symbols() {
        assert_eq!(Strand::Plus.flip(), Strand::Minus);
        assert_eq!(Strand::Minus.flip(), Strand::Plus);
        assert_eq!(Strand::Unknown.flip(), Strand::Unknown);
        assert_eq!(Strand::from_symbol("-"), Some(Strand::Minus));
        assert_eq!(Strand::from_symbol("x"), None);
    }

    #[test]
    fn alignment_normalize_sorts_and_merges() {
        let mut aln = Alignment::new(
            1,
            Strand::Plus,
            0,
            vec![
                RefBlock::new(200, 210),
                RefBlock::new(100, 120),
                RefBlock::new(110, 130), // overlaps the previous one
                RefBlock::new(210, 220), // adjacent
            ],
        );

        aln.normalize();
        assert_eq!(aln.blocks, vec![RefBlock::new(100, 130), RefBlock::new(200, 220)]);
        assert_eq!(aln.span(), Some((100, 219)));
    }

    #[test]
    fn empty_alignment_has_no_span() {
        let aln = Alignment::new(0, Strand::Minus, 0, Vec::new());
        assert_eq!(aln.span(), None);
    }
}
