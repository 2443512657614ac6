//! Tab-separated alignment input for the command line tool.
//!
//! One alignment per line:
//!
//! ```text
//! read_id  chrom  strand  mate  blocks
//! r1       chr1   +       0     100:50,300:20
//! ```
//!
//! `blocks` lists `start:length` pairs with 0-based starts. Blocks are
//! sorted and merged per alignment, so the endpoints do not depend on the
//! order they are listed in. `.` (no mapped blocks) is rejected.
//! Consecutive lines sharing a read id form one read. Blank lines and `#`
//! comments are skipped.

use std::io::BufRead;

use anyhow::{anyhow, bail, Context, Result};

use crate::index::EndpointIndex;
use crate::types::{Alignment, RefBlock, Strand};

/// All alignments of one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAlignments {
    pub read_id: String,
    pub alignments: Vec<Alignment>,
    /// Alignments dropped because their chromosome is not in the index.
    pub unplaced: usize,
}

/// Groups alignment lines into reads, resolving chromosome names against an index.
pub struct AlignmentReader<'a, R: BufRead> {
    lines: std::iter::Enumerate<std::io::Lines<R>>,
    index: &'a EndpointIndex,
    pending: Option<(String, Option<Alignment>)>,
}

impl<'a, R: BufRead> AlignmentReader<'a, R> {
    pub fn new(reader: R, index: &'a EndpointIndex) -> Self {
        Self {
            lines: reader.lines().enumerate(),
            index,
            pending: None,
        }
    }

    /// Next parsed line as (read id, alignment or `None` if unplaced).
    fn next_line(&mut self) -> Option<Result<(String, Option<Alignment>)>> {
        for (i, line) in self.lines.by_ref() {
            let line_no = i + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e).with_context(|| format!("read alignment line {line_no}"))),
            };
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(
                parse_alignment_line(&line, self.index)
                    .with_context(|| format!("alignment line {line_no}: {line}")),
            );
        }
        None
    }

    fn push(read: &mut ReadAlignments, aln: Option<Alignment>) {
        match aln {
            Some(aln) => read.alignments.push(aln),
            None => read.unplaced += 1,
        }
    }
}

impl<R: BufRead> Iterator for AlignmentReader<'_, R> {
    type Item = Result<ReadAlignments>;

    fn next(&mut self) -> Option<Self::Item> {
        let (read_id, first) = match self.pending.take() {
            Some(p) => p,
            None => match self.next_line()? {
                Ok(p) => p,
                Err(e) => return Some(Err(e)),
            },
        };

        let mut read = ReadAlignments {
            read_id,
            alignments: Vec::new(),
            unplaced: 0,
        };
        Self::push(&mut read, first);

        loop {
            match self.next_line() {
                None => break,
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok((id, aln))) if id == read.read_id => Self::push(&mut read, aln),
                Some(Ok(other)) => {
                    self.pending = Some(other);
                    break;
                }
            }
        }

        Some(Ok(read))
    }
}

/// Parse one alignment line. Unknown chromosomes give `Ok((id, None))`.
pub fn parse_alignment_line(line: &str, index: &EndpointIndex) -> Result<(String, Option<Alignment>)> {
    let cols: Vec<&str> = line.split('\t').collect();
    let &[read_id, chrom, strand, mate, blocks] = cols.as_slice() else {
        bail!("expected 5 tab-separated columns, found {}", cols.len());
    };

    let strand = match strand {
        "+" => Strand::Plus,
        "-" => Strand::Minus,
        other => bail!("alignment strand must be + or -, found '{other}'"),
    };
    let mate: u8 = mate.parse().with_context(|| format!("bad mate index '{mate}'"))?;
    let blocks = parse_blocks(blocks)?;
    if blocks.is_empty() {
        bail!("alignment of {read_id} (mate {mate}) has no mapped blocks");
    }

    let Some(chr_id) = index.chr_id(chrom) else {
        log::debug!("read {read_id}: chromosome {chrom} not in index");
        return Ok((read_id.to_string(), None));
    };

    let mut aln = Alignment::new(chr_id, strand, mate, blocks);
    aln.normalize();
    Ok((read_id.to_string(), Some(aln)))
}

/// `start:len[,start:len...]`, or `.` for no blocks.
pub fn parse_blocks(s: &str) -> Result<Vec<RefBlock>> {
    if s == "." {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|b| -> Result<RefBlock> {
            let (start, len) = b
                .split_once(':')
                .ok_or_else(|| anyhow!("block '{b}' is not start:length"))?;
            let start: u32 = start.parse().with_context(|| format!("bad block start '{start}'"))?;
            let len: u32 = len.parse().with_context(|| format!("bad block length '{len}'"))?;
            if len == 0 {
                bail!("block '{b}' has zero length");
            }
            let end = start
                .checked_add(len)
                .ok_or_else(|| anyhow!("block '{b}' overflows the coordinate range"))?;
            Ok(RefBlock::new(start, end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::select_endpoint;
    use crate::index::IdNameKeys;
    use crate::model::{EndpointMode, MatePolicy};
    use rstest::rstest;
    use std::io::Cursor;

    fn index() -> EndpointIndex {
        let gtf = "chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";\n";
        EndpointIndex::new()
            .from_reader(Cursor::new(gtf.as_bytes()), IdNameKeys::default())
            .unwrap()
    }

    #[test]
    fn parses_blocks() {
        assert_eq!(
            parse_blocks("100:50,300:20").unwrap(),
            vec![RefBlock::new(100, 150), RefBlock::new(300, 320)]
        );
        assert!(parse_blocks(".").unwrap().is_empty());
        assert!(parse_blocks("100").is_err());
        assert!(parse_blocks("100:0").is_err());
        assert!(parse_blocks("x:5").is_err());
    }

    #[test]
    fn groups_consecutive_lines_by_read() {
        let idx = index();
        let tsv = "\
# read chrom strand mate blocks
r1\tchr1\t+\t0\t100:50
r1\tchr1\t-\t1\t300:20,400:10
r1\tchrUn\t+\t0\t5:5

r2\tchr1\t-\t0\t500:10
r1\tchr1\t+\t0\t1:1
";
        let reads: Vec<ReadAlignments> = AlignmentReader::new(Cursor::new(tsv.as_bytes()), &idx)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(reads.len(), 3);
        assert_eq!(reads[0].read_id, "r1");
        assert_eq!(reads[0].alignments.len(), 2);
        assert_eq!(reads[0].unplaced, 1);
        assert_eq!(reads[0].alignments[1].mate, 1);
        assert_eq!(reads[0].alignments[1].strand, Strand::Minus);
        assert_eq!(reads[1].alignments[0].blocks, vec![RefBlock::new(500, 510)]);
        assert_eq!(reads[2].read_id, "r1");
    }

    #[test]
    fn unsorted_blocks_are_put_in_genomic_order() {
        let idx = index();
        let (_, aln) = parse_alignment_line("r1\tchr1\t-\t0\t300:10,100:10", &idx).unwrap();
        let aln = aln.unwrap();
        assert_eq!(aln.blocks, vec![RefBlock::new(100, 110), RefBlock::new(300, 310)]);
        assert_eq!(
            select_endpoint(&aln, EndpointMode::FivePrime, MatePolicy::AllMates).unwrap(),
            Some(309)
        );

        let (_, aln) = parse_alignment_line("r1\tchr1\t+\t0\t100:50,120:50", &idx).unwrap();
        assert_eq!(aln.unwrap().blocks, vec![RefBlock::new(100, 170)]);
    }

    #[rstest]
    #[case::known_chromosome("r1\tchr1\t+\t0\t.")]
    #[case::unknown_chromosome("r1\tchrUn\t+\t0\t.")]
    fn empty_block_list_is_rejected(#[case] line: &str) {
        let err = parse_alignment_line(line, &index()).unwrap_err();
        assert!(err.to_string().contains("no mapped blocks"));
    }

    #[test]
    fn reports_line_number_on_error() {
        let idx = index();
        let tsv = "r1\tchr1\t+\t0\t100:50\nr2\tchr1\t*\t0\t100:50\n";
        let err = AlignmentReader::new(Cursor::new(tsv.as_bytes()), &idx)
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(format!("{err:#}").contains("alignment line 2"));
    }
}
