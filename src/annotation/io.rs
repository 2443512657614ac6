use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::types::Strand;

/// Attribute syntax of an annotation line.
///
/// - GFF3: `key=value;key2=value2`
/// - GTF:  `key "value"; key2 "value2";`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gff3,
    Gtf,
}

/// One feature line of a GTF/GFF3 file.
///
/// `start0`/`end0` are 0-based half-open; the file itself is 1-based inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub line_no: usize,
    pub seqname: String,
    pub feature_type: String,
    pub start0: u32,
    pub end0: u32,
    pub strand: Strand,
    pub attrs: HashMap<String, String>,
    pub dialect: Dialect,
}

impl AnnotationRecord {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    pub fn is_exon_feature(&self, exon_types: &[String]) -> bool {
        exon_types.iter().any(|t| t == &self.feature_type)
    }

    /// Value of the first key in `keys` that is present and non-blank.
    pub fn pick_first_attr(&self, keys: &[String]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.attr(k))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error while reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line_no}: malformed GTF/GFF line ({problem}): {line}")]
    MalformedLine {
        line_no: usize,
        problem: &'static str,
        line: String,
    },

    #[error("line {line_no}: bad coordinates: {line}")]
    BadCoordinates { line_no: usize, line: String },

    #[error("line {line_no}: missing {what} attribute (tried keys {tried:?})")]
    MissingAttribute {
        line_no: usize,
        what: &'static str,
        tried: Vec<String>,
    },
}

/// Open an annotation file, decompressing `.gz` transparently.
pub fn open_annotation(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let is_gz = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    if is_gz {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Streaming GTF/GFF3 parser.
///
/// Most callers go through [`crate::annotation::AnnotationBuilder`] instead.
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use gtf_endpoint_index::annotation::io::AnnotationReader;
///
/// let reader = BufReader::new(File::open("genes.gtf").unwrap());
/// for rec in AnnotationReader::new(reader).records() {
///     let rec = rec.unwrap();
///     println!("{} {}-{}", rec.seqname, rec.start0, rec.end0);
/// }
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Parsed records; blank lines and `#` comments are skipped.
    pub fn records(mut self) -> impl Iterator<Item = Result<AnnotationRecord, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(source) => {
                    return Some(Err(ParseError::Io {
                        path: "<reader>".to_string(),
                        source,
                    }))
                }
            }

            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_record_line(line, self.line_no));
        })
    }
}

/// Parse one non-comment line.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<AnnotationRecord, ParseError> {
    let malformed = |problem| ParseError::MalformedLine {
        line_no,
        problem,
        line: line.to_string(),
    };
    let bad_coords = || ParseError::BadCoordinates {
        line_no,
        line: line.to_string(),
    };

    // seqname source feature start end score strand phase attributes
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 9 {
        return Err(malformed("expected 9 tab-separated columns"));
    }

    let start1: u32 = cols[3].parse().map_err(|_| bad_coords())?;
    let end1: u32 = cols[4].parse().map_err(|_| bad_coords())?;
    if start1 == 0 || end1 < start1 {
        return Err(bad_coords());
    }

    let strand = Strand::from_symbol(cols[6]).ok_or_else(|| malformed("strand must be one of + - . ?"))?;
    let (dialect, attrs) = parse_attributes(cols[8]);

    Ok(AnnotationRecord {
        line_no,
        seqname: cols[0].to_string(),
        feature_type: cols[2].to_string(),
        start0: start1 - 1,
        end0: end1,
        strand,
        attrs,
        dialect,
    })
}

/// Parse the attribute column.
///
/// A column containing `=` is read as GFF3, anything else as GTF. Each
/// `;`-separated entry is split at the first `=` (GFF3) or first
/// whitespace (GTF); surrounding quotes are removed from values.
pub fn parse_attributes(s: &str) -> (Dialect, HashMap<String, String>) {
    let dialect = if s.contains('=') { Dialect::Gff3 } else { Dialect::Gtf };

    let attrs = s
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match dialect {
            Dialect::Gff3 => part.split_once('='),
            Dialect::Gtf => part.split_once(char::is_whitespace),
        })
        .map(|(k, v)| (k.trim(), unquote(v)))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    (dialect, attrs)
}

fn unquote(v: &str) -> &str {
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    v.strip_suffix('"').unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_gtf_line() {
        let line = "chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; exon_number \"1\";";
        let rec = parse_record_line(line, 7).unwrap();

        assert_eq!(rec.dialect, Dialect::Gtf);
        assert_eq!(rec.line_no, 7);
        assert_eq!(rec.seqname, "chr1");
        assert_eq!(rec.feature_type, "exon");
        assert_eq!((rec.start0, rec.end0), (100, 150));
        assert_eq!(rec.strand, Strand::Plus);
        assert_eq!(rec.attr("gene_id"), Some("G1"));
        assert_eq!(rec.attr("exon_number"), Some("1"));
    }

    #[test]
    fn parse_gff3_line() {
        let line = "chr2\tsrc\texon\t5\t20\t.\t-\t.\tID=ex1;Parent=tx1;gene_id=G9";
        let rec = parse_record_line(line, 1).unwrap();

        assert_eq!(rec.dialect, Dialect::Gff3);
        assert_eq!((rec.start0, rec.end0), (4, 20));
        assert_eq!(rec.strand, Strand::Minus);
        assert_eq!(rec.attr("Parent"), Some("tx1"));
        assert_eq!(rec.pick_first_attr(&["transcript_id".into(), "Parent".into()]), Some("tx1"));
    }

    #[test]
    fn rejects_bad_coordinates_and_short_lines() {
        let inverted = "chr1\tsrc\texon\t150\t101\t.\t+\t.\tgene_id \"G1\";";
        assert!(matches!(
            parse_record_line(inverted, 3),
            Err(ParseError::BadCoordinates { line_no: 3, .. })
        ));

        let short = "chr1\tsrc\texon\t1\t2";
        assert!(matches!(parse_record_line(short, 1), Err(ParseError::MalformedLine { .. })));

        let strand = "chr1\tsrc\texon\t1\t2\t.\tx\t.\tgene_id \"G1\";";
        assert!(matches!(parse_record_line(strand, 1), Err(ParseError::MalformedLine { .. })));
    }

    #[test]
    fn streaming_reader_skips_comments_and_blank_lines() {
        let data = "\
#comment
chr1\tsrc\texon\t1\t2\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";

chr1\tsrc\texon\t3\t4\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
";
        let recs: Vec<_> = AnnotationReader::new(Cursor::new(data.as_bytes()))
            .records()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!((recs[0].start0, recs[0].end0, recs[0].line_no), (0, 2, 2));
        assert_eq!((recs[1].start0, recs[1].end0, recs[1].line_no), (2, 4, 4));
    }
}
