use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Serialize, Deserialize};

use crate::annotation::io::{open_annotation, AnnotationReader, AnnotationRecord, ParseError};
use crate::classify::Classifier;
use crate::error::BuildError;
use crate::model::gene::Gene;
use crate::model::transcript::Transcript;
use crate::model::types::{ClassifyOptions, GeneId, TranscriptId};
use crate::table::TranscriptTable;
use crate::types::RefBlock;

const MAGIC: &[u8; 4] = b"EPX1";
const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

/// Attribute keys used to read genes and transcripts from an annotation.
///
/// Each category accepts several keys; the first one present on a line wins.
/// GFF3 `Parent` values may list several transcripts separated by ','.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdNameKeys {
    pub gene_id_keys: Vec<String>,
    pub gene_name_keys: Vec<String>,

    pub transcript_id_keys: Vec<String>,
    pub transcript_name_keys: Vec<String>,

    /// GFF3 exon->transcript linkage (most commonly: Parent)
    pub parent_keys: Vec<String>,

    /// Feature types that count as exons (default: ["exon"])
    pub exon_feature_types: Vec<String>,
}

impl Default for IdNameKeys {
    fn default() -> Self {
        Self {
            gene_id_keys: vec!["gene_id".into(), "gene".into(), "GeneID".into()],
            gene_name_keys: vec!["gene_name".into(), "Name".into(), "gene".into()],

            transcript_id_keys: vec!["transcript_id".into(), "transcript".into()],
            transcript_name_keys: vec!["transcript_name".into()],

            parent_keys: vec!["Parent".into()],
            exon_feature_types: vec!["exon".into()],
        }
    }
}

/// Transcript index over all chromosomes of an annotation.
///
/// Holds the chromosome dictionary, the gene and transcript models, and one
/// [`TranscriptTable`] per chromosome (same order as `chr_names`). Built once,
/// then shared read-only by any number of classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointIndex {
    pub chr_names: Vec<String>,
    chr_to_id: HashMap<String, usize>,

    pub genes: Vec<Gene>,
    pub transcripts: Vec<Transcript>,

    tables: Vec<TranscriptTable>,
}

/// Per-chromosome summary: transcripts, genes, exons, longest transcript.
impl fmt::Display for EndpointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "EndpointIndex: {} genes, {} transcripts, {} chromosomes",
            self.genes.len(),
            self.transcripts.len(),
            self.chr_names.len()
        )?;

        for (chr_name, table) in self.chr_names.iter().zip(&self.tables) {
            let genes: HashSet<GeneId> = (0..table.len()).map(|r| table.gene_id(r)).collect();
            let longest = (0..table.len())
                .map(|r| table.end(r) - table.start(r) + 1)
                .max()
                .unwrap_or(0);

            writeln!(
                f,
                "  - {}: transcripts={}, genes={}, exons={}, longest_tx={} bp",
                chr_name,
                table.len(),
                genes.len(),
                table.exon_len(),
                longest
            )?;
        }

        Ok(())
    }
}

impl Default for EndpointIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointIndex {
    pub fn new() -> Self {
        Self {
            chr_names: Vec::new(),
            chr_to_id: HashMap::new(),
            genes: Vec::new(),
            transcripts: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Build an index from a GTF/GFF3 path (plain or `.gz`).
    pub fn from_path<P: AsRef<Path>>(path: P, keys: IdNameKeys) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_annotation(path)?;
        Self::new()
            .from_reader(reader, keys)
            .with_context(|| format!("build endpoint index from {}", path.display()))
    }

    /// Build an index from a GTF/GFF3 reader.
    ///
    /// Exon lines are grouped into transcripts and genes, transcripts are
    /// finalized, and one transcript table per chromosome is packed and
    /// validated. Chromosomes are numbered in first-seen order.
    ///
    /// ```
    /// use std::io::Cursor;
    /// use gtf_endpoint_index::index::{EndpointIndex, IdNameKeys};
    ///
    /// let gtf = "\
    /// chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";\n\
    /// chr1\tsrc\texon\t201\t250\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";\n";
    ///
    /// let idx = EndpointIndex::new()
    ///     .from_reader(Cursor::new(gtf.as_bytes()), IdNameKeys::default())
    ///     .unwrap();
    ///
    /// assert_eq!(idx.genes.len(), 1);
    /// assert_eq!(idx.chr_id("chr1"), Some(0));
    /// assert_eq!(idx.table(0).unwrap().len(), 1);
    /// ```
    pub fn from_reader<R: BufRead>(mut self, reader: R, keys: IdNameKeys) -> Result<Self, BuildError> {
        let mut gene_key_to_id: HashMap<String, GeneId> = HashMap::new();
        let mut tx_key_to_id: HashMap<(usize, String), TranscriptId> = HashMap::new();

        for rec in AnnotationReader::new(reader).records() {
            let rec = rec?;

            if !rec.is_exon_feature(&keys.exon_feature_types) {
                continue;
            }

            let chr_id = self.intern_chr(&rec.seqname);

            let gene_key = rec
                .pick_first_attr(&keys.gene_id_keys)
                .ok_or_else(|| ParseError::MissingAttribute {
                    line_no: rec.line_no,
                    what: "gene id",
                    tried: keys.gene_id_keys.clone(),
                })?
                .to_string();

            let tx_key_raw = rec
                .pick_first_attr(&keys.transcript_id_keys)
                .or_else(|| rec.pick_first_attr(&keys.parent_keys))
                .ok_or_else(|| ParseError::MissingAttribute {
                    line_no: rec.line_no,
                    what: "transcript id",
                    tried: [keys.transcript_id_keys.clone(), keys.parent_keys.clone()].concat(),
                })?
                .to_string();

            let gene_id = self.intern_gene(&rec, &keys, &gene_key, &mut gene_key_to_id);

            for tx_key in split_parent_list(&tx_key_raw) {
                let tx_id = self.intern_tx(&rec, &keys, chr_id, gene_id, tx_key, &mut tx_key_to_id);
                self.transcripts[tx_id].add_exon(RefBlock::new(rec.start0, rec.end0));
            }
        }

        for tx in &mut self.transcripts {
            tx.finalize();
        }
        for tx in &self.transcripts {
            self.genes[tx.gene_id].add_transcript(tx.id);
        }
        for g in &mut self.genes {
            g.finalize();
        }

        self.build_tables()?;

        log::info!(
            "indexed {} transcripts of {} genes on {} chromosomes",
            self.transcripts.len(),
            self.genes.len(),
            self.chr_names.len()
        );

        Ok(self)
    }

    pub fn chr_id(&self, name: &str) -> Option<usize> {
        self.chr_to_id.get(name).copied()
    }

    /// Transcript table of a chromosome.
    pub fn table(&self, chr_id: usize) -> Option<&TranscriptTable> {
        self.tables.get(chr_id)
    }

    /// Stable annotation id of a gene (the value of its gene id attribute).
    pub fn gene_stable_id(&self, gene: GeneId) -> Option<&str> {
        self.genes.get(gene).map(|g| g.stable_id.as_str())
    }

    /// Classifier over this index.
    pub fn classifier(&self, opts: ClassifyOptions) -> Classifier<'_> {
        Classifier::new(self, opts)
    }

    // -----------------------
    // Internal helpers
    // -----------------------

    fn intern_chr(&mut self, chr: &str) -> usize {
        if let Some(&id) = self.chr_to_id.get(chr) {
            return id;
        }
        let id = self.chr_names.len();
        self.chr_names.push(chr.to_string());
        self.chr_to_id.insert(chr.to_string(), id);
        id
    }

    fn intern_gene(
        &mut self,
        rec: &AnnotationRecord,
        keys: &IdNameKeys,
        gene_key: &str,
        gene_key_to_id: &mut HashMap<String, GeneId>,
    ) -> GeneId {
        let gid = match gene_key_to_id.get(gene_key) {
            Some(&gid) => gid,
            None => {
                let display = rec.pick_first_attr(&keys.gene_name_keys).unwrap_or(gene_key);
                let gid = self.genes.len();
                self.genes.push(Gene::new(gid, gene_key, display));
                gene_key_to_id.insert(gene_key.to_string(), gid);
                gid
            }
        };

        for k in &keys.gene_name_keys {
            if let Some(v) = rec.attr(k) {
                self.genes[gid].add_name(v);
            }
        }
        gid
    }

    fn intern_tx(
        &mut self,
        rec: &AnnotationRecord,
        keys: &IdNameKeys,
        chr_id: usize,
        gene_id: GeneId,
        tx_key: &str,
        tx_key_to_id: &mut HashMap<(usize, String), TranscriptId>,
    ) -> TranscriptId {
        // Same id on another chromosome (alt contigs, PAR copies) is a separate transcript.
        let key = (chr_id, tx_key.to_string());
        let tid = match tx_key_to_id.get(&key) {
            Some(&tid) => tid,
            None => {
                let tid = self.transcripts.len();
                self.transcripts
                    .push(Transcript::new(tid, gene_id, tx_key, chr_id, rec.strand));
                tx_key_to_id.insert(key, tid);
                tid
            }
        };

        for k in &keys.transcript_name_keys {
            if let Some(v) = rec.attr(k) {
                self.transcripts[tid].add_name(v);
            }
        }
        tid
    }

    fn build_tables(&mut self) -> Result<(), BuildError> {
        let mut per_chr: Vec<Vec<&Transcript>> = vec![Vec::new(); self.chr_names.len()];
        for tx in &self.transcripts {
            per_chr[tx.chr_id].push(tx);
        }

        let mut tables = Vec::with_capacity(per_chr.len());
        for (chr_id, txs) in per_chr.into_iter().enumerate() {
            let table = TranscriptTable::from_transcripts(txs).map_err(|source| BuildError::Table {
                chr: self.chr_names[chr_id].clone(),
                source,
            })?;
            log::debug!("{}: {} transcripts", self.chr_names[chr_id], table.len());
            tables.push(table);
        }

        self.tables = tables;
        Ok(())
    }

    /// Serialize this index with a small header (magic + crate version) and a bincode payload.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut f = BufWriter::new(
            File::create(path).with_context(|| format!("create {}", path.display()))?,
        );

        f.write_all(MAGIC)?;

        let v = VERSION_STR.as_bytes();
        f.write_all(&(v.len() as u16).to_le_bytes())?;
        f.write_all(v)?;

        bincode::serialize_into(&mut f, self)?;
        f.flush()?;

        Ok(())
    }

    /// Load an index written by `save()`.
    ///
    /// Rejects foreign files and version mismatches, and re-checks every
    /// transcript table once so queries can rely on its invariants.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut f = BufReader::new(File::open(path).with_context(|| format!("open {}", path.display()))?);

        let mut magic = [0u8; 4];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            bail!("Not an EndpointIndex file (bad magic)");
        }

        let mut len_buf = [0u8; 2];
        f.read_exact(&mut len_buf)?;
        let mut ver_buf = vec![0u8; u16::from_le_bytes(len_buf) as usize];
        f.read_exact(&mut ver_buf)?;
        let file_version = std::str::from_utf8(&ver_buf)?;

        if file_version != VERSION_STR {
            bail!(
                "Index version mismatch: file={}, binary={}",
                file_version,
                VERSION_STR
            );
        }

        let idx: Self = bincode::deserialize_from(&mut f)?;

        if idx.tables.len() != idx.chr_names.len() {
            bail!(
                "Index has {} transcript tables for {} chromosomes",
                idx.tables.len(),
                idx.chr_names.len()
            );
        }
        for (name, table) in idx.chr_names.iter().zip(&idx.tables) {
            table
                .validate()
                .with_context(|| format!("transcript table of {name} in {}", path.display()))?;
        }

        log::info!("loaded index {} ({} transcripts)", path.display(), idx.transcripts.len());
        Ok(idx)
    }
}

/// Split a GFF3 `Parent=a,b` list; plain ids come back as a single item.
fn split_parent_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strand;
    use std::io::Cursor;

    fn build(gtf: &str, keys: IdNameKeys) -> EndpointIndex {
        EndpointIndex::new()
            .from_reader(Cursor::new(gtf.as_bytes()), keys)
            .unwrap()
    }

    #[test]
    fn builds_tables_per_chromosome() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; transcript_id \"T1\";
chr1\tsrc\texon\t201\t250\t.\t+\t.\tgene_id \"G1\"; gene_name \"Alpha\"; transcript_id \"T1\";
chr2\tsrc\texon\t11\t20\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\";
chr1\tsrc\tCDS\t111\t140\t.\t+\t0\tgene_id \"G1\"; transcript_id \"T1\";
";
        let idx = build(gtf, IdNameKeys::default());

        assert_eq!(idx.chr_names, vec!["chr1".to_string(), "chr2".to_string()]);
        assert_eq!(idx.genes.len(), 2);
        assert_eq!(idx.genes[0].display_name(), "Alpha");
        assert_eq!(idx.gene_stable_id(0), Some("G1"));

        let t1 = idx.table(0).unwrap();
        assert_eq!(t1.len(), 1);
        assert_eq!((t1.start(0), t1.end(0)), (100, 249));
        assert_eq!(t1.exons(0).collect::<Vec<_>>(), vec![(100, 149), (200, 249)]);

        let t2 = idx.table(1).unwrap();
        assert_eq!(t2.strand(0), Strand::Minus);
        assert!(idx.table(2).is_none());
    }

    #[test]
    fn rows_are_sorted_across_interleaved_input() {
        let gtf = "\
chr1\tsrc\texon\t501\t600\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t101\t900\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\";
chr1\tsrc\texon\t301\t310\t.\t+\t.\tgene_id \"G3\"; transcript_id \"T3\";
";
        let idx = build(gtf, IdNameKeys::default());
        let table = idx.table(0).unwrap();
        let starts: Vec<u32> = (0..table.len()).map(|r| table.start(r)).collect();
        assert_eq!(starts, vec![100, 300, 500]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn missing_gene_id_is_reported_with_line_number() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t201\t250\t.\t+\t.\ttranscript_id \"T1\";
";
        let err = EndpointIndex::new()
            .from_reader(Cursor::new(gtf.as_bytes()), IdNameKeys::default())
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Parse(ParseError::MissingAttribute { line_no: 2, .. })
        ));
    }

    #[test]
    fn gff3_parent_multi_value_creates_two_transcripts() {
        let gff = "chr2\tsrc\texon\t5\t20\t.\t-\t.\tParent=tx1,tx2;gene_id=G9;Name=GeneNice\n";
        let keys = IdNameKeys {
            transcript_id_keys: vec![],
            gene_id_keys: vec!["gene_id".into()],
            gene_name_keys: vec!["Name".into()],
            ..Default::default()
        };
        let idx = build(gff, keys);

        assert_eq!(idx.genes.len(), 1);
        assert_eq!(idx.genes[0].display_name(), "GeneNice");
        assert_eq!(idx.transcripts.len(), 2);
        assert_eq!(idx.genes[0].transcript_ids(), &[0, 1]);
        assert_eq!(idx.table(0).unwrap().len(), 2);
    }

    #[test]
    fn same_transcript_id_on_two_chromosomes_stays_separate() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"NM_1\";
chr1_alt\tsrc\texon\t100001\t100050\t.\t+\t.\tgene_id \"G1\"; transcript_id \"NM_1\";
";
        let idx = build(gtf, IdNameKeys::default());
        assert_eq!(idx.transcripts.len(), 2);
        assert_eq!(idx.genes[0].transcript_ids(), &[0, 1]);

        let chr1 = idx.table(0).unwrap();
        assert_eq!(chr1.len(), 1);
        assert_eq!((chr1.start(0), chr1.end(0)), (100, 149));
        assert_eq!(chr1.exons(0).collect::<Vec<_>>(), vec![(100, 149)]);
        assert_eq!(chr1.stab(100_009).count(), 0);

        let alt = idx.table(1).unwrap();
        assert_eq!(alt.len(), 1);
        assert_eq!((alt.start(0), alt.end(0)), (100_000, 100_049));
    }

    #[test]
    fn save_and_load_round_trip() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr3\tsrc\texon\t1\t1000\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\";
";
        let idx = build(gtf, IdNameKeys::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.epx");
        idx.save(&path).unwrap();

        let loaded = EndpointIndex::load(&path).unwrap();
        assert_eq!(loaded.chr_names, idx.chr_names);
        assert_eq!(loaded.chr_id("chr3"), Some(1));
        assert_eq!(loaded.genes, idx.genes);
        assert_eq!(loaded.table(1), idx.table(1));
    }

    #[test]
    fn load_rejects_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_index");
        std::fs::write(&path, b"SPX1 something else").unwrap();
        let err = EndpointIndex::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn display_lists_every_chromosome() {
        let gtf = "\
chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chrM\tsrc\texon\t1\t10\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\";
";
        let text = build(gtf, IdNameKeys::default()).to_string();
        assert!(text.starts_with("EndpointIndex: 2 genes, 2 transcripts, 2 chromosomes"));
        assert!(text.contains("  - chrM: transcripts=1, genes=1, exons=1, longest_tx=10 bp"));
    }
}
