use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use rayon::prelude::*;

use gtf_endpoint_index::reads::{AlignmentReader, ReadAlignments};
use gtf_endpoint_index::{
    AnnotationFeature, ClassifyOptions, Classifier, CountingObserver, Counters, EndpointIndex,
    EndpointMode, IdNameKeys, LogObserver, MatePolicy, StrandFilter,
};

/// Build an endpoint index and classify read endpoints against it.
#[derive(Parser, Debug)]
#[command(name = "endpoint-index")]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbosity: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index from a GTF/GFF annotation and write it to disk
    Build(BuildArgs),

    /// Load an index from disk and print summary stats
    Stats(StatsArgs),

    /// Classify alignments by the exons their endpoint falls into
    Classify(ClassifyArgs),
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Serialized index file
    #[arg(long, short)]
    index: PathBuf,
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Input annotation file (.gtf/.gff/.gff3, optionally .gz)
    #[arg(long, short)]
    annotation: PathBuf,

    /// Output serialized index file
    #[arg(long, short)]
    index: PathBuf,

    /// Attribute keys to use for gene ID (repeatable)
    #[arg(long = "gene-id-key", value_name = "KEY", num_args = 1.., default_values_t = vec!["gene_id".to_string()])]
    gene_id_keys: Vec<String>,

    /// Attribute keys to use for gene name (repeatable)
    #[arg(long = "gene-name-key", value_name = "KEY", num_args = 1.., default_values_t = vec!["gene_name".to_string()])]
    gene_name_keys: Vec<String>,

    /// Attribute keys to use for transcript ID (repeatable)
    #[arg(long = "transcript-id-key", value_name = "KEY", num_args = 1.., default_values_t = vec!["transcript_id".to_string()])]
    transcript_id_keys: Vec<String>,

    /// Attribute keys to use for transcript name (repeatable)
    #[arg(long = "transcript-name-key", value_name = "KEY", num_args = 1.., default_values_t = vec!["transcript_name".to_string()])]
    transcript_name_keys: Vec<String>,

    /// GFF3 exon->transcript linkage keys (repeatable)
    #[arg(long = "parent-key", value_name = "KEY", num_args = 1.., default_values_t = vec!["Parent".to_string()])]
    parent_keys: Vec<String>,

    /// Feature types that count as exons (repeatable)
    #[arg(long = "exon-feature-type", value_name = "TYPE", num_args = 1.., default_values_t = vec!["exon".to_string()])]
    exon_feature_types: Vec<String>,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Serialized index file
    #[arg(long, short)]
    index: PathBuf,

    /// Alignment table: read_id, chrom, strand, mate, start:len blocks
    #[arg(long, short)]
    alignments: PathBuf,

    /// Output table: read_id, overlap type, gene ids
    #[arg(long, short)]
    output: PathBuf,

    /// Read endpoint used as query point
    #[arg(long, value_enum, default_value_t = EndpointMode::FivePrime)]
    endpoint: EndpointMode,

    /// Required read orientation relative to the transcript
    #[arg(long, value_enum, default_value_t = StrandFilter::Unspecified)]
    strand: StrandFilter,

    /// Mates of a pair that are classified
    #[arg(long, value_enum, default_value_t = MatePolicy::AllMates)]
    mates: MatePolicy,

    /// Worker threads
    #[arg(long, short, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    threads: u16,

    /// Reads classified per parallel batch
    #[arg(long, default_value_t = 100_000)]
    batch_size: usize,

    /// Trace every step for this many leading reads (needs -vvv)
    #[arg(long, default_value_t = 5)]
    trace_reads: usize,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(buf, "{} [{}] - {}", buf.timestamp(), record.level(), record.args())
        })
        .filter_level(level)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let start = Instant::now();
    match cli.cmd {
        Command::Build(args) => {
            let keys = IdNameKeys {
                gene_id_keys: args.gene_id_keys,
                gene_name_keys: args.gene_name_keys,
                transcript_id_keys: args.transcript_id_keys,
                transcript_name_keys: args.transcript_name_keys,
                parent_keys: args.parent_keys,
                exon_feature_types: args.exon_feature_types,
            };

            let idx = EndpointIndex::from_path(&args.annotation, keys)
                .with_context(|| format!("building index from {}", args.annotation.display()))?;

            println!("{idx}");

            idx.save(&args.index)
                .with_context(|| format!("writing index to {}", args.index.display()))?;

            log::info!("Index written to {}", args.index.display());
        }

        Command::Stats(args) => {
            let idx = EndpointIndex::load(&args.index)
                .with_context(|| format!("reading index {}", args.index.display()))?;
            println!("{idx}");
        }

        Command::Classify(args) => classify(args)?,
    }

    log::info!("Total execution time: {:.2?}", start.elapsed());
    Ok(())
}

fn classify(args: ClassifyArgs) -> Result<()> {
    let idx = EndpointIndex::load(&args.index)
        .with_context(|| format!("reading index {}", args.index.display()))?;

    let opts = ClassifyOptions {
        endpoint: args.endpoint,
        strand: args.strand,
        mates: args.mates,
    };
    log::info!("Classifying with {opts:?}");
    let classifier = idx.classifier(opts);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads as usize)
        .build()
        .context("starting worker pool")?;

    let input = File::open(&args.alignments)
        .with_context(|| format!("open alignments {}", args.alignments.display()))?;
    let mut reads = AlignmentReader::new(BufReader::new(input), &idx);

    let mut out = BufWriter::new(
        File::create(&args.output).with_context(|| format!("create {}", args.output.display()))?,
    );
    writeln!(out, "#read_id\toverlap_type\tgenes")?;

    let batch_size = args.batch_size.max(1);
    let mut batch: Vec<ReadAlignments> = Vec::with_capacity(batch_size);
    let mut totals = Counters::default();
    let mut unplaced = 0usize;
    let mut done = 0usize;

    loop {
        batch.clear();
        for read in reads.by_ref().take(batch_size) {
            batch.push(read?);
        }
        if batch.is_empty() {
            break;
        }

        let results: Vec<Result<(AnnotationFeature, Counters)>> = pool.install(|| {
            batch
                .par_iter()
                .enumerate()
                .map(|(i, read)| classify_read(&classifier, read, done + i < args.trace_reads))
                .collect()
        });

        for (read, res) in batch.iter().zip(results) {
            let (feature, counters) = res?;
            totals.merge(&counters);
            unplaced += read.unplaced;
            write_feature(&mut out, &idx, &read.read_id, &feature)?;
        }

        done += batch.len();
        log::debug!("{done} reads classified");
    }
    out.flush()?;

    log::info!(
        "{} reads, {} assigned; {} alignments classified, {} skipped by mate policy, {} on unindexed chromosomes",
        totals.reads,
        totals.assigned_reads,
        totals.alignments,
        totals.skipped_alignments,
        unplaced
    );
    log::info!(
        "{} candidate transcripts: {} strand-rejected, {} out of range, {} intronic, {} exonic",
        totals.candidates,
        totals.strand_rejected,
        totals.range_rejected,
        totals.intronic,
        totals.exonic
    );
    Ok(())
}

fn classify_read(
    classifier: &Classifier<'_>,
    read: &ReadAlignments,
    trace: bool,
) -> Result<(AnnotationFeature, Counters)> {
    let mut counting = CountingObserver::default();
    let feature = if trace {
        let mut obs = (&mut counting, LogObserver::new(&read.read_id));
        classifier.classify_with(&read.alignments, &mut obs)
    } else {
        classifier.classify_with(&read.alignments, &mut counting)
    }
    .with_context(|| format!("classifying read {}", read.read_id))?;

    Ok((feature, counting.counters))
}

fn write_feature<W: Write>(
    out: &mut W,
    idx: &EndpointIndex,
    read_id: &str,
    feature: &AnnotationFeature,
) -> Result<()> {
    let genes: Vec<&str> = feature
        .genes()
        .iter()
        .filter_map(|&g| idx.gene_stable_id(g))
        .collect();
    let genes = if genes.is_empty() {
        "-".to_string()
    } else {
        genes.join(";")
    };
    writeln!(out, "{read_id}\t{}\t{genes}", feature.overlap_type())?;
    Ok(())
}
