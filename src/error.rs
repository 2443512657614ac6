use thiserror::Error;

use crate::annotation::io::ParseError;

/// Errors raised while classifying a read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// An alignment without any mapped block has no endpoint.
    #[error("alignment of mate {mate} on chromosome {chr_id} has no mapped blocks")]
    InvalidAlignment { mate: u8, chr_id: usize },
}

/// Invariant violations found while building or loading a transcript table.
///
/// These are checked once per table; queries assume they hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("transcript starts are not sorted at row {row} ({prev} > {start})")]
    UnsortedStarts { row: usize, prev: u32, start: u32 },

    #[error("transcript at row {row} ends ({end}) before it starts ({start})")]
    EndBeforeStart { row: usize, start: u32, end: u32 },

    #[error("running maximum end is not monotone at row {row}")]
    MaxEndNotMonotone { row: usize },

    #[error("running maximum end at row {row} is {found}, expected {expected}")]
    MaxEndMismatch { row: usize, found: u32, expected: u32 },

    #[error("exon range of transcript at row {row} exceeds the exon table ({offset}+{count} > {len})")]
    ExonOutOfRange { row: usize, offset: usize, count: usize, len: usize },

    #[error("table columns have different lengths")]
    ColumnLengthMismatch,
}

/// Errors raised while building an index from an annotation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid transcript table for chromosome '{chr}': {source}")]
    Table {
        chr: String,
        #[source]
        source: IndexError,
    },
}
