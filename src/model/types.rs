use std::fmt;

use clap::ValueEnum;
use serde::{Serialize, Deserialize};

/// Internal numeric IDs (indexes into Vecs).
pub type GeneId = usize;
pub type TranscriptId = usize;

/// Which terminus of an alignment is used as the query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum EndpointMode {
    /// 5' end: first base on forward alignments, last base on reverse ones.
    #[value(name = "5p")]
    FivePrime,
    /// 3' end: last base on forward alignments, first base on reverse ones.
    #[value(name = "3p")]
    ThreePrime,
}

/// Library strandedness relative to the annotated transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum StrandFilter {
    /// No strand check.
    Unspecified,
    /// Read must be sense to the transcript.
    Forward,
    /// Read must be antisense to the transcript.
    Reverse,
}

/// Which mates of a fragment are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum MatePolicy {
    #[value(name = "primary")]
    PrimaryOnly,
    #[value(name = "all")]
    AllMates,
}

impl MatePolicy {
    #[inline]
    pub fn includes(self, mate: u8) -> bool {
        match self {
            MatePolicy::PrimaryOnly => mate == 0,
            MatePolicy::AllMates => true,
        }
    }
}

/// Classification outcome of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverlapType {
    #[default]
    Unassigned,
    Exonic,
}

impl fmt::Display for OverlapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverlapType::Unassigned => "Unassigned",
            OverlapType::Exonic => "Exonic",
        };
        write!(f, "{s}")
    }
}

/// Options held constant for a whole classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyOptions {
    pub endpoint: EndpointMode,
    pub strand: StrandFilter,
    pub mates: MatePolicy,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            endpoint: EndpointMode::FivePrime,
            strand: StrandFilter::Unspecified,
            mates: MatePolicy::AllMates,
        }
    }
}
