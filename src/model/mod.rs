pub mod types;
pub mod transcript;
pub mod gene;

pub use types::{
    ClassifyOptions, EndpointMode, MatePolicy, OverlapType, StrandFilter,
    GeneId, TranscriptId
};
