//! gtf_endpoint_index
//!
//! Classifies read alignments by the annotated exons their 5' or 3'
//! endpoint falls into. Alignments are genomic blocks (0-based,
//! half-open); the transcript index is built once from a GTF/GFF3 file and
//! shared read-only between classifiers.

pub mod types;
pub mod error;
pub mod model;
pub mod annotation;
pub mod table;
pub mod index;
pub mod feature;
pub mod observe;
pub mod classify;
pub mod reads;

pub use index::{EndpointIndex, IdNameKeys};
pub use annotation::AnnotationBuilder;
pub use classify::{select_endpoint, Classifier};
pub use error::{BuildError, ClassifyError, IndexError};
pub use feature::AnnotationFeature;
pub use observe::{ClassifyObserver, CountingObserver, Counters, LogObserver, NoopObserver};
pub use table::{TranscriptRow, TranscriptTable, Verdict};

pub use types::{Alignment, RefBlock, Strand};

pub use model::transcript::Transcript;
pub use model::gene::Gene;
pub use model::{
    ClassifyOptions, EndpointMode, GeneId, MatePolicy, OverlapType, StrandFilter, TranscriptId,
};
