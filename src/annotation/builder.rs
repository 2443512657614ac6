use std::io::BufRead;
use std::path::Path;

use crate::annotation::io::open_annotation;
use crate::error::BuildError;
use crate::index::{EndpointIndex, IdNameKeys};

/// Builds an [`EndpointIndex`] from a GTF/GFF3 annotation.
///
/// Wraps the attribute-key configuration so callers can adapt to files
/// that name their gene/transcript attributes differently.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    pub keys: IdNameKeys,
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|s| s.to_string()).collect()
}

impl AnnotationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: IdNameKeys) -> Self {
        Self { keys }
    }

    /// Single key for the gene id.
    pub fn gene_id_key(mut self, key: &str) -> Self {
        self.keys.gene_id_keys = vec![key.to_string()];
        self
    }

    pub fn gene_name_keys(mut self, keys: &[&str]) -> Self {
        self.keys.gene_name_keys = owned(keys);
        self
    }

    /// Transcript id keys. Leave empty to link exons through `parent_keys`.
    pub fn transcript_id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.transcript_id_keys = owned(keys);
        self
    }

    pub fn transcript_name_keys(mut self, keys: &[&str]) -> Self {
        self.keys.transcript_name_keys = owned(keys);
        self
    }

    pub fn parent_keys(mut self, keys: &[&str]) -> Self {
        self.keys.parent_keys = owned(keys);
        self
    }

    /// Feature types whose lines become exons (usually just "exon").
    pub fn exon_feature_types(mut self, types: &[&str]) -> Self {
        self.keys.exon_feature_types = owned(types);
        self
    }

    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<EndpointIndex, BuildError> {
        EndpointIndex::new().from_reader(reader, self.keys.clone())
    }

    /// Build from a file; `.gz` files are decompressed on the fly.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<EndpointIndex, BuildError> {
        let reader = open_annotation(path.as_ref())?;
        self.build_from_reader(reader)
    }
}
