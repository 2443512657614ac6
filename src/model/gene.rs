use crate::model::types::{TranscriptId, GeneId};
use serde::{Serialize, Deserialize};

/// Gene model.
///
/// `stable_id` is the annotation key the gene was interned under (e.g.
/// `ENSG...`); it is what classification output reports. `names[0]` is the
/// display name, the rest are aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub id: GeneId,
    pub stable_id: String,
    pub names: Vec<String>,
    transcript_ids: Vec<TranscriptId>,
}

impl Gene {
    pub fn new(id: GeneId, stable_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            stable_id: stable_id.into(),
            names: vec![display_name.into()],
            transcript_ids: Vec::new(),
        }
    }

    /// Add an alias (deduped, blank names ignored).
    pub fn add_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || self.names.iter().any(|n| n == name) {
            return;
        }
        self.names.push(name.to_string());
    }

    pub fn display_name(&self) -> &str {
        self.names.first().map(|s| s.as_str()).unwrap_or(&self.stable_id)
    }

    pub fn add_transcript(&mut self, tx_id: TranscriptId) {
        if !self.transcript_ids.contains(&tx_id) {
            self.transcript_ids.push(tx_id);
        }
    }

    pub fn transcript_ids(&self) -> &[TranscriptId] {
        &self.transcript_ids
    }

    pub fn finalize(&mut self) {
        self.transcript_ids.sort_unstable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_deduped_and_display_name_kept() {
        let mut g = Gene::new(0, "ENSG01", "Alpha");
        g.add_name("Alpha");
        g.add_name("ENSG01");
        g.add_name("  ");
        assert_eq!(g.names, vec!["Alpha".to_string(), "ENSG01".to_string()]);
        assert_eq!(g.display_name(), "Alpha");
        assert_eq!(g.stable_id, "ENSG01");
    }

    #[test]
    fn transcripts_are_unique_and_sorted_after_finalize() {
        let mut g = Gene::new(1, "G2", "G2");
        g.add_transcript(5);
        g.add_transcript(2);
        g.add_transcript(5);
        assert_eq!(g.transcript_ids(), &[5, 2]);

        g.finalize();
        assert_eq!(g.transcript_ids(), &[2, 5]);
    }
}
