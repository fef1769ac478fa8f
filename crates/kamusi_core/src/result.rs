use crate::{DictionaryEntry, QueryResult};

/// How a finished query is presented. Exactly one mode applies per result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// The guard rail rejected the query as out of domain.
    Blocked,
    /// Retrieval confidence was too low to generate an answer.
    LowConfidence,
    /// Normal generated answer with retrieved entries.
    Answer,
}

impl ResultMode {
    pub fn select(result: &QueryResult) -> Self {
        if result.blocked {
            ResultMode::Blocked
        } else if result.below_threshold {
            ResultMode::LowConfidence
        } else {
            ResultMode::Answer
        }
    }
}

impl QueryResult {
    pub fn mode(&self) -> ResultMode {
        ResultMode::select(self)
    }

    /// Retrieved entries minus the top match, which is displayed separately.
    pub fn other_entries(&self) -> impl Iterator<Item = &DictionaryEntry> {
        let top_word = self.top_match.as_ref().map(|top| top.word.as_str());
        self.retrieved_entries
            .iter()
            .filter(move |entry| Some(entry.word.as_str()) != top_word)
    }
}
