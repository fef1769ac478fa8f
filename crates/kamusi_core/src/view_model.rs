use crate::describe::{
    format_elapsed, format_percent, format_with_commas, step_description, vector_search_chips,
    SimilarityTier,
};
use crate::{
    AppState, DictionaryEntry, HealthResponse, Language, QueryResult, ResultMode, StepKind,
    StepList, StepStatus,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub query: String,
    pub k: u32,
    pub language: Language,
    pub show_pipeline_steps: bool,
    pub can_submit: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub health: Option<HealthPanel>,
    pub pipeline: Vec<PipelineRow>,
    pub result: Option<ResultView>,
    /// Nothing to show yet: no result, no error, no steps, not loading.
    pub show_welcome: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPanel {
    pub status: String,
    pub healthy: bool,
    pub model_name: String,
    pub vector_store: String,
    pub total_entries: String,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRow {
    pub step: String,
    pub label: String,
    pub status: StepStatus,
    pub description: String,
    pub elapsed: Option<String>,
    pub chips: Vec<EntryChip>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryChip {
    pub word: String,
    pub percent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub query: String,
    pub language: String,
    pub processing_time: Option<String>,
    pub body: ResultBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultBody {
    /// The query was refused as out of domain.
    Blocked { message: String },
    /// Retrieval was too weak to answer; closest entries are still listed.
    LowConfidence {
        message: String,
        closest: Vec<EntryView>,
    },
    Answer {
        response: String,
        total_retrieved: usize,
        top_match: Option<EntryView>,
        entries: Vec<EntryView>,
    },
}

impl ResultBody {
    pub fn mode(&self) -> ResultMode {
        match self {
            ResultBody::Blocked { .. } => ResultMode::Blocked,
            ResultBody::LowConfidence { .. } => ResultMode::LowConfidence,
            ResultBody::Answer { .. } => ResultMode::Answer,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub word: String,
    pub part_of_speech: Option<String>,
    pub similarity: String,
    pub tier: SimilarityTier,
    pub definition_en: Option<String>,
    pub definition_sw: Option<String>,
    pub synonyms: Option<String>,
    pub examples: Vec<String>,
    pub is_top_match: bool,
}

pub(crate) fn build_view(state: &AppState) -> AppViewModel {
    let form = state.form();
    let pipeline = if form.show_pipeline_steps {
        pipeline_rows(state.steps())
    } else {
        Vec::new()
    };

    AppViewModel {
        query: form.query.clone(),
        k: form.k,
        language: form.language,
        show_pipeline_steps: form.show_pipeline_steps,
        can_submit: !state.is_loading() && form.submittable_query().is_some(),
        loading: state.is_loading(),
        error: state.error().map(ToOwned::to_owned),
        health: state.health().map(health_panel),
        pipeline,
        result: state
            .error()
            .is_none()
            .then(|| state.result().map(result_view))
            .flatten(),
        show_welcome: state.result().is_none()
            && !state.is_loading()
            && state.error().is_none()
            && state.steps().is_empty(),
        dirty: state.dirty(),
    }
}

/// Canonical rows first (reranking only once seen), then any steps the
/// backend sent that this client does not know about.
pub fn pipeline_rows(steps: &StepList) -> Vec<PipelineRow> {
    if steps.is_empty() {
        return Vec::new();
    }

    let mut rows: Vec<PipelineRow> = StepKind::ALL
        .into_iter()
        .filter(|kind| !kind.is_conditional() || steps.contains(kind.id()))
        .map(|kind| match steps.get(kind.id()) {
            Some(step) => row_for(kind.label(), step),
            None => PipelineRow {
                step: kind.id().to_string(),
                label: kind.label().to_string(),
                status: StepStatus::Pending,
                description: String::new(),
                elapsed: None,
                chips: Vec::new(),
            },
        })
        .collect();

    rows.extend(
        steps
            .iter()
            .filter(|step| StepKind::from_id(&step.step).is_none())
            .map(|step| row_for(&step.step, step)),
    );
    rows
}

fn row_for(label: &str, step: &crate::DisplayStep) -> PipelineRow {
    let chips = if step.step == StepKind::VectorSearch.id() && step.status == StepStatus::Done {
        vector_search_chips(&step.data)
            .into_iter()
            .map(|(word, score)| EntryChip {
                word,
                percent: format_percent(score, 0),
            })
            .collect()
    } else {
        Vec::new()
    };

    PipelineRow {
        step: step.step.clone(),
        label: label.to_string(),
        status: step.status,
        description: step_description(&step.step, step.status, &step.data),
        elapsed: step.elapsed_ms().map(format_elapsed),
        chips,
    }
}

pub fn health_panel(health: &HealthResponse) -> HealthPanel {
    HealthPanel {
        status: health.status.clone(),
        healthy: health.is_healthy(),
        model_name: health.model_name.clone(),
        vector_store: health.vector_store.clone(),
        total_entries: format_with_commas(health.total_entries),
        warning: (!health.ollama_connected).then(|| {
            "Ollama service is not connected. Some features may be unavailable.".to_string()
        }),
    }
}

pub fn result_view(result: &QueryResult) -> ResultView {
    let body = match result.mode() {
        ResultMode::Blocked => ResultBody::Blocked {
            message: result.response.clone(),
        },
        ResultMode::LowConfidence => ResultBody::LowConfidence {
            message: result.response.clone(),
            closest: result
                .retrieved_entries
                .iter()
                .map(|entry| entry_view(entry, false))
                .collect(),
        },
        ResultMode::Answer => ResultBody::Answer {
            response: result.response.clone(),
            total_retrieved: result.retrieved_entries.len(),
            top_match: result.top_match.as_ref().map(|top| entry_view(top, true)),
            entries: result
                .other_entries()
                .map(|entry| entry_view(entry, false))
                .collect(),
        },
    };

    ResultView {
        query: result.query.clone(),
        language: result.language.clone(),
        processing_time: result
            .processing_time_ms
            .filter(|ms| *ms > 0.0)
            .map(|ms| format!("{ms:.0}ms")),
        body,
    }
}

pub fn entry_view(entry: &DictionaryEntry, is_top_match: bool) -> EntryView {
    EntryView {
        word: entry.word.clone(),
        part_of_speech: entry.part_of_speech.clone(),
        similarity: format!("{}%", format_percent(entry.similarity_score, 1)),
        tier: SimilarityTier::for_score(entry.similarity_score),
        definition_en: entry.definition_en.clone(),
        definition_sw: entry.definition_sw.clone(),
        synonyms: entry
            .synonyms
            .as_ref()
            .filter(|synonyms| !synonyms.is_empty())
            .map(|synonyms| synonyms.join(", ")),
        examples: entry
            .examples
            .iter()
            .flatten()
            .map(|example| {
                example
                    .values()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(" / ")
            })
            .filter(|text| !text.is_empty())
            .collect(),
        is_top_match,
    }
}
