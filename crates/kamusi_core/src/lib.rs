//! Kamusi core: wire models, the step reducer and a pure state machine with
//! view-model helpers.
mod describe;
mod effect;
mod events;
mod models;
mod msg;
mod result;
mod state;
mod steps;
mod update;
mod view_model;

pub use describe::{
    format_elapsed, format_percent, format_with_commas, step_description, vector_search_chips,
    SimilarityTier,
};
pub use effect::Effect;
pub use events::{Payload, StepEvent, StepKind, StepStatus, StreamSignal, COMPLETE_STEP, ERROR_STEP};
pub use models::{
    BatchQueryRequest, BatchQueryResponse, DictionaryEntry, ErrorResponse, HealthResponse,
    Language, QueryRequest, QueryResult, SearchRequest, SearchResponse,
};
pub use msg::Msg;
pub use result::ResultMode;
pub use state::{AppState, QueryId, SearchForm, DEFAULT_TOP_K, TOP_K_CHOICES};
pub use steps::{apply_step_event, DisplayStep, Millis, StepList};
pub use update::{update, NO_RESULT_MESSAGE};
pub use view_model::{
    entry_view, health_panel, pipeline_rows, result_view, AppViewModel, EntryChip, EntryView,
    HealthPanel, PipelineRow, ResultBody, ResultView,
};
