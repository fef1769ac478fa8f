use crate::steps::apply_step_event;
use crate::view_model::{build_view, AppViewModel};
use crate::{
    HealthResponse, Language, Millis, QueryRequest, QueryResult, StepEvent, StepList,
};

pub type QueryId = u64;

/// Entry counts the search form offers.
pub const TOP_K_CHOICES: [u32; 2] = [3, 5];
pub const DEFAULT_TOP_K: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    pub query: String,
    pub k: u32,
    pub language: Language,
    pub show_pipeline_steps: bool,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self {
            query: String::new(),
            k: DEFAULT_TOP_K,
            language: Language::Auto,
            show_pipeline_steps: true,
        }
    }
}

impl SearchForm {
    /// Trimmed query, or `None` when there is nothing to search for.
    pub fn submittable_query(&self) -> Option<&str> {
        let trimmed = self.query.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    form: SearchForm,
    next_query_id: QueryId,
    active_query: Option<QueryId>,
    /// The active stream already delivered its `complete` or `error` frame.
    frames_ended: bool,
    loading: bool,
    steps: StepList,
    result: Option<QueryResult>,
    error: Option<String>,
    health: Option<HealthResponse>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(form: SearchForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        build_view(self)
    }

    pub fn form(&self) -> &SearchForm {
        &self.form
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn health(&self) -> Option<&HealthResponse> {
        self.health.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn active_query(&self) -> Option<QueryId> {
        self.active_query
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_query(&mut self, query: String) {
        if self.form.query != query {
            self.form.query = query;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_top_k(&mut self, k: u32) -> bool {
        if !TOP_K_CHOICES.contains(&k) {
            return false;
        }
        if self.form.k != k {
            self.form.k = k;
            self.mark_dirty();
        }
        true
    }

    pub(crate) fn set_language(&mut self, language: Language) {
        if self.form.language != language {
            self.form.language = language;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_show_pipeline_steps(&mut self, show: bool) {
        if self.form.show_pipeline_steps != show {
            self.form.show_pipeline_steps = show;
            self.mark_dirty();
        }
    }

    /// Resets the previous query's output and allocates a fresh id.
    pub(crate) fn begin_query(&mut self) -> Option<(QueryId, QueryRequest)> {
        let query = self.form.submittable_query()?.to_string();
        self.next_query_id += 1;
        let query_id = self.next_query_id;
        self.active_query = Some(query_id);
        self.frames_ended = false;
        self.loading = true;
        self.steps = StepList::new();
        self.result = None;
        self.error = None;
        self.mark_dirty();

        let request = QueryRequest {
            query,
            k: Some(self.form.k),
            language: Some(self.form.language),
        };
        Some((query_id, request))
    }

    pub(crate) fn is_active(&self, query_id: QueryId) -> bool {
        self.active_query == Some(query_id)
    }

    /// Frames are taken only from the active query and only until its
    /// terminal frame.
    pub(crate) fn accepts_frames(&self, query_id: QueryId) -> bool {
        self.is_active(query_id) && !self.frames_ended
    }

    pub(crate) fn end_frames(&mut self) {
        self.frames_ended = true;
    }

    pub(crate) fn apply_step(&mut self, event: &StepEvent, now: Millis) {
        self.steps = apply_step_event(&self.steps, event, now);
        self.mark_dirty();
    }

    pub(crate) fn set_result(&mut self, result: QueryResult) {
        self.result = Some(result);
        self.mark_dirty();
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.result = None;
        self.error = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn finish_loading(&mut self) {
        if self.loading {
            self.loading = false;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_health(&mut self, health: HealthResponse) {
        if self.health.as_ref() != Some(&health) {
            self.health = Some(health);
            self.mark_dirty();
        }
    }
}
