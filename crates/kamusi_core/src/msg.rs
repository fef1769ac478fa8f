use crate::{HealthResponse, Language, Millis, QueryId, StepEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the search box.
    QueryChanged(String),
    /// User picked how many entries to retrieve.
    TopKChanged(u32),
    /// User picked the query language.
    LanguageChanged(Language),
    /// User toggled the pipeline steps panel.
    PipelineStepsToggled(bool),
    /// User submitted the current search box.
    SearchSubmitted,
    /// One decoded frame from the query stream, stamped on arrival.
    StreamEvent {
        query_id: QueryId,
        event: StepEvent,
        received_at: Millis,
    },
    /// Transport or HTTP failure for a query stream.
    StreamFailed { query_id: QueryId, message: String },
    /// The query stream was fully drained.
    StreamClosed { query_id: QueryId },
    /// Periodic health poll succeeded.
    HealthReceived(HealthResponse),
    /// Periodic health poll failed.
    HealthFailed(String),
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

impl From<HealthResponse> for Msg {
    fn from(health: HealthResponse) -> Self {
        Msg::HealthReceived(health)
    }
}
