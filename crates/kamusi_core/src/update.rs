use kamusi_logging::{kamusi_debug, kamusi_warn};

use crate::{AppState, Effect, Msg, StreamSignal};

/// Shown when a stream closes before its `complete` or `error` frame.
pub const NO_RESULT_MESSAGE: &str = "No result received from the backend";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::QueryChanged(query) => {
            state.set_query(query);
            Vec::new()
        }
        Msg::TopKChanged(k) => {
            if !state.set_top_k(k) {
                kamusi_debug!("Ignoring unsupported k={}", k);
            }
            Vec::new()
        }
        Msg::LanguageChanged(language) => {
            state.set_language(language);
            Vec::new()
        }
        Msg::PipelineStepsToggled(show) => {
            state.set_show_pipeline_steps(show);
            Vec::new()
        }
        Msg::SearchSubmitted => match state.begin_query() {
            Some((query_id, request)) => vec![Effect::StartQueryStream { query_id, request }],
            None => Vec::new(),
        },
        Msg::StreamEvent {
            query_id,
            event,
            received_at,
        } => {
            if !state.accepts_frames(query_id) {
                kamusi_debug!(
                    "Dropping step '{}' from query {} (stale or already ended)",
                    event.step,
                    query_id
                );
                return (state, Vec::new());
            }
            match event.into_signal() {
                StreamSignal::Step(event) => state.apply_step(&event, received_at),
                StreamSignal::Complete(result) => {
                    state.set_result(*result);
                    state.end_frames();
                }
                StreamSignal::Failed(message) => {
                    state.fail(message);
                    state.end_frames();
                }
            }
            Vec::new()
        }
        Msg::StreamFailed { query_id, message } => {
            if state.is_active(query_id) {
                state.fail(message);
                state.end_frames();
                state.finish_loading();
            }
            Vec::new()
        }
        Msg::StreamClosed { query_id } => {
            if state.accepts_frames(query_id) {
                kamusi_warn!("Stream for query {} closed without a final frame", query_id);
                state.fail(NO_RESULT_MESSAGE.to_string());
                state.end_frames();
            }
            if state.is_active(query_id) {
                state.finish_loading();
            }
            Vec::new()
        }
        Msg::HealthReceived(health) => {
            state.set_health(health);
            Vec::new()
        }
        Msg::HealthFailed(message) => {
            kamusi_warn!("Failed to fetch health status: {}", message);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
