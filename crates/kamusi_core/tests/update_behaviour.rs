use std::sync::Once;

use kamusi_core::{
    update, AppState, Effect, HealthResponse, Language, Msg, Payload, QueryId, QueryRequest,
    StepEvent, StepStatus, NO_RESULT_MESSAGE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(kamusi_logging::initialize_for_tests);
}

fn submit(state: AppState, input: &str) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::QueryChanged(input.to_string()));
    update(state, Msg::SearchSubmitted)
}

fn started_query(effects: &[Effect]) -> QueryId {
    effects
        .iter()
        .map(|effect| match effect {
            Effect::StartQueryStream { query_id, .. } => *query_id,
        })
        .next()
        .expect("start effect")
}

fn frame(query_id: QueryId, json: &str, received_at: u64) -> Msg {
    Msg::StreamEvent {
        query_id,
        event: serde_json::from_str::<StepEvent>(json).unwrap(),
        received_at,
    }
}

#[test]
fn submit_trims_query_and_emits_stream_effect() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::LanguageChanged(Language::Swahili));
    let (state, _) = update(state, Msg::TopKChanged(5));
    let (mut state, effects) = submit(state, "  chakula \n");

    assert_eq!(
        effects,
        vec![Effect::StartQueryStream {
            query_id: 1,
            request: QueryRequest {
                query: "chakula".to_string(),
                k: Some(5),
                language: Some(Language::Swahili),
            },
        }]
    );
    let view = state.view();
    assert!(view.loading);
    assert!(!view.can_submit);
    assert!(!view.show_welcome);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn blank_query_is_not_submitted() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "   \n\t");
    assert!(effects.is_empty());
    assert!(!state.is_loading());
    assert!(state.view().show_welcome);
}

#[test]
fn unsupported_k_is_ignored() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::TopKChanged(7));
    assert_eq!(state.form().k, 3);
}

#[test]
fn stream_builds_steps_then_result() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "chakula");
    let id = started_query(&effects);

    let (state, _) = update(state, frame(id, r#"{"step":"guard_check","status":"running","data":{}}"#, 10));
    let (state, _) = update(state, frame(id, r#"{"step":"guard_check","status":"done","data":{"passed":true}}"#, 40));
    let (state, _) = update(state, frame(id, r#"{"step":"vector_search","status":"running","data":{}}"#, 45));
    assert_eq!(state.steps().ids(), vec!["guard_check", "vector_search"]);
    assert!(state.result().is_none());

    let (state, _) = update(
        state,
        frame(
            id,
            r#"{"step":"complete","status":"done","data":{"query":"chakula","language":"sw","response":"food"}}"#,
            90,
        ),
    );
    let (state, _) = update(state, Msg::StreamClosed { query_id: id });

    assert_eq!(state.steps().len(), 2);
    assert_eq!(state.result().unwrap().query, "chakula");
    assert!(!state.is_loading());
    assert!(state.error().is_none());
    assert!(state.view().result.is_some());
}

#[test]
fn backend_error_frame_surfaces_message() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "chakula");
    let id = started_query(&effects);

    let (state, _) = update(state, frame(id, r#"{"step":"error","status":"error","data":{"message":"boom"}}"#, 5));
    let (state, _) = update(state, Msg::StreamClosed { query_id: id });

    assert_eq!(state.error(), Some("boom"));
    assert!(state.result().is_none());
    assert!(state.view().result.is_none());
    assert_eq!(state.view().error.as_deref(), Some("boom"));
}

#[test]
fn frames_after_terminal_frame_are_ignored() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "chakula");
    let id = started_query(&effects);

    let (state, _) = update(state, frame(id, r#"{"step":"error","status":"error","data":{"message":"boom"}}"#, 5));
    let (mut state, _) = update(state, Msg::Tick);
    state.consume_dirty();
    let (state, _) = update(
        state,
        frame(id, r#"{"step":"complete","status":"done","data":{"query":"chakula"}}"#, 6),
    );
    let (mut state, _) = update(state, frame(id, r#"{"step":"llm_generation","status":"running"}"#, 7));
    assert!(!state.consume_dirty());

    assert_eq!(state.error(), Some("boom"));
    assert!(state.result().is_none());
    assert!(state.steps().is_empty());

    let (state, _) = update(state, Msg::StreamClosed { query_id: id });
    assert!(!state.is_loading());

    // A later search starts accepting frames again.
    let (state, effects) = submit(state, "maji");
    let next = started_query(&effects);
    let (state, _) = update(state, frame(next, r#"{"step":"guard_check","status":"running"}"#, 8));
    assert_eq!(state.steps().ids(), vec!["guard_check"]);
    assert!(state.error().is_none());
}

#[test]
fn stream_closing_without_final_frame_is_an_error() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "chakula");
    let id = started_query(&effects);
    let (state, _) = update(state, frame(id, r#"{"step":"guard_check","status":"done"}"#, 3));
    let (state, _) = update(state, Msg::StreamClosed { query_id: id });

    assert!(!state.is_loading());
    assert_eq!(state.error(), Some(NO_RESULT_MESSAGE));
    assert_eq!(state.view().error.as_deref(), Some(NO_RESULT_MESSAGE));
}

#[test]
fn transport_failure_replaces_result() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "chakula");
    let id = started_query(&effects);
    let (state, _) = update(
        state,
        frame(id, r#"{"step":"complete","status":"done","data":{"query":"chakula"}}"#, 5),
    );
    let (state, _) = update(
        state,
        Msg::StreamFailed {
            query_id: id,
            message: "connection reset".to_string(),
        },
    );

    assert_eq!(state.error(), Some("connection reset"));
    assert!(state.result().is_none());
    assert!(!state.is_loading());
}

#[test]
fn new_search_discards_previous_stream() {
    init_logging();
    let (state, effects) = submit(AppState::new(), "chakula");
    let first = started_query(&effects);
    let (state, _) = update(state, frame(first, r#"{"step":"guard_check","status":"running"}"#, 1));

    let (state, effects) = submit(state, "maji");
    let second = started_query(&effects);
    assert_ne!(first, second);
    assert!(state.steps().is_empty());

    let (mut state, _) = update(state, frame(first, r#"{"step":"vector_search","status":"running"}"#, 2));
    assert!(state.steps().is_empty());
    assert!(state.consume_dirty());

    let (mut state, _) = update(state, Msg::StreamClosed { query_id: first });
    assert!(state.is_loading());
    assert!(!state.consume_dirty());

    let (state, _) = update(state, frame(second, r#"{"step":"guard_check","status":"running"}"#, 3));
    assert_eq!(state.steps().ids(), vec!["guard_check"]);
}

#[test]
fn health_updates_are_independent_of_queries() {
    init_logging();
    let health = HealthResponse {
        status: "healthy".to_string(),
        ollama_connected: false,
        vector_store: "chroma".to_string(),
        total_entries: 15234,
        model_name: "llama3".to_string(),
    };
    let (state, _) = update(AppState::new(), Msg::HealthReceived(health.clone()));
    let (state, _) = update(state, Msg::HealthFailed("timeout".to_string()));

    assert_eq!(state.health(), Some(&health));
    let panel = state.view().health.unwrap();
    assert!(!panel.healthy);
    assert_eq!(panel.total_entries, "15,234");
    assert!(panel.warning.is_some());
    assert!(state.steps().is_empty());
}

#[test]
fn step_event_helper_round_trips_payload() {
    let mut data = Payload::new();
    data.insert("message".to_string(), serde_json::json!("Searching..."));
    let event = StepEvent::new("vector_search", StepStatus::Running, data.clone());
    assert_eq!(event.data, data);
}
