use std::time::{Duration, Instant};

use kamusi_client::{ClientEvent, ClientHandle, ClientSettings};
use kamusi_core::QueryRequest;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collect_until<F>(handle: &ClientHandle, deadline: Duration, mut done: F) -> Vec<ClientEvent>
where
    F: FnMut(&ClientEvent) -> bool,
{
    let start = Instant::now();
    let mut events = Vec::new();
    while start.elapsed() < deadline {
        if let Some(event) = handle.recv_timeout(Duration::from_millis(50)) {
            let finished = done(&event);
            events.push(event);
            if finished {
                break;
            }
        }
    }
    events
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handle_tags_stream_events_with_query_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "data: {\"step\":\"guard_check\",\"status\":\"done\",\"data\":{\"passed\":true}}\n\n",
                "data: {\"step\":\"complete\",\"status\":\"done\",\"data\":{\"query\":\"chakula\"}}\n\n",
            ),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let handle = ClientHandle::new(ClientSettings::with_base_url(server.uri())).expect("handle");
    handle.start_query(7, QueryRequest::new("chakula"));

    let events = collect_until(&handle, Duration::from_secs(5), |event| {
        matches!(
            event,
            ClientEvent::StreamClosed { .. } | ClientEvent::StreamFailed { .. }
        )
    });

    let steps: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::Step { query_id, event } => Some((*query_id, event.step.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        steps,
        vec![(7, "guard_check".to_string()), (7, "complete".to_string())]
    );
    match events.last() {
        Some(ClientEvent::StreamClosed { query_id, stats }) => {
            assert_eq!(*query_id, 7);
            assert_eq!(stats.events, 2);
        }
        other => panic!("unexpected final event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handle_reports_stream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Internal"})))
        .mount(&server)
        .await;

    let handle = ClientHandle::new(ClientSettings::with_base_url(server.uri())).expect("handle");
    handle.start_query(3, QueryRequest::new("chakula"));

    let events = collect_until(&handle, Duration::from_secs(5), |event| {
        matches!(event, ClientEvent::StreamFailed { .. })
    });
    match events.last() {
        Some(ClientEvent::StreamFailed { query_id, error }) => {
            assert_eq!(*query_id, 3);
            assert_eq!(error.to_string(), "Internal");
        }
        other => panic!("unexpected final event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_poll_repeats_until_stopped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "ollama_connected": true,
            "vector_store": "chromadb",
            "total_entries": 10,
            "model_name": "llama3.2"
        })))
        .mount(&server)
        .await;

    let handle = ClientHandle::new(ClientSettings::with_base_url(server.uri())).expect("handle");
    let poller = handle.poll_health(Duration::from_millis(40));

    let mut seen = 0;
    let events = collect_until(&handle, Duration::from_secs(5), |event| {
        if matches!(event, ClientEvent::Health(Ok(_))) {
            seen += 1;
        }
        seen >= 2
    });
    assert!(events.len() >= 2);

    poller.stop();
    assert!(poller.is_stopped());
    // Let any in-flight check land, then expect silence.
    std::thread::sleep(Duration::from_millis(150));
    while handle.try_recv().is_some() {}
    assert!(handle.recv_timeout(Duration::from_millis(200)).is_none());
}
