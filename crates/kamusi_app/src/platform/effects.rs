use std::time::Duration;

use chrono::Utc;
use kamusi_client::{ClientEvent, ClientHandle, HealthPoller};
use kamusi_core::{Effect, Millis, Msg};
use kamusi_logging::kamusi_info;

/// Runs core effects against the backend and turns client events back into
/// messages.
pub struct EffectRunner {
    client: ClientHandle,
}

impl EffectRunner {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartQueryStream { query_id, request } => {
                    kamusi_info!(
                        "StartQueryStream query_id={} k={:?} language={:?} query={}",
                        query_id,
                        request.k,
                        request.language,
                        request.query
                    );
                    self.client.start_query(query_id, request);
                }
            }
        }
    }

    pub fn check_health(&self) {
        self.client.check_health();
    }

    pub fn poll_health(&self, interval: Duration) -> HealthPoller {
        self.client.poll_health(interval)
    }

    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.client
            .recv_timeout(timeout)
            .map(|event| to_msg(event, now_millis()))
    }

    pub fn try_next_msg(&self) -> Option<Msg> {
        self.client
            .try_recv()
            .map(|event| to_msg(event, now_millis()))
    }
}

pub fn now_millis() -> Millis {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

fn to_msg(event: ClientEvent, received_at: Millis) -> Msg {
    match event {
        ClientEvent::Step { query_id, event } => Msg::StreamEvent {
            query_id,
            event,
            received_at,
        },
        ClientEvent::StreamFailed { query_id, error } => Msg::StreamFailed {
            query_id,
            message: error.to_string(),
        },
        ClientEvent::StreamClosed { query_id, .. } => Msg::StreamClosed { query_id },
        ClientEvent::Health(Ok(health)) => health.into(),
        ClientEvent::Health(Err(err)) => Msg::HealthFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kamusi_client::{ApiError, StreamStats};
    use kamusi_core::{Payload, StepEvent, StepStatus};
    use pretty_assertions::assert_eq;

    #[test]
    fn client_events_map_onto_messages() {
        let event = StepEvent::new("guard_check", StepStatus::Running, Payload::new());
        assert_eq!(
            to_msg(
                ClientEvent::Step {
                    query_id: 2,
                    event: event.clone()
                },
                42
            ),
            Msg::StreamEvent {
                query_id: 2,
                event,
                received_at: 42
            }
        );
        assert_eq!(
            to_msg(
                ClientEvent::StreamFailed {
                    query_id: 2,
                    error: ApiError::EmptyStream
                },
                0
            ),
            Msg::StreamFailed {
                query_id: 2,
                message: "No response body from stream".to_string()
            }
        );
        assert_eq!(
            to_msg(
                ClientEvent::StreamClosed {
                    query_id: 2,
                    stats: StreamStats::default()
                },
                0
            ),
            Msg::StreamClosed { query_id: 2 }
        );
        assert_eq!(
            to_msg(ClientEvent::Health(Err(ApiError::Timeout)), 0),
            Msg::HealthFailed("request timed out".to_string())
        );
    }
}
