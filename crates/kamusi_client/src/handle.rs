use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use kamusi_core::{HealthResponse, QueryId, QueryRequest, StepEvent};
use kamusi_logging::{kamusi_debug, kamusi_warn};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{ApiError, ClientSettings, DictionaryApi, HttpDictionaryClient, StepSink, StreamStats};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Step {
        query_id: QueryId,
        event: StepEvent,
    },
    StreamFailed {
        query_id: QueryId,
        error: ApiError,
    },
    StreamClosed {
        query_id: QueryId,
        stats: StreamStats,
    },
    Health(Result<HealthResponse, ApiError>),
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to start client runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

enum ClientCommand {
    StartQuery {
        query_id: QueryId,
        request: QueryRequest,
    },
    CheckHealth,
    PollHealth {
        interval: Duration,
        token: CancellationToken,
    },
}

/// Runs backend calls on a background tokio runtime and reports back over a
/// channel, so a synchronous UI loop can drive it.
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<ClientCommand>,
    event_rx: mpsc::Receiver<ClientEvent>,
}

impl ClientHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, HandleError> {
        let api = HttpDictionaryClient::new(settings)?;
        Self::with_api(Arc::new(api))
    }

    pub fn with_api(api: Arc<dyn DictionaryApi>) -> Result<Self, HandleError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let api = api.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(api.as_ref(), command, event_tx).await;
                });
            }
        });

        Ok(Self { cmd_tx, event_rx })
    }

    /// Streams one query. Streams are not cancellable; callers drop events
    /// whose `query_id` is stale.
    pub fn start_query(&self, query_id: QueryId, request: QueryRequest) {
        let _ = self
            .cmd_tx
            .send(ClientCommand::StartQuery { query_id, request });
    }

    pub fn check_health(&self) {
        let _ = self.cmd_tx.send(ClientCommand::CheckHealth);
    }

    /// Checks health now and then every `interval` until the poller is
    /// stopped or dropped.
    pub fn poll_health(&self, interval: Duration) -> HealthPoller {
        let token = CancellationToken::new();
        let _ = self.cmd_tx.send(ClientCommand::PollHealth {
            interval,
            token: token.clone(),
        });
        HealthPoller { token }
    }

    pub fn try_recv(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

/// Stops the periodic health check when stopped or dropped.
#[derive(Debug)]
pub struct HealthPoller {
    token: CancellationToken,
}

impl HealthPoller {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct ChannelStepSink {
    query_id: QueryId,
    tx: mpsc::Sender<ClientEvent>,
}

impl StepSink for ChannelStepSink {
    fn emit(&self, event: StepEvent) {
        let _ = self.tx.send(ClientEvent::Step {
            query_id: self.query_id,
            event,
        });
    }
}

async fn handle_command(
    api: &dyn DictionaryApi,
    command: ClientCommand,
    event_tx: mpsc::Sender<ClientEvent>,
) {
    match command {
        ClientCommand::StartQuery { query_id, request } => {
            kamusi_debug!("Starting stream for query {} ({})", query_id, request.query);
            let sink = ChannelStepSink {
                query_id,
                tx: event_tx.clone(),
            };
            let event = match api.query_stream(&request, &sink).await {
                Ok(stats) => ClientEvent::StreamClosed { query_id, stats },
                Err(error) => {
                    kamusi_warn!("Stream for query {} failed: {}", query_id, error);
                    ClientEvent::StreamFailed { query_id, error }
                }
            };
            let _ = event_tx.send(event);
        }
        ClientCommand::CheckHealth => {
            let _ = event_tx.send(ClientEvent::Health(api.health().await));
        }
        ClientCommand::PollHealth { interval, token } => {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                if token.run_until_cancelled(ticker.tick()).await.is_none() {
                    break;
                }
                let Some(result) = token.run_until_cancelled(api.health()).await else {
                    break;
                };
                if event_tx.send(ClientEvent::Health(result)).is_err() {
                    break;
                }
            }
            kamusi_debug!("Health poll stopped");
        }
    }
}
