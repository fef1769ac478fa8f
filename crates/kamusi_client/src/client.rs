use std::pin::pin;
use std::sync::{Mutex, PoisonError};

use futures_util::StreamExt;
use kamusi_core::{
    BatchQueryRequest, BatchQueryResponse, ErrorResponse, HealthResponse, QueryRequest,
    QueryResult, SearchRequest, SearchResponse, StepEvent, StreamSignal,
};
use kamusi_logging::{kamusi_debug, kamusi_info};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::map_reqwest_error;
use crate::settings::API_PREFIX;
use crate::sse::{decode_frames, Frame};
use crate::{ApiError, ClientSettings};

/// Receives step events while a query stream is being read.
pub trait StepSink: Send + Sync {
    fn emit(&self, event: StepEvent);
}

impl<F> StepSink for F
where
    F: Fn(StepEvent) + Send + Sync,
{
    fn emit(&self, event: StepEvent) {
        self(event)
    }
}

/// Counters for one drained stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub bytes: u64,
    pub events: usize,
    pub skipped: usize,
}

#[async_trait::async_trait]
pub trait DictionaryApi: Send + Sync {
    async fn health(&self) -> Result<HealthResponse, ApiError>;

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, ApiError>;

    async fn batch_query(
        &self,
        request: &BatchQueryRequest,
    ) -> Result<BatchQueryResponse, ApiError>;

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ApiError>;

    /// Opens the query stream and hands every decoded frame to `sink` before
    /// reading on. Returns once the body is drained.
    async fn query_stream(
        &self,
        request: &QueryRequest,
        sink: &dyn StepSink,
    ) -> Result<StreamStats, ApiError>;

    /// Streams a query, forwarding pipeline steps to `sink`, and resolves to
    /// the final answer. An `error` frame becomes [`ApiError::Backend`].
    async fn query_and_collect(
        &self,
        request: &QueryRequest,
        sink: &dyn StepSink,
    ) -> Result<QueryResult, ApiError> {
        let outcome: Mutex<Option<StreamSignal>> = Mutex::new(None);
        let collector = |event: StepEvent| {
            if !event.is_terminal() {
                sink.emit(event);
                return;
            }
            let mut slot = outcome.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(event.into_signal());
            }
        };
        self.query_stream(request, &collector).await?;

        match outcome.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(StreamSignal::Complete(result)) => Ok(*result),
            Some(StreamSignal::Failed(message)) => Err(ApiError::Backend(message)),
            Some(StreamSignal::Step(_)) | None => Err(ApiError::Json(
                "stream ended without a final result".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpDictionaryClient {
    settings: ClientSettings,
    base_url: Url,
    client: reqwest::Client,
}

impl HttpDictionaryClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(settings.base_url.trim())
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", settings.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                settings.base_url,
                base_url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            API_PREFIX,
            path
        )
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|err| ApiError::Json(err.to_string()))?;
        let response = self
            .client
            .post(self.endpoint(path))
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.settings.request_timeout)
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }
}

#[async_trait::async_trait]
impl DictionaryApi for HttpDictionaryClient {
    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let response = self
            .client
            .get(self.endpoint("/health"))
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, ApiError> {
        self.post_json("/query", request).await
    }

    async fn batch_query(
        &self,
        request: &BatchQueryRequest,
    ) -> Result<BatchQueryResponse, ApiError> {
        self.post_json("/batch-query", request).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ApiError> {
        self.post_json("/search", request).await
    }

    async fn query_stream(
        &self,
        request: &QueryRequest,
        sink: &dyn StepSink,
    ) -> Result<StreamStats, ApiError> {
        let payload =
            serde_json::to_vec(request).map_err(|err| ApiError::Json(err.to_string()))?;
        let response = self
            .client
            .post(self.endpoint("/query/stream"))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut stats = StreamStats::default();
        let mut received = 0u64;
        {
            let body = response.bytes_stream().inspect(|chunk| {
                if let Ok(chunk) = chunk {
                    received += chunk.len() as u64;
                }
            });
            let mut frames = pin!(decode_frames(body));
            while let Some(frame) = frames.next().await {
                match frame.map_err(map_reqwest_error)? {
                    Frame::Step(event) => {
                        stats.events += 1;
                        sink.emit(event);
                    }
                    Frame::Malformed { data, reason } => {
                        stats.skipped += 1;
                        kamusi_debug!("Skipping malformed stream frame ({}): {}", reason, data);
                    }
                }
            }
        }
        stats.bytes = received;

        if stats.bytes == 0 {
            return Err(ApiError::EmptyStream);
        }
        kamusi_info!(
            "Stream for '{}' drained: {} events, {} skipped, {} bytes",
            request.query,
            stats.events,
            stats.skipped,
            stats.bytes
        );
        Ok(stats)
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body).map_err(|err| ApiError::Json(err.to_string()))
}

/// Prefers the backend's JSON `error` field; falls back to the status line.
async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let fallback = ApiError::Http {
        status: status.as_u16(),
        message: format!(
            "HTTP Error {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        ),
        detail: None,
    };

    let Ok(body) = response.bytes().await else {
        return fallback;
    };
    match serde_json::from_slice::<ErrorResponse>(&body) {
        Ok(error) => ApiError::Http {
            status: status.as_u16(),
            message: if error.error.is_empty() {
                "An error occurred".to_string()
            } else {
                error.error
            },
            detail: error.detail,
        },
        Err(_) => fallback,
    }
}
