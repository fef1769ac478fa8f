//! Kamusi client: HTTP and SSE access to the dictionary backend.
mod client;
mod error;
mod handle;
mod settings;
mod sse;

pub use client::{DictionaryApi, HttpDictionaryClient, StepSink, StreamStats};
pub use error::ApiError;
pub use handle::{ClientEvent, ClientHandle, HandleError, HealthPoller};
pub use settings::{ClientSettings, API_PREFIX, DEFAULT_BASE_URL};
pub use sse::{decode_frames, parse_data, Frame};
