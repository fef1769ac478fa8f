//! Decoding of the `data: <json>` frames sent by the query stream.

use std::fmt;

use bytes::Bytes;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{future, stream, Stream, StreamExt};
use kamusi_core::StepEvent;

/// Blank lines appended to the body so an unterminated last frame is still
/// dispatched when the connection closes.
const END_OF_BODY: &[u8] = b"\n\n";

/// One decoded event of the query stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Step(StepEvent),
    /// The event could not be decoded. The stream carries on.
    Malformed { data: String, reason: String },
}

/// Turns a chunked body into frames, one per server-sent event.
///
/// Events are yielded as soon as their terminating blank line arrives, and
/// UTF-8 sequences split across chunks are reassembled. Events with an empty
/// payload are dropped. Transport errors end the stream.
pub fn decode_frames<S, E>(body: S) -> impl Stream<Item = Result<Frame, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    body.chain(stream::once(future::ready(Ok(Bytes::from_static(END_OF_BODY)))))
        .eventsource()
        .filter_map(|item| {
            future::ready(match item {
                Ok(event) => parse_data(&event.data).map(Ok),
                Err(EventStreamError::Transport(err)) => Some(Err(err)),
                Err(err) => Some(Ok(Frame::Malformed {
                    data: String::new(),
                    reason: err.to_string(),
                })),
            })
        })
}

/// Parses one event payload. `None` when the payload is blank.
pub fn parse_data(data: &str) -> Option<Frame> {
    let raw = data.trim();
    if raw.is_empty() {
        return None;
    }
    Some(match serde_json::from_str(raw) {
        Ok(event) => Frame::Step(event),
        Err(err) => Frame::Malformed {
            data: raw.to_string(),
            reason: err.to_string(),
        },
    })
}
