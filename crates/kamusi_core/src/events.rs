use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::QueryResult;

/// Opaque key-value payload attached to a step event.
pub type Payload = Map<String, Value>;

/// Step identifier carrying the final answer.
pub const COMPLETE_STEP: &str = "complete";
/// Step identifier carrying a backend-signaled failure.
pub const ERROR_STEP: &str = "error";

const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Known step that has not been reported yet. Never sent by the backend.
    Pending,
    Running,
    Done,
    Error,
    Complete,
}

/// One frame of the query stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub step: String,
    pub status: StepStatus,
    #[serde(default)]
    pub data: Payload,
}

impl StepEvent {
    pub fn new(step: impl Into<String>, status: StepStatus, data: Payload) -> Self {
        Self {
            step: step.into(),
            status,
            data,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.step == COMPLETE_STEP || self.step == ERROR_STEP
    }

    /// Routes the event: sentinels become a result or a failure, everything
    /// else is a pipeline step for the reducer.
    pub fn into_signal(self) -> StreamSignal {
        if self.step == COMPLETE_STEP {
            return match serde_json::from_value::<QueryResult>(Value::Object(self.data)) {
                Ok(result) => StreamSignal::Complete(Box::new(result)),
                Err(err) => StreamSignal::Failed(format!("Malformed final result: {err}")),
            };
        }
        if self.step == ERROR_STEP {
            let message = self
                .data
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .unwrap_or(FALLBACK_ERROR_MESSAGE);
            return StreamSignal::Failed(message.to_string());
        }
        StreamSignal::Step(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    Step(StepEvent),
    Complete(Box<QueryResult>),
    Failed(String),
}

/// Pipeline stages the backend is known to emit, in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StepKind {
    GuardCheck,
    LanguageDetection,
    VectorSearch,
    ScoreCheck,
    Reranking,
    PromptBuild,
    LlmGeneration,
}

impl StepKind {
    pub const ALL: [StepKind; 7] = [
        StepKind::GuardCheck,
        StepKind::LanguageDetection,
        StepKind::VectorSearch,
        StepKind::ScoreCheck,
        StepKind::Reranking,
        StepKind::PromptBuild,
        StepKind::LlmGeneration,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn id(self) -> &'static str {
        match self {
            StepKind::GuardCheck => "guard_check",
            StepKind::LanguageDetection => "language_detection",
            StepKind::VectorSearch => "vector_search",
            StepKind::ScoreCheck => "score_check",
            StepKind::Reranking => "reranking",
            StepKind::PromptBuild => "prompt_build",
            StepKind::LlmGeneration => "llm_generation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepKind::GuardCheck => "Guard Rail",
            StepKind::LanguageDetection => "Language Detection",
            StepKind::VectorSearch => "Vector Search",
            StepKind::ScoreCheck => "Confidence Check",
            StepKind::Reranking => "Cross-Encoder Reranking",
            StepKind::PromptBuild => "Building Prompt",
            StepKind::LlmGeneration => "AI Generation",
        }
    }

    /// Reranking only shows up when the backend runs it.
    pub fn is_conditional(self) -> bool {
        matches!(self, StepKind::Reranking)
    }
}
