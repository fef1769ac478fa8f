//! Text for pipeline rows, entries and the health panel.

use serde_json::Value;

use crate::{Millis, Payload, StepKind, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityTier {
    High,
    Medium,
    Low,
}

impl SimilarityTier {
    pub fn for_score(score: f64) -> Self {
        if score > 0.8 {
            SimilarityTier::High
        } else if score > 0.6 {
            SimilarityTier::Medium
        } else {
            SimilarityTier::Low
        }
    }
}

/// One-line summary of a step's latest status and payload.
pub fn step_description(step: &str, status: StepStatus, data: &Payload) -> String {
    match status {
        StepStatus::Pending => return String::new(),
        StepStatus::Running => {
            return str_field(data, "message")
                .unwrap_or("Processing...")
                .to_string();
        }
        StepStatus::Error => {
            return str_field(data, "message").unwrap_or("Failed").to_string();
        }
        StepStatus::Done | StepStatus::Complete => {}
    }

    match StepKind::from_id(step) {
        Some(StepKind::GuardCheck) => {
            if bool_field(data, "passed") {
                "Query is relevant to dictionary lookup".to_string()
            } else {
                format!("Blocked · {}", str_field(data, "reason").unwrap_or("out of scope"))
            }
        }
        Some(StepKind::LanguageDetection) => format!(
            "Detected {} ({})",
            str_field(data, "label").unwrap_or("unknown"),
            str_field(data, "language").unwrap_or("?")
        ),
        Some(StepKind::VectorSearch) => {
            let count = f64_field(data, "count");
            if count == 0.0 {
                return "No entries found".to_string();
            }
            format!(
                "{} entries retrieved · Top match: \"{}\" ({}%)",
                count,
                str_field(data, "top_word").unwrap_or(""),
                format_percent(f64_field(data, "top_score"), 1)
            )
        }
        Some(StepKind::ScoreCheck) => {
            let score = format_percent(f64_field(data, "top_score"), 1);
            let threshold = format_percent(f64_field(data, "threshold"), 0);
            if bool_field(data, "passed") {
                format!("Passed · Top score {score}% ≥ {threshold}% threshold")
            } else {
                format!("Below threshold · {score}% < {threshold}% required, skipped LLM")
            }
        }
        Some(StepKind::Reranking) => format!(
            "Cross-encoder scored {} candidates · Kept top {}",
            f64_field(data, "candidates"),
            f64_field(data, "returned")
        ),
        Some(StepKind::PromptBuild) => format!(
            "{} template · {} entries used",
            str_field(data, "template").unwrap_or("default"),
            f64_field(data, "entries_used")
        ),
        Some(StepKind::LlmGeneration) => {
            if bool_field(data, "fallback") {
                "Fallback response (Ollama unavailable)".to_string()
            } else {
                format!(
                    "Generated {} characters with {}",
                    f64_field(data, "response_length"),
                    str_field(data, "model").unwrap_or("unknown model")
                )
            }
        }
        None => "Complete".to_string(),
    }
}

/// `(word, score)` chips listed under a finished vector search.
pub fn vector_search_chips(data: &Payload) -> Vec<(String, f64)> {
    data.get("entries")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let word = entry.get("word")?.as_str()?;
                    let score = entry.get("score").and_then(Value::as_f64).unwrap_or(0.0);
                    Some((word.to_string(), score))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn format_elapsed(ms: Millis) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

/// Formats a 0..1 score as a percentage with `decimals` places.
pub fn format_percent(score: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, score * 100.0)
}

pub fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

fn str_field<'a>(data: &'a Payload, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

fn bool_field(data: &Payload, key: &str) -> bool {
    data.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn f64_field(data: &Payload, key: &str) -> f64 {
    data.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}
