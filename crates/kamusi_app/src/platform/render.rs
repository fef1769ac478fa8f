//! Plain-text rendering of the view model for a line-oriented terminal.

use std::collections::BTreeMap;
use std::io::{self, Write};

use kamusi_core::{
    AppViewModel, EntryView, HealthPanel, PipelineRow, ResultBody, ResultView, SimilarityTier,
    StepStatus,
};

/// Prints only what changed since the last render: new or updated pipeline
/// rows, then the error or result once.
pub struct TerminalRenderer<W: Write> {
    out: W,
    printed_rows: BTreeMap<String, (StepStatus, String)>,
    printed_health: Option<HealthPanel>,
    printed_outcome: bool,
    quiet_health: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed_rows: BTreeMap::new(),
            printed_health: None,
            printed_outcome: false,
            quiet_health: true,
        }
    }

    /// Health updates are not printed until `show_health(true)`.
    pub fn show_health(&mut self, show: bool) {
        self.quiet_health = !show;
    }

    /// Forget the previous query so its rows and result print again.
    pub fn reset_query(&mut self) {
        self.printed_rows.clear();
        self.printed_outcome = false;
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if !self.quiet_health {
            if let Some(health) = &view.health {
                if self.printed_health.as_ref() != Some(health) {
                    writeln!(self.out, "{}", format_health(health))?;
                    self.printed_health = Some(health.clone());
                }
            }
        }

        for row in &view.pipeline {
            if row.status == StepStatus::Pending {
                continue;
            }
            let key = (row.status, row.description.clone());
            if self.printed_rows.get(&row.step) == Some(&key) {
                continue;
            }
            writeln!(self.out, "{}", format_row(row))?;
            self.printed_rows.insert(row.step.clone(), key);
        }

        if !self.printed_outcome && !view.loading {
            if let Some(error) = &view.error {
                writeln!(self.out, "\nError: {error}")?;
                self.printed_outcome = true;
            } else if let Some(result) = &view.result {
                writeln!(self.out, "\n{}", format_result(result))?;
                self.printed_outcome = true;
            }
        }

        self.out.flush()
    }
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[  ]",
        StepStatus::Running => "[..]",
        StepStatus::Done | StepStatus::Complete => "[ok]",
        StepStatus::Error => "[!!]",
    }
}

pub fn format_row(row: &PipelineRow) -> String {
    let mut line = format!("{} {}", status_marker(row.status), row.label);
    if !row.description.is_empty() {
        line.push_str(" · ");
        line.push_str(&row.description);
    }
    if let Some(elapsed) = &row.elapsed {
        line.push_str(&format!(" ({elapsed})"));
    }
    if !row.chips.is_empty() {
        let chips: Vec<String> = row
            .chips
            .iter()
            .map(|chip| format!("{} {}%", chip.word, chip.percent))
            .collect();
        line.push_str("\n     ");
        line.push_str(&chips.join("  "));
    }
    line
}

pub fn format_health(health: &HealthPanel) -> String {
    let mut text = format!(
        "Backend {} · model {} · {} · {} entries",
        health.status, health.model_name, health.vector_store, health.total_entries
    );
    if let Some(warning) = &health.warning {
        text.push_str("\nWarning: ");
        text.push_str(warning);
    }
    text
}

pub fn format_result(result: &ResultView) -> String {
    let mut lines = Vec::new();
    let mut header = format!("Query: {} [{}]", result.query, result.language);
    if let Some(time) = &result.processing_time {
        header.push_str(&format!(" in {time}"));
    }
    lines.push(header);

    match &result.body {
        ResultBody::Blocked { message } => {
            lines.push("Query not related to the dictionary".to_string());
            lines.push(message.clone());
        }
        ResultBody::LowConfidence { message, closest } => {
            lines.push("No confident match found".to_string());
            lines.push(message.clone());
            if !closest.is_empty() {
                lines.push(String::new());
                lines.push("Closest entries:".to_string());
                lines.extend(closest.iter().map(format_entry));
            }
        }
        ResultBody::Answer {
            response,
            total_retrieved,
            top_match,
            entries,
        } => {
            lines.push(String::new());
            lines.push(response.clone());
            if let Some(top) = top_match {
                lines.push(String::new());
                lines.push("Top match:".to_string());
                lines.push(format_entry(top));
            }
            if !entries.is_empty() {
                lines.push(String::new());
                lines.push(format!("Retrieved entries ({total_retrieved}):"));
                lines.extend(entries.iter().map(format_entry));
            }
        }
    }
    lines.join("\n")
}

pub fn format_entry(entry: &EntryView) -> String {
    let tier = match entry.tier {
        SimilarityTier::High => "high",
        SimilarityTier::Medium => "medium",
        SimilarityTier::Low => "low",
    };
    let marker = if entry.is_top_match { "*" } else { "-" };
    let mut lines = vec![match &entry.part_of_speech {
        Some(pos) => format!("  {marker} {} ({pos}) {} {tier}", entry.word, entry.similarity),
        None => format!("  {marker} {} {} {tier}", entry.word, entry.similarity),
    }];
    if let Some(definition) = &entry.definition_en {
        lines.push(format!("      EN: {definition}"));
    }
    if let Some(definition) = &entry.definition_sw {
        lines.push(format!("      SW: {definition}"));
    }
    if let Some(synonyms) = &entry.synonyms {
        lines.push(format!("      Synonyms: {synonyms}"));
    }
    lines.extend(entry.examples.iter().map(|example| format!("      e.g. {example}")));
    lines.join("\n")
}
