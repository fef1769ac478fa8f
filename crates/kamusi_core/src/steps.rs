use std::collections::BTreeMap;

use crate::{Payload, StepEvent, StepStatus};

/// Milliseconds since an arbitrary epoch, supplied by the caller.
pub type Millis = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayStep {
    pub step: String,
    pub status: StepStatus,
    pub data: Payload,
    pub started_at: Millis,
    /// Set only while the latest status is `Done`.
    pub completed_at: Option<Millis>,
}

impl DisplayStep {
    pub fn elapsed_ms(&self) -> Option<Millis> {
        self.completed_at
            .map(|done| done.saturating_sub(self.started_at))
    }
}

/// Steps in order of first appearance, with an id -> position index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepList {
    entries: Vec<DisplayStep>,
    index: BTreeMap<String, usize>,
}

impl StepList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, step: &str) -> Option<&DisplayStep> {
        self.index.get(step).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, step: &str) -> bool {
        self.index.contains_key(step)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayStep> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.step.as_str()).collect()
    }

    fn upsert(&mut self, event: &StepEvent, now: Millis) {
        let completed_at = (event.status == StepStatus::Done).then_some(now);
        match self.index.get(&event.step) {
            Some(&pos) => {
                let entry = &mut self.entries[pos];
                entry.status = event.status;
                entry.data = event.data.clone();
                entry.completed_at = completed_at;
            }
            None => {
                self.index.insert(event.step.clone(), self.entries.len());
                self.entries.push(DisplayStep {
                    step: event.step.clone(),
                    status: event.status,
                    data: event.data.clone(),
                    started_at: now,
                    completed_at,
                });
            }
        }
    }
}

impl<'a> IntoIterator for &'a StepList {
    type Item = &'a DisplayStep;
    type IntoIter = std::slice::Iter<'a, DisplayStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Pure reducer: inserts a step on first sight, otherwise updates it in place.
///
/// `completed_at` tracks the latest status: it is `Some(now)` exactly when the
/// event reports `Done`. Callers route the `complete`/`error` sentinels away
/// before reaching this function.
pub fn apply_step_event(steps: &StepList, event: &StepEvent, now: Millis) -> StepList {
    let mut next = steps.clone();
    next.upsert(event, now);
    next
}

impl FromIterator<(StepEvent, Millis)> for StepList {
    fn from_iter<I: IntoIterator<Item = (StepEvent, Millis)>>(iter: I) -> Self {
        let mut list = StepList::new();
        for (event, now) in iter {
            list.upsert(&event, now);
        }
        list
    }
}
