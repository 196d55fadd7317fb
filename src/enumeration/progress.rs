//! Enumeration progress
//!
//! Tracks a `{percent, status}` entry per resource-type code plus the
//! synthetic `api` entry for the backend call. Entries only move forward and
//! freeze once terminal.

use indexmap::IndexMap;
use serde::Serialize;

/// Progress key of the backend call itself
pub const API_CODE: &str = "api";

/// Highest percent the `api` entry reaches before the response arrives
pub const API_PROGRESS_CEILING: u8 = 90;

/// Percent added per pacing tick while waiting for the backend
pub const API_PROGRESS_STEP: u8 = 10;

/// Status of one progress entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum ProgressStatus {
    /// Not started yet
    Pending,
    /// Work underway, with a short description
    Running(String),
    /// Finished with this many records
    Done(usize),
    /// Failed; the message is only ever shown here
    Failed(String),
    /// Abandoned because the run was cancelled
    Cancelled,
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_) | Self::Cancelled)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "◯",
            Self::Running(_) => "↻",
            Self::Done(_) => "✓",
            Self::Failed(_) => "✗",
            Self::Cancelled => "⊘",
        }
    }

    /// Human-readable status line
    pub fn text(&self) -> String {
        match self {
            Self::Pending => "pending".to_string(),
            Self::Running(what) => what.clone(),
            Self::Done(0) => "no resources found".to_string(),
            Self::Done(1) => "1 resource found".to_string(),
            Self::Done(n) => format!("{} resources found", n),
            Self::Failed(err) => format!("error: {}", err),
            Self::Cancelled => "cancelled".to_string(),
        }
    }
}

/// One discrete progress update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub code: String,
    pub percent: u8,
    pub status: ProgressStatus,
}

impl ProgressEvent {
    pub fn running(code: &str, percent: u8, what: &str) -> Self {
        Self {
            code: code.to_string(),
            percent: percent.min(99),
            status: ProgressStatus::Running(what.to_string()),
        }
    }

    pub fn done(code: &str, count: usize) -> Self {
        Self::terminal(code, ProgressStatus::Done(count))
    }

    pub fn failed(code: &str, error: impl Into<String>) -> Self {
        Self::terminal(code, ProgressStatus::Failed(error.into()))
    }

    pub fn cancelled(code: &str) -> Self {
        Self::terminal(code, ProgressStatus::Cancelled)
    }

    fn terminal(code: &str, status: ProgressStatus) -> Self {
        Self {
            code: code.to_string(),
            percent: 100,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub percent: u8,
    pub status: ProgressStatus,
}

impl ProgressEntry {
    fn pending() -> Self {
        Self {
            percent: 0,
            status: ProgressStatus::Pending,
        }
    }
}

/// Progress of a run, keyed by code in selection order (`api` first)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnumerationProgress {
    entries: IndexMap<String, ProgressEntry>,
}

impl EnumerationProgress {
    pub fn for_selection<S: AsRef<str>>(codes: &[S]) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(API_CODE.to_string(), ProgressEntry::pending());
        for code in codes {
            entries.insert(code.as_ref().to_string(), ProgressEntry::pending());
        }
        Self { entries }
    }

    /// Apply an event. Returns false when it was ignored: unknown code,
    /// entry already terminal, or the percent would go backwards.
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        let Some(entry) = self.entries.get_mut(&event.code) else {
            tracing::debug!("Ignoring progress for unknown code {}", event.code);
            return false;
        };

        if entry.status.is_terminal() || event.percent < entry.percent {
            return false;
        }

        if entry.percent == event.percent && entry.status == event.status {
            return false;
        }

        entry.percent = event.percent;
        entry.status = event.status.clone();
        true
    }

    /// Mark every unfinished entry cancelled
    pub fn cancel_remaining(&mut self) -> usize {
        let mut cancelled = 0;
        for entry in self.entries.values_mut() {
            if !entry.status.is_terminal() {
                entry.percent = 100;
                entry.status = ProgressStatus::Cancelled;
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn get(&self, code: &str) -> Option<&ProgressEntry> {
        self.entries.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProgressEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True once every entry is terminal
    pub fn is_finished(&self) -> bool {
        self.entries.values().all(|e| e.status.is_terminal())
    }
}
