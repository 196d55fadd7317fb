//! Enumeration state machine
//!
//! The only way to change [`EnumerationState`] is [`reduce`]. [`StateStore`]
//! applies actions and notifies subscribers, both with full snapshots (watch)
//! and with the discrete progress events (broadcast).

use super::progress::{EnumerationProgress, ProgressEvent};
use crate::resource::Resource;
use serde::Serialize;
use tokio::sync::{broadcast, watch};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Enumerating,
    Completed,
    Failed,
    Cancelled,
}

/// Counts describing a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_resources: usize,
}

impl RunSummary {
    pub fn status_text(&self) -> String {
        let outcome = if self.cancelled > 0 { "cancelled" } else { "complete" };
        let mut text = format!(
            "Enumeration {}: {} resource types processed, {} resources found",
            outcome, self.processed, self.total_resources
        );
        if self.failed > 0 {
            text.push_str(&format!(", {} failed", self.failed));
        }
        if self.cancelled > 0 {
            text.push_str(&format!(", {} cancelled", self.cancelled));
        }
        text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumerationState {
    pub phase: Phase,
    pub credential_id: Option<u64>,
    pub selection: Vec<String>,
    pub progress: EnumerationProgress,
    pub resources: Vec<Resource>,
    pub error: Option<String>,
    pub summary: Option<RunSummary>,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// A new run replaces everything from the previous one
    Started {
        credential_id: u64,
        selection: Vec<String>,
    },
    Progress(ProgressEvent),
    Completed {
        resources: Vec<Resource>,
        summary: RunSummary,
    },
    /// Fatal failure: progress and resources are reset
    Failed { message: String },
    Cancelled {
        resources: Vec<Resource>,
        summary: RunSummary,
    },
}

/// Apply an action. Returns true if the state changed.
pub fn reduce(state: &mut EnumerationState, action: Action) -> bool {
    match action {
        Action::Started {
            credential_id,
            selection,
        } => {
            *state = EnumerationState {
                phase: Phase::Enumerating,
                credential_id: Some(credential_id),
                progress: EnumerationProgress::for_selection(&selection),
                selection,
                ..EnumerationState::default()
            };
            true
        }
        Action::Progress(event) => {
            if state.phase != Phase::Enumerating {
                return false;
            }
            state.progress.apply(&event)
        }
        Action::Completed { resources, summary } => {
            if state.phase != Phase::Enumerating {
                return false;
            }
            state.phase = Phase::Completed;
            state.resources = resources;
            state.summary = Some(summary);
            true
        }
        Action::Failed { message } => {
            state.phase = Phase::Failed;
            state.progress.clear();
            state.resources.clear();
            state.summary = None;
            state.error = Some(message);
            true
        }
        Action::Cancelled { resources, summary } => {
            if state.phase != Phase::Enumerating {
                return false;
            }
            state.progress.cancel_remaining();
            state.phase = Phase::Cancelled;
            state.resources = resources;
            state.summary = Some(summary);
            true
        }
    }
}

/// Observable holder of the current [`EnumerationState`]
pub struct StateStore {
    state: watch::Sender<EnumerationState>,
    events: broadcast::Sender<ProgressEvent>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(EnumerationState::default());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { state, events }
    }

    pub fn dispatch(&self, action: Action) {
        let event = match &action {
            Action::Progress(event) => Some(event.clone()),
            _ => None,
        };

        let changed = self.state.send_if_modified(|state| reduce(state, action));

        if let (true, Some(event)) = (changed, event) {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }

    /// Snapshots, delivered whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<EnumerationState> {
        self.state.subscribe()
    }

    /// Discrete progress events, in order
    pub fn events(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> EnumerationState {
        self.state.borrow().clone()
    }
}

/// Take every event already queued on `events` without waiting.
///
/// Dispatching is synchronous, so once a run has returned its last terminal
/// events are in the channel even if no one has polled for them yet.
pub fn drain_events(events: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut drained = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => drained.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} progress events", skipped);
            }
            Err(_) => break,
        }
    }
    drained
}
