//! Enumeration runs and their observable state
//!
//! # Architecture
//!
//! ```text
//! Orchestrator::run ──► EnumerationBackend::enumerate (one batched call)
//!        │                        │
//!        │ Action                 ▼
//!        ▼                 normalize_field per type
//!   StateStore ──watch──► snapshots
//!        └──broadcast──► ProgressEvent
//! ```
//!
//! # Module Structure
//!
//! - [`progress`] - Per-type progress entries and events
//! - [`state`] - State machine, reducer and the observable store
//! - [`orchestrator`] - Runs, cancellation and the reentrancy guard

pub mod orchestrator;
pub mod progress;
pub mod state;

pub use orchestrator::{Orchestrator, OrchestratorOptions, RunReport};
pub use progress::{EnumerationProgress, ProgressEntry, ProgressEvent, ProgressStatus, API_CODE};
pub use state::{drain_events, reduce, Action, EnumerationState, Phase, RunSummary, StateStore};
