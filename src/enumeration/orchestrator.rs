//! Enumeration runs
//!
//! One run issues a single batched backend call for the whole selection, then
//! normalizes each resource type independently. A type whose payload is
//! malformed is marked failed in its progress entry while its siblings carry
//! on; only a backend failure ends the run.

use super::progress::{ProgressEvent, API_CODE, API_PROGRESS_CEILING, API_PROGRESS_STEP};
use super::state::{Action, RunSummary, StateStore};
use crate::api::{EnumerationBackend, EnumerationPayload, PermissionProfile};
use crate::credential::Credential;
use crate::error::{ReconError, Result, ValidationError};
use crate::resource::{self, Resource, ResourceKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Timing knobs of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// How often the `api` entry advances while the backend call is pending
    pub progress_tick: Duration,
    /// Pause between resource types
    pub type_pacing: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(200),
            type_pacing: Duration::ZERO,
        }
    }
}

/// Outcome of a run that was not aborted by an error
#[derive(Debug, Clone)]
pub struct RunReport {
    pub resources: Vec<Resource>,
    pub summary: RunSummary,
    pub cancelled: bool,
}

/// Drives enumeration runs and owns one [`StateStore`] per credential
pub struct Orchestrator<B> {
    backend: Arc<B>,
    options: OrchestratorOptions,
    stores: Mutex<HashMap<u64, Arc<StateStore>>>,
    in_flight: Arc<Mutex<HashSet<u64>>>,
}

/// Releases the credential's in-flight slot on drop
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<u64>>>,
    credential_id: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.credential_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<B: EnumerationBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, OrchestratorOptions::default())
    }

    pub fn with_options(backend: B, options: OrchestratorOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            options,
            stores: Mutex::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// State of the credential's latest run, created on first use
    pub fn state(&self, credential_id: u64) -> Arc<StateStore> {
        lock(&self.stores)
            .entry(credential_id)
            .or_insert_with(|| Arc::new(StateStore::new()))
            .clone()
    }

    pub fn is_running(&self, credential_id: u64) -> bool {
        lock(&self.in_flight).contains(&credential_id)
    }

    fn acquire(&self, credential_id: u64) -> Result<InFlightGuard> {
        if !lock(&self.in_flight).insert(credential_id) {
            return Err(ReconError::AlreadyRunning(credential_id));
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            credential_id,
        })
    }

    /// Enumerate the requested resource types for a credential.
    ///
    /// Validation and reentrancy errors are returned before any state
    /// changes. A backend error resets the credential's state and is
    /// returned. Cancellation is not an error: the report carries whatever
    /// was normalized before the token fired.
    pub async fn run<S: AsRef<str>>(
        &self,
        credential: &Credential,
        requested: &[S],
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let selection = resource::expand(requested, &credential.provider);
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let _guard = self.acquire(credential.id)?;
        let store = self.state(credential.id);

        let codes: Vec<String> = resource::codes(&selection)
            .into_iter()
            .map(String::from)
            .collect();
        tracing::info!(
            "Enumerating {} resource types for credential {} ({})",
            codes.len(),
            credential.id,
            credential.provider
        );
        store.dispatch(Action::Started {
            credential_id: credential.id,
            selection: codes,
        });

        let param = resource::selection_param(&selection, &credential.provider);
        let payload = match self.call_backend(&store, credential.id, &param, cancel).await {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                tracing::error!("Enumeration failed for credential {}: {}", credential.id, e);
                store.dispatch(Action::Failed {
                    message: e.to_string(),
                });
                return Err(e);
            }
            None => {
                tracing::info!("Enumeration cancelled while waiting for the backend");
                let summary = RunSummary {
                    cancelled: selection.len(),
                    ..RunSummary::default()
                };
                return Ok(finish(&store, Vec::new(), summary));
            }
        };

        store.dispatch(Action::Progress(ProgressEvent::done(
            API_CODE,
            raw_count(&payload, &selection),
        )));

        let defaults = credential.defaults();
        let mut resources: Vec<Resource> = Vec::new();
        let mut seen: HashSet<(String, String, String)> = HashSet::new();
        let mut summary = RunSummary::default();

        for (index, kind) in selection.iter().copied().enumerate() {
            if index > 0 && !self.options.type_pacing.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.options.type_pacing) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            if cancel.is_cancelled() {
                break;
            }

            let code = kind.code();
            store.dispatch(Action::Progress(ProgressEvent::running(code, 50, "processing")));

            match resource::normalize_field(kind, payload.field(kind.payload_field()), &defaults) {
                Ok(items) => {
                    let before = resources.len();
                    for item in items {
                        let key = (
                            item.resource_type.clone(),
                            item.region.clone(),
                            item.id.clone(),
                        );
                        if seen.insert(key) {
                            resources.push(item);
                        } else {
                            tracing::warn!(
                                "Dropping duplicate {} resource {} in {}",
                                code,
                                item.id,
                                item.region
                            );
                        }
                    }
                    let count = resources.len() - before;
                    tracing::debug!("{}: {} resources", code, count);
                    store.dispatch(Action::Progress(ProgressEvent::done(code, count)));
                }
                Err(e) => {
                    tracing::warn!("Failed to process {}: {}", code, e);
                    summary.failed += 1;
                    store.dispatch(Action::Progress(ProgressEvent::failed(code, e.to_string())));
                }
            }
            summary.processed += 1;
        }

        summary.cancelled = selection.len() - summary.processed;
        summary.total_resources = resources.len();
        tracing::info!("{}", summary.status_text());

        Ok(finish(&store, resources, summary))
    }

    /// Await the batched call, ticking `api` progress and watching the token.
    /// `None` means the run was cancelled first.
    async fn call_backend(
        &self,
        store: &StateStore,
        credential_id: u64,
        param: &str,
        cancel: &CancellationToken,
    ) -> Option<Result<EnumerationPayload>> {
        let call = self.backend.enumerate(credential_id, param);
        tokio::pin!(call);

        let tick = self.options.progress_tick.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        let mut percent = 0u8;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = &mut call => return Some(result),
                _ = ticker.tick() => {
                    percent = percent.saturating_add(API_PROGRESS_STEP).min(API_PROGRESS_CEILING);
                    store.dispatch(Action::Progress(ProgressEvent::running(
                        API_CODE,
                        percent,
                        "waiting for backend",
                    )));
                }
            }
        }
    }

    /// Fetch what the credential is allowed to do
    pub async fn escalate(
        &self,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<PermissionProfile> {
        tracing::info!("Analyzing permissions of credential {}", credential.id);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReconError::Cancelled),
            result = self.backend.escalate(credential.id) => result.map_err(|e| {
                tracing::error!("Permission analysis failed for credential {}: {}", credential.id, e);
                e
            }),
        }
    }
}

/// Publish the terminal action of a run that produced a report
fn finish(store: &StateStore, resources: Vec<Resource>, summary: RunSummary) -> RunReport {
    let cancelled = summary.cancelled > 0;
    let report = RunReport {
        resources: resources.clone(),
        summary,
        cancelled,
    };

    if cancelled {
        store.dispatch(Action::Cancelled { resources, summary });
    } else {
        store.dispatch(Action::Completed { resources, summary });
    }
    report
}

/// Number of raw items the backend returned for the selection
fn raw_count(payload: &EnumerationPayload, selection: &[ResourceKind]) -> usize {
    selection
        .iter()
        .filter_map(|kind| payload.field(kind.payload_field()))
        .filter_map(|value| value.as_array())
        .map(|items| items.len())
        .sum()
}
