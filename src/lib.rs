//! cloudrecon
//!
//! Enumerates the cloud resources reachable with a stored credential,
//! normalizes them into one shape across providers, and derives topology and
//! privilege escalation graphs from the result.
//!
//! # Architecture
//!
//! ```text
//! catalog ──► Orchestrator ──► EnumerationBackend (HTTP)
//!    ▲             │
//! groups           ▼
//!             normalizer ──► Resources ──► graph builders
//! ```
//!
//! # Module Structure
//!
//! - [`api`] - Backend trait and its HTTP implementation
//! - [`resource`] - Type catalog, normalizer and filtering
//! - [`enumeration`] - Runs, progress and observable state
//! - [`groups`] - Persisted named selections
//! - [`graph`] - Graph view models
//! - [`config`] - Persistent configuration

pub mod api;
pub mod config;
pub mod credential;
pub mod enumeration;
pub mod error;
pub mod graph;
pub mod groups;
pub mod resource;

/// Version injected at compile time via CLOUDRECON_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CLOUDRECON_VERSION") {
    Some(v) => v,
    None => "dev",
};

pub use credential::Credential;
pub use error::{ReconError, Result};
