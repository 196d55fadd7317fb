//! Backend API interaction module
//!
//! The backend talks to the cloud providers; this crate only consumes its
//! response shapes.
//!
//! # Module Structure
//!
//! - [`http`] - reqwest implementation of [`EnumerationBackend`]
//! - [`types`] - Request/response bodies and the [`PermissionProfile`]

pub mod http;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;

pub use http::HttpBackend;
pub use types::{EnumerationPayload, PermissionProfile};

/// Operations the orchestrator needs from the backend
#[async_trait]
pub trait EnumerationBackend: Send + Sync {
    /// One batched enumeration. `resource_type` is `all` or comma-joined codes.
    async fn enumerate(&self, credential_id: u64, resource_type: &str) -> Result<EnumerationPayload>;

    async fn escalate(&self, credential_id: u64) -> Result<PermissionProfile>;
}
