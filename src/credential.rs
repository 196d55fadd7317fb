//! Credential handle
//!
//! Credentials are created and validated by an external service. This crate
//! only needs the identifier the backend knows them by, the provider, and the
//! default region used when a raw resource carries none.

use crate::resource::Provider;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "cloudProvider", alias = "provider")]
    pub provider: Provider,
    #[serde(default)]
    pub region: String,
}

impl Credential {
    pub fn new(id: u64, provider: Provider, region: &str) -> Self {
        Self {
            id,
            name: format!("credential-{}", id),
            provider,
            region: region.to_string(),
        }
    }

    /// Defaults applied to normalized resources
    pub fn defaults(&self) -> CredentialDefaults {
        CredentialDefaults {
            region: self.region.clone(),
        }
    }
}

/// Values the normalizer falls back to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialDefaults {
    pub region: String,
}
