//! Named, persisted selections of resource-type codes

use super::store::KeyValueStore;
use crate::error::{ReconError, Result, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store key holding the whole group collection
pub const GROUPS_KEY: &str = "resourceGroups";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub resources: Vec<String>,
    pub created: DateTime<Utc>,
}

/// Fields to change in [`GroupRegistry::update`]; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub resources: Option<Vec<String>>,
}

pub struct GroupRegistry<K> {
    store: K,
}

impl<K: KeyValueStore> GroupRegistry<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn list(&self) -> Result<Vec<ResourceGroup>> {
        match self.store.get(GROUPS_KEY)? {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(ReconError::persistence),
        }
    }

    pub fn get(&self, id: &str) -> Result<ResourceGroup> {
        self.list()?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| ValidationError::GroupNotFound(id.to_string()).into())
    }

    pub fn create<S: AsRef<str>>(&self, name: &str, resources: &[S]) -> Result<ResourceGroup> {
        let (name, resources) = validate(name, resources)?;

        let group = ResourceGroup {
            id: Uuid::new_v4().to_string(),
            name,
            resources,
            created: Utc::now(),
        };

        let mut groups = self.list()?;
        groups.push(group.clone());
        self.save(&groups)?;

        tracing::info!("Created resource group {} ({})", group.name, group.id);
        Ok(group)
    }

    pub fn update(&self, id: &str, patch: GroupPatch) -> Result<ResourceGroup> {
        let mut groups = self.list()?;
        let Some(index) = groups.iter().position(|g| g.id == id) else {
            return Err(ValidationError::GroupNotFound(id.to_string()).into());
        };

        let current = &groups[index];
        let name = patch.name.unwrap_or_else(|| current.name.clone());
        let resources = patch.resources.unwrap_or_else(|| current.resources.clone());
        let (name, resources) = validate(&name, &resources)?;

        let group = &mut groups[index];
        group.name = name;
        group.resources = resources;
        let updated = group.clone();

        self.save(&groups)?;
        tracing::info!("Updated resource group {}", id);
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<ResourceGroup> {
        let mut groups = self.list()?;
        let Some(index) = groups.iter().position(|g| g.id == id) else {
            return Err(ValidationError::GroupNotFound(id.to_string()).into());
        };
        let removed = groups.remove(index);

        if groups.is_empty() {
            self.store.delete(GROUPS_KEY)?;
        } else {
            self.save(&groups)?;
        }

        tracing::info!("Deleted resource group {}", id);
        Ok(removed)
    }

    /// The group's codes, replacing whatever the caller had selected
    pub fn apply_selection(&self, id: &str) -> Result<Vec<String>> {
        Ok(self.get(id)?.resources)
    }

    fn save(&self, groups: &[ResourceGroup]) -> Result<()> {
        let value = serde_json::to_value(groups).map_err(ReconError::persistence)?;
        self.store.set(GROUPS_KEY, value)
    }
}

/// Trimmed name and deduplicated codes, or the reason they are unusable
fn validate<S: AsRef<str>>(name: &str, resources: &[S]) -> Result<(String, Vec<String>)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyGroupName.into());
    }

    let mut codes: Vec<String> = Vec::new();
    for code in resources {
        let code = code.as_ref().trim();
        if !code.is_empty() && !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
    }
    if codes.is_empty() {
        return Err(ValidationError::EmptyGroupTypes.into());
    }

    Ok((name.to_string(), codes))
}
