//! Resource groups
//!
//! A group is a named subset of resource-type codes that can stand in for a
//! selection when starting an enumeration. The registry depends only on the
//! [`KeyValueStore`] trait.

pub mod registry;
pub mod store;

pub use registry::{GroupPatch, GroupRegistry, ResourceGroup, GROUPS_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
