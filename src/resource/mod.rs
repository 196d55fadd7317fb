//! Resource model
//!
//! Everything about *what* gets enumerated, independent of how the run is
//! driven.
//!
//! # Architecture
//!
//! - [`catalog`] - Provider and resource-kind tables, selection expansion
//! - [`normalize`] - Raw payload items to canonical [`Resource`] records
//! - [`filter`] - Filtering and per-type summaries over normalized resources
//!
//! # Example
//!
//! ```ignore
//! use cloudrecon::resource::{expand, normalize_field, Provider};
//!
//! let selection = expand(&["all"], &Provider::Aws);
//! for kind in selection {
//!     let items = normalize_field(kind, payload.get(kind.payload_field()), &defaults)?;
//! }
//! ```

pub mod catalog;
pub mod filter;
pub mod normalize;

pub use catalog::{
    codes, expand, list_types, selection_param, Provider, ResourceClass, ResourceKind,
    ResourceTypeDescriptor, ALL,
};
pub use filter::{regions, summarize_by_type, ResourceFilter};
pub use normalize::{normalize, normalize_field, Resource};
