//! Graph view models
//!
//! Builders here are pure: the same input always yields the same nodes,
//! positions and edges in the same order. Nothing is persisted; graphs are
//! recomputed whenever they are needed.
//!
//! # Module Structure
//!
//! - [`topology`] - Account, networks and the instances inside them
//! - [`escalation`] - Privilege escalation techniques for a permission profile
//! - [`attack_path`] - Credential to platform takeover chain

pub mod attack_path;
pub mod escalation;
pub mod topology;

use serde::Serialize;

pub use attack_path::build_attack_path;
pub use escalation::{build_escalation_graph, techniques, EscalationTechnique, Risk, TechniqueType};
pub use topology::build_topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Visual role of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeStyle {
    Root,
    Network,
    Compute,
    Technique,
    /// A technique the profile already holds every permission for
    AvailableTechnique,
    Stage,
    Goal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub position: Position,
    pub style: NodeStyle,
}

/// Presentation hint with no effect on graph structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeHint {
    Suggested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<EdgeHint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    fn add_node(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        position: Position,
        style: NodeStyle,
    ) -> &mut GraphNode {
        self.nodes.push(GraphNode {
            id: id.into(),
            label: label.into(),
            description: None,
            position,
            style,
        });
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    /// Edge ids are `{source}-{target}`
    fn add_edge(&mut self, source: &str, target: &str) -> &mut GraphEdge {
        self.edges.push(GraphEdge {
            id: format!("{}-{}", source, target),
            source: source.to_string(),
            target: target.to_string(),
            label: None,
            hint: None,
        });
        let last = self.edges.len() - 1;
        &mut self.edges[last]
    }
}

/// Graph-library-safe identifier: every non-alphanumeric character becomes `_`
pub fn sanitize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
