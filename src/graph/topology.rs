//! Network topology graph
//!
//! ```text
//!                 account (0,0)
//!        ┌──────────┼──────────────┐
//!      vpc 0      vpc 1   ...   orphan compute
//!    (col 0)     (col 1)        (after the vpcs)
//!      │
//!   instances, CHILD_SPACING apart, ROW_OFFSET below
//! ```

use super::{sanitize_id, Graph, NodeStyle, Position};
use crate::resource::{Resource, ResourceClass};

pub const BASE_X: i32 = 0;
pub const COLUMN_WIDTH: i32 = 250;
pub const VPC_ROW: i32 = 150;
pub const ROW_OFFSET: i32 = 150;
pub const CHILD_SPACING: i32 = 180;

pub const ROOT_ID: &str = "account";

fn node_id(resource: &Resource) -> String {
    sanitize_id(&format!(
        "{}_{}_{}",
        resource.resource_type, resource.region, resource.id
    ))
}

fn column_x(column: usize) -> i32 {
    BASE_X + column as i32 * COLUMN_WIDTH
}

/// Place networks and compute instances under one account root.
///
/// A compute resource belongs to the first network whose id equals its
/// `vpcId`. Compute resources without a match hang off the root.
pub fn build_topology(resources: &[Resource]) -> Graph {
    let mut graph = Graph::default();
    graph.add_node(ROOT_ID, "Cloud Account", Position::new(BASE_X, 0), NodeStyle::Root);

    let networks: Vec<&Resource> = resources
        .iter()
        .filter(|r| ResourceClass::from_code(&r.resource_type) == ResourceClass::Network)
        .collect();
    let computes: Vec<&Resource> = resources
        .iter()
        .filter(|r| ResourceClass::from_code(&r.resource_type) == ResourceClass::Compute)
        .collect();

    let mut placed = vec![false; computes.len()];

    for (column, network) in networks.iter().enumerate() {
        let network_id = node_id(network);
        let x = column_x(column);
        graph.add_node(&network_id, &network.name, Position::new(x, VPC_ROW), NodeStyle::Network);
        graph.add_edge(ROOT_ID, &network_id);

        let mut child = 0;
        for (index, compute) in computes.iter().enumerate() {
            if placed[index] || compute.vpc_id() != Some(network.id.as_str()) {
                continue;
            }
            placed[index] = true;

            let compute_id = node_id(compute);
            graph.add_node(
                &compute_id,
                &compute.name,
                Position::new(x + child * CHILD_SPACING, VPC_ROW + ROW_OFFSET),
                NodeStyle::Compute,
            );
            graph.add_edge(&network_id, &compute_id);
            child += 1;
        }
    }

    let orphans = computes
        .iter()
        .zip(&placed)
        .filter(|(_, placed)| !**placed)
        .map(|(compute, _)| compute);

    for (offset, compute) in orphans.enumerate() {
        let compute_id = node_id(compute);
        graph.add_node(
            &compute_id,
            &compute.name,
            Position::new(column_x(networks.len() + offset), VPC_ROW),
            NodeStyle::Compute,
        );
        graph.add_edge(ROOT_ID, &compute_id);
    }

    graph
}
