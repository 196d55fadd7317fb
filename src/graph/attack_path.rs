//! Attack path graph
//!
//! ```text
//!            credential
//!                │
//!        permission analysis        (only with permissions)
//!                │
//!           escalation              (only with potential escalation)
//!        ┌───────┼────────┐
//!     compute  storage  identity    (only classes with resources)
//!        └───────┼────────┘
//!        platform takeover
//! ```

use super::{Graph, NodeStyle, Position};
use crate::api::PermissionProfile;
use crate::credential::Credential;
use crate::resource::{Resource, ResourceClass};

pub const CENTER_X: i32 = 250;
pub const STAGE_SPACING: i32 = 100;
pub const FIRST_ROW: i32 = 50;
pub const CLASS_BASE_X: i32 = 100;
pub const CLASS_SPACING: i32 = 200;

pub const START_ID: &str = "start";
pub const PERMISSIONS_ID: &str = "permissions";
pub const ESCALATION_ID: &str = "escalation";
pub const END_ID: &str = "end";

/// Resource classes shown on the path, in column order
const CLASSES: [(ResourceClass, &str, &str); 3] = [
    (ResourceClass::Compute, "compute", "Compute instances"),
    (ResourceClass::ObjectStore, "storage", "Storage buckets"),
    (ResourceClass::Identity, "identity", "Identity resources"),
];

fn row(stage: i32) -> i32 {
    FIRST_ROW + stage * STAGE_SPACING
}

pub fn build_attack_path(
    credential: &Credential,
    profile: &PermissionProfile,
    resources: &[Resource],
) -> Graph {
    let mut graph = Graph::default();

    let start = graph.add_node(
        START_ID,
        format!("{} ({})", credential.name, credential.provider),
        Position::new(CENTER_X, row(0)),
        NodeStyle::Root,
    );
    start.description = Some("Access key credential".to_string());

    let mut tail = START_ID;

    if !profile.permissions.is_empty() {
        let node = graph.add_node(
            PERMISSIONS_ID,
            "Permission analysis",
            Position::new(CENTER_X, row(1)),
            NodeStyle::Stage,
        );
        node.description = Some(format!("Risk level: {}", profile.risk_level));
        graph.add_edge(START_ID, PERMISSIONS_ID).label = Some("analyze permissions".to_string());
        tail = PERMISSIONS_ID;

        if !profile.potential_escalation.is_empty() {
            let node = graph.add_node(
                ESCALATION_ID,
                "Privilege escalation",
                Position::new(CENTER_X, row(2)),
                NodeStyle::Stage,
            );
            node.description = Some(profile.potential_escalation.join(", "));
            graph.add_edge(PERMISSIONS_ID, ESCALATION_ID).label =
                Some("escalate privileges".to_string());
            tail = ESCALATION_ID;
        }
    }

    let mut class_nodes = Vec::new();
    for (column, (class, id, label)) in CLASSES.iter().enumerate() {
        let count = resources
            .iter()
            .filter(|r| ResourceClass::of(&credential.provider, &r.resource_type) == *class)
            .count();
        if count == 0 {
            continue;
        }

        let node = graph.add_node(
            *id,
            *label,
            Position::new(CLASS_BASE_X + column as i32 * CLASS_SPACING, row(3)),
            NodeStyle::Compute,
        );
        node.description = Some(format!("Count: {}", count));
        graph.add_edge(tail, id).label = Some("access resources".to_string());
        class_nodes.push(*id);
    }

    let end = graph.add_node(
        END_ID,
        "Platform takeover",
        Position::new(CENTER_X, row(4)),
        NodeStyle::Goal,
    );
    end.description = Some("Administrator access".to_string());

    for id in class_nodes {
        graph.add_edge(id, END_ID).label = Some("exploit resources".to_string());
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialDefaults;
    use crate::resource::{normalize, Provider, ResourceKind};
    use serde_json::json;

    fn resources() -> Vec<Resource> {
        let defaults = CredentialDefaults::default();
        vec![
            normalize(ResourceKind::Ec2, &json!({"instanceId": "i-1"}), &defaults).unwrap(),
            normalize(ResourceKind::Ec2, &json!({"instanceId": "i-2"}), &defaults).unwrap(),
            normalize(ResourceKind::IamUsers, &json!({"userName": "bob"}), &defaults).unwrap(),
            normalize(ResourceKind::IamRoles, &json!({"roleName": "admin"}), &defaults).unwrap(),
        ]
    }

    fn profile(escalation: &[&str]) -> PermissionProfile {
        PermissionProfile {
            user_type: "IAM User".to_string(),
            user: None,
            permissions: vec!["iam:PassRole".to_string()],
            risk_level: "High".to_string(),
            potential_escalation: escalation.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_full_chain() {
        let credential = Credential::new(3, Provider::Aws, "us-east-1");
        let graph = build_attack_path(&credential, &profile(&["iam:PassRole"]), &resources());

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "permissions", "escalation", "compute", "identity", "end"]);

        assert_eq!(graph.node("compute").unwrap().description.as_deref(), Some("Count: 2"));
        assert_eq!(graph.node("identity").unwrap().position, Position::new(500, 350));
        assert_eq!(graph.node("end").unwrap().position, Position::new(250, 450));
        assert_eq!(graph.node("start").unwrap().label, "credential-3 (AWS)");

        assert!(graph
            .edges
            .iter()
            .any(|e| e.source == "escalation" && e.target == "compute"));
        assert_eq!(graph.edges.iter().filter(|e| e.target == END_ID).count(), 2);
    }

    #[test]
    fn test_without_escalation_resources_hang_off_permissions() {
        let credential = Credential::new(3, Provider::Aws, "us-east-1");
        let graph = build_attack_path(&credential, &profile(&[]), &resources());

        assert!(!graph.has_node(ESCALATION_ID));
        assert!(graph
            .edges
            .iter()
            .any(|e| e.source == PERMISSIONS_ID && e.target == "identity"));
    }

    #[test]
    fn test_azure_storage_accounts_are_not_buckets() {
        let defaults = CredentialDefaults::default();
        let items = vec![
            normalize(ResourceKind::StorageAccount, &json!({"accountName": "logs"}), &defaults)
                .unwrap(),
            normalize(ResourceKind::AzureVm, &json!({"vmId": "vm-1"}), &defaults).unwrap(),
        ];
        let azure = Credential::new(5, Provider::Azure, "eastus");
        let graph = build_attack_path(&azure, &profile(&[]), &items);
        assert!(!graph.has_node("storage"));
        assert!(graph.has_node("compute"));

        let gcs = vec![normalize(ResourceKind::GcsBucket, &json!({"bucketName": "b"}), &defaults)
            .unwrap()];
        let gcp = Credential::new(6, Provider::Gcp, "us-central1");
        let graph = build_attack_path(&gcp, &profile(&[]), &gcs);
        assert_eq!(graph.node("storage").unwrap().description.as_deref(), Some("Count: 1"));
    }

    #[test]
    fn test_without_permissions_resources_hang_off_start() {
        let credential = Credential::new(3, Provider::Aws, "us-east-1");
        let graph = build_attack_path(&credential, &PermissionProfile::default(), &resources());

        assert!(!graph.has_node(PERMISSIONS_ID));
        assert!(graph
            .edges
            .iter()
            .any(|e| e.source == START_ID && e.target == "compute"));
    }
}
