//! Privilege escalation graph
//!
//! One root for the current identity and one node per known technique, laid
//! out three to a row below it. Whether the graph should be drawn at all for
//! an already privileged identity is the caller's decision
//! ([`PermissionProfile::is_terminal`]).

use super::topology::COLUMN_WIDTH;
use super::{sanitize_id, EdgeHint, Graph, NodeStyle, Position};
use crate::api::PermissionProfile;
use crate::resource::Provider;

pub const ROW_HEIGHT: i32 = 150;
pub const COLUMNS: usize = 3;

pub const ROOT_ID: &str = "identity";

/// How a technique gains privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechniqueType {
    /// Rewrites a policy or role binding
    PolicyModification,
    /// Issues new credentials for another principal
    CredentialCreation,
    /// Acts as a more privileged role or service account
    RoleAssumption,
    /// Runs code where a privileged identity is attached
    CodeExecution,
    SecretAccess,
}

impl TechniqueType {
    pub fn label(self) -> &'static str {
        match self {
            Self::PolicyModification => "Policy modification",
            Self::CredentialCreation => "Credential creation",
            Self::RoleAssumption => "Role assumption",
            Self::CodeExecution => "Code execution",
            Self::SecretAccess => "Secret access",
        }
    }
}

/// Impact if the technique succeeds, on the scale of a profile's `riskLevel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Risk {
    Low,
    Medium,
    High,
    Critical,
}

impl Risk {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// A known way to gain more privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationTechnique {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub technique_type: TechniqueType,
    pub risk: Risk,
    /// All of these are needed
    pub permissions: &'static [&'static str],
}

impl EscalationTechnique {
    /// True when the profile holds every required permission
    pub fn is_available(&self, profile: &PermissionProfile) -> bool {
        !self.permissions.is_empty()
            && self
                .permissions
                .iter()
                .all(|needed| profile.permissions.iter().any(|held| grants(held, needed)))
    }
}

/// `*`, an exact match, or a `service:*` style prefix
fn grants(held: &str, needed: &str) -> bool {
    let held = held.trim();
    if held == "*" || held.eq_ignore_ascii_case(needed) {
        return true;
    }
    match held.strip_suffix('*') {
        Some(prefix) if !prefix.is_empty() => needed
            .to_ascii_lowercase()
            .starts_with(&prefix.to_ascii_lowercase()),
        _ => false,
    }
}

const AWS_TECHNIQUES: &[EscalationTechnique] = &[
    EscalationTechnique {
        id: "create-policy-version",
        name: "Create policy version",
        description: "Publish a new default version of an attached managed policy",
        technique_type: TechniqueType::PolicyModification,
        risk: Risk::Critical,
        permissions: &["iam:CreatePolicyVersion"],
    },
    EscalationTechnique {
        id: "attach-user-policy",
        name: "Attach user policy",
        description: "Attach an administrator managed policy to the current user",
        technique_type: TechniqueType::PolicyModification,
        risk: Risk::Critical,
        permissions: &["iam:AttachUserPolicy"],
    },
    EscalationTechnique {
        id: "put-user-policy",
        name: "Put inline user policy",
        description: "Write an inline policy granting arbitrary actions",
        technique_type: TechniqueType::PolicyModification,
        risk: Risk::Critical,
        permissions: &["iam:PutUserPolicy"],
    },
    EscalationTechnique {
        id: "create-access-key",
        name: "Create access key",
        description: "Issue access keys for a more privileged user",
        technique_type: TechniqueType::CredentialCreation,
        risk: Risk::High,
        permissions: &["iam:CreateAccessKey"],
    },
    EscalationTechnique {
        id: "create-login-profile",
        name: "Create login profile",
        description: "Set a console password for a user that has none",
        technique_type: TechniqueType::CredentialCreation,
        risk: Risk::High,
        permissions: &["iam:CreateLoginProfile"],
    },
    EscalationTechnique {
        id: "pass-role-ec2",
        name: "Pass role to EC2",
        description: "Launch an instance with a privileged instance profile",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["iam:PassRole", "ec2:RunInstances"],
    },
    EscalationTechnique {
        id: "pass-role-lambda",
        name: "Pass role to Lambda",
        description: "Create and invoke a function running as a privileged role",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["iam:PassRole", "lambda:CreateFunction", "lambda:InvokeFunction"],
    },
    EscalationTechnique {
        id: "update-lambda-code",
        name: "Update Lambda code",
        description: "Replace the code of a function that runs with a privileged role",
        technique_type: TechniqueType::CodeExecution,
        risk: Risk::Medium,
        permissions: &["lambda:UpdateFunctionCode"],
    },
    EscalationTechnique {
        id: "update-assume-role-policy",
        name: "Update assume role policy",
        description: "Make a privileged role trust the current identity",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["iam:UpdateAssumeRolePolicy", "sts:AssumeRole"],
    },
];

const GCP_TECHNIQUES: &[EscalationTechnique] = &[
    EscalationTechnique {
        id: "service-account-key",
        name: "Create service account key",
        description: "Mint a key for a privileged service account",
        technique_type: TechniqueType::CredentialCreation,
        risk: Risk::High,
        permissions: &["iam.serviceAccountKeys.create"],
    },
    EscalationTechnique {
        id: "access-token",
        name: "Generate access token",
        description: "Impersonate a service account with a short-lived token",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["iam.serviceAccounts.getAccessToken"],
    },
    EscalationTechnique {
        id: "act-as-compute",
        name: "Act as service account on Compute Engine",
        description: "Create an instance running as a privileged service account",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["iam.serviceAccounts.actAs", "compute.instances.create"],
    },
    EscalationTechnique {
        id: "act-as-function",
        name: "Act as service account on Cloud Functions",
        description: "Deploy a function running as a privileged service account",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["iam.serviceAccounts.actAs", "cloudfunctions.functions.create"],
    },
    EscalationTechnique {
        id: "set-project-iam-policy",
        name: "Set project IAM policy",
        description: "Grant the current identity the owner role",
        technique_type: TechniqueType::PolicyModification,
        risk: Risk::Critical,
        permissions: &["resourcemanager.projects.setIamPolicy"],
    },
];

const ALIYUN_TECHNIQUES: &[EscalationTechnique] = &[
    EscalationTechnique {
        id: "attach-policy-to-user",
        name: "Attach policy to user",
        description: "Attach AdministratorAccess to the current RAM user",
        technique_type: TechniqueType::PolicyModification,
        risk: Risk::Critical,
        permissions: &["ram:AttachPolicyToUser"],
    },
    EscalationTechnique {
        id: "create-access-key",
        name: "Create access key",
        description: "Issue access keys for a more privileged RAM user",
        technique_type: TechniqueType::CredentialCreation,
        risk: Risk::High,
        permissions: &["ram:CreateAccessKey"],
    },
    EscalationTechnique {
        id: "create-login-profile",
        name: "Create login profile",
        description: "Enable console login for a RAM user",
        technique_type: TechniqueType::CredentialCreation,
        risk: Risk::Medium,
        permissions: &["ram:CreateLoginProfile"],
    },
    EscalationTechnique {
        id: "pass-role-ecs",
        name: "Pass role to ECS",
        description: "Launch an instance with a privileged instance RAM role",
        technique_type: TechniqueType::RoleAssumption,
        risk: Risk::High,
        permissions: &["ram:PassRole", "ecs:RunInstances"],
    },
    EscalationTechnique {
        id: "ecs-invoke-command",
        name: "Run command on ECS",
        description: "Execute commands on instances that hold a privileged role",
        technique_type: TechniqueType::CodeExecution,
        risk: Risk::Medium,
        permissions: &["ecs:InvokeCommand"],
    },
];

const AZURE_TECHNIQUES: &[EscalationTechnique] = &[
    EscalationTechnique {
        id: "role-assignment-write",
        name: "Write role assignment",
        description: "Assign the Owner role to the current principal",
        technique_type: TechniqueType::PolicyModification,
        risk: Risk::Critical,
        permissions: &["Microsoft.Authorization/roleAssignments/write"],
    },
    EscalationTechnique {
        id: "vm-run-command",
        name: "VM run command",
        description: "Run commands on a VM with a privileged managed identity",
        technique_type: TechniqueType::CodeExecution,
        risk: Risk::High,
        permissions: &["Microsoft.Compute/virtualMachines/runCommand/action"],
    },
    EscalationTechnique {
        id: "automation-runbook",
        name: "Automation runbook",
        description: "Publish a runbook that executes as a privileged account",
        technique_type: TechniqueType::CodeExecution,
        risk: Risk::Medium,
        permissions: &["Microsoft.Automation/automationAccounts/runbooks/write"],
    },
    EscalationTechnique {
        id: "key-vault-secrets",
        name: "Read Key Vault secrets",
        description: "Read stored credentials of other principals",
        technique_type: TechniqueType::SecretAccess,
        risk: Risk::Medium,
        permissions: &["Microsoft.KeyVault/vaults/secrets/getSecret/action"],
    },
];

/// Techniques known for a provider
pub fn techniques(provider: &Provider) -> &'static [EscalationTechnique] {
    match provider {
        Provider::Aws => AWS_TECHNIQUES,
        Provider::Gcp => GCP_TECHNIQUES,
        Provider::Aliyun => ALIYUN_TECHNIQUES,
        Provider::Azure => AZURE_TECHNIQUES,
        Provider::Unknown(_) => &[],
    }
}

/// Root plus one node and one root edge per technique
pub fn build_escalation_graph(
    profile: &PermissionProfile,
    catalog: &[EscalationTechnique],
) -> Graph {
    let mut graph = Graph::default();

    let label = if profile.user_type.trim().is_empty() {
        "Current identity"
    } else {
        profile.user_type.as_str()
    };
    let root = graph.add_node(ROOT_ID, label, Position::new(COLUMN_WIDTH, 0), NodeStyle::Root);
    root.description = match (&profile.user, profile.risk_level.is_empty()) {
        (Some(user), false) => Some(format!("{} (risk: {})", user, profile.risk_level)),
        (Some(user), true) => Some(user.clone()),
        (None, false) => Some(format!("risk: {}", profile.risk_level)),
        (None, true) => None,
    };

    for (index, technique) in catalog.iter().enumerate() {
        let id = sanitize_id(&format!("technique_{}_{}", index, technique.id));
        let column = (index % COLUMNS) as i32;
        let row = (index / COLUMNS) as i32 + 1;
        let style = if technique.is_available(profile) {
            NodeStyle::AvailableTechnique
        } else {
            NodeStyle::Technique
        };

        let node = graph.add_node(
            &id,
            technique.name,
            Position::new(column * COLUMN_WIDTH, row * ROW_HEIGHT),
            style,
        );
        node.description = Some(format!(
            "{} ({}, risk: {})",
            technique.description,
            technique.technique_type.label(),
            technique.risk.label()
        ));

        graph.add_edge(ROOT_ID, &id).hint = Some(EdgeHint::Suggested);
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(permissions: &[&str]) -> PermissionProfile {
        PermissionProfile {
            user_type: "IAM User".to_string(),
            user: Some("alice".to_string()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            risk_level: "High".to_string(),
            potential_escalation: Vec::new(),
        }
    }

    #[test]
    fn test_counts_and_grid() {
        let catalog = techniques(&Provider::Aws);
        let graph = build_escalation_graph(&profile(&[]), catalog);

        assert_eq!(graph.nodes.len(), catalog.len() + 1);
        assert_eq!(graph.edges.len(), catalog.len());
        assert!(graph.edges.iter().all(|e| e.source == ROOT_ID));
        assert!(graph.edges.iter().all(|e| e.hint == Some(EdgeHint::Suggested)));

        assert_eq!(graph.nodes[0].position, Position::new(250, 0));
        assert_eq!(graph.nodes[1].position, Position::new(0, 150));
        assert_eq!(graph.nodes[3].position, Position::new(500, 150));
        assert_eq!(graph.nodes[4].position, Position::new(0, 300));
        assert_eq!(
            graph.nodes[0].description.as_deref(),
            Some("alice (risk: High)")
        );
    }

    #[test]
    fn test_duplicate_catalog_ids_still_get_distinct_nodes() {
        let twice = [AWS_TECHNIQUES[0], AWS_TECHNIQUES[0]];
        let graph = build_escalation_graph(&profile(&[]), &twice);
        assert_ne!(graph.edges[0].target, graph.edges[1].target);
    }

    #[test]
    fn test_terminal_profile_is_not_special_cased() {
        let mut root = profile(&["*"]);
        root.user_type = "Root User".to_string();
        assert!(root.is_terminal());

        let graph = build_escalation_graph(&root, techniques(&Provider::Gcp));
        assert_eq!(graph.nodes.len(), GCP_TECHNIQUES.len() + 1);
    }

    #[test]
    fn test_available_techniques_are_highlighted() {
        let graph = build_escalation_graph(
            &profile(&["iam:PassRole", "ec2:*"]),
            techniques(&Provider::Aws),
        );
        let pass_role = graph
            .nodes
            .iter()
            .find(|n| n.label == "Pass role to EC2")
            .unwrap();
        assert_eq!(pass_role.style, NodeStyle::AvailableTechnique);

        let lambda = graph
            .nodes
            .iter()
            .find(|n| n.label == "Pass role to Lambda")
            .unwrap();
        assert_eq!(lambda.style, NodeStyle::Technique);
    }

    #[test]
    fn test_grants() {
        assert!(grants("*", "iam:PassRole"));
        assert!(grants("IAM:passrole", "iam:PassRole"));
        assert!(grants("iam:*", "iam:PassRole"));
        assert!(!grants("iam:Pass", "iam:PassRole"));
        assert!(!grants("ec2:*", "iam:PassRole"));
    }

    #[test]
    fn test_technique_nodes_carry_type_and_risk() {
        let graph = build_escalation_graph(&profile(&[]), techniques(&Provider::Azure));
        let node = graph
            .nodes
            .iter()
            .find(|n| n.label == "Write role assignment")
            .unwrap();
        assert_eq!(
            node.description.as_deref(),
            Some("Assign the Owner role to the current principal (Policy modification, risk: Critical)")
        );

        let secrets = graph.nodes.last().unwrap();
        assert_eq!(secrets.label, "Read Key Vault secrets");
        assert!(secrets
            .description
            .as_deref()
            .unwrap()
            .ends_with("(Secret access, risk: Medium)"));
    }

    #[test]
    fn test_policy_rewrites_are_critical() {
        for provider in [Provider::Aws, Provider::Gcp, Provider::Aliyun, Provider::Azure] {
            for technique in techniques(&provider) {
                if technique.technique_type == TechniqueType::PolicyModification {
                    assert_eq!(technique.risk, Risk::Critical, "{}", technique.id);
                }
                assert!(technique.risk >= Risk::Medium, "{}", technique.id);
            }
        }
    }

    #[test]
    fn test_unknown_provider_has_no_techniques() {
        assert!(techniques(&Provider::Unknown("oci".into())).is_empty());
    }
}
