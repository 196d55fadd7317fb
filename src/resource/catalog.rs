//! Resource Type Catalog
//!
//! Maps a provider to the ordered list of resource-type codes it supports and
//! expands user selections (`all`, `iam`, ...) into concrete codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selection keyword meaning "every type the provider supports"
pub const ALL: &str = "all";

/// Cloud provider a credential belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    Aws,
    Gcp,
    Aliyun,
    Azure,
    Unknown(String),
}

impl Provider {
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "AWS" | "aws" => Self::Aws,
            "GCP" | "gcp" => Self::Gcp,
            "Aliyun" | "aliyun" | "阿里云" => Self::Aliyun,
            "Azure" | "azure" => Self::Azure,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Aws => "AWS",
            Self::Gcp => "GCP",
            Self::Aliyun => "Aliyun",
            Self::Azure => "Azure",
            Self::Unknown(name) => name,
        }
    }

    /// Concrete resource kinds, in the order they are enumerated
    pub fn kinds(&self) -> &'static [ResourceKind] {
        use ResourceKind::*;
        match self {
            Self::Aws => &[
                Ec2,
                S3,
                IamRoles,
                IamUsers,
                Vpc,
                RouteTable,
                Elb,
                Eks,
                Kms,
                Rds,
                Lambda,
                ApiGateway,
                CloudTrail,
                CloudWatchLogs,
                DynamoDb,
                SecretsManager,
                Sns,
                Sqs,
            ],
            Self::Gcp => &[GceInstance, GcsBucket, IamRoles, IamUsers],
            Self::Aliyun => &[EcsInstance, OssBucket, RamRoles, RamUsers],
            Self::Azure => &[AzureVm, StorageAccount, RoleAssignment],
            Self::Unknown(_) => &[],
        }
    }

    /// Expansion of a selection alias, if `code` is one for this provider
    fn alias(&self, code: &str) -> Option<&'static [ResourceKind]> {
        use ResourceKind::*;
        match (self, code) {
            (Self::Aws | Self::Gcp, "iam") => Some(&[IamRoles, IamUsers]),
            (Self::Aliyun, "iam" | "ram") => Some(&[RamRoles, RamUsers]),
            (Self::Azure, "iam") => Some(&[RoleAssignment]),
            _ => None,
        }
    }

    /// Look up a concrete kind by its provider-scoped code
    pub fn kind(&self, code: &str) -> Option<ResourceKind> {
        self.kinds().iter().copied().find(|k| k.code() == code)
    }
}

impl From<String> for Provider {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<Provider> for String {
    fn from(p: Provider) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every resource kind any provider can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    // AWS
    Ec2,
    S3,
    IamRoles,
    IamUsers,
    Vpc,
    RouteTable,
    Elb,
    Eks,
    Kms,
    Rds,
    Lambda,
    ApiGateway,
    CloudTrail,
    CloudWatchLogs,
    DynamoDb,
    SecretsManager,
    Sns,
    Sqs,
    // GCP
    GceInstance,
    GcsBucket,
    // Aliyun
    EcsInstance,
    OssBucket,
    RamRoles,
    RamUsers,
    // Azure
    AzureVm,
    StorageAccount,
    RoleAssignment,
}

impl ResourceKind {
    /// Stable, provider-scoped code
    pub fn code(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::S3 => "s3",
            Self::IamRoles => "iamRoles",
            Self::IamUsers => "iamUsers",
            Self::Vpc => "vpc",
            Self::RouteTable => "route",
            Self::Elb => "elb",
            Self::Eks => "eks",
            Self::Kms => "kms",
            Self::Rds => "rds",
            Self::Lambda => "lambda",
            Self::ApiGateway => "apigateway",
            Self::CloudTrail => "cloudtrail",
            Self::CloudWatchLogs => "cloudwatch",
            Self::DynamoDb => "dynamodb",
            Self::SecretsManager => "secretsmanager",
            Self::Sns => "sns",
            Self::Sqs => "sqs",
            Self::GceInstance | Self::AzureVm => "compute",
            Self::GcsBucket | Self::StorageAccount => "storage",
            Self::EcsInstance => "ecs",
            Self::OssBucket => "oss",
            Self::RamRoles => "ramRoles",
            Self::RamUsers => "ramUsers",
            Self::RoleAssignment => "roleAssignments",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ec2 => "EC2 Instances",
            Self::S3 => "S3 Buckets",
            Self::IamRoles => "IAM Roles",
            Self::IamUsers => "IAM Users",
            Self::Vpc => "VPCs",
            Self::RouteTable => "Route Tables",
            Self::Elb => "Load Balancers",
            Self::Eks => "EKS Clusters",
            Self::Kms => "KMS Keys",
            Self::Rds => "RDS Instances",
            Self::Lambda => "Lambda Functions",
            Self::ApiGateway => "API Gateways",
            Self::CloudTrail => "CloudTrail Trails",
            Self::CloudWatchLogs => "CloudWatch Log Groups",
            Self::DynamoDb => "DynamoDB Tables",
            Self::SecretsManager => "Secrets Manager Secrets",
            Self::Sns => "SNS Topics",
            Self::Sqs => "SQS Queues",
            Self::GceInstance => "Compute Engine Instances",
            Self::GcsBucket => "Cloud Storage Buckets",
            Self::EcsInstance => "ECS Instances",
            Self::OssBucket => "OSS Buckets",
            Self::RamRoles => "RAM Roles",
            Self::RamUsers => "RAM Users",
            Self::AzureVm => "Virtual Machines",
            Self::StorageAccount => "Storage Accounts",
            Self::RoleAssignment => "Role Assignments",
        }
    }

    /// Field of the enumerate response holding this kind's raw items
    pub fn payload_field(self) -> &'static str {
        match self {
            Self::Ec2 | Self::GceInstance | Self::EcsInstance => "instances",
            Self::S3 | Self::GcsBucket | Self::OssBucket => "buckets",
            Self::IamRoles | Self::RamRoles => "roles",
            Self::IamUsers | Self::RamUsers => "users",
            Self::Vpc => "vpcs",
            Self::RouteTable => "routeTables",
            Self::Elb => "elbs",
            Self::Eks => "eksClusters",
            Self::Kms => "kmsKeys",
            Self::Rds => "rdsInstances",
            Self::Lambda => "lambdaFunctions",
            Self::ApiGateway => "apiGateways",
            Self::CloudTrail => "cloudTrails",
            Self::CloudWatchLogs => "cloudWatchLogGroups",
            Self::DynamoDb => "dynamoDBTables",
            Self::SecretsManager => "secrets",
            Self::Sns => "snsTopics",
            Self::Sqs => "sqsQueues",
            Self::AzureVm => "virtualMachines",
            Self::StorageAccount => "storageAccounts",
            Self::RoleAssignment => "roleAssignments",
        }
    }

    pub fn class(self) -> ResourceClass {
        match self {
            Self::Ec2 | Self::GceInstance | Self::EcsInstance | Self::AzureVm => {
                ResourceClass::Compute
            }
            Self::Vpc => ResourceClass::Network,
            Self::S3 | Self::GcsBucket | Self::OssBucket => ResourceClass::ObjectStore,
            Self::IamRoles | Self::IamUsers | Self::RamRoles | Self::RamUsers | Self::RoleAssignment => {
                ResourceClass::Identity
            }
            _ => ResourceClass::Other,
        }
    }

    pub fn descriptor(self) -> ResourceTypeDescriptor {
        ResourceTypeDescriptor {
            code: self.code().to_string(),
            label: self.label().to_string(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Coarse grouping of kinds used by the graph builders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Virtual machines, placed under their network in the topology graph
    Compute,
    Network,
    /// Object stores whose resources carry an object listing
    ObjectStore,
    Identity,
    Other,
}

static KNOWN_PROVIDERS: [Provider; 4] = [Provider::Aws, Provider::Gcp, Provider::Aliyun, Provider::Azure];

impl ResourceClass {
    /// Classify a normalized resource's `type` code within one provider
    pub fn of(provider: &Provider, code: &str) -> Self {
        if let Provider::Unknown(_) = provider {
            return Self::from_code(code);
        }
        provider
            .kinds()
            .iter()
            .find(|k| k.code() == code)
            .map_or(Self::Other, |k| k.class())
    }

    /// Classify a `type` code without knowing the provider.
    ///
    /// A code whose kinds disagree across providers (`storage` is a GCS
    /// bucket on GCP and a storage account on Azure) is [`ResourceClass::Other`].
    pub fn from_code(code: &str) -> Self {
        let mut classes = KNOWN_PROVIDERS
            .iter()
            .flat_map(|p| p.kinds())
            .filter(|k| k.code() == code)
            .map(|k| k.class());
        match classes.next() {
            Some(first) if classes.all(|c| c == first) => first,
            _ => Self::Other,
        }
    }
}

/// `{code, label}` pair offered to users when picking what to enumerate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeDescriptor {
    pub code: String,
    pub label: String,
}

/// Selectable types for a provider, `all` first
pub fn list_types(provider: &Provider) -> Vec<ResourceTypeDescriptor> {
    let mut types = vec![ResourceTypeDescriptor {
        code: ALL.to_string(),
        label: "All Resources".to_string(),
    }];
    types.extend(provider.kinds().iter().map(|k| k.descriptor()));
    types
}

/// Expand aliases and deduplicate, preserving first-seen order.
///
/// Codes the provider does not know are dropped.
pub fn expand<S: AsRef<str>>(selection: &[S], provider: &Provider) -> Vec<ResourceKind> {
    let mut expanded: Vec<ResourceKind> = Vec::new();

    let mut push = |kind: ResourceKind| {
        if !expanded.contains(&kind) {
            expanded.push(kind);
        }
    };

    for code in selection {
        let code = code.as_ref().trim();
        if code == ALL {
            provider.kinds().iter().copied().for_each(&mut push);
        } else if let Some(kinds) = provider.alias(code) {
            kinds.iter().copied().for_each(&mut push);
        } else if let Some(kind) = provider.kind(code) {
            push(kind);
        } else {
            tracing::warn!("Dropping unknown resource type '{}' for {}", code, provider);
        }
    }

    expanded
}

/// Codes of an expanded selection
pub fn codes(selection: &[ResourceKind]) -> Vec<&'static str> {
    selection.iter().map(|k| k.code()).collect()
}

/// Value sent as `resource_type` to the backend: `all` when the selection
/// covers every provider type, otherwise the comma-joined codes
pub fn selection_param(selection: &[ResourceKind], provider: &Provider) -> String {
    let all = provider.kinds();
    if !all.is_empty() && all.iter().all(|k| selection.contains(k)) {
        ALL.to_string()
    } else {
        codes(selection).join(",")
    }
}
