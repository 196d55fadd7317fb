//! Resource Normalizer
//!
//! Turns the shape-varying items of an enumerate response into canonical
//! [`Resource`] records. Each kind declares where its key, label, status and
//! extra attributes live; everything else is shared.

use super::catalog::ResourceKind;
use crate::credential::CredentialDefaults;
use crate::error::NormalizationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status used when a kind has no state field
pub const DEFAULT_STATUS: &str = "active";

/// Region used when neither the item nor the credential has one
pub const GLOBAL_REGION: &str = "global";

/// Canonical resource record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub status: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Object listing, copied as the backend sent it
    pub objects: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_objects: Option<bool>,
    /// Type-specific attributes (vpcId, instanceType, tags, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Resource {
    /// String attribute, if present and non-empty
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Network the resource is attached to
    pub fn vpc_id(&self) -> Option<&str> {
        self.attr_str("vpcId")
    }
}

/// How to label an item that has no name field
#[derive(Debug, Clone, Copy)]
enum NameFallback {
    /// Use the id verbatim
    Id,
    /// `"<prefix> <id>"`
    Prefixed(&'static str),
    /// Text after the last `:` of the id (ARNs)
    ArnTail,
    /// Text after the last `/` of the id (URLs)
    PathTail,
}

/// Where a kind keeps its fields. Paths may be dotted (`tags.Name`).
struct FieldMap {
    id: &'static [&'static str],
    name: &'static [&'static str],
    fallback: NameFallback,
    status: &'static [&'static str],
    attributes: &'static [&'static str],
}

fn field_map(kind: ResourceKind) -> FieldMap {
    use NameFallback::*;
    use ResourceKind::*;

    match kind {
        Ec2 | EcsInstance | GceInstance => FieldMap {
            id: &["instanceId"],
            name: &["tags.Name", "name"],
            fallback: Prefixed("Instance"),
            status: &["state", "status"],
            attributes: &[
                "instanceType",
                "publicIp",
                "privateIp",
                "vpcId",
                "subnetId",
                "tags",
            ],
        },
        AzureVm => FieldMap {
            id: &["vmId"],
            name: &["vmName"],
            fallback: Prefixed("VM"),
            status: &["status"],
            attributes: &["size", "publicIp", "privateIp", "vpcId"],
        },
        S3 | GcsBucket | OssBucket => FieldMap {
            id: &["bucketName"],
            name: &["bucketName"],
            fallback: Id,
            status: &[],
            attributes: &["creationDate"],
        },
        StorageAccount => FieldMap {
            id: &["accountId", "accountName"],
            name: &["accountName"],
            fallback: Id,
            status: &[],
            attributes: &["sku"],
        },
        IamRoles | RamRoles => FieldMap {
            id: &["roleId", "roleName"],
            name: &["roleName"],
            fallback: Id,
            status: &[],
            attributes: &["arn", "description"],
        },
        IamUsers | RamUsers => FieldMap {
            id: &["userId", "userName"],
            name: &["userName"],
            fallback: Id,
            status: &[],
            attributes: &["arn", "email"],
        },
        RoleAssignment => FieldMap {
            id: &["assignmentId"],
            name: &["roleDefinitionName", "roleDefinitionId"],
            fallback: Id,
            status: &[],
            attributes: &["roleDefinitionId", "principalId"],
        },
        Vpc => FieldMap {
            id: &["vpcId"],
            name: &["tags.Name"],
            fallback: Id,
            status: &["state"],
            attributes: &["cidrBlock", "isDefault", "ownerId", "tags"],
        },
        RouteTable => FieldMap {
            id: &["routeTableId"],
            name: &["tags.Name"],
            fallback: Id,
            status: &[],
            attributes: &["vpcId", "routes", "tags"],
        },
        Elb => FieldMap {
            id: &["loadBalancerArn", "loadBalancerName"],
            name: &["loadBalancerName"],
            fallback: ArnTail,
            status: &["state"],
            attributes: &["dnsName", "vpcId", "availabilityZones", "securityGroups"],
        },
        Eks => FieldMap {
            id: &["arn", "name"],
            name: &["name"],
            fallback: ArnTail,
            status: &["status"],
            attributes: &["version", "endpoint", "roleArn", "createdAt"],
        },
        Kms => FieldMap {
            id: &["keyId"],
            name: &["description"],
            fallback: Id,
            status: &["keyState"],
            attributes: &["arn", "keyUsage", "creationDate"],
        },
        Rds => FieldMap {
            id: &["dbInstanceIdentifier"],
            name: &["dbInstanceIdentifier"],
            fallback: Id,
            status: &["status"],
            attributes: &[
                "dbInstanceArn",
                "dbInstanceClass",
                "engine",
                "engineVersion",
                "endpoint",
                "multiAZ",
            ],
        },
        Lambda => FieldMap {
            id: &["functionArn", "functionName"],
            name: &["functionName"],
            fallback: ArnTail,
            status: &[],
            attributes: &["runtime", "handler", "role", "lastModified"],
        },
        ApiGateway => FieldMap {
            id: &["id", "apiId"],
            name: &["name"],
            fallback: Id,
            status: &[],
            attributes: &["description", "protocolType", "createdDate"],
        },
        CloudTrail => FieldMap {
            id: &["trailArn", "name"],
            name: &["name"],
            fallback: ArnTail,
            status: &[],
            attributes: &["s3BucketName", "homeRegion", "isMultiRegionTrail"],
        },
        CloudWatchLogs => FieldMap {
            id: &["logGroupName"],
            name: &["logGroupName"],
            fallback: Id,
            status: &[],
            attributes: &["arn", "retentionInDays", "storedBytes"],
        },
        DynamoDb => FieldMap {
            id: &["tableName"],
            name: &["tableName"],
            fallback: Id,
            status: &["tableStatus"],
            attributes: &["tableArn", "itemCount", "tableSizeBytes"],
        },
        SecretsManager => FieldMap {
            id: &["arn", "name"],
            name: &["name"],
            fallback: ArnTail,
            status: &[],
            attributes: &["description", "lastChangedDate"],
        },
        Sns => FieldMap {
            id: &["topicArn"],
            name: &["name"],
            fallback: ArnTail,
            status: &[],
            attributes: &[],
        },
        Sqs => FieldMap {
            id: &["queueUrl"],
            name: &["queueName"],
            fallback: PathTail,
            status: &[],
            attributes: &["queueArn"],
        },
    }
}

/// Normalize one raw item
pub fn normalize(
    kind: ResourceKind,
    raw: &Value,
    defaults: &CredentialDefaults,
) -> Result<Resource, NormalizationError> {
    let Some(item) = raw.as_object() else {
        return Err(NormalizationError::NotAnObject {
            kind: kind.code().to_string(),
        });
    };

    let fields = field_map(kind);

    let id = first_text(raw, fields.id).ok_or_else(|| NormalizationError::MissingField {
        kind: kind.code().to_string(),
        candidates: fields.id.join(", "),
    })?;

    let name = first_text(raw, fields.name).unwrap_or_else(|| match fields.fallback {
        NameFallback::Id => id.clone(),
        NameFallback::Prefixed(prefix) => format!("{} {}", prefix, id),
        NameFallback::ArnTail => tail(&id, ':'),
        NameFallback::PathTail => tail(&id, '/'),
    });

    let status = first_status(raw, fields.status).unwrap_or_else(|| DEFAULT_STATUS.to_string());

    let region = first_text(raw, &["region", "location"])
        .or_else(|| Some(defaults.region.clone()).filter(|r| !r.is_empty()))
        .unwrap_or_else(|| GLOBAL_REGION.to_string());

    let mut attributes = Map::new();
    for key in fields.attributes {
        if let Some(value) = item.get(*key).filter(|v| !v.is_null()) {
            attributes.insert(key.to_string(), value.clone());
        }
    }

    let (objects, more_objects) = if kind.class() == super::ResourceClass::ObjectStore {
        (
            Some(copy_objects(item.get("objects"))),
            Some(item.get("moreObjects").and_then(|v| v.as_bool()).unwrap_or(false)),
        )
    } else {
        (None, None)
    };

    Ok(Resource {
        id,
        name,
        resource_type: kind.code().to_string(),
        status,
        region,
        objects,
        more_objects,
        attributes,
    })
}

/// Normalize the payload field of one kind.
///
/// An absent or null field means the backend found nothing. Any malformed
/// item fails the whole kind.
pub fn normalize_field(
    kind: ResourceKind,
    field: Option<&Value>,
    defaults: &CredentialDefaults,
) -> Result<Vec<Resource>, NormalizationError> {
    match field {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| normalize(kind, item, defaults))
            .collect(),
        Some(_) => Err(NormalizationError::NotAnArray {
            kind: kind.code().to_string(),
            field: kind.payload_field().to_string(),
        }),
    }
}

/// Object listings are copied verbatim; members may hold nulls
fn copy_objects(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(objects)) => objects.clone(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::debug!("Ignoring non-array objects listing: {}", other);
            Vec::new()
        }
    }
}

/// Follow a dotted path
fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |current, part| current.get(part))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(item: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| lookup(item, path).and_then(as_text))
}

/// States are either plain strings or objects such as `{"code": "active"}`
fn first_status(item: &Value, paths: &[&str]) -> Option<String> {
    paths.iter().find_map(|path| {
        let value = lookup(item, path)?;
        as_text(value).or_else(|| {
            ["code", "Code", "name", "Name"]
                .iter()
                .find_map(|k| value.get(*k).and_then(as_text))
        })
    })
}

fn tail(id: &str, separator: char) -> String {
    id.trim_end_matches(separator)
        .rsplit(separator)
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(id)
        .to_string()
}
