//! Request and response bodies of the backend API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `POST /cloud/enumerate` body
#[derive(Debug, Clone, Serialize)]
pub struct EnumerateRequest<'a> {
    pub credential_id: u64,
    pub resource_type: &'a str,
}

/// `POST /cloud/escalate` body
#[derive(Debug, Clone, Serialize)]
pub struct EscalateRequest {
    pub credential_id: u64,
}

/// Raw enumerate result: payload field name to raw JSON.
///
/// Kept untyped so that one malformed field only affects the resource
/// kind reading it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumerationPayload {
    #[serde(default)]
    pub result: Map<String, Value>,
}

impl EnumerationPayload {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.result.get(name)
    }
}

impl From<Value> for EnumerationPayload {
    fn from(result: Value) -> Self {
        match result {
            Value::Object(result) => Self { result },
            _ => Self::default(),
        }
    }
}

/// Envelope of `POST /cloud/escalate`
#[derive(Debug, Clone, Deserialize)]
pub struct EscalateResponse {
    pub result: PermissionProfile,
}

/// What the credential is allowed to do
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionProfile {
    #[serde(default)]
    pub user_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potential_escalation: Vec<String>,
}

impl PermissionProfile {
    /// Root and administrator profiles have nothing left to escalate to
    pub fn is_terminal(&self) -> bool {
        let t = self.user_type.trim().to_ascii_lowercase();
        matches!(
            t.as_str(),
            "root" | "root user" | "administrator" | "admin" | "owner"
        )
    }
}

/// `{error}` body returned by the backend on failure
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_backend_body() {
        let body = json!({"result": {"instances": [{"instanceId": "i-1"}]}});
        let payload: EnumerationPayload = serde_json::from_value(body).unwrap();
        assert!(payload.field("instances").unwrap().is_array());
        assert!(payload.field("buckets").is_none());
    }

    #[test]
    fn test_profile_terminal_states() {
        let mut profile: PermissionProfile = serde_json::from_value(json!({
            "userType": "IAM User",
            "user": "alice",
            "permissions": ["s3:ListBuckets"],
            "riskLevel": "Medium"
        }))
        .unwrap();
        assert!(!profile.is_terminal());

        profile.user_type = "ROOT".to_string();
        assert!(profile.is_terminal());
        profile.user_type = "Root User".to_string();
        assert!(profile.is_terminal());
        profile.user_type = "Administrator".to_string();
        assert!(profile.is_terminal());
    }
}
