//! Integration tests for the HTTP backend using wiremock
//!
//! These tests drive `HttpBackend` and the orchestrator against mocked
//! `/cloud/*` endpoints, covering success bodies, `{error}` bodies and
//! status-code fallbacks.

use cloudrecon::api::{EnumerationBackend, HttpBackend};
use cloudrecon::enumeration::{Orchestrator, OrchestratorOptions, Phase, ProgressStatus};
use cloudrecon::resource::Provider;
use cloudrecon::{Credential, ReconError};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&format!("{}/api", server.uri()), None).expect("valid URL")
}

/// Test module for the raw backend calls
mod http_backend_tests {
    use super::*;

    /// Enumerate posts the credential and selection and unwraps `result`
    #[tokio::test]
    async fn test_enumerate_posts_selection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .and(body_json(json!({"credential_id": 7, "resource_type": "ec2,s3"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"instances": [{"instanceId": "i-1"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let payload = backend(&server).enumerate(7, "ec2,s3").await.unwrap();

        assert_eq!(payload.field("instances").unwrap()[0]["instanceId"], "i-1");
        assert!(payload.field("buckets").is_none());
    }

    /// The token is sent verbatim as the Authorization header
    #[tokio::test]
    async fn test_authorization_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .and(header("authorization", "secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HttpBackend::new(
            &format!("{}/api/", server.uri()),
            Some("secret-token".to_string()),
        )
        .unwrap();

        tokio_test::assert_ok!(backend.enumerate(1, "all").await);
    }

    /// Server `{error}` text is surfaced verbatim
    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Credential not found"})),
            )
            .mount(&server)
            .await;

        let err = tokio_test::assert_err!(backend(&server).enumerate(9, "all").await);
        assert!(matches!(err, ReconError::Backend(ref m) if m == "Credential not found"));
    }

    /// 5xx without a JSON body falls back to generic text
    #[tokio::test]
    async fn test_server_error_fallback() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/escalate"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = backend(&server).escalate(1).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Backend service temporarily unavailable. Please try again."
        );
        assert!(err.is_fatal());
    }

    /// Escalate parses the permission profile
    #[tokio::test]
    async fn test_escalate_returns_profile() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/escalate"))
            .and(body_json(json!({"credential_id": 4})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "user": "arn:aws:iam::1:user/alice",
                    "userType": "IAM User",
                    "role": "",
                    "permissions": ["iam:ListUsers", "iam:ListRoles"],
                    "potentialEscalation": ["iam:PassRole"],
                    "riskLevel": "High",
                    "message": "Privilege escalation attempted"
                }
            })))
            .mount(&server)
            .await;

        let profile = backend(&server).escalate(4).await.unwrap();
        assert_eq!(profile.user_type, "IAM User");
        assert_eq!(profile.permissions.len(), 2);
        assert_eq!(profile.potential_escalation, vec!["iam:PassRole"]);
        assert!(!profile.is_terminal());
    }

    /// Unreachable backend yields the network message
    #[tokio::test]
    async fn test_connection_refused() {
        let backend = HttpBackend::new("http://127.0.0.1:9/api", None).unwrap();
        let err = backend.enumerate(1, "all").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Request failed. Check your network connection and try again."
        );
    }
}

/// Test module for whole enumeration runs over HTTP
mod orchestrator_tests {
    use super::*;

    fn orchestrator(server: &MockServer) -> Orchestrator<HttpBackend> {
        Orchestrator::with_options(
            backend(server),
            OrchestratorOptions {
                progress_tick: Duration::from_millis(10),
                type_pacing: Duration::ZERO,
            },
        )
    }

    /// Full AWS run with only instances and buckets returned
    #[tokio::test]
    async fn test_end_to_end_all_types() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .and(body_json(json!({"credential_id": 1, "resource_type": "all"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "instances": [{"instanceId": "i-1", "state": "running"}],
                    "buckets": [{"bucketName": "b1"}]
                }
            })))
            .mount(&server)
            .await;

        let orchestrator = orchestrator(&server);
        let credential = Credential::new(1, Provider::Aws, "us-east-1");

        let report = orchestrator
            .run(&credential, &["all"], &CancellationToken::new())
            .await
            .unwrap();

        let resources = serde_json::to_value(&report.resources).unwrap();
        assert_eq!(
            resources,
            json!([
                {"id": "i-1", "name": "Instance i-1", "type": "ec2", "status": "running", "region": "us-east-1"},
                {"id": "b1", "name": "b1", "type": "s3", "status": "active", "region": "us-east-1", "objects": [], "moreObjects": false}
            ])
        );

        let state = orchestrator.state(1).snapshot();
        assert_eq!(state.phase, Phase::Completed);
        for code in ["vpc", "rds", "lambda", "sqs"] {
            let entry = state.progress.get(code).unwrap();
            assert_eq!(entry.percent, 100);
            assert_eq!(entry.status.text(), "no resources found");
        }
    }

    /// A malformed field only fails its own type
    #[tokio::test]
    async fn test_malformed_buckets_are_isolated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "instances": [{"instanceId": "i-1", "state": "running"}],
                    "buckets": [{"creationDate": "2024-01-01"}]
                }
            })))
            .mount(&server)
            .await;

        let orchestrator = orchestrator(&server);
        let credential = Credential::new(1, Provider::Aws, "us-east-1");

        let report = orchestrator
            .run(&credential, &["ec2", "s3"], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.resources[0].resource_type, "ec2");

        let state = orchestrator.state(1).snapshot();
        let s3 = state.progress.get("s3").unwrap();
        assert_eq!(s3.percent, 100);
        assert!(matches!(s3.status, ProgressStatus::Failed(_)));
        assert!(state.error.is_none());
    }

    /// Backend rejection resets the run and surfaces one message
    #[tokio::test]
    async fn test_backend_rejection_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"error": "Access denied"})),
            )
            .mount(&server)
            .await;

        let orchestrator = orchestrator(&server);
        let credential = Credential::new(2, Provider::Gcp, "us-central1");

        let err = orchestrator
            .run(&credential, &["iam"], &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Access denied");

        let state = orchestrator.state(2).snapshot();
        assert_eq!(state.phase, Phase::Failed);
        assert!(state.progress.is_empty());
        assert_eq!(state.error.as_deref(), Some("Access denied"));
    }

    /// Cancelling during a slow response abandons the request
    #[tokio::test]
    async fn test_cancel_slow_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/cloud/enumerate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"result": {}}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let orchestrator = orchestrator(&server);
        let credential = Credential::new(3, Provider::Aliyun, "cn-hangzhou");
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let report = orchestrator.run(&credential, &["ram"], &token).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.summary.cancelled, 2);
        assert_eq!(orchestrator.state(3).snapshot().phase, Phase::Cancelled);
    }
}
