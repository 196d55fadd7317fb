//! Property-based tests using proptest
//!
//! These tests check selection expansion, graph construction, filtering and
//! progress tracking against randomized inputs.

use cloudrecon::api::PermissionProfile;
use cloudrecon::credential::CredentialDefaults;
use cloudrecon::enumeration::{EnumerationProgress, ProgressEvent};
use cloudrecon::graph::{build_escalation_graph, build_topology, techniques, EscalationTechnique};
use cloudrecon::resource::{codes, expand, normalize, Provider, Resource, ResourceFilter, ResourceKind};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;

fn arb_provider() -> impl Strategy<Value = Provider> {
    prop_oneof![
        Just(Provider::Aws),
        Just(Provider::Gcp),
        Just(Provider::Aliyun),
        Just(Provider::Azure),
    ]
}

/// Mix of real codes, aliases and junk
fn arb_selection() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just("all".to_string()),
            Just("iam".to_string()),
            Just("ram".to_string()),
            Just("ec2".to_string()),
            Just("s3".to_string()),
            Just("compute".to_string()),
            Just("storage".to_string()),
            Just("oss".to_string()),
            Just("roleAssignments".to_string()),
            Just("vpc".to_string()),
            "[a-z]{1,8}",
        ],
        0..12,
    )
}

/// EC2 and VPC records drawing network ids from a small pool
fn arb_resource() -> impl Strategy<Value = Resource> {
    let defaults = CredentialDefaults {
        region: "us-east-1".to_string(),
    };
    (
        prop::bool::ANY,
        "[a-z0-9-]{1,12}",
        prop::option::of(prop_oneof![Just("vpc-1"), Just("vpc-2"), Just("vpc-3")]),
        prop_oneof![Just("us-east-1"), Just("eu-west-1")],
    )
        .prop_map(move |(is_vpc, id, vpc, region)| {
            if is_vpc {
                let raw = json!({"vpcId": vpc.unwrap_or("vpc-1"), "region": region});
                normalize(ResourceKind::Vpc, &raw, &defaults).unwrap()
            } else {
                let mut raw = json!({"instanceId": format!("i-{}", id), "region": region});
                if let Some(vpc) = vpc {
                    raw["vpcId"] = json!(vpc);
                }
                normalize(ResourceKind::Ec2, &raw, &defaults).unwrap()
            }
        })
}

fn arb_resources() -> impl Strategy<Value = Vec<Resource>> {
    prop::collection::vec(arb_resource(), 0..40)
}

fn arb_catalog() -> impl Strategy<Value = Vec<EscalationTechnique>> {
    let pool: Vec<EscalationTechnique> = [Provider::Aws, Provider::Gcp, Provider::Azure]
        .iter()
        .flat_map(|p| techniques(p).iter().copied())
        .collect();
    prop::collection::vec(prop::sample::select(pool), 0..30)
}

proptest! {
    #[test]
    fn expand_is_idempotent_and_duplicate_free(
        provider in arb_provider(),
        selection in arb_selection(),
    ) {
        let once = expand(&selection, &provider);
        let twice = expand(&codes(&once), &provider);
        prop_assert_eq!(&once, &twice);

        let unique: HashSet<_> = once.iter().collect();
        prop_assert_eq!(unique.len(), once.len());
        prop_assert!(once.iter().all(|k| provider.kinds().contains(k)));
    }

    #[test]
    fn expand_all_covers_provider(provider in arb_provider(), selection in arb_selection()) {
        let mut with_all = selection.clone();
        with_all.push("all".to_string());
        let expanded = expand(&with_all, &provider);
        prop_assert_eq!(expanded.len(), provider.kinds().len());
    }

    #[test]
    fn topology_is_deterministic(resources in arb_resources()) {
        let first = build_topology(&resources);
        let second = build_topology(&resources);
        prop_assert_eq!(&first, &second);

        // Root plus one node per network or compute resource
        prop_assert_eq!(first.nodes.len(), resources.len() + 1);
        prop_assert_eq!(first.edges.len(), resources.len());
        prop_assert!(first
            .nodes
            .iter()
            .all(|n| n.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')));
    }

    #[test]
    fn escalation_graph_counts(catalog in arb_catalog()) {
        let graph = build_escalation_graph(&PermissionProfile::default(), &catalog);

        prop_assert_eq!(graph.nodes.len(), catalog.len() + 1);
        prop_assert_eq!(graph.edges.len(), catalog.len());

        let root = &graph.nodes[0].id;
        prop_assert!(graph.edges.iter().all(|e| &e.source == root));
        let targets: HashSet<_> = graph.edges.iter().map(|e| e.target.as_str()).collect();
        prop_assert_eq!(targets.len(), catalog.len());
    }

    #[test]
    fn filter_is_idempotent_and_never_grows(
        resources in arb_resources(),
        region in prop::option::of(prop_oneof![Just("all"), Just("us-east-1"), Just("eu-west-1")]),
        kind in prop::option::of(prop_oneof![Just("ec2"), Just("vpc"), Just("all")]),
        text in prop::option::of("[a-z0-9-]{0,3}"),
    ) {
        let filter = ResourceFilter::new(kind, region, text.as_deref());
        let once = filter.apply(&resources);
        let twice = filter.apply(&once);

        prop_assert!(once.len() <= resources.len());
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.iter().all(|r| resources.contains(r)));
    }

    #[test]
    fn progress_never_goes_backwards(
        steps in prop::collection::vec((0usize..3, 0u8..=100, prop::bool::ANY), 0..60),
    ) {
        let codes = ["api", "ec2", "s3"];
        let mut progress = EnumerationProgress::for_selection(&["ec2", "s3"]);

        for (code, percent, finish) in steps {
            let code = codes[code];
            let before = progress.get(code).unwrap().clone();

            let event = if finish {
                ProgressEvent::done(code, percent as usize)
            } else {
                ProgressEvent::running(code, percent, "working")
            };
            progress.apply(&event);

            let after = progress.get(code).unwrap();
            prop_assert!(after.percent >= before.percent);
            if before.status.is_terminal() {
                prop_assert_eq!(after, &before);
            }
        }
    }
}
