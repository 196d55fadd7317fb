//! Resource filtering and per-type summaries

use super::catalog::ALL;
use super::normalize::Resource;
use indexmap::IndexMap;

/// Filter over normalized resources. `None` (or `all`) means no constraint.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub resource_type: Option<String>,
    pub region: Option<String>,
    pub text: Option<String>,
}

impl ResourceFilter {
    pub fn new(resource_type: Option<&str>, region: Option<&str>, text: Option<&str>) -> Self {
        let constraint = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty() && *s != ALL)
                .map(str::to_string)
        };
        Self {
            resource_type: constraint(resource_type),
            region: constraint(region),
            text: text
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        if let Some(ref t) = self.resource_type {
            if &resource.resource_type != t {
                return false;
            }
        }
        if let Some(ref region) = self.region {
            if &resource.region != region {
                return false;
            }
        }
        if let Some(ref text) = self.text {
            let text = text.to_lowercase();
            return resource.id.to_lowercase().contains(&text)
                || resource.name.to_lowercase().contains(&text);
        }
        true
    }

    pub fn apply(&self, resources: &[Resource]) -> Vec<Resource> {
        resources
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

/// Resource count per type code, in first-seen order
pub fn summarize_by_type(resources: &[Resource]) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for r in resources {
        *counts.entry(r.resource_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Distinct regions, in first-seen order
pub fn regions(resources: &[Resource]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in resources {
        if !out.contains(&r.region) {
            out.push(r.region.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn res(id: &str, t: &str, region: &str) -> Resource {
        Resource {
            id: id.to_string(),
            name: format!("name-{}", id),
            resource_type: t.to_string(),
            status: "active".to_string(),
            region: region.to_string(),
            objects: None,
            more_objects: None,
            attributes: Map::new(),
        }
    }

    #[test]
    fn test_all_means_no_constraint() {
        let items = vec![res("a", "ec2", "us-east-1"), res("b", "s3", "eu-west-1")];
        let filter = ResourceFilter::new(Some("all"), Some("all"), None);
        assert_eq!(filter.apply(&items).len(), 2);
    }

    #[test]
    fn test_filter_by_type_and_region() {
        let items = vec![
            res("a", "ec2", "us-east-1"),
            res("b", "ec2", "eu-west-1"),
            res("c", "s3", "us-east-1"),
        ];
        let filter = ResourceFilter::new(Some("ec2"), Some("us-east-1"), None);
        let out = filter.apply(&items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn test_text_is_case_insensitive() {
        let items = vec![res("Web-1", "ec2", "us-east-1"), res("db", "rds", "us-east-1")];
        let filter = ResourceFilter::new(None, None, Some("WEB"));
        assert_eq!(filter.apply(&items).len(), 1);
    }

    #[test]
    fn test_summaries() {
        let items = vec![
            res("a", "ec2", "us-east-1"),
            res("b", "s3", "eu-west-1"),
            res("c", "ec2", "us-east-1"),
        ];
        let counts = summarize_by_type(&items);
        assert_eq!(counts.get_index(0), Some((&"ec2".to_string(), &2)));
        assert_eq!(counts["s3"], 1);
        assert_eq!(regions(&items), vec!["us-east-1", "eu-west-1"]);
    }
}
