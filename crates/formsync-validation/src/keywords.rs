//! Custom schema keywords
//!
//! Resource schemas carry keywords the standard validator ignores
//! (`validateName: true` and friends). They are evaluated here by walking the
//! schema alongside the instance through `properties`, `items`,
//! `additionalProperties` and `allOf`.

use crate::types::Severity;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static DNS_SUBDOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9.]*[a-z0-9])?$").expect("valid regex"));
static DNS_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"));
static TEMPLATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{\{.*\}\}$").expect("valid regex"));
static LABEL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)?$").expect("valid regex"));

const NAME_MAX: usize = 253;
const LABEL_MAX: usize = 63;

/// Kinds whose dependencies must not name a namespace
const CLUSTER_SCOPED_DEPENDENCIES: [&str; 3] = ["ConfigurationPolicy", "IamPolicy", "CertificatePolicy"];

/// Generator keys accepted by `validateGenerator`
const GENERATORS: [&str; 8] = [
    "clusterDecisionResource",
    "git",
    "list",
    "clusters",
    "merge",
    "scmProvider",
    "pullRequest",
    "plugin",
];

/// Custom keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomKeyword {
    /// DNS-subdomain-like resource name
    ValidateName,
    /// Label-like name, or a `{{ }}` template expression
    ValidateTemplateName,
    /// Label key/value syntax
    ValidateLabel,
    /// Dependency on a cluster-scoped policy kind carries no namespace
    ValidateDep,
    /// Kind is deprecated
    DeprecatedKind,
    /// Exactly one known generator per entry
    ValidateGenerator,
}

impl CustomKeyword {
    const ALL: [Self; 6] = [
        Self::ValidateName,
        Self::ValidateTemplateName,
        Self::ValidateLabel,
        Self::ValidateDep,
        Self::DeprecatedKind,
        Self::ValidateGenerator,
    ];

    /// Keyword as written in a schema
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ValidateName => "validateName",
            Self::ValidateTemplateName => "validateTemplateName",
            Self::ValidateLabel => "validateLabel",
            Self::ValidateDep => "validateDep",
            Self::DeprecatedKind => "deprecatedKind",
            Self::ValidateGenerator => "validateGenerator",
        }
    }

    /// Severity of a violation
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::ValidateGenerator => Severity::Warning,
            Self::DeprecatedKind => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Violation message for `value`, `None` when the value passes
    fn check(self, value: &Value) -> Option<String> {
        match self {
            Self::ValidateName => {
                let name = value.as_str()?;
                (name.len() > NAME_MAX || !DNS_SUBDOMAIN.is_match(name)).then(|| {
                    "Name must start/end alphanumerically, can contain dashes and periods, \
                     and must be less then 253 characters"
                        .to_string()
                })
            }
            Self::ValidateTemplateName => {
                let name = value.as_str()?;
                let ok = TEMPLATE.is_match(name) || (name.len() <= LABEL_MAX && DNS_LABEL.is_match(name));
                (!ok).then(|| {
                    "Name must start/end alphanumerically, can contain dashes, \
                     and must be less then 63 characters"
                        .to_string()
                })
            }
            Self::ValidateLabel => {
                let ok = match value {
                    Value::String(s) => label_ok(s),
                    Value::Object(map) => map.iter().all(|(k, v)| {
                        let name = k.rsplit('/').next().unwrap_or(k);
                        label_ok(name) && v.as_str().map_or(true, label_ok)
                    }),
                    _ => true,
                };
                (!ok).then(|| {
                    "Labels must start/end alphanumerically, can contain dashes, underscores \
                     and periods, and must be 63 characters or less"
                        .to_string()
                })
            }
            Self::ValidateDep => {
                let deps: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                deps.iter().any(|dep| namespaced_cluster_dependency(dep)).then(|| {
                    "Dependencies on ConfigurationPolicies, IamPolicies, and CertificatePolicies \
                     cannot contain a namespace"
                        .to_string()
                })
            }
            Self::DeprecatedKind => Some(match value.as_str() {
                Some(kind) => format!("{kind} is deprecated"),
                None => "This kind is deprecated".to_string(),
            }),
            Self::ValidateGenerator => {
                let entries: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                let ok = entries.iter().all(|entry| {
                    entry.as_object().is_some_and(|map| {
                        map.len() == 1 && map.keys().all(|k| GENERATORS.contains(&k.as_str()))
                    })
                });
                (!ok).then(|| format!("Generator must be one of: {}", GENERATORS.join(", ")))
            }
        }
    }
}

fn label_ok(s: &str) -> bool {
    s.len() <= LABEL_MAX && LABEL_VALUE.is_match(s)
}

fn namespaced_cluster_dependency(dep: &Value) -> bool {
    let kind = dep.get("kind").and_then(Value::as_str).unwrap_or_default();
    CLUSTER_SCOPED_DEPENDENCIES.contains(&kind) && dep.get("namespace").is_some()
}

/// One custom keyword violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordViolation {
    /// Instance path of the offending value
    pub instance_path: Vec<String>,
    /// Keyword that failed
    pub keyword: CustomKeyword,
    /// Message
    pub message: String,
}

/// Evaluate every custom keyword of `schema` against `instance`
#[must_use]
pub fn check_keywords(schema: &Value, instance: &Value) -> Vec<KeywordViolation> {
    let mut out = Vec::new();
    walk(schema, instance, &mut Vec::new(), &mut out);
    out
}

fn walk(schema: &Value, instance: &Value, path: &mut Vec<String>, out: &mut Vec<KeywordViolation>) {
    let Some(schema) = schema.as_object() else { return };

    for keyword in CustomKeyword::ALL {
        let enabled = schema.get(keyword.name()).is_some_and(|v| v != &Value::Bool(false));
        if !enabled {
            continue;
        }
        if let Some(message) = keyword.check(instance) {
            out.push(KeywordViolation {
                instance_path: path.clone(),
                keyword,
                message,
            });
        }
    }

    if let Some(all_of) = schema.get("allOf").and_then(Value::as_array) {
        for sub in all_of {
            walk(sub, instance, path, out);
        }
    }

    match instance {
        Value::Object(map) => {
            let properties = schema.get("properties").and_then(Value::as_object);
            if let Some(properties) = properties {
                for (key, sub) in properties {
                    if let Some(child) = map.get(key) {
                        path.push(key.clone());
                        walk(sub, child, path, out);
                        path.pop();
                    }
                }
            }
            if let Some(additional) = schema.get("additionalProperties").filter(|v| v.is_object()) {
                for (key, child) in map {
                    if properties.is_some_and(|p| p.contains_key(key)) {
                        continue;
                    }
                    path.push(key.clone());
                    walk(additional, child, path, out);
                    path.pop();
                }
            }
        }
        Value::Array(items) => match schema.get("items") {
            Some(Value::Array(tuple)) => {
                for (i, (sub, child)) in tuple.iter().zip(items).enumerate() {
                    path.push(i.to_string());
                    walk(sub, child, path, out);
                    path.pop();
                }
            }
            Some(sub) => {
                for (i, child) in items.iter().enumerate() {
                    path.push(i.to_string());
                    walk(sub, child, path, out);
                    path.pop();
                }
            }
            None => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "metadata": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "validateName": true},
                        "labels": {"validateLabel": true}
                    }
                },
                "spec": {
                    "allOf": [{
                        "properties": {
                            "dependencies": {"items": {"validateDep": true}},
                            "generators": {"validateGenerator": true}
                        }
                    }]
                }
            }
        })
    }

    #[test]
    fn name_must_be_dns_subdomain() {
        let found = check_keywords(&schema(), &json!({"metadata": {"name": "-test"}}));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].instance_path, vec!["metadata", "name"]);
        assert!(found[0].message.contains("must start/end alphanumerically"));
        assert!(check_keywords(&schema(), &json!({"metadata": {"name": "a.b-c"}})).is_empty());
    }

    #[test]
    fn label_length_limit() {
        let long = "a".repeat(64);
        let found = check_keywords(&schema(), &json!({"metadata": {"labels": {"app": long}}}));
        assert!(found[0].message.contains("63 characters"));
    }

    #[test]
    fn dependency_namespace_rejected_for_cluster_policies() {
        let instance = json!({"spec": {"dependencies": [
            {"kind": "Policy", "namespace": "ns"},
            {"kind": "IamPolicy", "namespace": "ns"}
        ]}});
        let found = check_keywords(&schema(), &instance);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].instance_path, vec!["spec", "dependencies", "1"]);
        assert!(found[0].message.contains("ConfigurationPolicies"));
    }

    #[test]
    fn generator_needs_exactly_one_known_key() {
        let good = json!({"spec": {"generators": [{"list": {}}, {"git": {}}]}});
        assert!(check_keywords(&schema(), &good).is_empty());
        let bad = json!({"spec": {"generators": [{"list": {}, "git": {}}]}});
        let found = check_keywords(&schema(), &bad);
        assert_eq!(found[0].keyword.severity(), Severity::Warning);
        assert!(found[0].message.starts_with("Generator must be one of"));
    }

    #[test]
    fn template_names_accept_expressions() {
        let schema = json!({"properties": {"name": {"validateTemplateName": true}}});
        assert!(check_keywords(&schema, &json!({"name": "{{ .Name }}"})).is_empty());
        assert!(check_keywords(&schema, &json!({"name": "ok-name"})).is_empty());
        assert_eq!(check_keywords(&schema, &json!({"name": "Bad_Name"})).len(), 1);
    }

    #[test]
    fn deprecated_kind_always_reports() {
        let schema = json!({"properties": {"kind": {"deprecatedKind": true}}});
        let found = check_keywords(&schema, &json!({"kind": "PlacementRule"}));
        assert_eq!(found[0].keyword.severity(), Severity::Info);
        assert!(found[0].message.contains("deprecated"));
    }
}
