//! Testing utilities for formsync workspace
//!
//! Shared resource fixtures and schemas.

#![allow(missing_docs)]

use formsync_document::NodePath;
use serde_json::{json, Value};

pub fn path(dotted: &str) -> NodePath {
    dotted.parse().unwrap()
}

pub fn policy(name: &str, severity: &str) -> Value {
    json!({
        "apiVersion": "policy.open-cluster-management.io/v1",
        "kind": "Policy",
        "metadata": {"name": name, "namespace": "policies"},
        "spec": {
            "disabled": false,
            "remediationAction": "inform",
            "severity": severity
        }
    })
}

pub fn placement(name: &str) -> Value {
    json!({
        "apiVersion": "cluster.open-cluster-management.io/v1beta1",
        "kind": "Placement",
        "metadata": {"name": name, "namespace": "policies"},
        "spec": {"clusterSets": ["default"]}
    })
}

pub fn secret(name: &str, token: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {"name": name, "namespace": "default"},
        "type": "Opaque",
        "stringData": {"token": token, "user": "admin"}
    })
}

/// A resource read back from a cluster
pub fn live(mut resource: Value, uid: &str) -> Value {
    resource["metadata"]["uid"] = json!(uid);
    resource["metadata"]["resourceVersion"] = json!("1");
    resource
}

/// Per-type schema list for policies and placements
pub fn policy_schemas() -> Value {
    json!([
        {
            "type": "Policy",
            "required": 1,
            "schema": {
                "type": "object",
                "required": ["apiVersion", "kind", "metadata", "spec"],
                "properties": {
                    "kind": {"const": "Policy"},
                    "metadata": {
                        "type": "object",
                        "required": ["name", "namespace"],
                        "properties": {
                            "name": {"type": "string", "validateName": true},
                            "namespace": {"type": "string", "validateName": true}
                        }
                    },
                    "spec": {
                        "type": "object",
                        "properties": {
                            "disabled": {"type": "boolean"},
                            "remediationAction": {"enum": ["inform", "enforce"]},
                            "severity": {"type": "string"},
                            "dependencies": {"type": "array", "items": {"validateDep": true}}
                        }
                    }
                }
            }
        },
        {
            "type": "Placement",
            "schema": {
                "type": "object",
                "required": ["metadata"],
                "properties": {
                    "metadata": {
                        "type": "object",
                        "properties": {"name": {"type": "string", "validateName": true}}
                    }
                }
            }
        }
    ])
}
