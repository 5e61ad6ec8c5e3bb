//! Resource pairing across two resource lists
//!
//! Resources pair by identity first. Whatever is left pairs within its kind:
//! a lone remaining candidate is taken as is, otherwise the candidate whose
//! JSON body is most similar wins. Long base64 runs (certificates, encoded
//! secrets) are blanked before comparing so they do not dominate the score.

use formsync_document::{resource_id, similarity};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static BASE64_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9+/=]{32,}").expect("valid regex"));

/// Compact JSON body with base64-looking runs removed
#[must_use]
pub fn comparable_body(resource: &Value) -> String {
    BASE64_RUN.replace_all(&resource.to_string(), "").into_owned()
}

fn kind_of(resource: &Value) -> Option<&str> {
    resource.get("kind").and_then(Value::as_str)
}

/// Pair every resource of `from` with at most one resource of `to`
///
/// Returns, for each index of `from`, the index in `to` it pairs with.
#[must_use]
pub fn pair_resources(from: &[Value], to: &[Value]) -> Vec<Option<usize>> {
    let mut pairs: Vec<Option<usize>> = vec![None; from.len()];
    let mut taken = vec![false; to.len()];

    let to_ids: Vec<Option<String>> = to.iter().map(resource_id).collect();
    for (i, resource) in from.iter().enumerate() {
        let Some(id) = resource_id(resource) else { continue };
        if let Some(j) = (0..to.len()).find(|&j| !taken[j] && to_ids[j].as_deref() == Some(id.as_str())) {
            pairs[i] = Some(j);
            taken[j] = true;
        }
    }

    for (i, resource) in from.iter().enumerate() {
        if pairs[i].is_some() {
            continue;
        }
        let kind = kind_of(resource);
        let candidates: Vec<usize> = (0..to.len())
            .filter(|&j| !taken[j] && kind_of(&to[j]) == kind)
            .collect();
        let chosen = match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            many => {
                let body = comparable_body(resource);
                let mut best: Option<(usize, f64)> = None;
                for &j in many {
                    let rating = similarity(&body, &comparable_body(&to[j]));
                    if best.map_or(true, |(_, r)| rating > r) {
                        best = Some((j, rating));
                    }
                }
                best.filter(|(_, r)| *r > 0.0).map(|(j, _)| j)
            }
        };
        if let Some(j) = chosen {
            tracing::debug!(from = i, to = j, "paired resource by similarity");
            pairs[i] = Some(j);
            taken[j] = true;
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_pairs_regardless_of_order() {
        let from = vec![
            json!({"kind": "A", "metadata": {"name": "x"}}),
            json!({"kind": "A", "metadata": {"name": "y"}}),
        ];
        let to = vec![
            json!({"metadata": {"name": "y"}, "kind": "A"}),
            json!({"metadata": {"name": "x"}, "kind": "A"}),
        ];
        assert_eq!(pair_resources(&from, &to), vec![Some(1), Some(0)]);
    }

    #[test]
    fn renamed_resource_pairs_with_single_candidate() {
        let from = vec![json!({"kind": "A", "metadata": {"name": "old"}})];
        let to = vec![
            json!({"kind": "B", "metadata": {"name": "b"}}),
            json!({"kind": "A", "metadata": {"name": "new"}}),
        ];
        assert_eq!(pair_resources(&from, &to), vec![Some(1)]);
    }

    #[test]
    fn renamed_resource_pairs_with_most_similar() {
        let from = vec![json!({"kind": "A", "metadata": {"name": "old"}, "spec": {"replicas": 3, "image": "nginx"}})];
        let to = vec![
            json!({"kind": "A", "metadata": {"name": "q"}, "data": {"z": 1}}),
            json!({"kind": "A", "metadata": {"name": "renamed"}, "spec": {"replicas": 3, "image": "nginx"}}),
        ];
        assert_eq!(pair_resources(&from, &to), vec![Some(1)]);
    }

    #[test]
    fn base64_runs_blanked() {
        let body = comparable_body(&json!({"data": "QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVphYmNkZWZn"}));
        assert_eq!(body, r#"{"data":""}"#);
    }

    #[test]
    fn other_kinds_never_pair() {
        let from = vec![json!({"kind": "A", "metadata": {"name": "x"}})];
        let to = vec![json!({"kind": "B", "metadata": {"name": "x"}})];
        assert_eq!(pair_resources(&from, &to), vec![None]);
    }
}
