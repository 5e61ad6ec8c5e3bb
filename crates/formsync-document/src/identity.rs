//! Resource identity and string similarity
//!
//! Resources are identified by kind, namespace and name, the way a cluster
//! would address them; `metadata.selfLink` takes precedence when present.
//! Similarity is the Sørensen-Dice coefficient over character bigrams.

use serde_json::Value;

/// Identity of a resource
///
/// `/namespaces/<ns|none>/<kind>s/<name>`, lowercased, or the resource's
/// `metadata.selfLink`. `None` when the resource has no name.
#[must_use]
pub fn resource_id(resource: &Value) -> Option<String> {
    let metadata = resource.get("metadata");
    if let Some(link) = metadata.and_then(|m| m.get("selfLink")).and_then(Value::as_str) {
        return Some(link.to_string());
    }
    let name = metadata.and_then(|m| m.get("name")).and_then(Value::as_str)?;
    let namespace = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
        .unwrap_or("none");
    let kind = resource.get("kind").and_then(Value::as_str).unwrap_or_default();
    Some(format!("/namespaces/{namespace}/{kind}s/{name}").to_lowercase())
}

/// Sørensen-Dice similarity of two strings, in `0.0..=1.0`
#[inline]
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(a, b)
}

/// Best candidate for `target`, first encountered on ties
#[must_use]
pub fn best_match<'a, I>(target: &str, candidates: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.into_iter().enumerate() {
        let rating = similarity(target, candidate);
        if best.map_or(true, |(_, r)| rating > r) {
            best = Some((i, rating));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_ignores_field_order_and_case() {
        let a = json!({"kind": "Policy", "metadata": {"name": "P1", "namespace": "NS"}});
        let b = json!({"metadata": {"namespace": "ns", "name": "p1"}, "kind": "Policy"});
        assert_eq!(resource_id(&a), resource_id(&b));
        assert_eq!(resource_id(&a).unwrap(), "/namespaces/ns/policys/p1");
    }

    #[test]
    fn id_defaults_namespace_and_prefers_self_link() {
        let plain = json!({"kind": "Placement", "metadata": {"name": "x"}});
        assert_eq!(resource_id(&plain).unwrap(), "/namespaces/none/placements/x");
        let linked = json!({"kind": "A", "metadata": {"name": "x", "selfLink": "/apis/a/X"}});
        assert_eq!(resource_id(&linked).unwrap(), "/apis/a/X");
        assert_eq!(resource_id(&json!({"kind": "A"})), None);
    }

    #[test]
    fn best_match_prefers_first_on_ties() {
        let found = best_match("Policy", ["PolicyX", "PolicyY", "Other"]).unwrap();
        assert_eq!(found.0, 0);
        assert!(found.1 > 0.7);
        assert_eq!(best_match("x", std::iter::empty::<&str>()), None);
    }
}
