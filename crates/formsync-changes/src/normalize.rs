//! Comparison normalization
//!
//! Before diffing, kind buckets of unequal length are aligned so that adding
//! or removing one resource reads as one New or Delete instead of a cascade
//! of edits across every later position.

use formsync_document::{resource_id, Comparison};
use serde_json::{Map, Value};

/// Align the kind buckets of two comparisons in place
///
/// For each kind present on both sides with different lengths, the shorter
/// list is padded to the longer length: entries move to the position of the
/// longer-side resource with the same identity, leftovers take the first free
/// slots and the rest hold empty placeholders.
pub fn normalize(prior: &mut Comparison, new: &mut Comparison) {
    for (kind, prior_docs) in prior.iter_mut() {
        let Some(new_docs) = new.get_mut(kind) else { continue };
        match prior_docs.len().cmp(&new_docs.len()) {
            std::cmp::Ordering::Less => align(prior_docs, new_docs),
            std::cmp::Ordering::Greater => align(new_docs, prior_docs),
            std::cmp::Ordering::Equal => {}
        }
    }
}

fn align(shorter: &mut Vec<Value>, longer: &[Value]) {
    let longer_ids: Vec<Option<String>> = longer.iter().map(resource_id).collect();
    let mut slots: Vec<Option<Value>> = vec![None; longer.len()];
    let mut leftovers = Vec::new();
    for doc in shorter.drain(..) {
        let target = resource_id(&doc).and_then(|id| {
            longer_ids
                .iter()
                .enumerate()
                .position(|(i, other)| slots[i].is_none() && other.as_deref() == Some(id.as_str()))
        });
        match target {
            Some(i) => slots[i] = Some(doc),
            None => leftovers.push(doc),
        }
    }
    let mut leftovers = leftovers.into_iter();
    for slot in &mut slots {
        if slot.is_none() {
            *slot = leftovers.next();
        }
        if slot.is_none() {
            break;
        }
    }
    shorter.extend(
        slots
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Value::Object(Map::new()))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(name: &str) -> Value {
        json!({"kind": "A", "metadata": {"name": name}})
    }

    #[test]
    fn removed_resource_leaves_placeholder_at_its_slot() {
        let mut prior = Comparison::new();
        prior.insert("A".into(), vec![named("a"), named("b"), named("c")]);
        let mut new = Comparison::new();
        new.insert("A".into(), vec![named("a"), named("c")]);
        normalize(&mut prior, &mut new);
        assert_eq!(new["A"], vec![named("a"), json!({}), named("c")]);
        assert_eq!(prior["A"].len(), 3);
    }

    #[test]
    fn unmatched_entries_fill_first_free_slots() {
        let mut prior = Comparison::new();
        prior.insert("A".into(), vec![named("renamed")]);
        let mut new = Comparison::new();
        new.insert("A".into(), vec![named("x"), named("y")]);
        normalize(&mut prior, &mut new);
        assert_eq!(prior["A"], vec![named("renamed"), json!({})]);
    }

    #[test]
    fn equal_lengths_untouched() {
        let mut prior = Comparison::new();
        prior.insert("A".into(), vec![named("b"), named("a")]);
        let mut new = Comparison::new();
        new.insert("A".into(), vec![named("a"), named("b")]);
        normalize(&mut prior, &mut new);
        assert_eq!(prior["A"], vec![named("b"), named("a")]);
    }
}
