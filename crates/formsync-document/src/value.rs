//! Path access on plain values
//!
//! Get, set and unset operations over [`serde_json::Value`] trees addressed
//! by path segments. Numeric segments index arrays; setting through a
//! missing intermediate creates an array when the next segment is numeric
//! and an object otherwise.

use crate::path::as_index;
use serde_json::{Map, Value};

/// Value at `segments`, if present
#[must_use]
pub fn get_path<'a, S: AsRef<str>>(value: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |node, seg| step(node, seg.as_ref()))
}

/// Mutable value at `segments`, if present
pub fn get_path_mut<'a, S: AsRef<str>>(value: &'a mut Value, segments: &[S]) -> Option<&'a mut Value> {
    segments
        .iter()
        .try_fold(value, |node, seg| step_mut(node, seg.as_ref()))
}

fn step<'a>(node: &'a Value, seg: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => items.get(as_index(seg)?),
        _ => None,
    }
}

fn step_mut<'a>(node: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => items.get_mut(as_index(seg)?),
        _ => None,
    }
}

fn empty_container_for(next: &str) -> Value {
    if as_index(next).is_some() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Set the value at `segments`, creating intermediates as needed
///
/// Returns `false` when a scalar sits in the way; the tree is left untouched
/// past that point. An empty path replaces the whole value.
pub fn set_path<S: AsRef<str>>(value: &mut Value, segments: &[S], new: Value) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        *value = new;
        return true;
    };
    let mut node = value;
    for (i, seg) in parents.iter().enumerate() {
        let next = segments[i + 1].as_ref();
        if node.is_null() {
            *node = empty_container_for(seg.as_ref());
        }
        node = match node {
            Value::Object(map) => map
                .entry(seg.as_ref().to_string())
                .or_insert_with(|| empty_container_for(next)),
            Value::Array(items) => {
                let Some(idx) = as_index(seg.as_ref()) else { return false };
                if idx >= items.len() {
                    items.resize(idx + 1, Value::Null);
                }
                let slot = &mut items[idx];
                if slot.is_null() {
                    *slot = empty_container_for(next);
                }
                slot
            }
            _ => return false,
        };
    }
    if node.is_null() {
        *node = empty_container_for(last.as_ref());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.as_ref().to_string(), new);
            true
        }
        Value::Array(items) => {
            let Some(idx) = as_index(last.as_ref()) else { return false };
            if idx >= items.len() {
                items.resize(idx + 1, Value::Null);
            }
            items[idx] = new;
            true
        }
        _ => false,
    }
}

/// Remove the value at `segments`, returning it
///
/// Object entries are removed preserving the order of their siblings; array
/// items are spliced out.
pub fn unset_path<S: AsRef<str>>(value: &mut Value, segments: &[S]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;
    match get_path_mut(value, parents)? {
        Value::Object(map) => map.shift_remove(last.as_ref()),
        Value::Array(items) => {
            let idx = as_index(last.as_ref())?;
            (idx < items.len()).then(|| items.remove(idx))
        }
        _ => None,
    }
}
