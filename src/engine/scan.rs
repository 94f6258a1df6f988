//! Traversal of semi-structured document bodies.
//!
//! [`visit_leaves`] walks a JSON tree once, calling back for every scalar with
//! the key it is stored under. Reference extraction and the size metric are
//! both expressed as leaf actions over it.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::document::Document;
use super::identity::canonical_id;

/// Field name marking a reference to another document.
pub const REFERENCE_KEY: &str = "_ref";

/// Visits every leaf (non-object, non-array value) below `fields`.
///
/// `key` is the object key the leaf is stored under, or `None` for array
/// items. Uses an explicit stack so deeply nested bodies cannot overflow.
pub fn visit_leaves<'a, F>(fields: &'a Map<String, Value>, mut visit: F)
where
	F: FnMut(Option<&'a str>, &'a Value),
{
	let mut stack: Vec<(Option<&'a str>, &'a Value)> = fields
		.iter()
		.rev()
		.map(|(k, v)| (Some(k.as_str()), v))
		.collect();

	while let Some((key, value)) = stack.pop() {
		match value {
			Value::Object(map) => {
				stack.extend(map.iter().rev().map(|(k, v)| (Some(k.as_str()), v)));
			}
			Value::Array(items) => {
				stack.extend(items.iter().rev().map(|v| (None, v)));
			}
			leaf => visit(key, leaf),
		}
	}
}

/// Canonical ids referenced anywhere in the document body.
pub fn references(document: &Document) -> BTreeSet<String> {
	let mut refs = BTreeSet::new();
	visit_leaves(&document.fields, |key, value| {
		if key == Some(REFERENCE_KEY) {
			if let Some(id) = value.as_str().filter(|s| !s.is_empty()) {
				refs.insert(canonical_id(id).to_owned());
			}
		}
	});
	refs
}

/// Total character count of every string leaf, id and type included.
pub fn weight(document: &Document) -> usize {
	let mut total = document.id.chars().count() + document.doc_type.chars().count();
	visit_leaves(&document.fields, |_, value| {
		if let Value::String(s) = value {
			total += s.chars().count();
		}
	});
	total
}
