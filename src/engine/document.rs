//! Content documents as delivered by the document store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque content record.
///
/// Only `_id` and `_type` are interpreted; every other field is kept as raw
/// JSON and walked by the reference scanner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(rename = "_type", default)]
	pub doc_type: String,
	#[serde(flatten)]
	pub fields: Map<String, Value>,
}

impl Document {
	pub fn new(id: impl Into<String>, doc_type: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			doc_type: doc_type.into(),
			fields: Map::new(),
		}
	}

	/// Builder-style field setter.
	pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
		self.fields.insert(key.into(), value);
		self
	}

	pub fn field(&self, key: &str) -> Option<&Value> {
		self.fields.get(key)
	}

	/// A field's value if it is a non-empty string.
	pub fn str_field(&self, key: &str) -> Option<&str> {
		self.field(key)
			.and_then(Value::as_str)
			.filter(|s| !s.trim().is_empty())
	}

	pub fn target(&self) -> DocumentTarget {
		DocumentTarget {
			id: self.id.clone(),
			doc_type: self.doc_type.clone(),
		}
	}
}

/// Identity forwarded to the host when the user interacts with a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentTarget {
	pub id: String,
	#[serde(rename = "type")]
	pub doc_type: String,
}
