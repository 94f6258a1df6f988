//! Display metrics derived from the document collection.
//!
//! None of this affects graph correctness; it drives node sizing, labels and
//! the document-type legend, and is recomputed whenever the collection
//! changes.

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::document::Document;
use super::scan::weight;

/// Smallest node value; `node_value` ranges over `[MIN_VALUE, MIN_VALUE + 100]`.
const MIN_VALUE: f64 = 5.0;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentMetrics {
	/// Largest [`weight`] of any document.
	pub max_weight: usize,
	pub type_counts: BTreeMap<String, usize>,
}

impl DocumentMetrics {
	pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
		let mut metrics = Self::default();
		for doc in documents {
			metrics.max_weight = metrics.max_weight.max(weight(doc));
			*metrics.type_counts.entry(doc.doc_type.clone()).or_insert(0) += 1;
		}
		metrics
	}

	/// Visual value of a node, scaled against the heaviest document.
	pub fn node_value(&self, document: &Document) -> f64 {
		if self.max_weight == 0 {
			return MIN_VALUE;
		}
		MIN_VALUE + 100.0 * (weight(document) as f64 / self.max_weight as f64)
	}

	/// The `limit` most common document types, most common first.
	pub fn top_types(&self, limit: usize) -> Vec<(&str, usize)> {
		let mut types: Vec<(&str, usize)> = self
			.type_counts
			.iter()
			.map(|(name, count)| (name.as_str(), *count))
			.collect();
		types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
		types.truncate(limit);
		types
	}
}

/// Human label: `title`, then `name`, then the id.
pub fn label_for(document: &Document) -> String {
	document
		.str_field("title")
		.or_else(|| document.str_field("name"))
		.unwrap_or(&document.id)
		.trim()
		.to_owned()
}

/// `"blog.postAuthor"` becomes `"Blog post Author"`.
pub fn format_doc_type(doc_type: &str) -> String {
	let mut chars = doc_type.chars();
	let capitalized: String = match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => return String::new(),
	};

	let mut out = String::with_capacity(capitalized.len() + 4);
	for c in capitalized.chars() {
		match c {
			'.' => out.push(' '),
			c if c.is_ascii_uppercase() => {
				out.push(' ');
				out.push(c);
			}
			c => out.push(c),
		}
	}
	out.trim().to_owned()
}

/// Cuts `s` to `limit` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, limit: usize) -> Cow<'_, str> {
	match s.char_indices().nth(limit) {
		Some((byte, _)) => Cow::Owned(format!("{}…", &s[..byte])),
		None => Cow::Borrowed(s),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn node_value_scales_against_heaviest_document() {
		let small = Document::new("a", "t");
		let big = Document::new("b", "t").with_field("body", json!("x".repeat(98)));
		let metrics = DocumentMetrics::from_documents([&small, &big]);

		assert_eq!(metrics.max_weight, 100);
		assert_eq!(metrics.node_value(&big), 105.0);
		assert_eq!(metrics.node_value(&small), 5.0 + 2.0);
	}

	#[test]
	fn empty_collection_has_minimum_value() {
		let metrics = DocumentMetrics::default();
		assert_eq!(metrics.node_value(&Document::new("", "")), 5.0);
	}

	#[test]
	fn top_types_orders_by_count_then_name() {
		let docs = [
			Document::new("1", "post"),
			Document::new("2", "post"),
			Document::new("3", "author"),
			Document::new("4", "category"),
			Document::new("5", "category"),
			Document::new("6", "tag"),
		];
		let metrics = DocumentMetrics::from_documents(docs.iter());

		assert_eq!(metrics.top_types(3), [("category", 2), ("post", 2), ("author", 1)]);
	}

	#[test]
	fn labels_prefer_title_then_name_then_id() {
		let titled = Document::new("a", "t").with_field("title", json!(" Hello "));
		let named = Document::new("b", "t").with_field("name", json!("Ada"));
		let bare = Document::new("c", "t").with_field("title", json!(7));

		assert_eq!(label_for(&titled), "Hello");
		assert_eq!(label_for(&named), "Ada");
		assert_eq!(label_for(&bare), "c");
	}

	#[test]
	fn formats_document_types_for_display() {
		assert_eq!(format_doc_type("blog.postAuthor"), "Blog post Author");
		assert_eq!(format_doc_type("category"), "Category");
		assert_eq!(format_doc_type(""), "");
	}

	#[test]
	fn truncate_counts_characters() {
		assert_eq!(truncate("héllo world", 5), "héllo…");
		assert_eq!(truncate("short", 5), "short");
	}
}
