//! Draft/published identity normalization.
//!
//! A logical document may exist twice in the store: the published version
//! under its canonical id and an unpublished draft under `drafts.<id>`.
//! Every id entering the engine passes through [`canonical_id`] so the rest
//! of the code only ever sees canonical ids.

use std::collections::HashMap;

use super::document::Document;

/// Reserved prefix marking a draft document id.
pub const DRAFT_PREFIX: &str = "drafts.";

/// Strips the draft marker, if any.
pub fn canonical_id(id: &str) -> &str {
	id.strip_prefix(DRAFT_PREFIX).unwrap_or(id)
}

pub fn is_draft(id: &str) -> bool {
	id.starts_with(DRAFT_PREFIX)
}

/// Rewrites a document's id to its canonical form.
pub fn normalize(mut document: Document) -> Document {
	if is_draft(&document.id) {
		document.id = canonical_id(&document.id).to_owned();
	}
	document
}

/// Collapses draft/published pairs into one document per canonical id.
///
/// Published documents are placed first, in input order; drafts then replace
/// their published counterpart in place or are appended. A draft always wins.
pub fn normalize_documents(documents: Vec<Document>) -> Vec<Document> {
	let (drafts, published): (Vec<_>, Vec<_>) =
		documents.into_iter().partition(|doc| is_draft(&doc.id));

	let mut merged: Vec<Document> = Vec::with_capacity(published.len() + drafts.len());
	let mut positions: HashMap<String, usize> = HashMap::new();

	for doc in published.into_iter().chain(drafts.into_iter().map(normalize)) {
		match positions.get(&doc.id) {
			Some(&idx) => merged[idx] = doc,
			None => {
				positions.insert(doc.id.clone(), merged.len());
				merged.push(doc);
			}
		}
	}
	merged
}
