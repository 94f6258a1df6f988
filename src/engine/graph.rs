//! Node/edge model derived from the document set.
//!
//! A [`Graph`] is an immutable value: every operation returns a patched copy
//! and leaves the receiver untouched, so a renderer holding an older snapshot
//! never observes a half-applied update. Node and edge lists sit behind `Rc`
//! so handing a snapshot out is cheap.

use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use super::document::Document;
use super::scan::references;

/// Kind of a graph node. Only documents are modeled; presence is an overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Document,
}

/// One node per canonical document id.
#[derive(Clone, Debug)]
pub struct Node {
	pub id: String,
	pub kind: NodeKind,
	pub document: Rc<Document>,
}

impl Node {
	fn for_document(document: Rc<Document>) -> Self {
		Self {
			id: document.id.clone(),
			kind: NodeKind::Document,
			document,
		}
	}
}

/// A directed reference from `source` to `target`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
	pub source: String,
	pub target: String,
}

impl Edge {
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
		}
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// Snapshot of the reference topology.
///
/// Invariant: every edge endpoint is the id of a node in the same snapshot.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	nodes: Rc<Vec<Node>>,
	edges: Rc<Vec<Edge>>,
}

impl Graph {
	/// Builds the graph from scratch. References to documents outside the set
	/// are dropped.
	pub fn rebuild(documents: &[Rc<Document>]) -> Self {
		let known: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();

		let edges = documents
			.iter()
			.flat_map(|doc| {
				references(doc)
					.into_iter()
					.filter(|target| known.contains(target.as_str()))
					.map(|target| Edge::new(doc.id.as_str(), target))
			})
			.collect();

		Self {
			nodes: Rc::new(documents.iter().cloned().map(Node::for_document).collect()),
			edges: Rc::new(edges),
		}
	}

	/// Patches one document's node and outgoing edges.
	///
	/// `previous` is the stored version this document replaces, if any. The
	/// returned flag is true when the node set or the edge set changed; a
	/// payload-only update still replaces the node's document.
	pub fn apply_upsert(&self, previous: Option<&Document>, document: Rc<Document>) -> (Self, bool) {
		let id = document.id.clone();
		let new_refs = self.retained_references(&id, &document);
		let old_refs = previous
			.map(|prev| self.retained_references(&id, prev))
			.unwrap_or_default();

		// A target that arrived after the previous version was applied has no
		// edge yet even though the ref sets compare equal.
		let rewire = old_refs != new_refs || self.outgoing(&id) != new_refs;

		let mut nodes = (*self.nodes).clone();
		let mut changed = false;
		match nodes.iter_mut().find(|node| node.id == id) {
			Some(node) => node.document = document,
			None => {
				nodes.push(Node::for_document(document));
				changed = true;
			}
		}

		let edges = if rewire {
			changed = true;
			let mut edges: Vec<Edge> = self
				.edges
				.iter()
				.filter(|edge| edge.source != id)
				.cloned()
				.collect();
			edges.extend(new_refs.into_iter().map(|target| Edge::new(id.as_str(), target)));
			Rc::new(edges)
		} else {
			Rc::clone(&self.edges)
		};

		(
			Self {
				nodes: Rc::new(nodes),
				edges,
			},
			changed,
		)
	}

	/// Removes a node and every edge touching it.
	pub fn apply_removal(&self, id: &str) -> Self {
		Self {
			nodes: Rc::new(self.nodes.iter().filter(|n| n.id != id).cloned().collect()),
			edges: Rc::new(self.edges.iter().filter(|e| !e.touches(id)).cloned().collect()),
		}
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	/// Edge endpoints as an unordered set of pairs.
	pub fn edge_pairs(&self) -> BTreeSet<(String, String)> {
		self.edges
			.iter()
			.map(|e| (e.source.clone(), e.target.clone()))
			.collect()
	}

	pub fn node_ids(&self) -> BTreeSet<String> {
		self.nodes.iter().map(|n| n.id.clone()).collect()
	}

	fn outgoing(&self, id: &str) -> BTreeSet<String> {
		self.edges
			.iter()
			.filter(|e| e.source == id)
			.map(|e| e.target.clone())
			.collect()
	}

	/// References of `document` that may become edges: self-loops and ids of
	/// nodes already in the graph.
	fn retained_references(&self, source: &str, document: &Document) -> BTreeSet<String> {
		references(document)
			.into_iter()
			.filter(|target| target == source || self.contains(target))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{Value, json};

	fn doc(id: &str, refs: &[&str]) -> Rc<Document> {
		let refs: Vec<Value> = refs.iter().map(|r| json!({"_ref": r})).collect();
		Rc::new(Document::new(id, "post").with_field("refs", Value::Array(refs)))
	}

	fn pairs(list: &[(&str, &str)]) -> BTreeSet<(String, String)> {
		list.iter()
			.map(|(s, t)| (s.to_string(), t.to_string()))
			.collect()
	}

	fn assert_no_dangling(graph: &Graph) {
		let ids = graph.node_ids();
		for edge in graph.edges() {
			assert!(ids.contains(&edge.source), "dangling source {}", edge.source);
			assert!(ids.contains(&edge.target), "dangling target {}", edge.target);
		}
	}

	#[test]
	fn rebuild_is_idempotent() {
		let docs = vec![doc("a", &["b", "c"]), doc("b", &["a"]), doc("c", &[])];
		let first = Graph::rebuild(&docs);
		let second = Graph::rebuild(&docs);

		assert_eq!(first.node_ids(), second.node_ids());
		assert_eq!(first.edge_pairs(), second.edge_pairs());
	}

	#[test]
	fn rebuild_drops_orphan_references() {
		let graph = Graph::rebuild(&[doc("a", &["b", "missing"]), doc("b", &[])]);

		assert_eq!(graph.edge_pairs(), pairs(&[("a", "b")]));
		assert_no_dangling(&graph);
	}

	#[test]
	fn rebuild_keeps_self_references_once() {
		let graph = Graph::rebuild(&[doc("a", &["a", "a"])]);
		assert_eq!(graph.edge_pairs(), pairs(&[("a", "a")]));
		assert_eq!(graph.edges().len(), 1);
	}

	#[test]
	fn scenario_update_then_disappear() {
		let graph = Graph::rebuild(&[doc("a", &["b"]), doc("b", &[])]);
		assert_eq!(graph.node_ids().len(), 2);
		assert_eq!(graph.edge_pairs(), pairs(&[("a", "b")]));

		let old = graph.node("a").map(|n| Rc::clone(&n.document)).unwrap();
		let (graph, changed) = graph.apply_upsert(Some(&*old), doc("a", &[]));
		assert!(changed);
		assert!(graph.edges().is_empty());

		let graph = graph.apply_removal("b");
		assert_eq!(graph.node_ids(), ["a".to_string()].into_iter().collect());
		assert!(graph.edges().is_empty());
	}

	#[test]
	fn payload_update_without_topology_change_is_unchanged() {
		let graph = Graph::rebuild(&[doc("a", &["b"]), doc("b", &[])]);
		let old = Rc::clone(&graph.node("a").unwrap().document);
		let retitled = Rc::new(
			Document::clone(&doc("a", &["b"])).with_field("title", json!("New title")),
		);

		let (next, changed) = graph.apply_upsert(Some(&*old), Rc::clone(&retitled));

		assert!(!changed);
		assert_eq!(next.node("a").unwrap().document.str_field("title"), Some("New title"));
		assert!(graph.node("a").unwrap().document.str_field("title").is_none());
	}

	#[test]
	fn new_document_is_appended_and_marked_changed() {
		let graph = Graph::rebuild(&[doc("a", &[])]);
		let (graph, changed) = graph.apply_upsert(None, doc("b", &["a"]));

		assert!(changed);
		assert_eq!(graph.nodes().last().unwrap().id, "b");
		assert_eq!(graph.edge_pairs(), pairs(&[("b", "a")]));
	}

	#[test]
	fn upsert_drops_references_to_unseen_documents() {
		let graph = Graph::rebuild(&[]);
		let (graph, _) = graph.apply_upsert(None, doc("a", &["b", "a"]));

		assert_eq!(graph.edge_pairs(), pairs(&[("a", "a")]));
		assert_no_dangling(&graph);
	}

	#[test]
	fn target_arrival_does_not_create_edges_retroactively() {
		let graph = Graph::rebuild(&[doc("a", &["b"])]);
		assert!(graph.edges().is_empty());

		let (graph, _) = graph.apply_upsert(None, doc("b", &[]));
		assert!(graph.edges().is_empty());

		// Re-processing the referencing document picks the edge up.
		let old = Rc::clone(&graph.node("a").unwrap().document);
		let (graph, changed) = graph.apply_upsert(Some(&*old), doc("a", &["b"]));
		assert!(changed);
		assert_eq!(graph.edge_pairs(), pairs(&[("a", "b")]));
	}

	#[test]
	fn removal_cascades_to_incident_edges_only() {
		let graph = Graph::rebuild(&[
			doc("x", &["y"]),
			doc("y", &["x", "z"]),
			doc("z", &["y"]),
		]);

		let after = graph.apply_removal("x");

		assert!(!after.contains("x"));
		assert!(after.contains("y"));
		assert!(after.edges().iter().all(|e| !e.touches("x")));
		assert_eq!(after.edge_pairs(), pairs(&[("y", "z"), ("z", "y")]));
		assert_eq!(graph.edges().len(), 4, "input snapshot must be untouched");
	}

	#[test]
	fn removal_of_unknown_id_is_a_copy() {
		let graph = Graph::rebuild(&[doc("a", &[])]);
		let after = graph.apply_removal("nope");
		assert_eq!(after.node_ids(), graph.node_ids());
	}

	#[test]
	fn incremental_backward_order_matches_rebuild() {
		let docs = vec![
			doc("person", &[]),
			doc("category", &[]),
			doc("post-1", &["person", "category"]),
			doc("post-2", &["person", "post-1", "post-2"]),
			doc("review", &["post-2", "ghost"]),
		];

		let mut graph = Graph::default();
		for d in &docs {
			let (next, _) = graph.apply_upsert(None, Rc::clone(d));
			graph = next;
			assert_no_dangling(&graph);
		}

		let rebuilt = Graph::rebuild(&docs);
		assert_eq!(graph.node_ids(), rebuilt.node_ids());
		assert_eq!(graph.edge_pairs(), rebuilt.edge_pairs());
	}

	#[test]
	fn incremental_forward_references_self_correct_on_reprocess() {
		let docs = vec![doc("a", &["b"]), doc("b", &["a"])];

		let mut graph = Graph::default();
		for d in &docs {
			graph = graph.apply_upsert(None, Rc::clone(d)).0;
		}
		assert_eq!(graph.edge_pairs(), pairs(&[("b", "a")]));

		let old = Rc::clone(&graph.node("a").unwrap().document);
		graph = graph.apply_upsert(Some(&*old), Rc::clone(&docs[0])).0;
		assert_eq!(graph.edge_pairs(), Graph::rebuild(&docs).edge_pairs());
	}
}
