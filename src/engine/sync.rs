//! The sync controller: one workspace view's document, graph and presence
//! state, driven by discrete events.
//!
//! The controller performs no I/O. The async driver feeds it the bulk fetch
//! result, each listen event, resolved users and timer ticks, and publishes
//! the [`GraphSnapshot`] it produces. Every mutator is a no-op once the view
//! has been torn down, so late completions cannot touch a dead view.

use std::rc::Rc;

use log::{debug, info};

use super::document::Document;
use super::graph::Graph;
use super::identity::{self, canonical_id};
use super::metrics::DocumentMetrics;
use super::presence::{PresenceTracker, Session};
use super::users::{CachedUser, UserCache};
use crate::error::GraphError;
use crate::store::{ListenEvent, Transition};

/// Lifecycle of one view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Waiting for the bulk fetch.
	Uninitialized,
	/// Graph built; applying live updates.
	Live,
	/// Load failed or live updates dropped; waiting for a retry.
	Failed(GraphError),
	/// View unmounted.
	TornDown,
}

/// Immutable state handed to the renderer.
#[derive(Clone, Debug)]
pub struct GraphSnapshot<I> {
	pub phase: Phase,
	pub graph: Graph,
	/// Bumped whenever the node or edge set changes.
	pub topology: u64,
	pub sessions: Vec<Session<I>>,
	pub metrics: Rc<DocumentMetrics>,
}

/// A user did something to a document; resolve the user to show presence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activity {
	pub identity: String,
	pub document_id: String,
}

/// What applying one listen event did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
	/// Nothing to apply (not live, or an event without a document).
	Ignored,
	Upserted {
		document_id: String,
		topology_changed: bool,
		activity: Option<Activity>,
	},
	Removed {
		document_id: String,
	},
}

pub struct SyncController<I> {
	phase: Phase,
	documents: Vec<Rc<Document>>,
	graph: Graph,
	topology: u64,
	metrics: Rc<DocumentMetrics>,
	presence: PresenceTracker<I>,
	users: UserCache<I>,
	idle_timeout_ms: u64,
}

impl<I: Clone> SyncController<I> {
	pub fn new(idle_timeout_ms: u64) -> Self {
		Self {
			phase: Phase::Uninitialized,
			documents: Vec::new(),
			graph: Graph::default(),
			topology: 0,
			metrics: Rc::default(),
			presence: PresenceTracker::default(),
			users: UserCache::default(),
			idle_timeout_ms,
		}
	}

	pub fn phase(&self) -> &Phase {
		&self.phase
	}

	pub fn is_live(&self) -> bool {
		self.phase == Phase::Live
	}

	pub fn is_torn_down(&self) -> bool {
		self.phase == Phase::TornDown
	}

	/// Installs the bulk-fetch result and goes live. Also used on reconnect,
	/// where it replaces whatever the previous subscription accumulated.
	pub fn load(&mut self, documents: Vec<Document>) {
		if self.is_torn_down() {
			return;
		}
		self.documents = identity::normalize_documents(documents)
			.into_iter()
			.map(Rc::new)
			.collect();
		self.graph = Graph::rebuild(&self.documents);
		self.topology += 1;
		self.refresh_metrics();

		let graph = &self.graph;
		let presence = &mut self.presence;
		let stale: Vec<String> = presence
			.sessions()
			.iter()
			.filter(|s| !graph.contains(&s.document_id))
			.map(|s| s.document_id.clone())
			.collect();
		for id in stale {
			presence.remove_for_document(&id);
		}

		info!(
			"studio-graph: loaded {} documents, {} references",
			self.graph.nodes().len(),
			self.graph.edges().len()
		);
		self.phase = Phase::Live;
	}

	/// Records a load or subscription failure.
	pub fn fail(&mut self, error: GraphError) {
		if self.is_torn_down() {
			return;
		}
		self.phase = Phase::Failed(error);
	}

	/// Routes one listen event to the document collection, graph and presence.
	pub fn apply_event(&mut self, event: ListenEvent) -> EventOutcome {
		if !self.is_live() {
			debug!("studio-graph: ignoring event while {:?}", self.phase);
			return EventOutcome::Ignored;
		}

		match event {
			ListenEvent {
				result: Some(document),
				identity,
				..
			} => self.upsert(document, identity),
			ListenEvent {
				transition: Some(Transition::Disappear),
				document_id: Some(id),
				..
			} => self.remove(canonical_id(&id)),
			_ => EventOutcome::Ignored,
		}
	}

	fn upsert(&mut self, document: Document, identity: String) -> EventOutcome {
		let document = Rc::new(identity::normalize(document));
		let id = document.id.clone();
		let position = self.documents.iter().position(|d| d.id == id);
		let previous = position.map(|idx| Rc::clone(&self.documents[idx]));

		let (graph, topology_changed) = self
			.graph
			.apply_upsert(previous.as_deref(), Rc::clone(&document));
		self.graph = graph;
		if topology_changed {
			self.topology += 1;
		}

		match position {
			Some(idx) => self.documents[idx] = document,
			None => self.documents.push(document),
		}
		self.refresh_metrics();
		debug!("studio-graph: upserted {id} (topology changed: {topology_changed})");

		let activity = (!identity.is_empty()).then(|| Activity {
			identity,
			document_id: id.clone(),
		});
		EventOutcome::Upserted {
			document_id: id,
			topology_changed,
			activity,
		}
	}

	fn remove(&mut self, id: &str) -> EventOutcome {
		self.documents.retain(|d| d.id != id);
		self.graph = self.graph.apply_removal(id);
		self.topology += 1;
		self.refresh_metrics();

		let reaped = self.presence.remove_for_document(id);
		debug!("studio-graph: removed {id}, reaped {reaped} sessions");
		EventOutcome::Removed {
			document_id: id.to_owned(),
		}
	}

	pub fn cached_user(&self, identity: &str) -> Option<Rc<CachedUser<I>>> {
		self.users.get(identity)
	}

	/// Adds a resolved user to the cache. Returns `None` after teardown.
	pub fn cache_user(&mut self, identity: &str, user: CachedUser<I>) -> Option<Rc<CachedUser<I>>> {
		if self.is_torn_down() {
			return None;
		}
		Some(self.users.insert(identity, user))
	}

	/// Creates or refreshes the presence session for `user` on `document_id`.
	///
	/// Returns false when nothing was recorded: the view is not live, or the
	/// document was removed while the user was being resolved.
	pub fn record_activity(&mut self, user: Rc<CachedUser<I>>, document_id: &str, now: u64) -> bool {
		if !self.is_live() || !self.graph.contains(document_id) {
			return false;
		}
		self.presence.record_activity(user, document_id, now);
		true
	}

	/// Expires idle sessions. Returns true if any were removed.
	pub fn sweep(&mut self, now: u64) -> bool {
		if self.is_torn_down() {
			return false;
		}
		self.presence.sweep_expired(now, self.idle_timeout_ms) > 0
	}

	/// Stops all further state changes.
	pub fn teardown(&mut self) {
		self.phase = Phase::TornDown;
	}

	pub fn snapshot(&self) -> GraphSnapshot<I> {
		GraphSnapshot {
			phase: self.phase.clone(),
			graph: self.graph.clone(),
			topology: self.topology,
			sessions: self.presence.sessions().to_vec(),
			metrics: Rc::clone(&self.metrics),
		}
	}

	pub fn documents(&self) -> &[Rc<Document>] {
		&self.documents
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	pub fn sessions(&self) -> &[Session<I>] {
		self.presence.sessions()
	}

	fn refresh_metrics(&mut self) {
		self.metrics = Rc::new(DocumentMetrics::from_documents(
			self.documents.iter().map(|d| d.as_ref()),
		));
	}
}
