//! End-to-end runs of the sync driver against an in-memory document store.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::{mpsc, oneshot};
use serde_json::{Value, json};
use studio_graph::clock::Clock;
use studio_graph::config::{DEFAULT_AVATAR_URL, GraphConfig};
use studio_graph::driver::run;
use studio_graph::engine::{Document, GraphSnapshot, Phase, UserProfile};
use studio_graph::error::{GraphError, StoreError};
use studio_graph::store::{DocumentStore, EventStream, ListenEvent, ListenOptions};

#[derive(Clone, Default)]
struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
	fn set(&self, now: u64) {
		self.0.set(now);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> u64 {
		self.0.get()
	}
}

#[derive(Default)]
struct FakeStore {
	documents: RefCell<Vec<Document>>,
	/// Scripted fetch results, used before falling back to `documents`.
	fetches: RefCell<VecDeque<Result<Vec<Document>, StoreError>>>,
	/// Delivered to the next subscription as soon as it opens.
	backlog: RefCell<Vec<ListenEvent>>,
	subscriptions: RefCell<Vec<mpsc::UnboundedSender<Result<ListenEvent, StoreError>>>>,
	users: HashMap<String, UserProfile>,
	/// Lookups for these users block until the gate is released.
	gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
	fetch_calls: Cell<usize>,
	listen_calls: Cell<usize>,
}

impl FakeStore {
	fn with_documents(documents: Vec<Document>) -> Self {
		let mut store = Self::default();
		store.documents = RefCell::new(documents);
		for (id, image) in [
			("ada", Some("https://img.test/ada.png")),
			("bob", Some("https://img.test/broken.png")),
			("cy", None),
		] {
			store.users.insert(
				id.to_owned(),
				UserProfile {
					id: id.to_owned(),
					display_name: id.to_uppercase(),
					image_url: image.map(str::to_owned),
				},
			);
		}
		store
	}

	fn send(&self, item: Result<ListenEvent, StoreError>) {
		let subscriptions = self.subscriptions.borrow();
		let live = subscriptions.last().expect("no subscription");
		live.unbounded_send(item).expect("subscription dropped");
	}

	fn emit(&self, event: ListenEvent) {
		self.send(Ok(event));
	}

	fn gate(&self, user: &str) -> oneshot::Sender<()> {
		let (tx, rx) = oneshot::channel();
		self.gates.borrow_mut().insert(user.to_owned(), rx);
		tx
	}
}

#[async_trait(?Send)]
impl DocumentStore for FakeStore {
	type Image = String;

	async fn fetch(&self, _query: &str) -> Result<Vec<Document>, StoreError> {
		self.fetch_calls.set(self.fetch_calls.get() + 1);
		let scripted = self.fetches.borrow_mut().pop_front();
		scripted.unwrap_or_else(|| Ok(self.documents.borrow().clone()))
	}

	fn listen(
		&self,
		_query: &str,
		_params: &Value,
		_options: &ListenOptions,
	) -> Result<EventStream, StoreError> {
		self.listen_calls.set(self.listen_calls.get() + 1);
		let (tx, rx) = mpsc::unbounded();
		for event in self.backlog.borrow_mut().drain(..) {
			tx.unbounded_send(Ok(event)).expect("fresh channel");
		}
		self.subscriptions.borrow_mut().push(tx);
		Ok(rx.boxed_local())
	}

	async fn user_by_id(&self, id: &str) -> Result<UserProfile, StoreError> {
		let gate = self.gates.borrow_mut().remove(id);
		if let Some(gate) = gate {
			let _ = gate.await;
		}
		self.users
			.get(id)
			.cloned()
			.ok_or_else(|| StoreError::user_lookup(id, "no such user"))
	}

	async fn load_image(&self, url: &str, _width: u32, _height: u32) -> Option<String> {
		(!url.contains("broken")).then(|| url.to_owned())
	}
}

/// What one published snapshot looked like.
#[derive(Clone, Debug)]
struct Seen {
	phase: Phase,
	nodes: BTreeSet<String>,
	edges: BTreeSet<(String, String)>,
	/// (user, document, avatar)
	sessions: Vec<(String, String, Option<String>)>,
}

impl Seen {
	fn of(snapshot: &GraphSnapshot<String>) -> Self {
		Self {
			phase: snapshot.phase.clone(),
			nodes: snapshot.graph.node_ids(),
			edges: snapshot.graph.edge_pairs(),
			sessions: snapshot
				.sessions
				.iter()
				.map(|s| (s.user.id().to_owned(), s.document_id.clone(), s.user.image.clone()))
				.collect(),
		}
	}
}

/// Test-side handles. Dropping them ends the driver.
struct Controls {
	ticks: mpsc::UnboundedSender<()>,
	retries: mpsc::UnboundedSender<()>,
	seen: Rc<RefCell<Vec<Seen>>>,
}

impl Controls {
	fn tick(&self) {
		self.ticks.unbounded_send(()).expect("driver gone");
	}

	fn retry(&self) {
		self.retries.unbounded_send(()).expect("driver gone");
	}

	fn last(&self) -> Seen {
		self.seen.borrow().last().cloned().expect("nothing published")
	}
}

/// Lets the driver run until it is idle.
async fn settle() {
	for _ in 0..32 {
		tokio::task::yield_now().await;
	}
}

async fn drive<F, Fut>(store: Rc<FakeStore>, clock: ManualClock, script: F) -> Vec<Seen>
where
	F: FnOnce(Controls) -> Fut,
	Fut: Future<Output = ()>,
{
	let (ticks, tick_rx) = mpsc::unbounded();
	let (retries, retry_rx) = mpsc::unbounded();
	let seen = Rc::new(RefCell::new(Vec::new()));

	let sink = Rc::clone(&seen);
	let driver = run(
		store,
		clock,
		GraphConfig::default(),
		tick_rx,
		retry_rx,
		move |snapshot: &GraphSnapshot<String>| sink.borrow_mut().push(Seen::of(snapshot)),
	);
	let controls = Controls {
		ticks,
		retries,
		seen: Rc::clone(&seen),
	};
	futures::join!(driver, script(controls));

	seen.take()
}

fn doc(id: &str, refs: &[&str]) -> Document {
	let refs: Vec<_> = refs.iter().map(|r| json!({ "_type": "reference", "_ref": r })).collect();
	Document::new(id, "post").with_field("refs", json!(refs))
}

fn ids(items: &[&str]) -> BTreeSet<String> {
	items.iter().map(|s| s.to_string()).collect()
}

fn pairs(items: &[(&str, &str)]) -> BTreeSet<(String, String)> {
	items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
}

#[tokio::test]
async fn loads_then_follows_live_updates() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &["b"]), doc("b", &[])]));
	let handle = Rc::clone(&store);

	drive(store, ManualClock::default(), |c| async move {
		settle().await;
		let seen = c.last();
		assert_eq!(seen.phase, Phase::Live);
		assert_eq!(seen.nodes, ids(&["a", "b"]));
		assert_eq!(seen.edges, pairs(&[("a", "b")]));

		handle.emit(ListenEvent::updated("ada", doc("drafts.c", &["drafts.a"])));
		settle().await;
		let seen = c.last();
		assert_eq!(seen.nodes, ids(&["a", "b", "c"]));
		assert_eq!(seen.edges, pairs(&[("a", "b"), ("c", "a")]));
		assert_eq!(
			seen.sessions,
			vec![(
				"ada".to_owned(),
				"c".to_owned(),
				Some("https://img.test/ada.png".to_owned())
			)]
		);

		handle.emit(ListenEvent::disappeared("ada", "drafts.c"));
		settle().await;
		let seen = c.last();
		assert_eq!(seen.nodes, ids(&["a", "b"]));
		assert_eq!(seen.edges, pairs(&[("a", "b")]));
		assert!(seen.sessions.is_empty());
	})
	.await;
}

#[tokio::test]
async fn events_buffered_during_fetch_apply_after_load() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[])]));
	store
		.backlog
		.borrow_mut()
		.push(ListenEvent::updated("cy", doc("c", &["a"])));

	// The controls hold the tick sender; dropping them early ends the view.
	let seen = drive(store, ManualClock::default(), |c| async move {
		settle().await;
		drop(c);
	})
	.await;

	let nodes: Vec<_> = seen.iter().map(|s| s.nodes.clone()).collect();
	assert_eq!(nodes[0], ids(&["a"]));
	assert_eq!(nodes[1], ids(&["a", "c"]));
	let last = seen.last().expect("published");
	assert_eq!(last.nodes, ids(&["a", "c"]));
	assert_eq!(last.edges, pairs(&[("c", "a")]));
}

#[tokio::test]
async fn fetch_failure_waits_for_retry() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[])]));
	store
		.fetches
		.borrow_mut()
		.push_back(Err(StoreError::Fetch("boom".to_owned())));
	let handle = Rc::clone(&store);

	drive(store, ManualClock::default(), |c| async move {
		settle().await;
		assert_eq!(
			c.last().phase,
			Phase::Failed(GraphError::Load(StoreError::Fetch("boom".to_owned())))
		);

		c.retry();
		settle().await;
		let seen = c.last();
		assert_eq!(seen.phase, Phase::Live);
		assert_eq!(seen.nodes, ids(&["a"]));
		assert_eq!(handle.listen_calls.get(), 2);
	})
	.await;
}

#[tokio::test]
async fn stream_error_keeps_graph_until_reconnect() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[])]));
	let handle = Rc::clone(&store);

	drive(store, ManualClock::default(), |c| async move {
		settle().await;
		handle.send(Err(StoreError::Stream("socket closed".to_owned())));
		settle().await;

		let seen = c.last();
		assert!(matches!(seen.phase, Phase::Failed(GraphError::Disconnected(_))));
		assert_eq!(seen.nodes, ids(&["a"]));

		handle.documents.borrow_mut().push(doc("b", &["a"]));
		c.retry();
		settle().await;

		let seen = c.last();
		assert_eq!(seen.phase, Phase::Live);
		assert_eq!(seen.edges, pairs(&[("b", "a")]));
		assert_eq!(handle.fetch_calls.get(), 2);
	})
	.await;
}

#[tokio::test]
async fn malformed_events_are_skipped() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[])]));
	let handle = Rc::clone(&store);

	drive(store, ManualClock::default(), |c| async move {
		settle().await;
		handle.send(Err(StoreError::Decode("not json".to_owned())));
		handle.emit(ListenEvent::updated("cy", doc("b", &[])));
		settle().await;

		let seen = c.last();
		assert_eq!(seen.phase, Phase::Live);
		assert_eq!(seen.nodes, ids(&["a", "b"]));
	})
	.await;
}

#[tokio::test]
async fn sessions_expire_after_idle_timeout() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[])]));
	let handle = Rc::clone(&store);
	let clock = ManualClock::default();
	let time = clock.clone();

	drive(store, clock, |c| async move {
		time.set(1_000);
		settle().await;
		handle.emit(ListenEvent::updated("ada", doc("a", &[])));
		settle().await;
		assert_eq!(c.last().sessions.len(), 1);

		time.set(11_000);
		c.tick();
		settle().await;
		assert_eq!(c.last().sessions.len(), 1);

		time.set(11_001);
		c.tick();
		settle().await;
		assert!(c.last().sessions.is_empty());
	})
	.await;
}

#[tokio::test]
async fn avatars_fall_back_or_go_missing() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[]), doc("b", &[])]));
	let handle = Rc::clone(&store);

	drive(store, ManualClock::default(), |c| async move {
		settle().await;
		handle.emit(ListenEvent::updated("bob", doc("a", &[])));
		handle.emit(ListenEvent::updated("cy", doc("b", &[])));
		handle.emit(ListenEvent::updated("ghost", doc("b", &["a"])));
		settle().await;

		let mut sessions = c.last().sessions;
		sessions.sort();
		assert_eq!(
			sessions,
			vec![
				("bob".to_owned(), "a".to_owned(), None),
				("cy".to_owned(), "b".to_owned(), Some(DEFAULT_AVATAR_URL.to_owned())),
			]
		);
		// The unknown user's edit still lands in the graph.
		assert_eq!(c.last().edges, pairs(&[("b", "a")]));
	})
	.await;
}

#[tokio::test]
async fn teardown_abandons_pending_lookups() {
	let store = Rc::new(FakeStore::with_documents(vec![doc("a", &[])]));
	let handle = Rc::clone(&store);
	let release = store.gate("ada");

	let seen = drive(store, ManualClock::default(), |c| async move {
		settle().await;
		handle.emit(ListenEvent::updated("ada", doc("a", &[])));
		settle().await;
		drop(c);
		settle().await;
	})
	.await;

	// The lookup future was dropped with the driver.
	assert!(release.send(()).is_err());
	assert!(seen.iter().all(|s| s.sessions.is_empty()));
}
