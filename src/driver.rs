//! Async event loop feeding a [`SyncController`].
//!
//! One call to [`run`] owns one view's lifetime: it opens the subscription,
//! performs the bulk fetch, then applies stream events, resolved user
//! lookups and timer ticks strictly one at a time. Failures are published
//! as a [`Phase::Failed`] snapshot and the loop waits for a retry request.
//! The loop ends when the tick stream ends (the timer was cancelled);
//! dropping the future has the same effect and also unsubscribes and
//! abandons in-flight lookups.
//!
//! [`Phase::Failed`]: crate::engine::Phase::Failed

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::stream::{FusedStream, FuturesUnordered};
use futures::{FutureExt, Stream, StreamExt, select};
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::config::GraphConfig;
use crate::engine::{Activity, CachedUser, EventOutcome, GraphSnapshot, SyncController};
use crate::error::{GraphError, StoreError};
use crate::store::{DocumentStore, ListenOptions};

enum Exit {
	/// The session failed; wait for a retry.
	Failed,
	/// The view is going away.
	Stopped,
}

struct Resolved<I> {
	activity: Activity,
	user: Result<CachedUser<I>, StoreError>,
}

/// Drives one graph view until `ticks` ends.
///
/// `ticks` should yield once per sweep interval; `retries` yields when the
/// user asks to reload after a failure. Every state change is handed to
/// `publish`.
pub async fn run<S, C, T, R, F>(
	store: Rc<S>,
	clock: C,
	config: GraphConfig,
	ticks: T,
	retries: R,
	mut publish: F,
) where
	S: DocumentStore + 'static,
	C: Clock,
	T: Stream<Item = ()> + Unpin,
	R: Stream<Item = ()> + Unpin,
	F: FnMut(&GraphSnapshot<S::Image>),
{
	let mut controller = SyncController::new(config.idle_timeout_ms);
	let mut ticks = ticks.fuse();
	let mut retries = retries.fuse();

	'view: loop {
		let exit = live_session(
			&store,
			&clock,
			&config,
			&mut controller,
			&mut ticks,
			&mut publish,
		)
		.await;
		if let Exit::Stopped = exit {
			break 'view;
		}
		publish(&controller.snapshot());

		// Presence keeps decaying while the failure is on screen.
		loop {
			select! {
				retry = retries.next() => match retry {
					Some(()) => {
						info!("studio-graph: retrying");
						continue 'view;
					}
					None => break 'view,
				},
				tick = ticks.next() => match tick {
					Some(()) => {
						if controller.sweep(clock.now_ms()) {
							publish(&controller.snapshot());
						}
					}
					None => break 'view,
				},
			}
		}
	}

	controller.teardown();
	debug!("studio-graph: view torn down");
}

async fn live_session<S, C, T, F>(
	store: &Rc<S>,
	clock: &C,
	config: &GraphConfig,
	controller: &mut SyncController<S::Image>,
	ticks: &mut T,
	publish: &mut F,
) -> Exit
where
	S: DocumentStore + 'static,
	C: Clock,
	T: FusedStream<Item = ()> + Unpin,
	F: FnMut(&GraphSnapshot<S::Image>),
{
	// Subscribe first so nothing between the fetch and the first event is
	// lost; the stream buffers until the graph is built.
	let params = Value::Object(Map::new());
	let mut events = match store.listen(&config.query, &params, &ListenOptions::default()) {
		Ok(events) => events.fuse(),
		Err(err) => {
			warn!("studio-graph: {err}");
			controller.fail(GraphError::Load(err));
			return Exit::Failed;
		}
	};

	match store.fetch(&config.query).await {
		Ok(documents) => controller.load(documents),
		Err(err) => {
			warn!("studio-graph: {err}");
			controller.fail(GraphError::Load(err));
			return Exit::Failed;
		}
	}
	publish(&controller.snapshot());

	let mut lookups: FuturesUnordered<LocalBoxFuture<'static, Resolved<S::Image>>> =
		FuturesUnordered::new();

	loop {
		select! {
			event = events.next() => match event {
				Some(Ok(event)) => {
					match controller.apply_event(event) {
						EventOutcome::Ignored => continue,
						EventOutcome::Upserted {
							activity: Some(activity),
							..
						} => match controller.cached_user(&activity.identity) {
							Some(user) => {
								controller.record_activity(user, &activity.document_id, clock.now_ms());
							}
							None => lookups.push(
								resolve_user(Rc::clone(store), activity, config).boxed_local(),
							),
						},
						_ => {}
					}
					publish(&controller.snapshot());
				}
				Some(Err(err)) if err.is_recoverable() => {
					warn!("studio-graph: skipping event: {err}");
				}
				Some(Err(err)) => {
					warn!("studio-graph: {err}");
					controller.fail(GraphError::Disconnected(err));
					return Exit::Failed;
				}
				None => {
					warn!("studio-graph: subscription closed");
					controller.fail(GraphError::Disconnected(StoreError::Stream(
						"subscription closed".to_owned(),
					)));
					return Exit::Failed;
				}
			},
			resolved = lookups.select_next_some() => {
				let Resolved { activity, user } = resolved;
				match user {
					Ok(user) => {
						let Some(user) = controller.cache_user(&activity.identity, user) else {
							continue;
						};
						if controller.record_activity(user, &activity.document_id, clock.now_ms()) {
							publish(&controller.snapshot());
						}
					}
					Err(err) => warn!("studio-graph: {err}; presence not shown"),
				}
			},
			tick = ticks.next() => match tick {
				Some(()) => {
					if controller.sweep(clock.now_ms()) {
						publish(&controller.snapshot());
					}
				}
				None => return Exit::Stopped,
			},
		}
	}
}

/// Looks up a user and their avatar. A missing avatar is not an error.
fn resolve_user<S>(
	store: Rc<S>,
	activity: Activity,
	config: &GraphConfig,
) -> impl Future<Output = Resolved<S::Image>> + 'static
where
	S: DocumentStore + 'static,
{
	let size = config.avatar_size;
	let fallback = config.fallback_avatar_url.clone();

	async move {
		let user = match store.user_by_id(&activity.identity).await {
			Ok(profile) => {
				let url = profile
					.image_url
					.clone()
					.filter(|url| !url.is_empty())
					.unwrap_or(fallback);
				let image = store.load_image(&url, size, size).await;
				if image.is_none() {
					warn!("studio-graph: avatar for {} did not load", profile.id);
				}
				Ok(CachedUser::new(profile, image))
			}
			Err(err) => Err(err),
		};
		Resolved { activity, user }
	}
}
