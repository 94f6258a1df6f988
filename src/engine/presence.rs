//! Transient "who is looking at what" sessions.
//!
//! A session exists per (user, document) pair from the first observed
//! activity until it has been idle longer than the timeout. Sessions refer to
//! documents by canonical id only; the graph owns the documents.

use std::f64::consts::TAU;
use std::rc::Rc;

use super::users::{CachedUser, string_seed};

/// Sessions idle longer than this are swept.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
	pub fn value(self) -> u64 {
		self.0
	}
}

#[derive(Clone, Debug)]
pub struct Session<I> {
	pub id: SessionId,
	pub user: Rc<CachedUser<I>>,
	pub document_id: String,
	pub start_time: u64,
	pub last_active: u64,
	/// Display angle in radians, fixed for the session's lifetime.
	pub angle: f64,
}

impl<I> Session<I> {
	pub fn idle_ms(&self, now: u64) -> u64 {
		now.saturating_sub(self.last_active)
	}

	pub fn age_ms(&self, now: u64) -> u64 {
		now.saturating_sub(self.start_time)
	}

	fn matches(&self, user_id: &str, document_id: &str) -> bool {
		self.user.id() == user_id && self.document_id == document_id
	}
}

/// Owns the live session list.
#[derive(Debug)]
pub struct PresenceTracker<I> {
	sessions: Vec<Session<I>>,
	next_id: u64,
}

impl<I> Default for PresenceTracker<I> {
	fn default() -> Self {
		Self {
			sessions: Vec::new(),
			next_id: 1,
		}
	}
}

impl<I> PresenceTracker<I> {
	/// Creates or refreshes the session for `(user, document_id)`.
	pub fn record_activity(
		&mut self,
		user: Rc<CachedUser<I>>,
		document_id: &str,
		now: u64,
	) -> SessionId {
		if let Some(session) = self
			.sessions
			.iter_mut()
			.find(|s| s.matches(user.id(), document_id))
		{
			session.last_active = now;
			return session.id;
		}

		let id = SessionId(self.next_id);
		self.next_id += 1;
		let angle = display_angle(user.id(), document_id, id);
		self.sessions.push(Session {
			id,
			user,
			document_id: document_id.to_owned(),
			start_time: now,
			last_active: now,
			angle,
		});
		id
	}

	/// Drops sessions idle for more than `idle_timeout_ms`. Returns how many
	/// were removed.
	pub fn sweep_expired(&mut self, now: u64, idle_timeout_ms: u64) -> usize {
		let before = self.sessions.len();
		self.sessions.retain(|s| s.idle_ms(now) <= idle_timeout_ms);
		before - self.sessions.len()
	}

	/// Drops every session pointing at a removed document.
	pub fn remove_for_document(&mut self, document_id: &str) -> usize {
		let before = self.sessions.len();
		self.sessions.retain(|s| s.document_id != document_id);
		before - self.sessions.len()
	}

	pub fn sessions(&self) -> &[Session<I>] {
		&self.sessions
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}
}

/// Deterministic pseudo-random value in `[0, 1)`.
fn pseudo_random(seed: f64) -> f64 {
	let x = (seed * 12.9898 + seed * 78.233).sin() * 43758.5453;
	x - x.floor()
}

fn display_angle(user_id: &str, document_id: &str, id: SessionId) -> f64 {
	let seed = string_seed(user_id) as f64 * 0.37
		+ string_seed(document_id) as f64 * 0.11
		+ id.value() as f64;
	pseudo_random(seed) * TAU
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::users::UserProfile;

	fn user(id: &str) -> Rc<CachedUser<()>> {
		Rc::new(CachedUser::new(
			UserProfile {
				id: id.into(),
				display_name: id.to_uppercase(),
				image_url: None,
			},
			None,
		))
	}

	#[test]
	fn activity_creates_then_refreshes() {
		let mut presence = PresenceTracker::default();
		let first = presence.record_activity(user("ada"), "doc-1", 1_000);
		let angle = presence.sessions()[0].angle;

		let again = presence.record_activity(user("ada"), "doc-1", 4_000);

		assert_eq!(first, again);
		let session = &presence.sessions()[0];
		assert_eq!(presence.sessions().len(), 1);
		assert_eq!(session.start_time, 1_000);
		assert_eq!(session.last_active, 4_000);
		assert_eq!(session.angle, angle);
		assert!((0.0..TAU).contains(&angle));
	}

	#[test]
	fn sessions_are_unique_per_user_and_document() {
		let mut presence = PresenceTracker::default();
		let a = presence.record_activity(user("ada"), "doc-1", 0);
		let b = presence.record_activity(user("ada"), "doc-2", 0);
		let c = presence.record_activity(user("bob"), "doc-1", 0);

		assert_eq!(presence.sessions().len(), 3);
		assert!(a != b && b != c && a != c);
	}

	#[test]
	fn sweep_boundary_is_strictly_greater_than_timeout() {
		let now = 100_000;
		let mut presence = PresenceTracker::default();
		presence.record_activity(user("stale"), "doc", now - 10_001);
		presence.record_activity(user("fresh"), "doc", now - 9_999);
		presence.record_activity(user("edge"), "doc", now - 10_000);

		let removed = presence.sweep_expired(now, DEFAULT_IDLE_TIMEOUT_MS);

		assert_eq!(removed, 1);
		let remaining: Vec<_> = presence.sessions().iter().map(|s| s.user.id()).collect();
		assert_eq!(remaining, ["fresh", "edge"]);
	}

	#[test]
	fn sweeping_with_a_clock_behind_keeps_everything() {
		let mut presence = PresenceTracker::default();
		presence.record_activity(user("ada"), "doc", 5_000);
		assert_eq!(presence.sweep_expired(1_000, DEFAULT_IDLE_TIMEOUT_MS), 0);
	}

	#[test]
	fn removing_a_document_reaps_its_sessions() {
		let mut presence = PresenceTracker::default();
		presence.record_activity(user("ada"), "gone", 0);
		presence.record_activity(user("bob"), "gone", 0);
		presence.record_activity(user("ada"), "kept", 0);

		assert_eq!(presence.remove_for_document("gone"), 2);
		assert_eq!(presence.sessions().len(), 1);
		assert_eq!(presence.sessions()[0].document_id, "kept");
	}
}
