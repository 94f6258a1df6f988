//! User profiles and the per-view lookup cache.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Profile as returned by the store's user lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	pub id: String,
	#[serde(default)]
	pub display_name: String,
	#[serde(default)]
	pub image_url: Option<String>,
}

/// A resolved user together with its decoded avatar, if it loaded.
#[derive(Clone, Debug)]
pub struct CachedUser<I> {
	pub profile: UserProfile,
	pub image: Option<I>,
}

impl<I> CachedUser<I> {
	pub fn new(profile: UserProfile, image: Option<I>) -> Self {
		Self { profile, image }
	}

	pub fn id(&self) -> &str {
		&self.profile.id
	}

	/// Display name, falling back to the id for profiles without one.
	pub fn display_name(&self) -> &str {
		if self.profile.display_name.is_empty() {
			&self.profile.id
		} else {
			&self.profile.display_name
		}
	}

	/// Stable seed for per-user presentation (e.g. color).
	pub fn color_seed(&self) -> u32 {
		string_seed(self.display_name())
	}
}

/// Sum of the string's UTF-16 code units; stable across sessions and hosts.
pub fn string_seed(s: &str) -> u32 {
	s.encode_utf16().fold(0u32, |acc, unit| acc.wrapping_add(unit as u32))
}

/// Users looked up during this view's lifetime, keyed by the identity the
/// store reported. Never invalidated; owned by one view, never global.
#[derive(Debug)]
pub struct UserCache<I> {
	users: HashMap<String, Rc<CachedUser<I>>>,
}

impl<I> Default for UserCache<I> {
	fn default() -> Self {
		Self {
			users: HashMap::new(),
		}
	}
}

impl<I> UserCache<I> {
	pub fn get(&self, identity: &str) -> Option<Rc<CachedUser<I>>> {
		self.users.get(identity).cloned()
	}

	/// Stores a resolved user. If a concurrent lookup already cached this
	/// identity, the first entry is kept and returned.
	pub fn insert(&mut self, identity: &str, user: CachedUser<I>) -> Rc<CachedUser<I>> {
		Rc::clone(
			self.users
				.entry(identity.to_owned())
				.or_insert_with(|| Rc::new(user)),
		)
	}

	pub fn len(&self) -> usize {
		self.users.len()
	}

	pub fn is_empty(&self) -> bool {
		self.users.is_empty()
	}
}
