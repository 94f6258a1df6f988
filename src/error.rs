//! Error types for the document-store boundary and the graph view.

use thiserror::Error;

/// Failure reported by the host document-store client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
	/// The host page did not provide a usable client.
	#[error("document store unavailable: {0}")]
	Unavailable(String),

	/// The bulk query was rejected.
	#[error("fetch failed: {0}")]
	Fetch(String),

	/// Opening the real-time subscription failed.
	#[error("listen failed: {0}")]
	Listen(String),

	/// The open subscription reported an error or closed.
	#[error("subscription error: {0}")]
	Stream(String),

	/// A user profile could not be resolved.
	#[error("user lookup failed for '{id}': {message}")]
	UserLookup { id: String, message: String },

	/// A payload from the client did not have the expected shape.
	#[error("malformed payload: {0}")]
	Decode(String),
}

impl StoreError {
	/// Creates a user lookup error.
	pub fn user_lookup(id: impl Into<String>, message: impl Into<String>) -> Self {
		Self::UserLookup {
			id: id.into(),
			message: message.into(),
		}
	}

	/// Decode errors concern a single payload; the subscription stays usable.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::Decode(_) | Self::UserLookup { .. })
	}
}

impl From<serde_json::Error> for StoreError {
	fn from(err: serde_json::Error) -> Self {
		Self::Decode(err.to_string())
	}
}

/// Failure surfaced to the user as "unable to load graph".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
	/// The initial load (subscribe + bulk fetch) did not complete.
	#[error("unable to load graph: {0}")]
	Load(StoreError),

	/// The live subscription dropped after the graph was loaded.
	#[error("live updates disconnected: {0}")]
	Disconnected(StoreError),
}

impl GraphError {
	/// Whether a graph from an earlier load is still on screen.
	pub fn keeps_graph(&self) -> bool {
		matches!(self, Self::Disconnected(_))
	}
}
