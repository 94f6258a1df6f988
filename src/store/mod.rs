//! The document-store client consumed by the graph view.
//!
//! The store itself lives in the host studio; this module only fixes the
//! shape of what the engine needs from it. [`bridge`] binds the trait to the
//! host's JavaScript client.

pub mod bridge;

use async_trait::async_trait;
use futures::stream::LocalBoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{Document, UserProfile};
use crate::error::StoreError;

/// Live update stream. Dropping it unsubscribes.
pub type EventStream = LocalBoxStream<'static, Result<ListenEvent, StoreError>>;

/// Visibility change carried by a listen event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
	Appear,
	Update,
	Disappear,
}

/// One event from the real-time subscription.
///
/// Events without a `result` and without a `disappear` transition (e.g. the
/// initial welcome) carry nothing for the graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenEvent {
	pub result: Option<Document>,
	pub previous: Option<Document>,
	/// Id of the user whose action produced the event.
	pub identity: String,
	pub transition: Option<Transition>,
	pub document_id: Option<String>,
}

impl ListenEvent {
	pub fn updated(identity: impl Into<String>, document: Document) -> Self {
		Self {
			document_id: Some(document.id.clone()),
			result: Some(document),
			identity: identity.into(),
			transition: Some(Transition::Update),
			..Self::default()
		}
	}

	pub fn disappeared(identity: impl Into<String>, document_id: impl Into<String>) -> Self {
		Self {
			identity: identity.into(),
			transition: Some(Transition::Disappear),
			document_id: Some(document_id.into()),
			..Self::default()
		}
	}
}

/// Options forwarded to the store's listen call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenOptions {
	pub include_result: bool,
	pub include_previous_revision: bool,
	pub visibility: String,
}

impl Default for ListenOptions {
	fn default() -> Self {
		Self {
			include_result: true,
			include_previous_revision: false,
			visibility: "query".to_owned(),
		}
	}
}

/// What the graph view consumes from the host's document store.
///
/// All futures run on the single UI thread, hence `?Send`.
#[async_trait(?Send)]
pub trait DocumentStore {
	/// Decoded avatar handle handed to the renderer.
	type Image: Clone + 'static;

	/// Runs `query` once and returns every matching document.
	async fn fetch(&self, query: &str) -> Result<Vec<Document>, StoreError>;

	/// Opens a subscription for changes to documents matching `query`.
	fn listen(
		&self,
		query: &str,
		params: &Value,
		options: &ListenOptions,
	) -> Result<EventStream, StoreError>;

	async fn user_by_id(&self, id: &str) -> Result<UserProfile, StoreError>;

	/// Loads and decodes an avatar. `None` when it cannot be loaded.
	async fn load_image(&self, url: &str, width: u32, height: u32) -> Option<Self::Image>;
}
