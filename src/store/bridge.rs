//! [`DocumentStore`] backed by the host studio's JavaScript client.
//!
//! The host page exposes a global `createStudioGraphClient(config)` that
//! returns an object with `fetch(query)`, `listen(query, params, options,
//! onEvent, onError)` and `getUserById(id)`. Payloads cross the boundary as
//! JSON and are decoded with serde.

use std::cell::RefCell;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use futures::{Stream, StreamExt};
use js_sys::{Function, JSON, Promise};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use super::{DocumentStore, EventStream, ListenEvent, ListenOptions};
use crate::engine::{Document, UserProfile};
use crate::error::StoreError;

#[wasm_bindgen]
extern "C" {
	/// Document client provided by the host page.
	#[derive(Clone, Debug)]
	pub type JsStudioClient;

	#[wasm_bindgen(catch, js_name = createStudioGraphClient)]
	fn create_client(config: &JsValue) -> Result<JsStudioClient, JsValue>;

	#[wasm_bindgen(method, catch)]
	fn fetch(this: &JsStudioClient, query: &str) -> Result<Promise, JsValue>;

	/// Returns the unsubscribe function.
	#[wasm_bindgen(method, catch)]
	fn listen(
		this: &JsStudioClient,
		query: &str,
		params: &JsValue,
		options: &JsValue,
		on_event: &Function,
		on_error: &Function,
	) -> Result<Function, JsValue>;

	#[wasm_bindgen(method, catch, js_name = getUserById)]
	fn get_user_by_id(this: &JsStudioClient, id: &str) -> Result<Promise, JsValue>;
}

/// Best-effort message for a thrown JS value.
fn describe(err: &JsValue) -> String {
	if let Some(message) = err.as_string() {
		return message;
	}
	match err.dyn_ref::<js_sys::Error>() {
		Some(error) => String::from(error.message()),
		None => format!("{err:?}"),
	}
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, StoreError> {
	let text = serde_json::to_string(value)?;
	JSON::parse(&text).map_err(|err| StoreError::Decode(describe(&err)))
}

fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, StoreError> {
	// `JSON.stringify(undefined)` is not a string.
	let text = JSON::stringify(value)
		.map_err(|err| StoreError::Decode(describe(&err)))?
		.as_string()
		.unwrap_or_else(|| "null".to_owned());
	Ok(serde_json::from_str(&text)?)
}

/// Handle on the host client.
#[derive(Clone, Debug)]
pub struct JsDocumentStore {
	client: JsStudioClient,
}

impl JsDocumentStore {
	/// Creates a client pinned to `api_version`.
	pub fn connect(api_version: &str) -> Result<Self, StoreError> {
		let config = to_js(&json!({ "apiVersion": api_version }))?;
		let client =
			create_client(&config).map_err(|err| StoreError::Unavailable(describe(&err)))?;
		debug!("studio-graph: connected with api version {api_version}");
		Ok(Self { client })
	}
}

#[async_trait(?Send)]
impl DocumentStore for JsDocumentStore {
	type Image = HtmlImageElement;

	async fn fetch(&self, query: &str) -> Result<Vec<Document>, StoreError> {
		let promise = self
			.client
			.fetch(query)
			.map_err(|err| StoreError::Fetch(describe(&err)))?;
		let value = JsFuture::from(promise)
			.await
			.map_err(|err| StoreError::Fetch(describe(&err)))?;
		from_js(&value)
	}

	fn listen(
		&self,
		query: &str,
		params: &Value,
		options: &ListenOptions,
	) -> Result<EventStream, StoreError> {
		let (tx, events) = mpsc::unbounded();

		let event_tx = tx.clone();
		let on_event = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
			// Closed receiver means the view is gone.
			let _ = event_tx.unbounded_send(from_js::<ListenEvent>(&payload));
		});
		let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
			let _ = tx.unbounded_send(Err(StoreError::Stream(describe(&err))));
		});

		let unsubscribe = self
			.client
			.listen(
				query,
				&to_js(params)?,
				&to_js(options)?,
				on_event.as_ref().unchecked_ref(),
				on_error.as_ref().unchecked_ref(),
			)
			.map_err(|err| StoreError::Listen(describe(&err)))?;

		Ok(Box::pin(Subscription {
			events,
			unsubscribe,
			_on_event: on_event,
			_on_error: on_error,
		}))
	}

	async fn user_by_id(&self, id: &str) -> Result<UserProfile, StoreError> {
		let promise = self
			.client
			.get_user_by_id(id)
			.map_err(|err| StoreError::user_lookup(id, describe(&err)))?;
		let value = JsFuture::from(promise)
			.await
			.map_err(|err| StoreError::user_lookup(id, describe(&err)))?;
		from_js::<Option<UserProfile>>(&value)?
			.ok_or_else(|| StoreError::user_lookup(id, "no such user"))
	}

	async fn load_image(&self, url: &str, width: u32, height: u32) -> Option<HtmlImageElement> {
		let image = HtmlImageElement::new_with_width_and_height(width, height).ok()?;
		let (tx, settled) = oneshot::channel::<bool>();
		let tx = Rc::new(RefCell::new(Some(tx)));

		let settle = |loaded: bool| {
			let tx = Rc::clone(&tx);
			Closure::<dyn FnMut()>::new(move || {
				if let Some(tx) = tx.borrow_mut().take() {
					let _ = tx.send(loaded);
				}
			})
		};
		let on_load = settle(true);
		let on_error = settle(false);

		image.set_onload(Some(on_load.as_ref().unchecked_ref()));
		image.set_onerror(Some(on_error.as_ref().unchecked_ref()));
		image.set_src(url);

		let loaded = settled.await.unwrap_or(false);
		image.set_onload(None);
		image.set_onerror(None);
		loaded.then_some(image)
	}
}

/// Live subscription. Dropping it calls the host's unsubscribe function.
struct Subscription {
	events: mpsc::UnboundedReceiver<Result<ListenEvent, StoreError>>,
	unsubscribe: Function,
	_on_event: Closure<dyn FnMut(JsValue)>,
	_on_error: Closure<dyn FnMut(JsValue)>,
}

impl Stream for Subscription {
	type Item = Result<ListenEvent, StoreError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.events.poll_next_unpin(cx)
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Err(err) = self.unsubscribe.call0(&JsValue::NULL) {
			warn!("studio-graph: unsubscribe failed: {}", describe(&err));
		}
	}
}
