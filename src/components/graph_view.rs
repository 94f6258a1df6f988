//! The live graph view: spawns the sync driver for one store connection and
//! renders the canvas together with its overlays (status, legend, hover
//! label).

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::mpsc;
use futures::future::{AbortHandle, Abortable};
use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlImageElement;

use super::force_graph::{ForceGraphCanvas, GraphScene, LegendEntry, SharedScene};
use crate::clock::SystemClock;
use crate::config::GraphConfig;
use crate::driver;
use crate::engine::{DocumentTarget, GraphSnapshot, Phase};
use crate::store::bridge::JsDocumentStore;

/// What the status overlay shows.
#[derive(Clone, Debug, PartialEq)]
enum Status {
	Loading,
	Live,
	/// Load or live updates failed; the user can ask for another attempt.
	Failed { message: String, reconnect: bool },
	/// No document store to talk to.
	Unavailable(String),
}

impl Status {
	fn from_phase(phase: &Phase) -> Self {
		match phase {
			Phase::Uninitialized => Self::Loading,
			Phase::Live | Phase::TornDown => Self::Live,
			Phase::Failed(err) => Self::Failed {
				message: err.to_string(),
				reconnect: err.keeps_graph(),
			},
		}
	}
}

/// Live graph of every document matched by `config.query`.
///
/// Clicking a node hands its `{id, type}` to `on_open`.
#[component]
pub fn GraphView(
	config: GraphConfig,
	#[prop(into)] on_open: Callback<DocumentTarget>,
) -> impl IntoView {
	let scene: SharedScene = Rc::new(RefCell::new(GraphScene::new(config.idle_timeout_ms)));
	let status = RwSignal::new(Status::Loading);
	let legend = RwSignal::new(Vec::<LegendEntry>::new());
	let hover = RwSignal::new(None::<String>);
	let (retry_tx, retry_rx) = mpsc::unbounded::<()>();

	match JsDocumentStore::connect(&config.api_version) {
		Ok(store) => {
			let (tick_tx, tick_rx) = mpsc::unbounded::<()>();
			let tick = Closure::<dyn FnMut()>::new(move || {
				let _ = tick_tx.unbounded_send(());
			});
			let interval = web_sys::window().and_then(|window| {
				window
					.set_interval_with_callback_and_timeout_and_arguments_0(
						tick.as_ref().unchecked_ref(),
						config.sweep_interval_ms as i32,
					)
					.ok()
			});

			let scene_sync = scene.clone();
			let legend_size = config.legend_size;
			let publish = move |snapshot: &GraphSnapshot<HtmlImageElement>| {
				let (entries, hover_lost) = {
					let mut scene = scene_sync.borrow_mut();
					let hover_lost = scene.sync(snapshot);
					(scene.legend(&snapshot.metrics, legend_size), hover_lost)
				};
				if hover_lost {
					hover.set(None);
				}
				legend.set(entries);
				status.set(Status::from_phase(&snapshot.phase));
			};

			let (abort, registration) = AbortHandle::new_pair();
			let run = driver::run(
				Rc::new(store),
				SystemClock,
				config.clone(),
				tick_rx,
				retry_rx,
				publish,
			);
			spawn_local(async move {
				// The interval callback lives exactly as long as the driver.
				let _tick = tick;
				if Abortable::new(run, registration).await.is_err() {
					debug!("studio-graph: driver stopped on unmount");
				}
			});

			on_cleanup(move || {
				abort.abort();
				if let (Some(window), Some(id)) = (web_sys::window(), interval) {
					window.clear_interval_with_handle(id);
				}
			});
		}
		Err(err) => {
			warn!("studio-graph: {err}");
			status.set(Status::Unavailable(err.to_string()));
		}
	}

	let on_hover = Callback::new(move |label: Option<String>| hover.set(label));

	let status_overlay = move || match status.get() {
		Status::Live => None,
		Status::Loading => Some(view! { <div class="graph-status">"Loading graph…"</div> }.into_any()),
		Status::Unavailable(message) => Some(
			view! {
				<div class="graph-status graph-status--error">
					<strong>"Unable to load graph"</strong>
					<p>{message}</p>
				</div>
			}
			.into_any(),
		),
		Status::Failed { message, reconnect } => {
			let retry_tx = retry_tx.clone();
			let label = if reconnect { "Reconnect" } else { "Retry" };
			Some(
				view! {
					<div class="graph-status graph-status--error">
						<strong>"Unable to load graph"</strong>
						<p>{message}</p>
						<button on:click=move |_| {
							let _ = retry_tx.unbounded_send(());
						}>{label}</button>
					</div>
				}
				.into_any(),
			)
		}
	};

	view! {
		<div class="graph-view">
			<ForceGraphCanvas scene=scene on_hover=on_hover on_open=on_open fullscreen=true />
			<div class="graph-legend">
				<For
					each=move || legend.get()
					key=|entry| entry.doc_type.clone()
					let:entry
				>
					<div class="graph-legend__row" style:color=entry.color.clone()>
						<span class="graph-legend__badge"></span>
						<span>{entry.label.clone()}</span>
					</div>
				</For>
			</div>
			{move || hover.get().map(|label| view! { <div class="graph-hover">{label}</div> })}
			{status_overlay}
		</div>
	}
}
