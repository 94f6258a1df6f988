//! studio-graph: live force-directed graph of a content workspace.
//!
//! Every document becomes a node, every reference an edge, and every editor
//! currently working on a document appears as an avatar next to it. The
//! graph is built from one bulk query and then kept current from the store's
//! real-time subscription.
//!
//! - [`engine`] holds the browser-independent sync engine.
//! - [`store`] defines what the engine needs from the document store, and
//!   binds it to the host page's JavaScript client.
//! - [`driver`] runs the async event loop that feeds the engine.
//! - [`components`] renders the result with Leptos on a canvas.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod clock;
pub mod components;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod store;

pub use components::graph_view::GraphView;
pub use config::GraphConfig;
pub use engine::{DocumentTarget, GraphSnapshot, Phase, SyncController};
pub use error::{GraphError, StoreError};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("studio-graph: logging initialized");
}

/// Load the view configuration from a script element with id="graph-config".
/// Missing or malformed configuration falls back to the defaults.
fn load_config() -> GraphConfig {
	let Some(json_text) = config_text() else {
		info!("studio-graph: no #graph-config element, using defaults");
		return GraphConfig::default();
	};

	match GraphConfig::from_json(&json_text) {
		Ok(config) => {
			info!("studio-graph: loaded config (api version {})", config.api_version);
			config
		}
		Err(e) => {
			warn!("studio-graph: failed to parse graph config: {}", e);
			GraphConfig::default()
		}
	}
}

fn config_text() -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("graph-config")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Asks the host studio to open a document for editing.
fn open_document(target: DocumentTarget) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let hash = format!("#/intent/edit/id={};type={}", target.id, target.doc_type);
	if let Err(e) = window.location().set_hash(&hash) {
		warn!("studio-graph: could not open {}: {:?}", target.id, e);
	}
}

/// Main application component.
/// Reads the configuration from the DOM and renders the live graph view.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_config();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Document Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<GraphView config=config on_open=open_document />
			<div class="graph-overlay">
				<h1>"Document Graph"</h1>
				<p class="subtitle">"Click a document to edit it. Scroll to zoom. Drag background to pan."</p>
			</div>
		</div>
	}
}
