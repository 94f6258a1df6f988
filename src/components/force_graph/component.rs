//! Leptos component wrapping the graph canvas.
//!
//! The component creates an HTML canvas element and wires up mouse/wheel event
//! handlers for node dragging, panning, zooming, hovering and clicking. An
//! animation loop runs via `requestAnimationFrame`, stepping the physics
//! simulation and redrawing the shared [`GraphScene`] each frame. Unmounting
//! stops the loop and removes the window resize listener.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent, WheelEvent, Window,
};

use super::render;
use super::scale::ScaleConfig;
use super::state::GraphScene;
use super::theme::Theme;
use crate::clock::{Clock, SystemClock};
use crate::engine::DocumentTarget;

/// Scene shared between the sync driver (writer) and the canvas (reader).
pub type SharedScene = Rc<RefCell<GraphScene<HtmlImageElement>>>;

/// Pointer travel, in pixels, below which a press counts as a click.
const CLICK_SLOP: f64 = 4.0;

/// Visual configuration owned by the canvas.
struct CanvasStyle {
	scale: ScaleConfig,
	theme: Theme,
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// State carried from one animation frame to the next.
struct FrameLoop {
	scene: SharedScene,
	style: Rc<CanvasStyle>,
	ctx: CanvasRenderingContext2d,
	stopped: StopSignal,
}

/// Raised once on unmount; the frame loop checks it before drawing.
#[derive(Clone, Debug, Default)]
struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
	fn stop(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	fn is_stopped(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

/// Steps and draws one frame, then requests the next until stopped. Each
/// request owns the loop, so nothing outlives the last scheduled frame.
fn schedule_frame(frame: Rc<FrameLoop>) {
	request_animation_frame(move || {
		if frame.stopped.is_stopped() {
			return;
		}
		{
			let mut scene = frame.scene.borrow_mut();
			scene.tick(0.016);
			render::render(
				&scene,
				&frame.ctx,
				&frame.style.scale,
				&frame.style.theme,
				SystemClock.now_ms(),
			);
		}
		schedule_frame(frame);
	});
}

/// Renders the shared scene on a canvas element.
///
/// The component sizes itself to its parent container by default; set
/// `fullscreen = true` to fill the viewport and resize with the window.
/// `on_hover` receives the label of the node under the pointer, `on_open`
/// the document behind a clicked node.
#[component]
pub fn ForceGraphCanvas(
	scene: SharedScene,
	#[prop(into)] on_hover: Callback<Option<String>>,
	#[prop(into)] on_open: Callback<DocumentTarget>,
	#[prop(default = false)] fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let style = Rc::new(CanvasStyle {
		scale: ScaleConfig::default(),
		theme: Theme::default(),
	});
	let stopped = StopSignal::default();

	let stopped_cleanup = stopped.clone();
	on_cleanup(move || stopped_cleanup.stop());

	let (scene_init, style_init) = (scene.clone(), style.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			canvas
				.parent_element()
				.map(|p| (p.client_width() as f64, p.client_height() as f64))
				.unwrap_or((800.0, 600.0))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		scene_init.borrow_mut().resize(w, h);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			warn!("studio-graph: canvas has no 2d context");
			return;
		};

		if fullscreen {
			let (scene_resize, canvas_resize) = (scene_init.clone(), canvas.clone());
			let listener = window_event_listener(leptos::ev::resize, move |_| {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				scene_resize.borrow_mut().resize(nw, nh);
			});
			on_cleanup(move || listener.remove());
		}

		schedule_frame(Rc::new(FrameLoop {
			scene: scene_init.clone(),
			style: style_init.clone(),
			ctx,
			stopped: stopped.clone(),
		}));
	});

	let (scene_md, style_md) = (scene.clone(), style.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut scene = scene_md.borrow_mut();
		match scene.node_at_position(x, y, &style_md.scale) {
			Some(info) => {
				let id = info.target.id;
				if let Some((nx, ny)) = scene.position_of(&id) {
					scene.drag.node_start_x = nx;
					scene.drag.node_start_y = ny;
				}
				scene.drag.node = Some(id);
				scene.drag.start_x = x;
				scene.drag.start_y = y;
				scene.drag.moved = false;
			}
			None => {
				scene.pan.active = true;
				scene.pan.start_x = x;
				scene.pan.start_y = y;
				scene.pan.transform_start_x = scene.transform.x;
				scene.pan.transform_start_y = scene.transform.y;
			}
		}
	};

	let (scene_mm, style_mm) = (scene.clone(), style.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut hover_change = None;
		{
			let mut scene = scene_mm.borrow_mut();
			if let Some(id) = scene.drag.node.clone() {
				let (dx, dy) = (x - scene.drag.start_x, y - scene.drag.start_y);
				if scene.drag.moved || dx.hypot(dy) > CLICK_SLOP {
					scene.drag.moved = true;
					let k = scene.transform.k;
					let nx = scene.drag.node_start_x + (dx / k) as f32;
					let ny = scene.drag.node_start_y + (dy / k) as f32;
					scene.pin_node(&id, nx, ny);
				}
			} else {
				if scene.pan.active {
					scene.transform.x = scene.pan.transform_start_x + (x - scene.pan.start_x);
					scene.transform.y = scene.pan.transform_start_y + (y - scene.pan.start_y);
				}
				let hovered = scene.node_at_position(x, y, &style_mm.scale);
				let hovered_id = hovered.as_ref().map(|info| info.target.id.as_str());
				if scene.highlight.hovered.as_deref() != hovered_id {
					scene.set_hover(hovered_id);
					hover_change = Some(hovered.map(|info| info.label));
				}
			}
		}
		// Notify outside the borrow; the callback may touch reactive state.
		if let Some(label) = hover_change {
			on_hover.run(label);
		}
	};

	let (scene_mu, style_mu) = (scene.clone(), style.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let mut opened = None;
		{
			let mut scene = scene_mu.borrow_mut();
			if let Some(id) = scene.drag.node.take() {
				if !scene.drag.moved {
					opened = pointer(canvas_ref, &ev)
						.and_then(|(x, y)| scene.node_at_position(x, y, &style_mu.scale))
						.filter(|info| info.target.id == id)
						.map(|info| info.target);
				}
			}
			scene.drag.moved = false;
			scene.pan.active = false;
		}
		if let Some(target) = opened {
			on_open.run(target);
		}
	};

	let scene_ml = scene.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let was_hovering = {
			let mut scene = scene_ml.borrow_mut();
			scene.drag.node = None;
			scene.drag.moved = false;
			scene.pan.active = false;
			let was_hovering = scene.highlight.hovered.is_some();
			scene.set_hover(None);
			was_hovering
		};
		if was_hovering {
			on_hover.run(None);
		}
	};

	let scene_wh = scene.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		let mut scene = scene_wh.borrow_mut();
		let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
		let new_k = (scene.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / scene.transform.k;
		scene.transform.x = x - (x - scene.transform.x) * ratio;
		scene.transform.y = y - (y - scene.transform.y) * ratio;
		scene.transform.k = new_k;
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: pointer;"
		/>
	}
}
