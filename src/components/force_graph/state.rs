//! Canvas-side scene state.
//!
//! Wraps the `force_graph` physics simulation with per-node display data, the
//! pan/zoom transform, hover highlighting and the presence sessions to draw.
//! Snapshots from the sync engine are folded in with [`GraphScene::sync`]:
//! the simulation is rebuilt only when the topology changed, and nodes that
//! survive a rebuild keep their positions.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::scale::{ScaleConfig, ScaledValues};
use super::theme::{Color, TypeColors};
use crate::engine::metrics::label_for;
use crate::engine::{DocumentMetrics, DocumentTarget, Graph, GraphSnapshot, Node, Session};

/// Per-node display data attached to each node in the simulation.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub target: DocumentTarget,
	pub label: String,
	pub color: Color,
	/// World-space radius, `sqrt` of the node value.
	pub radius: f64,
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to 0.1..10.0).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Tracks an in-progress node drag.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	/// Document id of the node under the pointer at mousedown.
	pub node: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
	/// Set once the pointer moved far enough to count as a drag, not a click.
	pub moved: bool,
}

/// Tracks an in-progress canvas pan.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Smoothed hover highlighting keyed by document id, so it survives
/// simulation rebuilds.
///
/// Each node has an intensity in `[0, 1]` that eases towards 1 while the node
/// is hovered or adjacent to the hovered node, and decays back to 0 after.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	pub hovered: Option<String>,
	target_set: HashSet<String>,
	intensity: HashMap<String, f64>,
}

impl HighlightState {
	pub fn set_hover(&mut self, node: Option<&str>, edges: &[(String, String)]) {
		if self.hovered.as_deref() == node {
			return;
		}
		self.hovered = node.map(str::to_owned);
		self.target_set.clear();

		if let Some(id) = node {
			self.target_set.insert(id.to_owned());
			for (source, target) in edges {
				if source == id {
					self.target_set.insert(target.clone());
				} else if target == id {
					self.target_set.insert(source.clone());
				}
			}
		}
	}

	/// Exponential smoothing: `value += (target - value) * (1 - e^(-speed * dt))`.
	pub fn tick(&mut self, dt: f64) {
		const FADE_IN_SPEED: f64 = 6.0;
		const FADE_OUT_SPEED: f64 = 4.0;

		let fade_in = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out = (-FADE_OUT_SPEED * dt).exp();

		for id in &self.target_set {
			let value = self.intensity.entry(id.clone()).or_insert(0.0);
			*value += (1.0 - *value) * fade_in;
		}
		let targets = &self.target_set;
		self.intensity.retain(|id, value| {
			if targets.contains(id) {
				return true;
			}
			*value *= fade_out;
			*value > 0.005
		});
	}

	pub fn node_intensity(&self, id: &str) -> f64 {
		self.intensity.get(id).copied().unwrap_or(0.0)
	}

	pub fn edge_intensity(&self, source: &str, target: &str) -> f64 {
		(self.node_intensity(source) * self.node_intensity(target)).sqrt()
	}
}

/// A legend row: formatted type name and its node color.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
	pub doc_type: String,
	pub label: String,
	pub color: String,
}

/// Everything the canvas draws, updated from engine snapshots and mutated
/// each frame by the animation loop.
pub struct GraphScene<I> {
	pub physics: ForceGraph<NodeInfo, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub highlight: HighlightState,
	pub sessions: Vec<Session<I>>,
	pub idle_timeout_ms: u64,
	pub width: f64,
	pub height: f64,
	edges: Vec<(String, String)>,
	/// Documents that reference themselves; drawn as loops, not springs.
	self_loops: HashSet<String>,
	topology: Option<u64>,
	type_colors: TypeColors,
}

fn simulation() -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

/// Start position for a node with no previous layout.
fn seed_position(index: usize, count: usize) -> (f32, f32) {
	let angle = (index as f64) * 2.0 * PI / count.max(1) as f64;
	let ring = 100.0 + 10.0 * (index % 7) as f64;
	((ring * angle.cos()) as f32, (ring * angle.sin()) as f32)
}

impl<I: Clone> GraphScene<I> {
	pub fn new(idle_timeout_ms: u64) -> Self {
		Self {
			physics: simulation(),
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			highlight: HighlightState::default(),
			sessions: Vec::new(),
			idle_timeout_ms,
			width: 0.0,
			height: 0.0,
			edges: Vec::new(),
			self_loops: HashSet::new(),
			topology: None,
			type_colors: TypeColors::default(),
		}
	}

	/// Folds an engine snapshot into the scene.
	///
	/// Returns `true` when the hovered node went away, so the caller can
	/// clear whatever it shows for the hover.
	pub fn sync(&mut self, snapshot: &GraphSnapshot<I>) -> bool {
		let hover_lost = if self.topology == Some(snapshot.topology) {
			self.refresh(&snapshot.graph, &snapshot.metrics);
			false
		} else {
			self.topology = Some(snapshot.topology);
			self.rebuild(&snapshot.graph, &snapshot.metrics)
		};
		self.sessions = snapshot.sessions.clone();
		hover_lost
	}

	fn node_info(&mut self, node: &Node, metrics: &DocumentMetrics) -> NodeInfo {
		NodeInfo {
			target: node.document.target(),
			label: label_for(&node.document),
			color: self.type_colors.color_for(&node.document.doc_type),
			radius: metrics.node_value(&node.document).sqrt(),
		}
	}

	fn rebuild(&mut self, graph: &Graph, metrics: &DocumentMetrics) -> bool {
		let mut previous: HashMap<String, (f32, f32, bool)> = HashMap::new();
		self.physics.visit_nodes(|node| {
			previous.insert(
				node.data.user_data.target.id.clone(),
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		let mut physics = simulation();
		let mut index = HashMap::new();
		let count = graph.nodes().len();
		for (i, node) in graph.nodes().iter().enumerate() {
			let info = self.node_info(node, metrics);
			let (x, y, is_anchor) = previous.get(&node.id).copied().unwrap_or_else(|| {
				let (x, y) = seed_position(i, count);
				(x, y, false)
			});
			let idx = physics.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: info,
			});
			index.insert(node.id.as_str(), idx);
		}

		let mut edges = Vec::new();
		let mut self_loops = HashSet::new();
		for edge in graph.edges() {
			if edge.source == edge.target {
				self_loops.insert(edge.source.clone());
				continue;
			}
			if let (Some(&src), Some(&tgt)) =
				(index.get(edge.source.as_str()), index.get(edge.target.as_str()))
			{
				physics.add_edge(src, tgt, EdgeData::default());
				edges.push((edge.source.clone(), edge.target.clone()));
			}
		}

		if let Some(dragged) = &self.drag.node {
			if !index.contains_key(dragged.as_str()) {
				self.drag = DragState::default();
			}
		}
		let hovered = self.highlight.hovered.take();
		self.physics = physics;
		self.edges = edges;
		self.self_loops = self_loops;
		match hovered {
			Some(id) if graph.contains(&id) => {
				self.highlight.set_hover(Some(&id), &self.edges);
				false
			}
			Some(_) => true,
			None => false,
		}
	}

	/// Updates labels, colors and sizes in place.
	fn refresh(&mut self, graph: &Graph, metrics: &DocumentMetrics) {
		let mut infos: HashMap<&str, NodeInfo> = HashMap::new();
		for node in graph.nodes() {
			let info = self.node_info(node, metrics);
			infos.insert(node.id.as_str(), info);
		}
		self.physics.visit_nodes_mut(|node| {
			if let Some(info) = infos.remove(node.data.user_data.target.id.as_str()) {
				node.data.user_data = info;
			}
		});
	}

	/// Legend rows for the `limit` most common types.
	pub fn legend(&mut self, metrics: &DocumentMetrics, limit: usize) -> Vec<LegendEntry> {
		use crate::engine::metrics::format_doc_type;

		metrics
			.top_types(limit)
			.into_iter()
			.map(|(doc_type, _)| LegendEntry {
				doc_type: doc_type.to_owned(),
				label: format_doc_type(doc_type),
				color: self.type_colors.color_for(doc_type).to_css(),
			})
			.collect()
	}

	pub fn node_count(&self) -> usize {
		let mut count = 0;
		self.physics.visit_nodes(|_| count += 1);
		count
	}

	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}

	pub fn has_self_loop(&self, id: &str) -> bool {
		self.self_loops.contains(id)
	}

	pub fn position_of(&self, id: &str) -> Option<(f32, f32)> {
		let mut found = None;
		self.physics.visit_nodes(|node| {
			if node.data.user_data.target.id == id {
				found = Some((node.x(), node.y()));
			}
		});
		found
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// The topmost node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64, config: &ScaleConfig) -> Option<NodeInfo> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let scale = ScaledValues::new(config, self.transform.k);
		let mut found = None;
		self.physics.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let hit_radius = node.data.user_data.radius.max(scale.min_hit_radius);
			if (dx * dx + dy * dy).sqrt() < hit_radius {
				found = Some(node.data.user_data.clone());
			}
		});
		found
	}

	pub fn set_hover(&mut self, id: Option<&str>) {
		self.highlight.set_hover(id, &self.edges);
	}

	/// Moves a node and pins it in place.
	pub fn pin_node(&mut self, id: &str, x: f32, y: f32) {
		self.physics.visit_nodes_mut(|node| {
			if node.data.user_data.target.id == id {
				node.data.x = x;
				node.data.y = y;
				node.data.is_anchor = true;
			}
		});
	}

	pub fn tick(&mut self, dt: f32) {
		self.physics.update(dt);
		self.highlight.tick(dt as f64);
	}

	/// Resizes the viewport, keeping the world origin centered.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}
}
