//! Visual theming for the graph canvas.
//!
//! Colors for document types are handed out in order of first appearance from
//! a fixed hue table, and remembered per canvas so the legend and the nodes
//! agree. User colors are derived from a stable seed.

use std::collections::HashMap;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * (1.0 - t) + other.r as f64 * t) as u8,
			g: (self.g as f64 * (1.0 - t) + other.g as f64 * t) as u8,
			b: (self.b as f64 * (1.0 - t) + other.b as f64 * t) as u8,
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Mid-tone hues, one per document type before wrapping around.
pub const HUES: [Color; 9] = [
	Color::rgb(134, 144, 160), // Gray
	Color::rgb(76, 145, 255),  // Blue
	Color::rgb(160, 110, 240), // Purple
	Color::rgb(240, 100, 190), // Magenta
	Color::rgb(245, 90, 90),   // Red
	Color::rgb(245, 140, 70),  // Orange
	Color::rgb(230, 190, 50),  // Yellow
	Color::rgb(70, 190, 110),  // Green
	Color::rgb(50, 185, 200),  // Cyan
];

/// Color for a user, stable for a given seed.
pub fn user_color(seed: u32) -> Color {
	HUES[seed as usize % HUES.len()]
}

/// Document type colors, assigned on first request.
#[derive(Clone, Debug, Default)]
pub struct TypeColors {
	assigned: HashMap<String, Color>,
}

impl TypeColors {
	pub fn color_for(&mut self, doc_type: &str) -> Color {
		if let Some(color) = self.assigned.get(doc_type) {
			return *color;
		}
		let color = HUES[self.assigned.len() % HUES.len()];
		self.assigned.insert(doc_type.to_owned(), color);
		color
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Primary background color
	pub color: Color,
	/// Center color of the radial gradient
	pub color_secondary: Color,
	/// Vignette intensity (0.0 = none, 1.0 = strong)
	pub vignette: f64,
}

/// Edge visual style.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	pub color: Color,
	/// Color of edges touching the hovered node
	pub highlight_color: Color,
}

/// Node visual style.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	pub border_color: Color,
	/// Border width in world units
	pub border_width: f64,
	/// Fill blended in while a node is hovered
	pub hover_color: Color,
	pub label_color: Color,
	/// Stroke drawn under labels for contrast
	pub label_outline: Color,
}

/// Presence overlay style.
#[derive(Clone, Debug)]
pub struct PresenceStyle {
	/// Connector line and ring around the node
	pub line_color: Color,
	/// Dark stroke under the user-colored avatar ring
	pub outline_color: Color,
	pub name_color: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: BackgroundStyle,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
	pub presence: PresenceStyle,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: BackgroundStyle {
				color: Color::rgb(19, 20, 27),
				color_secondary: Color::rgb(27, 29, 38),
				vignette: 0.15,
			},
			edge: EdgeStyle {
				color: Color::rgba(134, 144, 160, 0.125),
				highlight_color: Color::rgba(200, 210, 225, 0.6),
			},
			node: NodeStyle {
				border_color: Color::rgba(0, 0, 0, 0.5),
				border_width: 0.5,
				hover_color: Color::rgba(134, 144, 160, 0.8),
				label_color: Color::rgb(255, 255, 255),
				label_outline: Color::rgba(0, 0, 0, 0.5),
			},
			presence: PresenceStyle {
				line_color: Color::rgb(255, 255, 255),
				outline_color: Color::rgb(0, 0, 0),
				name_color: Color::rgb(255, 255, 255),
			},
		}
	}
}
