//! Zoom-dependent sizes for graph visuals.
//!
//! Node radii live in world space (they come from document weight). Strokes,
//! fonts and the presence overlay are specified in screen pixels and divided
//! by the zoom factor `k` so they look the same at every zoom level.

/// How a size in the config reacts to zoom.
#[derive(Clone, Debug)]
pub enum ScaleBehavior {
	/// Constant screen-space size (pixels). Unaffected by zoom.
	Screen,
	/// World-space size, clamped to min/max screen-space bounds.
	Clamped { min_screen: f64, max_screen: f64 },
}

impl ScaleBehavior {
	/// World-space value for `base` at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// Tunable sizes; screen pixels unless noted.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub edge_width: f64,
	/// Arrow length in world units
	pub arrow_size: f64,
	pub arrow_behavior: ScaleBehavior,
	/// Hit radius floor so tiny nodes stay clickable
	pub min_hit_radius: f64,
	pub label_size: f64,
	/// Largest label font in world units
	pub label_max: f64,
	/// Labels are hidden below this on-screen node radius
	pub label_min_radius: f64,
	/// Extra width a label may take beyond the node's diameter
	pub label_slack: f64,
	pub label_gap: f64,
	/// Gap between a node's edge and the avatar center
	pub avatar_distance: f64,
	pub presence_font_size: f64,
	pub presence_line_width: f64,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			edge_width: 2.0,
			arrow_size: 3.0,
			arrow_behavior: ScaleBehavior::Clamped {
				min_screen: 0.0,
				max_screen: 12.0,
			},
			min_hit_radius: 5.0,
			label_size: 10.0,
			label_max: 100.0,
			label_min_radius: 10.0,
			label_slack: 30.0,
			label_gap: 5.0,
			avatar_distance: 40.0,
			presence_font_size: 12.0,
			presence_line_width: 2.0,
		}
	}
}

/// Pre-computed world-space values for one frame.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	pub k: f64,
	pub edge_line_width: f64,
	pub arrow_size: f64,
	pub min_hit_radius: f64,
	pub label_font: String,
	pub label_min_radius: f64,
	pub label_slack: f64,
	pub label_gap: f64,
	pub label_outline_width: f64,
	pub avatar_distance: f64,
	pub presence_font: String,
	pub presence_line_width: f64,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let screen = ScaleBehavior::Screen;
		let label_size = screen.apply(config.label_size, k).min(config.label_max);
		let presence_size = screen.apply(config.presence_font_size, k).round().max(1.0);

		Self {
			k,
			edge_line_width: screen.apply(config.edge_width, k),
			arrow_size: config.arrow_behavior.apply(config.arrow_size, k),
			min_hit_radius: screen.apply(config.min_hit_radius, k),
			label_font: format!("{label_size}px sans-serif"),
			label_min_radius: screen.apply(config.label_min_radius, k),
			label_slack: screen.apply(config.label_slack, k),
			label_gap: screen.apply(config.label_gap, k),
			label_outline_width: screen.apply(2.0, k),
			avatar_distance: config.avatar_distance,
			presence_font: format!("bold {presence_size}px sans-serif"),
			presence_line_width: screen.apply(config.presence_line_width, k),
		}
	}

	/// Whether a node of world radius `radius` is large enough on screen to label.
	pub fn shows_label(&self, radius: f64) -> bool {
		radius > self.label_min_radius
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn screen_sizes_shrink_when_zoomed_in() {
		let config = ScaleConfig::default();
		let near = ScaledValues::new(&config, 4.0);
		let far = ScaledValues::new(&config, 1.0);
		assert_eq!(far.edge_line_width, 2.0);
		assert_eq!(near.edge_line_width, 0.5);
	}

	#[test]
	fn label_font_is_capped() {
		let scaled = ScaledValues::new(&ScaleConfig::default(), 0.05);
		assert_eq!(scaled.label_font, "100px sans-serif");
	}

	#[test]
	fn labels_need_ten_screen_pixels() {
		let scaled = ScaledValues::new(&ScaleConfig::default(), 2.0);
		assert!(!scaled.shows_label(5.0));
		assert!(scaled.shows_label(5.5));
	}

	#[test]
	fn clamped_behavior_bounds_screen_size() {
		let clamp = ScaleBehavior::Clamped {
			min_screen: 2.0,
			max_screen: 12.0,
		};
		assert_eq!(clamp.apply(3.0, 10.0), 1.2);
		assert_eq!(clamp.apply(3.0, 0.1), 20.0);
		assert_eq!(clamp.apply(3.0, 1.0), 3.0);
	}
}
