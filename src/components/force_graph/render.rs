//! Canvas rendering for the graph scene.
//!
//! Rendering uses multiple passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Edges, then nodes with their labels (world space)
//! 3. Presence overlays on top of everything else

use std::f64::consts::PI;

use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::easing::{FADE, FLASH};
use super::scale::{ScaleConfig, ScaledValues};
use super::state::{GraphScene, NodeInfo};
use super::theme::{Theme, user_color};
use crate::engine::Session;
use crate::engine::metrics::truncate;

/// How long a new avatar flashes in its user's color.
const FLASH_MS: f64 = 700.0;

/// Renders the complete scene to the canvas. `now` is the wall clock in ms.
pub fn render(
	scene: &GraphScene<HtmlImageElement>,
	ctx: &CanvasRenderingContext2d,
	config: &ScaleConfig,
	theme: &Theme,
	now: u64,
) {
	let scale = ScaledValues::new(config, scene.transform.k);

	draw_background(scene, ctx, theme);

	ctx.save();
	let _ = ctx.translate(scene.transform.x, scene.transform.y);
	let _ = ctx.scale(scene.transform.k, scene.transform.k);

	draw_edges(scene, ctx, &scale, theme);
	draw_nodes(scene, ctx, &scale, theme);
	draw_presence(scene, ctx, &scale, theme, now);

	ctx.restore();

	if theme.background.vignette > 0.0 {
		draw_vignette(scene, ctx, theme);
	}
}

fn draw_background<I>(scene: &GraphScene<I>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (cx, cy) = (scene.width / 2.0, scene.height / 2.0);
	match ctx.create_radial_gradient(cx, cy, 0.0, cx, cy, scene.width.max(scene.height) * 0.8) {
		Ok(gradient) => {
			let _ = gradient.add_color_stop(0.0, &theme.background.color_secondary.to_css());
			let _ = gradient.add_color_stop(1.0, &theme.background.color.to_css());
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
		}
		Err(_) => ctx.set_fill_style_str(&theme.background.color.to_css()),
	}
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);
}

fn draw_vignette<I>(scene: &GraphScene<I>, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (cx, cy) = (scene.width / 2.0, scene.height / 2.0);
	let Ok(gradient) = ctx.create_radial_gradient(
		cx,
		cy,
		scene.width.min(scene.height) * 0.3,
		cx,
		cy,
		scene.width.max(scene.height) * 0.7,
	) else {
		return;
	};
	let _ = gradient.add_color_stop(0.0, "rgba(0, 0, 0, 0)");
	let _ = gradient.add_color_stop(
		1.0,
		&format!("rgba(0, 0, 0, {})", theme.background.vignette),
	);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);
}

fn draw_edges<I>(
	scene: &GraphScene<I>,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	scene.physics.visit_edges(|n1, n2, _| {
		let (source, target) = (&n1.data.user_data, &n2.data.user_data);
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < source.radius + target.radius {
			return;
		}

		let t = scene
			.highlight
			.edge_intensity(&source.target.id, &target.target.id);
		let color = theme.edge.color.lerp(theme.edge.highlight_color, t);
		ctx.set_stroke_style_str(&color.to_css());
		ctx.set_line_width(scale.edge_line_width);

		let (ux, uy) = (dx / dist, dy / dist);
		let (tip_x, tip_y) = (x2 - ux * target.radius, y2 - uy * target.radius);
		ctx.begin_path();
		ctx.move_to(x1 + ux * source.radius, y1 + uy * source.radius);
		ctx.line_to(tip_x - ux * scale.arrow_size, tip_y - uy * scale.arrow_size);
		ctx.stroke();

		// Arrow head marks the referenced document.
		let (back_x, back_y) = (tip_x - ux * scale.arrow_size, tip_y - uy * scale.arrow_size);
		let (px, py) = (-uy * scale.arrow_size * 0.5, ux * scale.arrow_size * 0.5);
		ctx.set_fill_style_str(&color.to_css());
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	});
}

fn draw_nodes<I: Clone>(
	scene: &GraphScene<I>,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
) {
	scene.physics.visit_nodes(|node| {
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let hovered = scene.highlight.hovered.as_deref() == Some(info.target.id.as_str());
		let t = if hovered {
			scene.highlight.node_intensity(&info.target.id)
		} else {
			0.0
		};

		if scene.has_self_loop(&info.target.id) {
			draw_self_loop(ctx, x, y, info.radius, scale, theme);
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, info.radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&info.color.lerp(theme.node.hover_color, t).to_css());
		ctx.set_stroke_style_str(&theme.node.border_color.to_css());
		ctx.set_line_width(theme.node.border_width);
		ctx.stroke();
		ctx.fill();

		if scale.shows_label(info.radius) {
			draw_label(ctx, info, x, y, scale, theme);
		}
	});
}

/// Small loop on the node's upper right for a document that references itself.
fn draw_self_loop(
	ctx: &CanvasRenderingContext2d,
	x: f64,
	y: f64,
	radius: f64,
	scale: &ScaledValues,
	theme: &Theme,
) {
	let offset = radius * 0.75;
	ctx.begin_path();
	let _ = ctx.arc(x + offset, y - offset, radius * 0.6, 0.0, 2.0 * PI);
	ctx.set_stroke_style_str(&theme.edge.color.to_css());
	ctx.set_line_width(scale.edge_line_width);
	ctx.stroke();
}

/// Draws the longest truncation of the label that fits under the node.
fn draw_label(
	ctx: &CanvasRenderingContext2d,
	info: &NodeInfo,
	x: f64,
	y: f64,
	scale: &ScaledValues,
	theme: &Theme,
) {
	ctx.set_font(&scale.label_font);
	let max_width = info.radius * 2.0 + scale.label_slack;

	let mut len = 50.0_f64;
	while len >= 5.0 {
		let label = truncate(&info.label, len.round() as usize);
		let fits = ctx
			.measure_text(&label)
			.map(|metrics| metrics.width() < max_width)
			.unwrap_or(false);
		if fits {
			let text_y = y + info.radius + scale.label_gap;
			ctx.set_text_align("center");
			ctx.set_text_baseline("top");
			ctx.set_stroke_style_str(&theme.node.label_outline.to_css());
			ctx.set_line_width(scale.label_outline_width);
			let _ = ctx.stroke_text(&label, x, text_y);
			ctx.set_fill_style_str(&theme.node.label_color.to_css());
			let _ = ctx.fill_text(&label, x, text_y);
			return;
		}
		len /= 1.2;
	}
}

fn draw_presence(
	scene: &GraphScene<HtmlImageElement>,
	ctx: &CanvasRenderingContext2d,
	scale: &ScaledValues,
	theme: &Theme,
	now: u64,
) {
	if scene.sessions.is_empty() {
		return;
	}
	scene.physics.visit_nodes(|node| {
		let info = &node.data.user_data;
		for session in scene
			.sessions
			.iter()
			.filter(|session| session.document_id == info.target.id)
		{
			let anchor = (node.x() as f64, node.y() as f64, info.radius);
			draw_session(ctx, session, anchor, scale, theme, scene.idle_timeout_ms, now);
		}
	});
}

/// Avatar on a spoke around the node, fading out as the session idles.
fn draw_session(
	ctx: &CanvasRenderingContext2d,
	session: &Session<HtmlImageElement>,
	(nx, ny, radius): (f64, f64, f64),
	scale: &ScaledValues,
	theme: &Theme,
	idle_timeout_ms: u64,
	now: u64,
) {
	let k = scale.k;
	let angle = session.angle;
	let (sin, cos) = angle.sin_cos();
	let image = session.user.image.as_ref();
	let (img_w, img_h) = image
		.map(|img| (img.width() as f64, img.height() as f64))
		.unwrap_or((0.0, 0.0));
	let distance = radius * k + scale.avatar_distance;
	let (x, y) = (nx + sin * distance / k, ny + cos * distance / k);

	let timeout = idle_timeout_ms.max(1) as f64;
	let idle = session.idle_ms(now) as f64;
	let line = theme.presence.line_color.to_css();
	let outline = theme.presence.outline_color.to_css();

	ctx.save();
	ctx.set_global_alpha(FADE.ease(1.0 - idle.min(timeout) / timeout));
	ctx.set_font(&scale.presence_font);

	ctx.begin_path();
	ctx.set_stroke_style_str(&line);
	ctx.set_line_width(scale.presence_line_width);
	ctx.move_to(
		nx + sin * (distance - img_w / 2.0) / k,
		ny + cos * (distance - img_h / 2.0) / k,
	);
	ctx.line_to(nx + sin * radius, ny + cos * radius);
	ctx.stroke();

	ctx.begin_path();
	let _ = ctx.arc(nx, ny, radius, 0.0, 2.0 * PI);
	ctx.stroke();

	if let Some(image) = image {
		let color = user_color(session.user.color_seed());
		ctx.save();

		let flash = FLASH.ease(((FLASH_MS - session.age_ms(now) as f64) / FLASH_MS).max(0.0));
		if flash > 0.0 {
			ctx.begin_path();
			ctx.set_fill_style_str(&color.with_alpha(flash).to_css());
			let _ = ctx.arc(x, y, (img_w / 2.0 + 10.0) / k, 0.0, 2.0 * PI);
			ctx.fill();
		}

		ctx.begin_path();
		let _ = ctx.arc(x, y, img_w / k / 2.0, 0.0, 2.0 * PI);
		ctx.clip();
		let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
			image,
			x - img_w / k / 2.0,
			y - img_h / k / 2.0,
			img_w / k,
			img_h / k,
		);
		ctx.set_stroke_style_str(&outline);
		ctx.set_line_width(6.0 / k);
		ctx.stroke();
		ctx.set_stroke_style_str(&color.to_css());
		ctx.set_line_width(4.0 / k);
		ctx.stroke();

		ctx.restore();
	}

	ctx.begin_path();
	ctx.set_stroke_style_str(&outline);
	ctx.set_line_width(0.5 / k);
	let _ = ctx.arc(x, y, img_w / k / 2.0, 0.0, 2.0 * PI);
	ctx.stroke();

	// Names go above avatars in the top half of the circle.
	let above = (PI / 2.0..PI * 1.5).contains(&angle);
	let text_y = if above {
		y - (img_h / 2.0 + 5.0) / k
	} else {
		y + (img_h / 2.0 + 5.0) / k
	};
	ctx.set_fill_style_str(&theme.presence.name_color.to_css());
	ctx.set_text_align("center");
	ctx.set_text_baseline(if above { "bottom" } else { "top" });
	let _ = ctx.fill_text(session.user.display_name(), x, text_y);

	ctx.restore();
}
