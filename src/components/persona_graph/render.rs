use std::f64::consts::{FRAC_PI_2, PI, TAU};

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scene::{SceneEdge, SceneNode};
use super::state::{BADGE_RADIUS, PersonaGraphState, badge_center};
use super::types::Layer;
use super::visibility::DetailLevel;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &PersonaGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_rings(state, ctx);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// Faint guides for the layer rings.
fn draw_rings(state: &PersonaGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.05)");
	ctx.set_line_width(1.0 / k);
	let mut radii: Vec<f64> = state
		.engine
		.layout()
		.nodes
		.values()
		.filter(|placed| placed.layer != Layer::Profile)
		.map(|placed| placed.position.length().round())
		.collect();
	radii.sort_by(f64::total_cmp);
	radii.dedup_by(|a, b| (*a - *b).abs() < 20.0);
	for r in radii {
		ctx.begin_path();
		let _ = ctx.arc(0.0, 0.0, r, 0.0, TAU);
		ctx.stroke();
	}
}

fn draw_edges(state: &PersonaGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap) = (1.5 / k, 8.0 / k, 4.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.fade.highlight_t);
	let scene = state.engine.scene();

	for edge in &scene.edges {
		let (Some(source), Some(target)) = (scene.node(&edge.source_id), scene.node(&edge.target_id))
		else {
			continue;
		};
		draw_edge(ctx, edge, source, target, line_width, t);
		if edge.animated {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(dash_offset);
			ctx.set_global_alpha(0.6 * edge.opacity);
			ctx.set_stroke_style_str("white");
			ctx.stroke();
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}
	}
	ctx.set_global_alpha(1.0);
}

fn draw_edge(
	ctx: &CanvasRenderingContext2d,
	edge: &SceneEdge,
	source: &SceneNode,
	target: &SceneNode,
	line_width: f64,
	t: f64,
) {
	let (a, b) = (source.position(), target.position());
	let delta = b - a;
	let Some(dir) = delta.normalized() else {
		return;
	};
	let start = a + dir * (source.diameter / 2.0);
	let end = b - dir * (target.diameter / 2.0);

	// Highlighted edges thicken as the hover fade comes in.
	let width = if edge.opacity >= 1.0 {
		line_width * (1.0 + 0.5 * t)
	} else {
		line_width
	};
	ctx.set_global_alpha(edge.opacity);
	ctx.set_stroke_style_str(&edge.color);
	ctx.set_line_width(width);
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	ctx.line_to(end.x, end.y);
	ctx.stroke();
}

fn draw_nodes(state: &PersonaGraphState, ctx: &CanvasRenderingContext2d) {
	let (t, k) = (ease_out_cubic(state.fade.highlight_t), state.transform.k);
	let hovered = state.engine.interaction().hovered.as_deref();
	let dim = state.has_active_highlight();

	for node in &state.engine.scene().nodes {
		let related = hovered.is_some_and(|h| {
			h == node.id
				|| state.engine.scene().edges.iter().any(|e| {
					(e.source_id == h && e.target_id == node.id)
						|| (e.target_id == h && e.source_id == node.id)
				})
		});
		let alpha = if dim && !related { 1.0 - 0.5 * t } else { 1.0 };
		ctx.set_global_alpha(alpha);

		if node.is_hovered && t > 0.01 {
			draw_glow(ctx, node, t);
		}
		match node.detail_level {
			DetailLevel::Macro => draw_glyph(ctx, node),
			DetailLevel::Full => draw_card(ctx, node, k),
			DetailLevel::Hidden => {}
		}
		if node.is_selected {
			ctx.begin_path();
			let _ = ctx.arc(node.x, node.y, node.diameter / 2.0 + 4.0 / k, 0.0, TAU);
			ctx.set_stroke_style_str("rgba(59, 130, 246, 1)");
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}
		if node.cluster.is_some() {
			draw_badge(ctx, node, k);
		}
	}
	ctx.set_global_alpha(1.0);
}

fn draw_glow(ctx: &CanvasRenderingContext2d, node: &SceneNode, t: f64) {
	let radius = node.diameter / 2.0;
	let glow_radius = radius * (1.4 + 0.8 * t);
	let Ok(gradient) =
		ctx.create_radial_gradient(node.x, node.y, radius * 0.3, node.x, node.y, glow_radius)
	else {
		return;
	};
	let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", 0.35 * t));
	let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
	ctx.begin_path();
	let _ = ctx.arc(node.x, node.y, glow_radius, 0.0, TAU);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}

/// Macro glyph: a colored disc with the layer's mark, no text.
fn draw_glyph(ctx: &CanvasRenderingContext2d, node: &SceneNode) {
	let r = node.diameter / 2.0;
	ctx.begin_path();
	let _ = ctx.arc(node.x, node.y, r, 0.0, TAU);
	ctx.set_fill_style_str(&node.color);
	ctx.fill();
	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
	ctx.set_line_width(1.0);
	ctx.stroke();
	ctx.begin_path();
	let _ = ctx.arc(node.x, node.y, r * 0.35, 0.0, TAU);
	ctx.set_fill_style_str("rgba(255, 255, 255, 0.85)");
	ctx.fill();
}

/// Full card: disc, confidence arc and label.
fn draw_card(ctx: &CanvasRenderingContext2d, node: &SceneNode, k: f64) {
	let r = node.diameter / 2.0;
	ctx.begin_path();
	let _ = ctx.arc(node.x, node.y, r, 0.0, TAU);
	ctx.set_fill_style_str(&node.color);
	ctx.fill();

	if node.confidence > 0.0 {
		ctx.begin_path();
		let _ = ctx.arc(
			node.x,
			node.y,
			r + 2.5,
			-FRAC_PI_2,
			-FRAC_PI_2 + TAU * node.confidence,
		);
		ctx.set_stroke_style_str("rgba(120, 230, 160, 0.9)");
		ctx.set_line_width(2.0);
		ctx.stroke();
	}

	if let Some(label) = &node.label {
		ctx.set_fill_style_str("white");
		ctx.set_text_align("center");
		ctx.set_font(&format!("{}px sans-serif", node.label_font_size / k.max(0.75)));
		let _ = ctx.fill_text(label, node.x, node.y + node.label_offset);
	}
}

fn draw_badge(ctx: &CanvasRenderingContext2d, node: &SceneNode, k: f64) {
	let Some(cluster) = node.cluster else {
		return;
	};
	let center = badge_center(node);
	ctx.begin_path();
	let _ = ctx.arc(center.x, center.y, BADGE_RADIUS, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(if cluster.expanded { "#3b3b58" } else { "#ff7f0e" });
	ctx.fill();
	ctx.set_fill_style_str("white");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	ctx.set_font(&format!("bold {}px sans-serif", 10.0 / k.max(1.0)));
	let text = if cluster.expanded {
		"−".to_string()
	} else {
		cluster.child_count.to_string()
	};
	let _ = ctx.fill_text(&text, center.x, center.y);
	ctx.set_text_baseline("alphabetic");
}
